//! Bench case records and their JSON/CSV serialization.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fmt::Write as _;

/// Analyzer family a case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Harmonic distortion.
    Thd,
    /// Attack/release timing.
    AttackRelease,
    /// Compression curve.
    Compressor,
    /// Reference/target comparison.
    Compare,
}

impl Category {
    /// Name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Thd => "thd",
            Category::AttackRelease => "attack_release",
            Category::Compressor => "compressor",
            Category::Compare => "compare",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one bench case. A skipped case has notes and no metrics.
#[derive(Debug, Clone, Serialize)]
pub struct BenchCase {
    /// Case name from the plan.
    pub name: String,
    /// Analyzer family.
    pub category: Category,
    /// Resolved parameters.
    pub params: Value,
    /// Result fields keyed by their stable names.
    pub metrics: Map<String, Value>,
    /// Skip reasons and sanity warnings.
    pub notes: Vec<String>,
}

impl BenchCase {
    /// Case that ran and produced `metrics`.
    pub fn measured(
        name: impl Into<String>,
        category: Category,
        params: Value,
        metrics: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            params,
            metrics,
            notes: Vec::new(),
        }
    }

    /// Case that did not run, with the reason.
    pub fn skipped(
        name: impl Into<String>,
        category: Category,
        params: Value,
        note: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            params,
            metrics: Map::new(),
            notes: vec![note.into()],
        }
    }

    /// Append notes.
    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes.extend(notes);
        self
    }

    fn metric(&self, key: &str) -> f64 {
        self.metrics
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(f64::NAN)
    }

    /// One-line console summary.
    pub fn summary_line(&self) -> String {
        let mut msg = format!("- {} [{}]", self.name, self.category);
        if !self.notes.is_empty() {
            msg.push_str(" | ");
            msg.push_str(&self.notes.join("; "));
        } else if !self.metrics.is_empty() {
            let detail = match self.category {
                Category::Thd => format!(
                    "THD {:.2} dB, THD+N {:.2} dB",
                    self.metric("thd_db"),
                    self.metric("thdn_db")
                ),
                Category::AttackRelease => format!(
                    "Attack {:.1} ms / Release {:.1} ms",
                    self.metric("attack_ms"),
                    self.metric("release_ms")
                ),
                Category::Compressor => format!(
                    "Thr {:.2} dB, Ratio {:.2}",
                    self.metric("thr_db"),
                    self.metric("ratio")
                ),
                Category::Compare => format!(
                    "Latency {:.2} ms, Gain {:+.2} dB",
                    self.metric("latency_ms"),
                    self.metric("gain_error_db")
                ),
            };
            msg.push_str(" | ");
            msg.push_str(&detail);
        }
        msg
    }

    /// Flat CSV row: scalars as-is, lists and maps JSON-encoded.
    pub fn flat_row(&self) -> Vec<(String, String)> {
        let mut row = vec![
            ("name".to_string(), self.name.clone()),
            ("category".to_string(), self.category.to_string()),
        ];
        for (key, value) in &self.metrics {
            row.push((key.clone(), scalar_text(value)));
        }
        if !self.notes.is_empty() {
            row.push(("notes".to_string(), self.notes.join(" | ")));
        }
        if !is_empty_value(&self.params) {
            row.push(("params".to_string(), self.params.to_string()));
        }
        row
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Text form of a metric value in a CSV cell.
///
/// `null` only arises from the NaN sentinels, so it prints as `nan`.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "nan".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Quote a CSV field when it holds a delimiter, quote or line break.
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Render cases as CSV. Columns are the union of row keys in first-seen order.
pub fn to_csv(cases: &[BenchCase]) -> String {
    let rows: Vec<Vec<(String, String)>> = cases.iter().map(BenchCase::flat_row).collect();

    let mut columns: Vec<&str> = Vec::new();
    for row in &rows {
        for (key, _) in row {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut csv = String::new();
    let header: Vec<String> = columns.iter().map(|c| csv_field(c)).collect();
    csv.push_str(&header.join(","));
    csv.push('\n');

    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                row.iter()
                    .find(|(key, _)| key == column)
                    .map(|(_, value)| csv_field(value))
                    .unwrap_or_default()
            })
            .collect();
        let _ = writeln!(csv, "{}", cells.join(","));
    }
    csv
}

/// Build environment description stored alongside the results.
pub fn collect_env() -> Map<String, Value> {
    let mut env = Map::new();
    env.insert(
        "pathprobe".to_string(),
        Value::from(env!("CARGO_PKG_VERSION")),
    );
    env.insert("os".to_string(), Value::from(std::env::consts::OS));
    env.insert("arch".to_string(), Value::from(std::env::consts::ARCH));
    env.insert("family".to_string(), Value::from(std::env::consts::FAMILY));
    env
}

/// Full JSON results document.
#[derive(Debug, Serialize)]
pub struct BenchReport<'a> {
    /// Build environment.
    pub env: Map<String, Value>,
    /// Every case in run order.
    pub cases: &'a [BenchCase],
}

impl<'a> BenchReport<'a> {
    /// Report over `cases` with the current environment.
    pub fn new(cases: &'a [BenchCase]) -> Self {
        Self {
            env: collect_env(),
            cases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_flat_row_encodes_collections() {
        let case = BenchCase::measured(
            "h2",
            Category::Thd,
            json!({"freq": 1000.0}),
            object(json!({"thd_db": -30.0, "harmonics_dbc": {"2": -30.0}})),
        );
        let row = case.flat_row();
        assert_eq!(row[0], ("name".to_string(), "h2".to_string()));
        assert_eq!(row[1], ("category".to_string(), "thd".to_string()));
        assert!(row.contains(&("harmonics_dbc".to_string(), "{\"2\":-30.0}".to_string())));
        assert_eq!(
            row.last(),
            Some(&("params".to_string(), "{\"freq\":1000.0}".to_string()))
        );
    }

    #[test]
    fn test_csv_union_of_columns_in_first_seen_order() {
        let cases = vec![
            BenchCase::measured(
                "a",
                Category::AttackRelease,
                Value::Null,
                object(json!({"attack_ms": 12.5, "release_ms": null})),
            ),
            BenchCase::skipped(
                "b",
                Category::Compare,
                json!({"input": "", "output": ""}),
                "Skipped: missing input/output wav.",
            ),
        ];
        let csv = to_csv(&cases);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,category,attack_ms,release_ms,notes,params");
        assert_eq!(lines[1], "a,attack_release,12.5,nan,,");
        assert_eq!(
            lines[2],
            "b,compare,,,Skipped: missing input/output wav.,\"{\"\"input\"\":\"\"\"\",\"\"output\"\":\"\"\"\"}\""
        );
    }

    #[test]
    fn test_summary_lines() {
        let case = BenchCase::measured(
            "cmp",
            Category::Compare,
            Value::Null,
            object(json!({"latency_ms": 5.0, "gain_error_db": -6.02})),
        );
        assert_eq!(
            case.summary_line(),
            "- cmp [compare] | Latency 5.00 ms, Gain -6.02 dB"
        );

        let skipped = BenchCase::skipped("x", Category::Thd, Value::Null, "Skipped: missing input_wav.");
        assert_eq!(
            skipped.summary_line(),
            "- x [thd] | Skipped: missing input_wav."
        );

        let bypass = BenchCase::measured(
            "c",
            Category::Compressor,
            Value::Null,
            object(json!({"thr_db": null, "ratio": 1.0})),
        );
        assert_eq!(bypass.summary_line(), "- c [compressor] | Thr NaN dB, Ratio 1.00");
    }

    #[test]
    fn test_report_shape() {
        let cases = vec![BenchCase::skipped("x", Category::Thd, Value::Null, "n")];
        let value = serde_json::to_value(BenchReport::new(&cases)).unwrap();
        assert!(value["env"]["os"].is_string());
        assert_eq!(value["cases"][0]["category"], "thd");
        assert_eq!(value["cases"][0]["notes"][0], "n");
    }
}
