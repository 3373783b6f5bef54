use crate::model::{numeric_value, Marks, StudentRecord};
use anyhow::Context;
use serde::Deserialize;

const BUNDLED: &str = include_str!("../data/students.json");

#[derive(Debug, Deserialize)]
struct SeedFile {
    students: Vec<SeedEntry>,
}

// Older exports use snake_case keys and bare numbers for ids and roll numbers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEntry {
    id: serde_json::Value,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "roll_number", alias = "roll")]
    roll_number: serde_json::Value,
    #[serde(default)]
    class: serde_json::Value,
    #[serde(default)]
    section: serde_json::Value,
    #[serde(default, alias = "attendance")]
    attendance_percent: serde_json::Value,
    #[serde(default)]
    marks: Option<serde_json::Map<String, serde_json::Value>>,
}

pub fn load_bundled() -> anyhow::Result<Vec<StudentRecord>> {
    parse_seed(BUNDLED).context("bundled student data is malformed")
}

/// Parses a `{ "students": [...] }` document. Entries that cannot become a
/// valid record are skipped with a warning.
pub fn parse_seed(text: &str) -> anyhow::Result<Vec<StudentRecord>> {
    let file: SeedFile = serde_json::from_str(text).context("failed to parse seed json")?;
    let mut out = Vec::with_capacity(file.students.len());
    for (idx, entry) in file.students.into_iter().enumerate() {
        match into_record(entry) {
            Ok(rec) => out.push(rec),
            Err(reason) => tracing::warn!(index = idx, reason, "seed entry skipped"),
        }
    }
    Ok(out)
}

fn into_record(entry: SeedEntry) -> Result<StudentRecord, &'static str> {
    let id = scalar_text(&entry.id).ok_or("missing id")?;
    let attendance_percent = numeric_value(&entry.attendance_percent)
        .filter(|n| n.is_finite() && (0.0..=100.0).contains(n))
        .ok_or("attendance missing or outside 0-100")?;
    let marks = entry.marks.map(|m| {
        m.iter()
            .filter_map(|(subject, v)| numeric_value(v).map(|n| (subject.clone(), n)))
            .collect::<Marks>()
    });
    Ok(StudentRecord {
        id,
        name: entry.name,
        roll_number: scalar_text(&entry.roll_number).unwrap_or_default(),
        class: scalar_text(&entry.class).unwrap_or_default(),
        section: scalar_text(&entry.section).unwrap_or_default(),
        attendance_percent,
        marks,
    })
}

fn scalar_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
