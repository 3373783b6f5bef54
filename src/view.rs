//! Derived roster views: filtering, pagination and CSV export rows.
//!
//! Everything here is a pure function of its inputs. Callers own the current
//! criteria and page index and re-run [`project`] whenever either changes or the
//! roster does.

use crate::model::{FilterCriteria, PageDescriptor, StudentRecord};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One export column: a header label and a dot-path into the serialized record
/// (for example `marks.maths`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvColumn {
    pub label: String,
    pub key: String,
}

impl CsvColumn {
    fn new(label: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
        }
    }
}

pub fn default_columns() -> Vec<CsvColumn> {
    vec![
        CsvColumn::new("Name", "name"),
        CsvColumn::new("Roll No", "rollNumber"),
        CsvColumn::new("Class", "class"),
        CsvColumn::new("Section", "section"),
        CsvColumn::new("Attendance", "attendancePercent"),
        CsvColumn::new("Maths", "marks.maths"),
        CsvColumn::new("Science", "marks.science"),
        CsvColumn::new("English", "marks.english"),
    ]
}

/// 1-based inclusive bounds of the visible rows within the matched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShowingRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub rows: Vec<StudentRecord>,
    pub total_matched: usize,
    pub page_count: usize,
    /// The page actually shown, after clamping the requested index.
    pub page: PageDescriptor,
    pub range: ShowingRange,
    #[serde(skip)]
    pub csv_header: Vec<String>,
    /// Every matched record, not just the visible page.
    #[serde(skip)]
    pub csv_rows: Vec<Vec<String>>,
}

impl Projection {
    /// Renders header plus `csv_rows` as CSV text, one line per record.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        wtr.write_record(&self.csv_header)
            .context("failed to write csv header")?;
        for row in &self.csv_rows {
            wtr.write_record(row).context("failed to write csv row")?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush csv writer: {}", e.error()))?;
        String::from_utf8(bytes).context("csv output is not utf-8")
    }
}

pub fn matches(rec: &StudentRecord, criteria: &FilterCriteria) -> bool {
    matches_search(rec, &criteria.search_term)
        && matches_exact(&rec.class, criteria.class_filter.as_deref())
        && matches_exact(&rec.section, criteria.section_filter.as_deref())
        && matches_attendance(rec.attendance_percent, criteria)
}

fn matches_search(rec: &StudentRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    // Names ignore case; roll numbers are matched as typed.
    rec.name.to_lowercase().contains(&term.to_lowercase()) || rec.roll_number.contains(term)
}

fn matches_exact(value: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(f) if !f.is_empty() => value == f,
        _ => true,
    }
}

fn matches_attendance(value: f64, criteria: &FilterCriteria) -> bool {
    let min = criteria.min_attendance.unwrap_or(0.0);
    let max = criteria.max_attendance.unwrap_or(100.0);
    value >= min && value <= max
}

/// Computes the visible page, counts and export rows for `records`.
pub fn project(
    records: &[StudentRecord],
    criteria: &FilterCriteria,
    page: PageDescriptor,
    columns: &[CsvColumn],
) -> Projection {
    let matched: Vec<&StudentRecord> = records.iter().filter(|r| matches(r, criteria)).collect();
    let total_matched = matched.len();

    let size = page.size.max(1);
    let page_count = total_matched.div_ceil(size);
    let index = page.index.clamp(1, page_count.max(1));
    let start = ((index - 1) * size).min(total_matched);
    let end = (start + size).min(total_matched);

    let rows = matched[start..end].iter().map(|r| (*r).clone()).collect();
    let range = if total_matched == 0 {
        ShowingRange { start: 0, end: 0 }
    } else {
        ShowingRange {
            start: start + 1,
            end,
        }
    };

    let csv_header = columns.iter().map(|c| c.label.clone()).collect();
    let csv_rows = matched.iter().map(|r| csv_row(r, columns)).collect();

    Projection {
        rows,
        total_matched,
        page_count,
        page: PageDescriptor { index, size },
        range,
        csv_header,
        csv_rows,
    }
}

fn csv_row(rec: &StudentRecord, columns: &[CsvColumn]) -> Vec<String> {
    let value = serde_json::to_value(rec).unwrap_or(serde_json::Value::Null);
    columns.iter().map(|c| field_text(&value, &c.key)).collect()
}

/// Resolves a dot-path. Anything missing along the way renders as "".
fn field_text(root: &serde_json::Value, path: &str) -> String {
    let mut cur = root;
    for part in path.split('.') {
        match cur.get(part) {
            Some(next) => cur = next,
            None => return String::new(),
        }
    }
    match cur {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) if n.is_f64() => {
            n.as_f64().map(|f| f.to_string()).unwrap_or_default()
        }
        other => other.to_string(),
    }
}
