use crate::model::StudentRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

pub const GOOD_ATTENDANCE: f64 = 75.0;
pub const FAIR_ATTENDANCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    Good,
    Fair,
    Low,
}

impl AttendanceBand {
    pub fn of(percent: f64) -> Self {
        if percent >= GOOD_ATTENDANCE {
            AttendanceBand::Good
        } else if percent >= FAIR_ATTENDANCE {
            AttendanceBand::Fair
        } else {
            AttendanceBand::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub classes: Vec<String>,
    pub sections: Vec<String>,
}

/// Distinct class and section values, each sorted.
pub fn filter_options(records: &[StudentRecord]) -> FilterOptions {
    let classes: BTreeSet<&str> = records.iter().map(|r| r.class.as_str()).collect();
    let sections: BTreeSet<&str> = records.iter().map(|r| r.section.as_str()).collect();
    FilterOptions {
        classes: classes.into_iter().map(str::to_string).collect(),
        sections: sections.into_iter().map(str::to_string).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendancePoint {
    pub name: String,
    pub attendance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    pub good: usize,
    pub fair: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStats {
    pub total: usize,
    pub average_attendance: Option<f64>,
    pub attendance_series: Vec<AttendancePoint>,
    pub class_counts: Vec<ClassCount>,
    pub bands: BandCounts,
}

pub fn roster_stats(records: &[StudentRecord]) -> RosterStats {
    let mut per_class: BTreeMap<&str, usize> = BTreeMap::new();
    let mut bands = BandCounts::default();
    let mut sum = 0.0;

    for r in records {
        *per_class.entry(r.class.as_str()).or_default() += 1;
        match AttendanceBand::of(r.attendance_percent) {
            AttendanceBand::Good => bands.good += 1,
            AttendanceBand::Fair => bands.fair += 1,
            AttendanceBand::Low => bands.low += 1,
        }
        sum += r.attendance_percent;
    }

    let average_attendance = if records.is_empty() {
        None
    } else {
        Some(sum / records.len() as f64)
    };

    RosterStats {
        total: records.len(),
        average_attendance,
        attendance_series: records
            .iter()
            .map(|r| AttendancePoint {
                name: r.name.clone(),
                attendance: r.attendance_percent.trunc() as i64,
            })
            .collect(),
        class_counts: per_class
            .into_iter()
            .map(|(class, count)| ClassCount {
                class: class.to_string(),
                label: format!("Class {}", class),
                count,
            })
            .collect(),
        bands,
    }
}
