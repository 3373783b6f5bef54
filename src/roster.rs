use crate::auth::AuthStore;
use crate::error::{CommandError, FieldErrors};
use crate::model::{numeric_value, Marks, StudentRecord};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Unvalidated add-student form input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStudent {
    pub name: String,
    #[serde(alias = "roll", alias = "roll_number")]
    pub roll_number: String,
    pub class: String,
    pub section: String,
    #[serde(alias = "attendance")]
    pub attendance_percent: Option<serde_json::Value>,
    pub marks: Option<Marks>,
}

/// Delivered to subscribers after every successful mutation.
#[derive(Debug)]
pub struct RosterChange<'a> {
    pub version: u64,
    pub records: &'a [StudentRecord],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&RosterChange<'_>)>;

/// The authoritative, insertion-ordered student roster.
pub struct RosterStore {
    records: Vec<StudentRecord>,
    // Every id ever held, including deleted ones.
    known_ids: HashSet<String>,
    version: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            known_ids: HashSet::new(),
            version: 0,
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Builds a store from startup data. Later duplicates of an id are dropped.
    pub fn with_records(seed: Vec<StudentRecord>) -> Self {
        let mut store = Self::new();
        for rec in seed {
            if !store.known_ids.insert(rec.id.clone()) {
                tracing::warn!(id = %rec.id, "duplicate seed id skipped");
                continue;
            }
            store.records.push(rec);
        }
        store
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&RosterChange<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drops a listener registered with [`RosterStore::subscribe`]. Returns
    /// false if `id` was already removed.
    ///
    /// The sidecar's own view subscription lives as long as the process.
    #[allow(dead_code)]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Validates `input` and appends it as a new record.
    ///
    /// Requires an admin session. On any failure the roster is untouched.
    pub fn add_record(
        &mut self,
        auth: &AuthStore,
        input: NewStudent,
    ) -> Result<StudentRecord, CommandError> {
        auth.require_admin("students.create")?;
        let attendance_percent = validate(&input).map_err(CommandError::Validation)?;

        let rec = StudentRecord {
            id: self.issue_id(),
            name: input.name.trim().to_string(),
            roll_number: input.roll_number.trim().to_string(),
            class: input.class.trim().to_string(),
            section: input.section.trim().to_string(),
            attendance_percent,
            marks: input.marks,
        };
        self.records.push(rec.clone());
        tracing::info!(id = %rec.id, size = self.records.len(), "student added");
        self.notify();
        Ok(rec)
    }

    /// Removes the record with `id`. Returns whether anything was removed;
    /// an unknown id is not an error.
    pub fn delete_record(&mut self, auth: &AuthStore, id: &str) -> Result<bool, CommandError> {
        auth.require_admin("students.delete")?;
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            tracing::debug!(id, "delete of unknown id ignored");
            return Ok(false);
        };
        self.records.remove(pos);
        tracing::info!(id, size = self.records.len(), "student deleted");
        self.notify();
        Ok(true)
    }

    fn issue_id(&mut self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.known_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn notify(&mut self) {
        self.version += 1;
        let change = RosterChange {
            version: self.version,
            records: &self.records,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

/// Checks every field and returns the parsed attendance, or all field errors at once.
pub fn validate(input: &NewStudent) -> Result<f64, FieldErrors> {
    let mut errors = FieldErrors::default();
    if input.name.trim().is_empty() {
        errors.insert("name", "Name is required");
    }
    if input.roll_number.trim().is_empty() {
        errors.insert("rollNumber", "Roll number is required");
    }
    if input.class.trim().is_empty() {
        errors.insert("class", "Class is required");
    }
    if input.section.trim().is_empty() {
        errors.insert("section", "Section is required");
    }

    let attendance = match input.attendance_percent.as_ref() {
        None | Some(serde_json::Value::Null) => {
            errors.insert("attendancePercent", "Attendance is required");
            None
        }
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            errors.insert("attendancePercent", "Attendance is required");
            None
        }
        Some(v) => match numeric_value(v).filter(|n| n.is_finite()) {
            None => {
                errors.insert("attendancePercent", "Attendance must be a number");
                None
            }
            Some(n) if !(0.0..=100.0).contains(&n) => {
                errors.insert("attendancePercent", "Must be between 0-100");
                None
            }
            Some(n) => Some(n),
        },
    };

    match attendance {
        Some(n) if errors.is_empty() => Ok(n),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::model::Role;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn admin() -> AuthStore {
        let mut auth = AuthStore::new();
        auth.login(
            Role::Admin,
            &Credentials {
                username: "principal".into(),
                ..Default::default()
            },
        )
        .expect("admin login");
        auth
    }

    fn input(name: &str, attendance: serde_json::Value) -> NewStudent {
        NewStudent {
            name: name.into(),
            roll_number: "101".into(),
            class: "10".into(),
            section: "A".into(),
            attendance_percent: Some(attendance),
            marks: None,
        }
    }

    fn seeded() -> RosterStore {
        RosterStore::with_records(vec![
            StudentRecord {
                id: "1".into(),
                name: "Alice".into(),
                roll_number: "1".into(),
                class: "10".into(),
                section: "A".into(),
                attendance_percent: 90.0,
                marks: None,
            },
            StudentRecord {
                id: "2".into(),
                name: "Bob".into(),
                roll_number: "2".into(),
                class: "10".into(),
                section: "B".into(),
                attendance_percent: 40.0,
                marks: None,
            },
        ])
    }

    #[test]
    fn add_appends_with_a_fresh_id() {
        let auth = admin();
        let mut store = seeded();
        let rec = store
            .add_record(&auth, input("  Carol ", json!(60)))
            .expect("add");
        assert_eq!(store.len(), 3);
        assert_eq!(store.records().last().map(|r| r.id.as_str()), Some(rec.id.as_str()));
        assert_eq!(rec.name, "Carol");
        assert_eq!(rec.attendance_percent, 60.0);
        assert!(rec.id != "1" && rec.id != "2");
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn add_accepts_numeric_strings_and_marks() {
        let auth = admin();
        let mut store = RosterStore::new();
        let mut marks = Marks::new();
        marks.insert("maths".into(), 88.0);
        let rec = store
            .add_record(
                &auth,
                NewStudent {
                    marks: Some(marks),
                    ..input("Dev", json!("85.5"))
                },
            )
            .expect("add");
        assert_eq!(rec.attendance_percent, 85.5);
        assert_eq!(rec.marks.and_then(|m| m.get("maths").copied()), Some(88.0));
    }

    #[test]
    fn add_with_empty_name_reports_name_and_keeps_roster() {
        let auth = admin();
        let mut store = seeded();
        let err = store.add_record(&auth, input("   ", json!(50))).unwrap_err();
        let fields = match err {
            CommandError::Validation(f) => f,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(fields.get("name"), Some("Name is required"));
        assert_eq!(fields.len(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn validation_collects_every_failing_field() {
        let fields = validate(&NewStudent::default()).unwrap_err();
        let names: Vec<_> = fields.fields().collect();
        assert_eq!(
            names,
            vec!["attendancePercent", "class", "name", "rollNumber", "section"]
        );
        assert_eq!(fields.get("attendancePercent"), Some("Attendance is required"));
    }

    #[test]
    fn validation_checks_attendance_range_and_type() {
        let out_of_range = validate(&input("A", json!(100.5))).unwrap_err();
        assert_eq!(out_of_range.get("attendancePercent"), Some("Must be between 0-100"));

        let negative = validate(&input("A", json!(-1))).unwrap_err();
        assert_eq!(negative.get("attendancePercent"), Some("Must be between 0-100"));

        let text = validate(&input("A", json!("ninety"))).unwrap_err();
        assert_eq!(text.get("attendancePercent"), Some("Attendance must be a number"));

        let nan = validate(&input("A", json!("NaN"))).unwrap_err();
        assert_eq!(nan.get("attendancePercent"), Some("Attendance must be a number"));

        assert_eq!(validate(&input("A", json!(0))), Ok(0.0));
        assert_eq!(validate(&input("A", json!(100))), Ok(100.0));
    }

    #[test]
    fn delete_unknown_id_is_a_silent_no_op() {
        let auth = admin();
        let mut store = seeded();
        let before = store.records().to_vec();
        assert_eq!(store.delete_record(&auth, "missing"), Ok(false));
        assert_eq!(store.records(), before.as_slice());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn delete_removes_and_preserves_order() {
        let auth = admin();
        let mut store = seeded();
        store.add_record(&auth, input("Carol", json!(60))).expect("add");
        assert_eq!(store.delete_record(&auth, "2"), Ok(true));
        let names: Vec<_> = store.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Carol"]);
    }

    #[test]
    fn mutations_without_admin_are_forbidden() {
        let mut store = seeded();
        let nobody = AuthStore::new();
        assert_eq!(
            store.add_record(&nobody, input("Eve", json!(70))).unwrap_err(),
            CommandError::Forbidden {
                action: "students.create"
            }
        );

        let mut student = AuthStore::new();
        student
            .login(
                Role::Student,
                &Credentials {
                    name: "Alice".into(),
                    roll_number: "1".into(),
                    ..Default::default()
                },
            )
            .expect("student login");
        assert!(matches!(
            store.delete_record(&student, "1"),
            Err(CommandError::Forbidden { .. })
        ));
        // Permission is checked before validation.
        assert!(matches!(
            store.add_record(&student, NewStudent::default()),
            Err(CommandError::Forbidden { .. })
        ));
        assert_eq!(store.len(), 2);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn subscribers_see_post_mutation_state() {
        let auth = admin();
        let mut store = seeded();
        let seen: Rc<RefCell<Vec<(u64, usize)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |change| {
            sink.borrow_mut().push((change.version, change.records.len()));
        });

        store.add_record(&auth, input("Carol", json!(60))).expect("add");
        store.delete_record(&auth, "nope").expect("no-op");
        let _ = store.add_record(&auth, input("", json!(60)));
        store.delete_record(&auth, "1").expect("delete");
        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 2)]);

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.delete_record(&auth, "2").expect("delete");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn seed_duplicates_are_dropped() {
        let mut dup = seeded().records().to_vec();
        dup.push(dup[0].clone());
        let store = RosterStore::with_records(dup);
        assert_eq!(store.len(), 2);
    }

    proptest! {
        #[test]
        fn ids_stay_unique_and_are_never_reused(ops in prop::collection::vec(any::<Option<usize>>(), 1..40)) {
            let auth = admin();
            let mut store = seeded();
            let mut issued: HashSet<String> = store.records().iter().map(|r| r.id.clone()).collect();
            for op in ops {
                match op {
                    None => {
                        let before = store.len();
                        let rec = store.add_record(&auth, input("Zed", json!(75))).expect("add");
                        prop_assert!(issued.insert(rec.id));
                        prop_assert_eq!(store.len(), before + 1);
                    }
                    Some(i) if !store.is_empty() => {
                        let id = store.records()[i % store.len()].id.clone();
                        prop_assert_eq!(store.delete_record(&auth, &id), Ok(true));
                    }
                    Some(_) => {}
                }
            }
            let live: HashSet<&str> = store.records().iter().map(|r| r.id.as_str()).collect();
            prop_assert_eq!(live.len(), store.len());
        }
    }
}
