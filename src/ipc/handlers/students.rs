use crate::ipc::error::{command_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::roster::NewStudent;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "students": state.roster.records(),
            "version": state.roster.version(),
        }),
    )
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("student").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing student", None);
    };
    let input: NewStudent = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid student: {e}"), None),
    };

    match state.roster.add_record(&state.auth, input) {
        Ok(student) => ok(
            &req.id,
            json!({ "student": student, "view": state.view_snapshot() }),
        ),
        Err(e) => command_err(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Seed ids may arrive as bare numbers.
    let student_id = match req.params.get("studentId") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return err(&req.id, "bad_params", "missing studentId", None),
    };

    match state.roster.delete_record(&state.auth, &student_id) {
        Ok(removed) => ok(
            &req.id,
            json!({ "removed": removed, "view": state.view_snapshot() }),
        ),
        Err(e) => command_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
