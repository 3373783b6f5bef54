use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}


fn roster_size(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> usize {
    let res = request_ok(stdin, reader, "size", "students.list", json!({}));
    res.get("students")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0)
}

#[test]
fn mutations_without_a_session_are_forbidden() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let session = request_ok(&mut stdin, &mut reader, "1", "auth.session", json!({}));
    assert!(session.get("session").map(|v| v.is_null()).unwrap_or(false));

    let create = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "student": {
            "name": "Eve", "rollNumber": "9", "class": "9", "section": "A", "attendancePercent": 70
        } }),
    );
    assert_eq!(error_code(&create), Some("forbidden"));

    let delete = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.delete",
        json!({ "studentId": "1" }),
    );
    assert_eq!(error_code(&delete), Some("forbidden"));
    assert_eq!(roster_size(&mut stdin, &mut reader), 12);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_sessions_are_read_only() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "role": "student", "credentials": { "name": "Diya Patel", "rollNumber": "102" } }),
    );
    let session = login.get("session").cloned().expect("session");
    assert_eq!(session.get("role").and_then(|v| v.as_str()), Some("student"));
    assert_eq!(session.get("displayName").and_then(|v| v.as_str()), Some("Diya Patel"));
    assert_eq!(session.get("rollNumber").and_then(|v| v.as_str()), Some("102"));

    let delete = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.delete",
        json!({ "studentId": "1" }),
    );
    assert_eq!(error_code(&delete), Some("forbidden"));
    assert_eq!(roster_size(&mut stdin, &mut reader), 12);

    // Reads stay available.
    let view = request_ok(&mut stdin, &mut reader, "3", "view.get", json!({}));
    assert_eq!(view.get("totalMatched").and_then(|v| v.as_u64()), Some(12));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn logout_returns_to_unauthenticated_and_is_idempotent() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "role": "admin", "credentials": { "username": "principal" } }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "2", "auth.logout", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "3", "auth.logout", json!({}));

    let session = request_ok(&mut stdin, &mut reader, "4", "auth.session", json!({}));
    assert!(session.get("session").map(|v| v.is_null()).unwrap_or(false));

    let delete = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.delete",
        json!({ "studentId": "1" }),
    );
    assert_eq!(error_code(&delete), Some("forbidden"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn login_rejects_unknown_roles_and_blank_identities() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let bad_role = request(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "role": "teacher", "credentials": { "username": "x" } }),
    );
    assert_eq!(error_code(&bad_role), Some("bad_params"));

    let blank = request(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "role": "admin", "credentials": { "username": "   ", "password": "secret" } }),
    );
    assert_eq!(error_code(&blank), Some("missing_credential"));

    let no_roll = request(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "role": "student", "credentials": { "name": "Asha" } }),
    );
    assert_eq!(error_code(&no_roll), Some("missing_credential"));

    let health = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));
    assert!(health.get("session").map(|v| v.is_null()).unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
}
