use crate::auth::Credentials;
use crate::ipc::error::{command_err, err, ok};
use crate::ipc::helpers::{optional_object, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let role_raw = match required_str(req, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(role) = Role::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            "role must be admin or student",
            Some(json!({ "role": role_raw })),
        );
    };
    let credentials: Credentials = match optional_object(req, "credentials") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.auth.login(role, &credentials) {
        Ok(session) => ok(&req.id, json!({ "session": session })),
        Err(e) => command_err(&req.id, &e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.auth.logout();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.auth.session() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
