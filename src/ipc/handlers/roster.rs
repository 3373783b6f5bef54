use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::stats;
use serde_json::json;

fn handle_roster_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(stats::roster_stats(state.roster.records())))
}

fn handle_roster_filter_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(stats::filter_options(state.roster.records())))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.stats" => Some(handle_roster_stats(state, req)),
        "roster.filterOptions" => Some(handle_roster_filter_options(state, req)),
        _ => None,
    }
}
