use crate::ipc::error::{err, ok};
use crate::ipc::helpers::optional_object;
use crate::ipc::types::{AppState, Request};
use crate::model::FilterCriteria;
use serde_json::json;
use std::path::{Path, PathBuf};

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn handle_view_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state.view_snapshot())
}

fn handle_view_set_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let criteria: FilterCriteria = match optional_object(req, "criteria") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    tracing::debug!(?criteria, "filter changed");
    state.view.borrow_mut().set_criteria(criteria);
    ok(&req.id, state.view_snapshot())
}

fn handle_view_set_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(
            &req.id,
            "bad_params",
            "index must be a non-negative integer",
            None,
        );
    };
    state
        .view
        .borrow_mut()
        .set_page(usize::try_from(index).unwrap_or(usize::MAX));
    ok(&req.id, state.view_snapshot())
}

/// `outPath` names a folder unless it ends in `.csv`. A folder gets the
/// configured export file name appended, whether or not it exists yet.
fn resolve_export_path(out_path: &str, file_name: &str) -> PathBuf {
    let p = PathBuf::from(out_path);
    let names_csv_file = !out_path.ends_with('/')
        && !out_path.ends_with('\\')
        && p.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if names_csv_file && !p.is_dir() {
        p
    } else {
        p.join(file_name)
    }
}

fn write_text_file(path: &Path, contents: &str) -> Result<(), HandlerErr> {
    let details = || Some(json!({ "path": path.to_string_lossy() }));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "export_failed",
            message: e.to_string(),
            details: details(),
        })?;
    }
    std::fs::write(path, contents).map_err(|e| HandlerErr {
        code: "export_failed",
        message: e.to_string(),
        details: details(),
    })
}

fn export_csv(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (csv, row_count) = {
        let mut view = state.view.borrow_mut();
        let projection = view.current(state.roster.version(), state.roster.records());
        let csv = projection.to_csv().map_err(|e| HandlerErr {
            code: "export_failed",
            message: format!("{e:#}"),
            details: None,
        })?;
        (csv, projection.csv_rows.len())
    };

    let file_name = state.config.export_file_name.as_str();
    let mut result = json!({
        "fileName": file_name,
        "rowCount": row_count,
        "exportedAt": chrono::Utc::now().to_rfc3339(),
    });

    match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(out) if !out.trim().is_empty() => {
            let path = resolve_export_path(out.trim(), file_name);
            write_text_file(&path, &csv)?;
            tracing::info!(rows = row_count, path = %path.display(), "csv exported");
            result["path"] = json!(path.to_string_lossy());
        }
        _ => {
            tracing::info!(rows = row_count, "csv exported inline");
            result["csv"] = json!(csv);
        }
    }
    Ok(result)
}

fn handle_view_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    match export_csv(state, req) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.get" => Some(handle_view_get(state, req)),
        "view.setFilter" => Some(handle_view_set_filter(state, req)),
        "view.setPage" => Some(handle_view_set_page(state, req)),
        "view.exportCsv" => Some(handle_view_export_csv(state, req)),
        _ => None,
    }
}
