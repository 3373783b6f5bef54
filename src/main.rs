mod auth;
mod config;
mod error;
mod ipc;
mod logging;
mod model;
mod roster;
mod seed;
mod stats;
mod view;

use anyhow::Context;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => config::AppConfig::load(&path)?,
        None => config::AppConfig::default(),
    };
    let seed = seed::load_bundled().context("failed to load startup roster")?;
    tracing::info!(
        students = seed.len(),
        page_size = config.page_size,
        "rosterd {} ready",
        env!("CARGO_PKG_VERSION")
    );

    let mut state = ipc::AppState::new(config, seed);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        }

        // Bytes that are not UTF-8 get the same reply as bad JSON.
        let line = match std::str::from_utf8(&buf) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "request line is not utf-8");
                reply_bad_json(&mut stdout, &e.to_string());
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                reply_bad_json(&mut stdout, &e.to_string());
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}

// Can't reply with an id we never parsed.
fn reply_bad_json(stdout: &mut io::Stdout, message: &str) {
    let resp = serde_json::json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message }
    });
    let _ = writeln!(stdout, "{}", resp);
    let _ = stdout.flush();
}
