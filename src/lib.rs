pub mod models;
pub mod services;

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize logging system with timestamped log files
pub fn init_logging() {
    let disable_file_log = matches!(
        std::env::var("VERITEXT_DISABLE_FILE_LOG").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    );
    let disable_cleanup = matches!(
        std::env::var("VERITEXT_DISABLE_LOG_CLEANUP").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    );

    // Configure subscriber filter as early as possible (so fallback logging is consistent).
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via VERITEXT_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("VERITEXT_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    // Ensure logs directory exists
    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("veritext_{}.log", timestamp);

    // Create a dedicated file per session; keep log writes non-blocking.
    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Best-effort cleanup in the background (avoid adding startup I/O latency).
    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, 30);
        });
    }
}

/// Get the logs directory path
fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("veritext").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &PathBuf, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with("veritext_") && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
