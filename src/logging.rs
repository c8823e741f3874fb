use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use std::{fs, path::Path, path::PathBuf, sync::Mutex};
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "todos-tui.log";

/// Installs a file-backed tracing subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("failed to create log directory {}", parent.display())
            })?;
        }
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .wrap_err_with(|| format!("failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| eyre!("failed to install tracing subscriber: {err}"))
}

pub fn default_log_file() -> PathBuf {
    let mut root = dirs::data_local_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join("todos-tui");
    if cfg!(debug_assertions) {
        root = root.join("dev");
    }
    root.join(LOG_FILE_NAME)
}
