//! CLI command implementations

pub mod logs;
pub mod rotate;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use shelfkey_core::{EntryPoint, LogEvent, LoggingService, ShelfkeyContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let shelfkey_dir = get_shelfkey_dir().ok()?;
    std::fs::create_dir_all(&shelfkey_dir).ok()?;
    LoggingService::new(&shelfkey_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the shelfkey data directory from environment or default
pub fn get_shelfkey_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SHELFKEY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".shelfkey"))
}

/// Get or create shelfkey context
pub fn get_context() -> Result<ShelfkeyContext> {
    let shelfkey_dir = get_shelfkey_dir()?;

    std::fs::create_dir_all(&shelfkey_dir)
        .with_context(|| format!("Failed to create shelfkey directory: {:?}", shelfkey_dir))?;

    ShelfkeyContext::new(&shelfkey_dir).context("Failed to initialize shelfkey context")
}
