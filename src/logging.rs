//! Structured logging to a file.
//!
//! The terminal belongs to the TUI, so events go to a log file under the
//! state directory unless the file cannot be opened, in which case they go
//! to stderr and are only visible after the alternate screen is left.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogSettings, default_state_dir};

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "ENCORE_LOG";

/// Install the global subscriber. Returns the log file in use, if any.
pub fn init(settings: &LogSettings) -> Option<PathBuf> {
    let (filter, bad_directive) = build_filter(std::env::var(LOG_ENV).ok(), &settings.filter);
    let path = log_path(settings);

    let file = path.as_deref().and_then(|p| {
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(p).ok()
    });

    let installed = match file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()
            .map(|()| path),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map(|()| None),
    };

    match installed {
        Ok(path) => {
            if let Some(directive) = bad_directive {
                warn!(%directive, "invalid log filter, using the default");
            }
            path
        }
        // A subscriber is already installed (tests, embedding).
        Err(_) => None,
    }
}

/// `ENCORE_LOG` wins over the configured filter. An unparsable filter falls
/// back to `encore=info` and is returned so it can be reported.
fn build_filter(from_env: Option<String>, configured: &str) -> (EnvFilter, Option<String>) {
    let directive = from_env
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| configured.to_string());

    match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(LogSettings::default().filter), Some(directive)),
    }
}

fn log_path(settings: &LogSettings) -> Option<PathBuf> {
    settings
        .file
        .clone()
        .or_else(|| default_state_dir().map(|dir| dir.join("encore.log")))
}

/// Where log output ends up, for the startup banner.
pub fn describe(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("logging to {}", p.display()),
        None => "logging to stderr".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_overrides_configured_one() {
        let (filter, bad) = build_filter(Some("encore=trace".into()), "encore=warn");
        assert!(bad.is_none());
        assert_eq!(filter.to_string(), "encore=trace");
    }

    #[test]
    fn blank_env_filter_is_ignored() {
        let (filter, _) = build_filter(Some("  ".into()), "encore=warn");
        assert_eq!(filter.to_string(), "encore=warn");
    }

    #[test]
    fn invalid_filter_falls_back_to_default() {
        let (filter, bad) = build_filter(None, "encore=loud");
        assert_eq!(bad.as_deref(), Some("encore=loud"));
        assert_eq!(filter.to_string(), "encore=info");
    }

    #[test]
    fn explicit_log_file_wins() {
        let settings = LogSettings {
            filter: "encore=info".into(),
            file: Some(PathBuf::from("/tmp/encore-test.log")),
        };
        assert_eq!(
            log_path(&settings),
            Some(PathBuf::from("/tmp/encore-test.log"))
        );
    }
}
