//! Command-handler surface over the roster and ledger core.
//!
//! Front ends call one `on_*` handler per user action and receive a
//! serializable envelope back. Nothing here panics or returns `Err`.

mod api;
mod envelope;
mod input;

pub use api::{resolve_db_path, BusRosterApi};
pub use envelope::{ActionResponse, ApiError, QueryResponse};
pub use input::{DriverInput, DriverUpdate, ReportRequest, StudentInput, StudentUpdate};

/// Health check for front-end wiring.
pub fn ping() -> String {
    busroster_core::ping().to_owned()
}

pub fn core_version() -> String {
    busroster_core::core_version().to_owned()
}

/// Starts core file logging.
///
/// Returns an empty string on success and the error message otherwise.
/// Repeating the same `level + log_dir` is a no-op.
pub fn init_logging(level: &str, log_dir: &str) -> String {
    match busroster_core::init_logging(level, log_dir) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{core_version, init_logging, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_reports_bad_input() {
        assert!(!init_logging("info", "").is_empty());
        assert!(!init_logging("verbose", "/tmp/busroster-logs").is_empty());
        assert!(!init_logging("info", "relative/logs").is_empty());
    }
}
