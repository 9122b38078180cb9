//! Unified error types for LevelUp.
//!
//! Lookup failures, malformed documents and collaborator failures are
//! surfaced to the caller. Misuse of the level state machine (ending a level
//! that was never started, pausing an idle level) is not an error value: it is
//! logged and ignored at the call site.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for LevelUp operations.
#[derive(Error, Debug)]
pub enum LevelUpError {
    /// Malformed document, unknown `type` discriminator or invalid field.
    #[error("deserialization error: {message}")]
    Deserialize { message: String },

    /// A score id that no world in scope owns.
    #[error("score not found: {score_id}")]
    ScoreNotFound { score_id: String },

    /// An item id the inventory does not know about.
    #[error("virtual item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// A world id that is not part of the registry.
    #[error("world not found: {world_id}")]
    WorldNotFound { world_id: String },

    /// A gate id that is not part of the registry.
    #[error("gate not found: {gate_id}")]
    GateNotFound { gate_id: String },

    /// A challenge id that is not part of the registry.
    #[error("challenge not found: {challenge_id}")]
    ChallengeNotFound { challenge_id: String },

    /// I/O errors from the file-backed store.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Inventory failures other than unknown items.
    #[error("inventory error: {message}")]
    Inventory { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for LevelUp operations.
pub type Result<T> = std::result::Result<T, LevelUpError>;

impl LevelUpError {
    /// Create a deserialization error.
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::Deserialize {
            message: message.into(),
        }
    }

    /// Create a score lookup error.
    pub fn score_not_found(score_id: impl Into<String>) -> Self {
        Self::ScoreNotFound {
            score_id: score_id.into(),
        }
    }

    /// Create an item lookup error.
    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::ItemNotFound {
            item_id: item_id.into(),
        }
    }

    /// Create a world lookup error.
    pub fn world_not_found(world_id: impl Into<String>) -> Self {
        Self::WorldNotFound {
            world_id: world_id.into(),
        }
    }

    /// Create a gate lookup error.
    pub fn gate_not_found(gate_id: impl Into<String>) -> Self {
        Self::GateNotFound {
            gate_id: gate_id.into(),
        }
    }

    /// Create a challenge lookup error.
    pub fn challenge_not_found(challenge_id: impl Into<String>) -> Self {
        Self::ChallengeNotFound {
            challenge_id: challenge_id.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create an inventory error.
    pub fn inventory(message: impl Into<String>) -> Self {
        Self::Inventory {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error came from a lookup of an unknown id.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::ScoreNotFound { .. }
                | Self::ItemNotFound { .. }
                | Self::WorldNotFound { .. }
                | Self::GateNotFound { .. }
                | Self::ChallengeNotFound { .. }
        )
    }
}

impl From<io::Error> for LevelUpError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for LevelUpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialize {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used on paths where a failure must not stop the caller, such as loading
/// optional configuration layers: log a warning and carry on with a default.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the `levelup` CLI.
pub mod exit_codes {
    /// Command succeeded.
    pub const OK: i32 = 0;

    /// Command failed (bad model document, storage failure).
    pub const FAILURE: i32 = 1;

    /// Invalid command-line usage or configuration.
    pub const USAGE: i32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = LevelUpError::storage(
            "/tmp/progress.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/progress.json"));
    }

    #[test]
    fn test_deserialize_error_display() {
        let err = LevelUpError::deserialize("unknown gate type `listXOR`");
        assert_eq!(
            err.to_string(),
            "deserialization error: unknown gate type `listXOR`"
        );
    }

    #[test]
    fn test_lookup_error_display() {
        assert_eq!(
            LevelUpError::score_not_found("coins").to_string(),
            "score not found: coins"
        );
        assert_eq!(
            LevelUpError::item_not_found("gem").to_string(),
            "virtual item not found: gem"
        );
        assert_eq!(
            LevelUpError::world_not_found("w1").to_string(),
            "world not found: w1"
        );
        assert_eq!(
            LevelUpError::gate_not_found("g1").to_string(),
            "gate not found: g1"
        );
    }

    #[test]
    fn test_is_lookup() {
        assert!(LevelUpError::score_not_found("s").is_lookup());
        assert!(LevelUpError::item_not_found("i").is_lookup());
        assert!(!LevelUpError::config("bad").is_lookup());
        assert!(!LevelUpError::inventory("short").is_lookup());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: LevelUpError = io_err.into();
        assert!(matches!(err, LevelUpError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LevelUpError = json_err.into();
        assert!(matches!(err, LevelUpError::Deserialize { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(LevelUpError::config("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(LevelUpError::inventory("test"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }
}
