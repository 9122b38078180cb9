//! CLI commands for LevelUp.
//!
//! - **validate**: parse a model document and summarize it
//! - **status**: show persisted progress for every entity of a model
//! - **reset**: clear persisted progress

pub mod reset;
pub mod status;
pub mod validate;

pub use reset::ResetCommand;
pub use status::StatusCommand;
pub use validate::ValidateCommand;
