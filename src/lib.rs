pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{EmbeddedSource, FileKeyValueStore, HttpSource, LocalStorage, MemoryStore};
pub use config::evaluation_config::EvaluationConfig;
pub use core::{
    ledger::SubmissionLedger,
    roster::RosterStore,
    selection::GroupSelection,
    session::{EvaluationApp, RatingSheet},
};
pub use utils::error::{EvalError, Result, ValidationFailure};
