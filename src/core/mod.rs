pub mod combine;
pub mod export;
pub mod ledger;
pub mod report;
pub mod roster;
pub mod selection;
pub mod session;

pub use crate::domain::model::{Evaluation, ExportRow, Participant, Statistics, Submission};
pub use crate::domain::ports::{DataSource, KeyValueStore, Storage};
pub use crate::utils::error::Result;
