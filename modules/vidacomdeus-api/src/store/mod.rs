//! File-backed persistence for data that has no table yet.

mod json_store;
pub mod etl_runs;
pub mod patients;

pub use etl_runs::{EtlRun, EtlRunLog};
pub use json_store::{JsonStore, JsonStoreError};
pub use patients::{PatientStore, TherapistError};
