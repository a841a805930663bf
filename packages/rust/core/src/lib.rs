//! Pipeline orchestration and the built-in stages for placeseo.
//!
//! This crate ties taxonomy, collection and content generation together into
//! one sequential brand run, gates the resulting artifacts against a JSON
//! Schema, and archives or reports on a brand directory.

pub mod archive;
pub mod artifact;
pub mod gate;
pub mod pipeline;
pub mod report;
pub mod stages;

pub use archive::archive;
pub use gate::{FileOutcome, FileReport, GateReport, SchemaGate};
pub use pipeline::{
    ExternalStage, Pipeline, ProgressReporter, RunReport, SilentProgress, Stage, StageContext,
    StageTiming, describe_external,
};
