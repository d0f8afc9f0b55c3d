pub mod artifacts;
pub mod control;
pub mod correction;
pub mod fco;
pub mod hkl;
pub mod res;
pub mod resolution;
pub mod runner;
pub mod scaling;
pub mod serialization;
pub mod workflow;

pub use artifacts::{ArtifactChain, ChainEntry};
pub use correction::{CorrectionSummary, apply_correction, fit_correction};
pub use hkl::ReflectionFile;
pub use resolution::ResolutionModel;
pub use runner::{ProcessRunner, RefinementOutcome, RefinementRunner};
pub use scaling::{BinRange, ScaledReflectionReport, write_scaled_reflections};
pub use workflow::{CycleReport, TdsWorkflow, WorkflowReport, render_human_summary};
