//! The SQL review stage: one API-backed review per captured query.

pub mod bypass;
pub mod document;
pub mod inputs;
pub mod sanitize;
pub mod state;
pub mod workflow;

pub use inputs::CompanionReader;
pub use workflow::{ReviewInputs, ReviewSettings, ReviewWorkflow};
