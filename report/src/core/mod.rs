//! Small shared helpers used across the pipeline.

pub mod format;
