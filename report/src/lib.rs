//! Report pipeline for multi-channel bioelectric recordings.
//!
//! Raw signal dumps and assessment results go in; a paginated PDF comes out.
//! The crate also hosts the synthetic progress estimator used by status
//! displays while backend jobs only report coarse states.

pub mod assessment;
pub mod charts;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod layout;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod signal;
pub mod sources;

pub use config::ReportConfig;
pub use error::{Error, RenderError, Result, Stage};
