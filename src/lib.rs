//! # casework
//!
//! Work-unit lifecycle for distributed verification of a partitioned document
//! corpus: unit generation with assignment tracking, partition gap resolution,
//! a fixed-order validation pipeline, and idempotent findings persistence.

pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod locator;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod telemetry;
pub mod validator;

pub use error::{Error, Result};
