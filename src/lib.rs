//! Focal Mechanism Map Library
//!
//! This library provides the pipeline stages behind the `focal_mechanism_map`
//! binary: catalog conditioning, magnitude partitioning, legend generation and
//! GMT map rendering.

pub mod catalog;
pub mod condition;
pub mod config;
pub mod error;
pub mod gmt;
pub mod legend;
pub mod pipeline;
pub mod profile;
pub mod render;

pub use error::{FocalMapError, Result};
