//! Service modules built on top of the page pipeline.
//!
//! The pipeline itself converts one page; services orchestrate whole runs.

pub mod batch;
