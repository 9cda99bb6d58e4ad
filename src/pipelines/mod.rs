//! # Ready-to-use pipelines
//!
//! - [`fine_tuning`]: trains a classifier on a labelled corpus and writes a checkpoint
//! - [`sentiment`]: runs a checkpoint over a corpus or over ad-hoc sentences

pub mod fine_tuning;
pub mod sentiment;
