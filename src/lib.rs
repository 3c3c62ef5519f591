//! Valora - benchmark harness for data-valuation algorithms
//!
//! Takes a labeled dataset, a retrainable model and one value per training
//! point, and measures how well the values rank points: removal curves,
//! corrupted-sample discovery, value-threshold sweeps and clustering-based
//! noise detection. Loaders and evaluators are traits, so any valuation
//! method that can produce a value array plugs in.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod loader;
pub mod mediator;
pub mod metrics;
pub mod model;
pub mod output;
pub mod ranking;
pub mod registry;
pub mod sweep;

pub use error::{BenchError, Result};
