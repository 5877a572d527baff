//! Machine maintenance predictor
//!
//! Trains a classifier on machine sensor readings offline, persists it as a
//! model artifact, and serves predictions through a web form and a JSON API.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod observability;
pub mod recommendations;

pub use config::Config;
pub use error::{AppError, Result};
