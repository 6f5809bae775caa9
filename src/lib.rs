#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod app;
pub mod attachment;
pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod ingest;
pub mod render;
pub mod sink;
pub mod snippet;

pub use error::{Error, Result};
