//! sectordb-core
//!
//! Shared types, seam traits, error taxonomy and configuration for the
//! sector classification and answering pipeline.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;
