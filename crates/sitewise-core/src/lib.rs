//! Sitewise Core - Domain models, error taxonomy, and configuration
//!
//! This crate contains the project, session, intent, and response models shared
//! by every layer of the dispatcher, plus the layered configuration and the
//! retry policy used for storage and capability calls.

pub mod config;
pub mod error;
pub mod models;
pub mod naming;
pub mod retry;

pub use error::{Result, SitewiseError};
