//! Core types shared across Draftchat.
//!
//! Currently this is configuration; the drafting state machine lives in
//! [`crate::session`].

mod config;

pub use config::{Config, EngineConfig, ExportConfig, SessionConfig, API_URL_ENV};
