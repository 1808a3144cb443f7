//! # Draftchat
//!
//! Chat-driven legal document drafting.
//!
//! A user describes the document they need; the draft engine matches a
//! template, asks for the variables it could not fill, and renders the
//! draft. When no template matches, similar documents are searched on the
//! web and one of them can be turned into a template on the spot.
//!
//! ## Layout
//!
//! - [`session`]: the drafting session state machine
//! - [`engine`]: the draft engine interface and its HTTP client
//! - [`console`]: a line-oriented front end for a session
//! - [`core`]: configuration
//!
//! ## Quick Start
//!
//! ```bash
//! # Start a session against a local engine
//! draftchat
//!
//! # Open a known template directly
//! draftchat chat --template rental_agreement
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod console;
pub mod core;
pub mod engine;
pub mod session;

pub use crate::core::Config;
pub use console::Console;
pub use engine::{DraftEngine, EngineError, EngineErrorKind, HttpEngine};
pub use session::{DraftSession, Phase, SessionError};

/// Current version of draftchat.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const APP_NAME: &str = "draftchat";
