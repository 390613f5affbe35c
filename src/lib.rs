//! delta: a guided "What is my Delta?" reflection workbook.
//!
//! The session store and export formatters are usable on their own; the
//! `server` module wraps them in a local web UI.

pub mod config;
pub mod consent;
pub mod export;
pub mod library;
pub mod logging;
pub mod server;
pub mod session;
pub mod steps;
