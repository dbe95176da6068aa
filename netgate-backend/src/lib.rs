//! netgate backend library.
//!
//! The binary wires these modules together; they are exposed here for the
//! integration tests.
//!
//! ```text
//! api ──► network ──► query ──► execution ──► environment
//!  │         └──► parser (structured | legacy)
//!  └──► control ──► execution
//! ```

pub mod api;
pub mod config;
pub mod control;
pub mod environment;
pub mod execution;
pub mod network;
pub mod parser;
pub mod query;
