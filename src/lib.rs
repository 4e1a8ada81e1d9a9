//! Riskcall - instrument risky API calls and aggregate them at run time
//!
//! The [`instrument`] pass inserts a logging hook before every direct call
//! to a configured API (by default `strcpy`). The [`runtime`] side collects
//! the hook's observations into a fixed-capacity table and writes a JSON
//! report plus a console summary when the process exits.

pub mod cli;
pub mod instrument;
pub mod ir;
pub mod pipeline;
pub mod runtime;
