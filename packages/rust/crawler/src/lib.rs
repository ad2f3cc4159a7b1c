//! Portal client and assignment link extraction.
//!
//! This crate provides:
//! - [`PortalClient`]: `reqwest`-based [`AssignmentSource`](themis_shared::AssignmentSource)
//! - [`parser`]: `scraper`-based extraction of `{name, url}` pairs from a page

pub mod client;
pub mod parser;

pub use client::PortalClient;
pub use parser::{extract_assignments, parse_selector};
