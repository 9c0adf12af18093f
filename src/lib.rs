//! jobsync: push scraped job postings into a Notion workspace.
//!
//! The crate is organized around one pipeline: an OAuth (or manual-token)
//! session, workspace discovery, a one-shot destination setup, and a sync
//! executor that assembles a bilingual page document per job record. State
//! lives in a small SQLite settings store.
pub mod assemble;
pub mod compat;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fields;
pub mod model;
pub mod notion;
pub mod oauth;
pub mod setup;
pub mod store;
pub mod sync;
