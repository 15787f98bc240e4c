//! Blobvault test & validation infrastructure.
//!
//! Cross-crate suites: end-to-end upload/dedup/delete flows, concurrency
//! races on identical content, and property tests over the accounting
//! identities and the query engine.

pub mod harness;
pub mod integration;
pub mod proptest_catalog;

pub use harness::TestEnv;
