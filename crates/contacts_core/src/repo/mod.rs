//! Repository layer for contact persistence.
//!
//! # Responsibility
//! - Define the contact data access contract.
//! - Keep SQLite query details out of callers.
//!
//! # Invariants
//! - Write paths validate contacts before SQL mutations.
//! - Failures are returned as `RepoError`, so an empty result always means
//!   an empty match, never a swallowed connection failure.

pub mod contact_repo;
