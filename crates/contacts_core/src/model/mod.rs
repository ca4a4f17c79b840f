//! Domain model for the address book.
//!
//! # Responsibility
//! - Define the plain data records moved between callers and storage.
//!
//! # Invariants
//! - Entities read back from storage are transient copies; the store stays
//!   the source of truth.

pub mod contact;
