#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod cursor;

pub mod error;

/// The chained hash table engine.
///
/// [`ChainedTable`](hash_table::ChainedTable) stores values in a power-of-two
/// slot array, chaining collisions inside their home slot. It takes
/// precomputed hashes and equality predicates, so it can also be used
/// without a [`HashingStrategy`].
pub mod hash_table;

/// A strategy-driven hash set with pool operations.
///
/// This module provides [`UnifiedSet`], which wraps a
/// [`ChainedTable`](hash_table::ChainedTable) and a [`HashingStrategy`].
pub mod hash_set;

/// Hashing and equality policies.
pub mod strategy;

#[cfg(feature = "serde")]
mod serialization;

/// A lock-guarded wrapper around [`UnifiedSet`].
#[cfg(feature = "sync")]
pub mod sync;

pub use cursor::Cursor;
pub use error::ErrorKind;
pub use error::SetError;
pub use hash_set::UnifiedSet;
pub use hash_table::ChainedTable;
pub use strategy::DefaultHashBuilder;
pub use strategy::FnStrategy;
pub use strategy::FunctionPair;
pub use strategy::HashingStrategy;
pub use strategy::IdentityStrategy;
pub use strategy::NaturalStrategy;
pub use strategy::NullSafe;
#[cfg(feature = "sync")]
pub use sync::SynchronizedSet;
