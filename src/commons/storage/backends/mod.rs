//! Storage backends.
//!
//! Each backend provides a `Store` type with the same set of primitives.
//! These need to be added to the macro invocation at the bottom of the
//! `store` module.

pub mod disk;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;
