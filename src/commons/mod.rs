//! Common types used by the various components.

pub mod error;
pub mod storage;
