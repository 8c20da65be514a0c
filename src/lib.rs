//! A store for HKL calculation records.
//!
//! Calculation records are addressed by a name and an optional collection
//! and kept in one of several storage backends which all behave the same.
//! The backend is selected through a storage URI when the store is
//! created. See [`calc::CalcStore`] for the operations on records.

pub mod calc;
pub mod cli;
pub mod commons;
pub mod config;
pub mod constants;
