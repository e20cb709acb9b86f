//! Core types and utilities

pub mod category;
pub mod units;

pub use category::*;
pub use units::*;
