//! Operations module
//!
//! Coordinates the user-facing commands: sparse checkout, revert-all and build
//! staleness checks

pub mod build_check;
pub mod checkout;
pub mod revert;

pub use build_check::*;
pub use checkout::*;
pub use revert::*;
