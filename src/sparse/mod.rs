//! Sparse checkout module
//!
//! Plans and applies a partial working copy: `local` inspects what is already
//! on disk, `builder` turns a profile into a three-phase `Plan`, and
//! `executor` applies that plan (or describes it in a dry run).

pub mod builder;
pub mod executor;
pub mod local;
pub mod plan;

pub use builder::*;
pub use executor::*;
pub use local::*;
pub use plan::*;
