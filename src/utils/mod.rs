//! Utility modules
//!
//! Path model and filesystem helpers shared by planning and execution

pub mod fs;
pub mod path;

pub use path::NormalizedPath;
