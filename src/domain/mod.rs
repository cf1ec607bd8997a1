//! Domain layer for nett
//!
//! Diagnostics, per-file and run reports, and the error type shared by every
//! other layer. Nothing here touches the filesystem.

pub mod diagnostics;
pub mod errors;

pub use diagnostics::*;
pub use errors::*;
