//! statusinfo Common Library
//!
//! Shared constants, bounded status text and configuration loading for the
//! statusinfo workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Capacity limits and refresh intervals
//! - [`status`] - `Fragment`, `StatusLine` and the line assembler
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use statusinfo_common::prelude::*;
//!
//! let parts = [Fragment::from_text("tmp:45C "), Fragment::from_text("12-03-2024 10:15")];
//! assert_eq!(assemble(parts.iter()).as_str(), "tmp:45C 12-03-2024 10:15");
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod status;
