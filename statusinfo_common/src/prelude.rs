//! Prelude module for common re-exports.
//!
//! ```rust
//! use statusinfo_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, StatusConfig};

// ─── Capacity Constants ─────────────────────────────────────────────
pub use crate::consts::{MAX_ELEMENT_CHARS, MAX_NUMBER_ELEMENTS, MAX_STATUS_CHARS, SEPARATOR};

// ─── Status Text ────────────────────────────────────────────────────
pub use crate::status::{Fragment, NotificationSlots, StatusLine, assemble};
