//! System-wide constants for the statusinfo workspace.
//!
//! Single source of truth for capacity limits and refresh intervals.
//! Capacities follow C string conventions: the `*_CHARS` values include
//! room for a terminator, so the visible text is one character shorter.

use static_assertions::const_assert;

/// Maximum characters in a status line, terminator included.
pub const MAX_STATUS_CHARS: usize = 192;

/// Maximum characters in any single fragment (separator and terminator included).
pub const MAX_ELEMENT_CHARS: usize = 32;

/// Number of notification slots in a device-event status line.
///
/// The last slot is reserved for the fallback fragment.
pub const MAX_NUMBER_ELEMENTS: usize = MAX_STATUS_CHARS / MAX_ELEMENT_CHARS;

/// Visible characters a [`StatusLine`](crate::status::StatusLine) can hold.
pub const STATUS_LINE_CAPACITY: usize = MAX_STATUS_CHARS - 1;

/// Visible characters a [`Fragment`](crate::status::Fragment) can hold.
pub const FRAGMENT_CAPACITY: usize = MAX_ELEMENT_CHARS - 1;

/// Maximum characters for one interface entry of the network summary.
pub const MAX_NET_ITEM_CHARS: usize = 16;

/// Distinct interface names remembered during one network walk.
pub const MAX_INTERFACES: usize = 16;

/// Default time between periodic status refreshes (ms).
pub const STATUS_TIMEOUT_MS: u64 = 10_000;

/// Default time a notification stays on screen before the next refresh (ms).
pub const NOTIFY_TIMEOUT_MS: u64 = 2_000;

/// Timeout of the very first reactor wait (ms).
pub const INITIAL_TIMEOUT_MS: u64 = 1_000;

/// Battery charge at or below this percentage is flagged with `[!]`.
pub const LOW_BATTERY_PERCENT: i64 = 15;

/// Number of hwmon zones probed for a matching thermal sensor.
pub const MAX_THERMAL_ZONES: usize = 9;

/// Maximum number of mixer controls watched for volume changes.
pub const MAX_MIXER_CONTROLS: usize = 8;

/// Separator appended to every fragment.
pub const SEPARATOR: char = ' ';

/// Final line written to the sink on shutdown.
pub const CLOSING_LINE: &str = "Status Bar Closed";

const_assert!(MAX_NUMBER_ELEMENTS >= 1);
const_assert!(MAX_NET_ITEM_CHARS <= MAX_ELEMENT_CHARS);
const_assert!(NOTIFY_TIMEOUT_MS < STATUS_TIMEOUT_MS);
