//! Bounded status text: fragments, status lines and the line assembler.
//!
//! Every status source produces a [`Fragment`]: a short piece of text capped
//! at [`FRAGMENT_CAPACITY`] bytes that normally ends with the separator.
//! Fragments are concatenated into a [`StatusLine`] by [`assemble`], which
//! drops trailing fragments instead of overflowing the line.
//!
//! Formatting never fails: text that does not fit is cut at the last char
//! boundary that fits, the same way `snprintf` behaves.

use crate::consts::{
    FRAGMENT_CAPACITY, MAX_ELEMENT_CHARS, MAX_NUMBER_ELEMENTS, MAX_STATUS_CHARS,
    STATUS_LINE_CAPACITY,
};
use core::fmt;

/// `fmt::Write` adapter that fills a bounded string and silently drops the rest.
struct Truncating<'a, const N: usize> {
    buf: &'a mut heapless::String<N>,
    overflowed: bool,
}

impl<'a, const N: usize> Truncating<'a, N> {
    fn new(buf: &'a mut heapless::String<N>) -> Self {
        Self {
            buf,
            overflowed: false,
        }
    }
}

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.overflowed {
            return Ok(());
        }
        if self.buf.push_str(s).is_ok() {
            return Ok(());
        }
        for ch in s.chars() {
            if self.buf.push(ch).is_err() {
                self.overflowed = true;
                break;
            }
        }
        Ok(())
    }
}

/// Write `args` into `buf`, truncating at capacity. Returns `true` if everything fit.
fn write_truncated<const N: usize>(buf: &mut heapless::String<N>, args: fmt::Arguments<'_>) -> bool {
    let mut w = Truncating::new(buf);
    // Truncating::write_str never reports an error.
    let _ = fmt::write(&mut w, args);
    !w.overflowed
}

/// A single bounded text unit contributed by one status source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment(heapless::String<FRAGMENT_CAPACITY>);

impl Fragment {
    /// The empty fragment. Holds its slot but consumes no line budget.
    pub const EMPTY: Fragment = Fragment(heapless::String::new());

    /// Create an empty fragment.
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Format a fragment, truncating at [`FRAGMENT_CAPACITY`].
    ///
    /// ```
    /// use statusinfo_common::status::Fragment;
    /// let f = Fragment::from_fmt(format_args!("bat:{}% ", 80));
    /// assert_eq!(f.as_str(), "bat:80% ");
    /// ```
    pub fn from_fmt(args: fmt::Arguments<'_>) -> Self {
        let mut fragment = Self::new();
        write_truncated(&mut fragment.0, args);
        fragment
    }

    /// Build a fragment from plain text, truncating at capacity.
    pub fn from_text(text: &str) -> Self {
        Self::from_fmt(format_args!("{text}"))
    }

    /// Append formatted text. Returns `false` once the fragment is full.
    pub fn push_fmt(&mut self, args: fmt::Arguments<'_>) -> bool {
        write_truncated(&mut self.0, args)
    }

    /// Reset to the empty fragment.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        FRAGMENT_CAPACITY - self.0.len()
    }

    /// Fragment text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for the empty fragment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The composed line delivered to an output sink for one reactor cycle.
///
/// Invariant: `len() < MAX_STATUS_CHARS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine(heapless::String<STATUS_LINE_CAPACITY>);

impl StatusLine {
    /// Create an empty line.
    pub const fn new() -> Self {
        Self(heapless::String::new())
    }

    /// Build a line from arbitrary text, truncating at capacity.
    pub fn from_text(text: &str) -> Self {
        let mut line = Self::new();
        write_truncated(&mut line.0, format_args!("{text}"));
        line
    }

    /// Line text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if nothing was composed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concatenate fragments into a status line.
///
/// Whole fragments are appended in order while the remaining budget is
/// larger than one fragment's maximum size ([`MAX_ELEMENT_CHARS`]); the
/// rest are dropped without error. A fragment is never cut, and empty
/// fragments cost nothing.
pub fn assemble<'a, I>(fragments: I) -> StatusLine
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut line = StatusLine::new();
    let mut budget = MAX_STATUS_CHARS;

    for fragment in fragments {
        if budget <= MAX_ELEMENT_CHARS {
            break;
        }
        if line.0.push_str(fragment.as_str()).is_err() {
            break;
        }
        budget -= fragment.len();
    }

    line
}

/// Fixed slot layout of a device notification line.
///
/// Slot `i` belongs to entry `i` of the udev action table; the last slot
/// holds the fallback fragment. Unused slots stay empty so ordering is kept
/// without gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSlots {
    slots: [Fragment; MAX_NUMBER_ELEMENTS],
}

impl NotificationSlots {
    /// Index of the fallback slot.
    pub const FALLBACK: usize = MAX_NUMBER_ELEMENTS - 1;

    /// All slots empty.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Fragment::new()),
        }
    }

    /// Mutable access to slot `index`, `None` past the last slot.
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Fragment> {
        self.slots.get_mut(index)
    }

    /// Slot `index`.
    pub fn slot(&self, index: usize) -> Option<&Fragment> {
        self.slots.get(index)
    }

    /// The fallback slot.
    pub fn fallback_mut(&mut self) -> &mut Fragment {
        &mut self.slots[Self::FALLBACK]
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(Fragment::clear);
    }

    /// Compose the notification line in slot order.
    pub fn assemble(&self) -> StatusLine {
        assemble(self.slots.iter())
    }
}

impl Default for NotificationSlots {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_truncates_like_snprintf() {
        let long = "x".repeat(100);
        let f = Fragment::from_text(&long);
        assert_eq!(f.len(), FRAGMENT_CAPACITY);
        assert_eq!(f.remaining(), 0);
    }

    #[test]
    fn fragment_truncates_on_char_boundary() {
        // 30 ASCII bytes + a 2-byte char = 32 bytes, one too many.
        let text = format!("{}é", "a".repeat(30));
        let f = Fragment::from_text(&text);
        assert_eq!(f.as_str(), "a".repeat(30));
    }

    #[test]
    fn push_fmt_reports_overflow() {
        let mut f = Fragment::new();
        assert!(f.push_fmt(format_args!("{}", "a".repeat(20))));
        assert!(!f.push_fmt(format_args!("{}", "b".repeat(20))));
        assert_eq!(f.len(), FRAGMENT_CAPACITY);
        assert!(f.as_str().starts_with(&"a".repeat(20)));
    }

    #[test]
    fn assemble_keeps_order() {
        let parts = [
            Fragment::from_text("a "),
            Fragment::EMPTY,
            Fragment::from_text("b "),
        ];
        assert_eq!(assemble(parts.iter()).as_str(), "a b ");
    }

    #[test]
    fn assemble_drops_whole_fragments_when_budget_runs_low() {
        let full = Fragment::from_text(&"z".repeat(FRAGMENT_CAPACITY));
        let parts = vec![full; 10];
        let line = assemble(parts.iter());
        assert!(line.len() < MAX_STATUS_CHARS);
        assert_eq!(line.len() % FRAGMENT_CAPACITY, 0);
        // 192 budget: 161, 130, 99, 68, 37 remain after each, then stop.
        assert_eq!(line.len(), 5 * FRAGMENT_CAPACITY);
    }

    #[test]
    fn slots_start_empty_and_fallback_is_last() {
        let mut slots = NotificationSlots::new();
        assert!(slots.assemble().is_empty());
        *slots.fallback_mut() = Fragment::from_text("usb: 1-1: add ");
        *slots.slot_mut(0).unwrap() = Fragment::from_text("LCD: 50% ");
        assert_eq!(slots.assemble().as_str(), "LCD: 50% usb: 1-1: add ");
        assert!(slots.slot_mut(MAX_NUMBER_ELEMENTS).is_none());
        slots.clear();
        assert!(slots.slot(0).unwrap().is_empty());
    }

    #[test]
    fn status_line_from_text_is_bounded() {
        let line = StatusLine::from_text(&"q".repeat(500));
        assert_eq!(line.len(), STATUS_LINE_CAPACITY);
    }
}
