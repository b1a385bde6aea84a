//! Property tests for the status line assembler.
//!
//! Whatever fragments are fed in, the line stays below the global
//! capacity and is always an in-order concatenation of whole fragments.

use proptest::prelude::*;
use statusinfo_common::consts::{FRAGMENT_CAPACITY, MAX_STATUS_CHARS};
use statusinfo_common::status::{Fragment, NotificationSlots, assemble};

fn fragment_strategy() -> impl Strategy<Value = Fragment> {
    proptest::string::string_regex(&format!("[a-z0-9:%! ]{{0,{FRAGMENT_CAPACITY}}}"))
        .expect("valid regex")
        .prop_map(|s| Fragment::from_text(&s))
}

proptest! {
    #[test]
    fn line_is_bounded_and_made_of_whole_fragments(
        parts in proptest::collection::vec(fragment_strategy(), 0..24)
    ) {
        let line = assemble(parts.iter());
        prop_assert!(line.len() < MAX_STATUS_CHARS);

        // The line must equal the concatenation of some prefix of `parts`.
        let mut prefix = String::new();
        let mut matched = line.is_empty();
        for part in &parts {
            prefix.push_str(part.as_str());
            if prefix == line.as_str() {
                matched = true;
            }
            if prefix.len() > line.len() {
                break;
            }
        }
        prop_assert!(matched, "line {:?} is not a prefix of whole fragments", line.as_str());
    }

    #[test]
    fn short_inputs_are_never_dropped(
        parts in proptest::collection::vec(fragment_strategy(), 0..5)
    ) {
        // Five fragments of at most 31 bytes always fit.
        let expected: String = parts.iter().map(Fragment::as_str).collect();
        let line = assemble(parts.iter());
        prop_assert_eq!(line.as_str(), expected.as_str());
    }

    #[test]
    fn fragments_never_exceed_capacity(text in ".{0,200}") {
        let fragment = Fragment::from_text(&text);
        prop_assert!(fragment.len() <= FRAGMENT_CAPACITY);
        prop_assert!(text.starts_with(fragment.as_str()));
    }
}

#[test]
fn oversized_sequence_truncates_gracefully() {
    let big = Fragment::from_text(&"#".repeat(FRAGMENT_CAPACITY));
    let parts: Vec<Fragment> = std::iter::repeat_n(big, 12).collect();
    let line = assemble(parts.iter());
    assert!(line.len() < MAX_STATUS_CHARS);
    assert_eq!(line.len() % FRAGMENT_CAPACITY, 0);
}

#[test]
fn empty_slots_hold_their_position() {
    let mut slots = NotificationSlots::new();
    *slots.slot_mut(2).expect("slot 2") = Fragment::from_text("power_supply: AC: Plugged ");
    assert_eq!(slots.assemble().as_str(), "power_supply: AC: Plugged ");

    *slots.slot_mut(0).expect("slot 0") = Fragment::from_text("LCD: 40% ");
    assert_eq!(
        slots.assemble().as_str(),
        "LCD: 40% power_supply: AC: Plugged "
    );
}
