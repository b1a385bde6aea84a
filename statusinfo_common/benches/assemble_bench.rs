//! Status line assembly benchmarks.
//!
//! Measures fragment formatting and line assembly for a periodic refresh
//! and for a full notification slot layout.

use criterion::{Criterion, criterion_group, criterion_main};
use statusinfo_common::consts::FRAGMENT_CAPACITY;
use statusinfo_common::status::{Fragment, NotificationSlots, assemble};
use std::hint::black_box;

fn bench_periodic_line(c: &mut Criterion) {
    let parts = [
        Fragment::from_text("w3:-52dBm e2:1000M "),
        Fragment::from_text("tmp:48C "),
        Fragment::from_text("pwr:9W "),
        Fragment::from_text("bat:87% "),
        Fragment::from_text("14-03-2024 09:41"),
    ];

    c.bench_function("assemble_periodic_line", |b| {
        b.iter(|| black_box(assemble(black_box(&parts).iter())));
    });
}

fn bench_fragment_format(c: &mut Criterion) {
    c.bench_function("fragment_from_fmt", |b| {
        b.iter(|| black_box(Fragment::from_fmt(format_args!("bat:{}% ", black_box(42)))));
    });
}

fn bench_full_slots(c: &mut Criterion) {
    let mut slots = NotificationSlots::new();
    for i in 0..NotificationSlots::FALLBACK + 1 {
        if let Some(slot) = slots.slot_mut(i) {
            *slot = Fragment::from_text(&"n".repeat(FRAGMENT_CAPACITY));
        }
    }

    c.bench_function("assemble_full_slots", |b| {
        b.iter(|| black_box(slots.assemble()));
    });
}

criterion_group!(benches, bench_periodic_line, bench_fragment_format, bench_full_slots);
criterion_main!(benches);
