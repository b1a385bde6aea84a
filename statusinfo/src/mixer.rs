//! Mixer volume notifications.
//!
//! A [`MixerSnapshot`] is computed from the raw readings of one stereo
//! control and rendered as a full status line such as `Master: 40%` or
//! `Master: !40%:55%`. The right channel clause appears only when the two
//! channels differ in volume or mute state.

use std::fmt::Write as _;
use std::os::fd::AsFd;

use statusinfo_common::status::StatusLine;

use crate::error::MixerError;

/// Readiness source delivering mixer change events.
pub trait AudioSource: AsFd {
    /// Process pending events on the descriptor.
    ///
    /// Returns the snapshot of the control that changed, or `None` when no
    /// watched control has a new value.
    fn handle_events(&mut self) -> Result<Option<MixerSnapshot>, MixerError>;
}

/// Raw values read from one simple mixer control.
///
/// `*_right` is `None` when the control only has a joined (mono) value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlReading {
    /// Control name.
    pub name: String,
    /// Left playback switch, `true` means audible.
    pub switch_left: Option<bool>,
    /// Right playback switch.
    pub switch_right: Option<bool>,
    /// Playback volume range `(min, max)`.
    pub range: Option<(i64, i64)>,
    /// Left playback volume.
    pub volume_left: Option<i64>,
    /// Right playback volume.
    pub volume_right: Option<i64>,
}

/// One audio channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// Volume in percent of the control range; `None` if the range is empty.
    pub percent: Option<i64>,
    /// Playback switch is off.
    pub muted: bool,
}

/// Most recent state of a watched control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerSnapshot {
    /// Control name.
    pub control: String,
    /// Front left.
    pub left: ChannelState,
    /// Front right.
    pub right: ChannelState,
}

fn percent(volume: Option<i64>, range: Option<(i64, i64)>) -> Option<i64> {
    let (min, max) = range?;
    let span = max.checked_sub(min)?;
    if span <= 0 {
        return None;
    }
    let offset = volume?.checked_sub(min)?;
    Some(offset.checked_mul(100)? / span)
}

impl MixerSnapshot {
    /// Normalise raw readings. Joined controls copy the left channel.
    pub fn from_reading(reading: &ControlReading) -> Self {
        let right_switch = reading.switch_right.or(reading.switch_left);
        let right_volume = reading.volume_right.or(reading.volume_left);
        Self {
            control: reading.name.clone(),
            left: ChannelState {
                percent: percent(reading.volume_left, reading.range),
                muted: reading.switch_left == Some(false),
            },
            right: ChannelState {
                percent: percent(right_volume, reading.range),
                muted: right_switch == Some(false),
            },
        }
    }

    /// Status line for this snapshot.
    pub fn render(&self) -> StatusLine {
        let mut text = format!("{}: ", self.control);
        push_channel(&mut text, &self.left);
        if self.left != self.right {
            text.push(':');
            push_channel(&mut text, &self.right);
        }
        StatusLine::from_text(&text)
    }
}

/// Last raw reading of every watched control, by control index.
///
/// Changes are detected on raw values: a volume step that keeps the same
/// rounded percentage still counts as a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingTracker {
    last: Vec<Option<ControlReading>>,
}

impl ReadingTracker {
    /// Start from the readings taken when the controls were opened.
    pub fn new(baseline: Vec<Option<ControlReading>>) -> Self {
        Self { last: baseline }
    }

    /// Record `readings` and return the snapshot of the last control whose
    /// raw values changed.
    pub fn update<I>(&mut self, readings: I) -> Option<MixerSnapshot>
    where
        I: IntoIterator<Item = Option<ControlReading>>,
    {
        let mut latest = None;
        for (last, current) in self.last.iter_mut().zip(readings) {
            if current == *last {
                continue;
            }
            if let Some(reading) = &current {
                latest = Some(MixerSnapshot::from_reading(reading));
            }
            *last = current;
        }
        latest
    }
}

fn push_channel(text: &mut String, channel: &ChannelState) {
    if channel.muted {
        text.push('!');
    }
    // Writing into a String cannot fail.
    let _ = match channel.percent {
        Some(pct) => write!(text, "{pct}%"),
        None => write!(text, "?%"),
    };
}
