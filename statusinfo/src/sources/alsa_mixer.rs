//! ALSA mixer event source.

use std::os::fd::{AsFd, BorrowedFd, RawFd};

use alsa::PollDescriptors;
use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use statusinfo_common::consts::MAX_MIXER_CONTROLS;
use tracing::{debug, info, warn};

use crate::error::MixerError;
use crate::mixer::{AudioSource, ControlReading, MixerSnapshot, ReadingTracker};

fn alsa_err(e: alsa::Error) -> MixerError {
    MixerError::Alsa(e.to_string())
}

/// Watches a fixed set of simple controls on one ALSA mixer device.
pub struct AlsaMixer {
    mixer: Mixer,
    controls: Vec<String>,
    tracker: ReadingTracker,
    fd: RawFd,
}

impl std::fmt::Debug for AlsaMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlsaMixer")
            .field("controls", &self.controls)
            .field("fd", &self.fd)
            .finish()
    }
}

impl AlsaMixer {
    /// Open `device` and watch the listed controls (index 0).
    ///
    /// Missing controls are skipped with a warning; fails when none exist
    /// or the mixer has no poll descriptor.
    pub fn open(device: &str, names: &[String]) -> Result<Self, MixerError> {
        let mixer = Mixer::new(device, false).map_err(alsa_err)?;

        let mut controls = Vec::new();
        for name in names.iter().take(MAX_MIXER_CONTROLS) {
            if mixer.find_selem(&SelemId::new(name, 0)).is_some() {
                debug!("Watching mixer control {name}");
                controls.push(name.clone());
            } else {
                warn!("Could not find mixer element {name}");
            }
        }
        if controls.is_empty() {
            return Err(MixerError::NoControls {
                device: device.to_string(),
            });
        }

        let descriptors = mixer.get().map_err(alsa_err)?;
        if descriptors.len() > 1 {
            warn!(
                "Mixer exposes {} poll descriptors; only the first is watched, volume events may be missed",
                descriptors.len()
            );
        }
        let fd = descriptors.first().ok_or(MixerError::NoDescriptor)?.fd;

        let mut source = Self {
            controls,
            tracker: ReadingTracker::default(),
            mixer,
            fd,
        };
        // Baseline so the first event reports only what actually changed.
        source.tracker = ReadingTracker::new(source.read_all());
        info!("Mixer {device}: watching {}", source.controls.join(", "));
        Ok(source)
    }

    fn read_all(&self) -> Vec<Option<ControlReading>> {
        self.controls
            .iter()
            .map(|name| {
                let selem = self.mixer.find_selem(&SelemId::new(name, 0))?;
                Some(reading(name, &selem))
            })
            .collect()
    }
}

fn reading(name: &str, selem: &Selem<'_>) -> ControlReading {
    let mut reading = ControlReading {
        name: name.to_string(),
        ..ControlReading::default()
    };

    if selem.has_playback_switch() {
        reading.switch_left = selem
            .get_playback_switch(SelemChannelId::FrontLeft)
            .inspect_err(|e| warn!("{name}: left playback switch: {e}"))
            .ok()
            .map(|v| v != 0);
        if !selem.has_playback_switch_joined() {
            reading.switch_right = selem
                .get_playback_switch(SelemChannelId::FrontRight)
                .inspect_err(|e| warn!("{name}: right playback switch: {e}"))
                .ok()
                .map(|v| v != 0);
        }
    }

    if selem.has_playback_volume() {
        reading.range = Some(selem.get_playback_volume_range());
        reading.volume_left = selem
            .get_playback_volume(SelemChannelId::FrontLeft)
            .inspect_err(|e| warn!("{name}: left playback volume: {e}"))
            .ok();
        if !selem.has_playback_volume_joined() {
            reading.volume_right = selem
                .get_playback_volume(SelemChannelId::FrontRight)
                .inspect_err(|e| warn!("{name}: right playback volume: {e}"))
                .ok();
        }
    }

    reading
}

impl AsFd for AlsaMixer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the descriptor belongs to `self.mixer` and stays open for
        // as long as `self` is alive.
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }
}

impl AudioSource for AlsaMixer {
    fn handle_events(&mut self) -> Result<Option<MixerSnapshot>, MixerError> {
        self.mixer.handle_events().map_err(alsa_err)?;

        let readings = self.read_all();
        Ok(self.tracker.update(readings))
    }
}
