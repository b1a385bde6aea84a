//! Periodic status line.
//!
//! Composed on every reactor timeout, in the order
//! network, temperature, power, battery, clock. Each part is optional and
//! simply left empty when its source is unavailable.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use statusinfo_common::config::StatusConfig;
use statusinfo_common::consts::LOW_BATTERY_PERCENT;
use statusinfo_common::status::{Fragment, StatusLine, assemble};
use tracing::{info, warn};

use crate::net::NetworkProbe;
use crate::sysfs::{find_thermal_input, read_sys_long, read_temperature};

/// `DD-MM-YYYY HH:MM`.
pub const CLOCK_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Microwatts per watt.
const MICROWATTS: i64 = 1_000_000;

/// Battery fragment: `[!]` at or below the low threshold, empty when unreadable.
pub fn battery_fragment(capacity: i64) -> Fragment {
    match capacity {
        -1 => Fragment::EMPTY,
        c if c > LOW_BATTERY_PERCENT => Fragment::from_fmt(format_args!("bat:{c}% ")),
        c => Fragment::from_fmt(format_args!("[!]bat:{c}% ")),
    }
}

/// Power draw fragment, only for a positive reading.
pub fn power_fragment(watts: i64) -> Fragment {
    if watts > 0 {
        Fragment::from_fmt(format_args!("pwr:{watts}W "))
    } else {
        Fragment::EMPTY
    }
}

/// Clock fragment, without separator since it always comes last.
pub fn clock_fragment(now: &DateTime<Local>) -> Fragment {
    let mut text = String::new();
    if write!(text, "{}", now.format(CLOCK_FORMAT)).is_err() {
        return Fragment::from_text("[clock format error]");
    }
    Fragment::from_text(&text)
}

/// Builds the periodic status line.
pub struct Composer {
    network: Box<dyn NetworkProbe>,
    thermal: Option<PathBuf>,
    battery_capacity: PathBuf,
    battery_power: PathBuf,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("thermal", &self.thermal)
            .field("battery_capacity", &self.battery_capacity)
            .field("battery_power", &self.battery_power)
            .finish_non_exhaustive()
    }
}

impl Composer {
    /// Resolve sysfs paths from `config` and report what is available.
    pub fn new(config: &StatusConfig, network: Box<dyn NetworkProbe>) -> Self {
        let thermal = find_thermal_input(config);
        let battery_capacity = config.battery_path("capacity");
        let battery_power = config.battery_path("power_now");

        for path in [&battery_capacity, &battery_power] {
            if path.exists() {
                info!("Battery reading from {}", path.display());
            } else {
                warn!("{} not found", path.display());
            }
        }

        Self {
            network,
            thermal,
            battery_capacity,
            battery_power,
        }
    }

    /// Whether a thermal sensor was resolved.
    pub fn has_thermal(&self) -> bool {
        self.thermal.is_some()
    }

    /// Compose the full periodic line.
    pub fn compose(&mut self) -> StatusLine {
        let clock = clock_fragment(&Local::now());
        let capacity = read_sys_long(&self.battery_capacity);
        let watts = read_sys_long(&self.battery_power) / MICROWATTS;

        let network = self.network.summary();
        let temperature = match &self.thermal {
            Some(path) => Fragment::from_fmt(format_args!("tmp:{}C ", read_temperature(path))),
            None => Fragment::EMPTY,
        };

        assemble([
            &network,
            &temperature,
            &power_fragment(watts),
            &battery_fragment(capacity),
            &clock,
        ])
    }
}
