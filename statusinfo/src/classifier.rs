//! Device event classification.
//!
//! [`UDEV_ACTIONS`] maps subsystem names to fragment producers. The table
//! index of an entry is the notification slot its fragment lands in, so the
//! order of a notification line follows the table and not the order of
//! events. Events no entry handles are reported in the fallback slot.

use static_assertions::const_assert;
use statusinfo_common::config::StatusConfig;
use statusinfo_common::consts::MAX_NUMBER_ELEMENTS;
use statusinfo_common::status::{Fragment, NotificationSlots};
use tracing::{debug, warn};

use crate::sources::DeviceEvent;
use crate::sysfs::parse_leading_long;

/// Names the power supply handler treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierContext {
    /// Battery device name; its events produce an empty fragment.
    pub battery_name: String,
    /// AC adaptor device name; its events report Plugged/Unplugged.
    pub adaptor_name: String,
}

impl ClassifierContext {
    /// Take the device names from the configuration.
    pub fn from_config(config: &StatusConfig) -> Self {
        Self {
            battery_name: config.battery_name.clone(),
            adaptor_name: config.adaptor_name.clone(),
        }
    }
}

/// Fragment producer for one subsystem. `None` means the handler failed.
pub type ActionHandler = fn(&DeviceEvent, &ClassifierContext) -> Option<Fragment>;

/// One entry of the action table.
#[derive(Debug, Clone, Copy)]
pub struct UdevAction {
    /// Subsystem the handler applies to.
    pub subsystem: &'static str,
    /// Handler invoked for `change` events of that subsystem.
    pub handler: ActionHandler,
}

/// Subsystem handlers, in slot order.
pub const UDEV_ACTIONS: &[UdevAction] = &[
    UdevAction {
        subsystem: "backlight",
        handler: backlight_status,
    },
    UdevAction {
        subsystem: "rfkill",
        handler: rfkill_status,
    },
    UdevAction {
        subsystem: "power_supply",
        handler: power_status,
    },
];

// Every entry needs its own slot in front of the fallback slot.
const_assert!(UDEV_ACTIONS.len() < MAX_NUMBER_ELEMENTS);

/// Subsystems the device source should deliver.
pub fn watched_subsystems() -> Vec<&'static str> {
    let mut subsystems: Vec<&'static str> = Vec::with_capacity(UDEV_ACTIONS.len());
    for action in UDEV_ACTIONS {
        if !subsystems.contains(&action.subsystem) {
            subsystems.push(action.subsystem);
        }
    }
    subsystems
}

/// `LCD: <pct>% ` from actual/max brightness.
fn backlight_status(event: &DeviceEvent, _: &ClassifierContext) -> Option<Fragment> {
    let actual = parse_leading_long(&event.attribute("actual_brightness")?)?;
    let max = parse_leading_long(&event.attribute("max_brightness")?)?;
    if max <= 0 {
        debug!("{}: max_brightness is {max}", event.sysname());
        return None;
    }
    Some(Fragment::from_fmt(format_args!("LCD: {}% ", 100 * actual / max)))
}

/// `<type> [rfkill index:<n>]: On|Off `.
fn rfkill_status(event: &DeviceEvent, _: &ClassifierContext) -> Option<Fragment> {
    let soft = event.attribute("soft");
    let hard = event.attribute("hard");
    if soft.is_none() && hard.is_none() {
        return None;
    }
    let unblocked = |state: &Option<String>| state.as_deref().is_some_and(|s| s.starts_with('0'));
    let state = if unblocked(&soft) && unblocked(&hard) {
        "On"
    } else {
        "Off"
    };

    let kind = event.attribute("type").unwrap_or_else(|| "?".into());
    let index = event.attribute("index").unwrap_or_else(|| "?".into());
    Some(Fragment::from_fmt(format_args!(
        "{kind} [rfkill index:{index}]: {state} "
    )))
}

/// Battery: empty. Adaptor: Plugged/Unplugged. Others: raw action.
fn power_status(event: &DeviceEvent, context: &ClassifierContext) -> Option<Fragment> {
    let subsystem = event.subsystem().unwrap_or("power_supply");
    let name = event.sysname();

    if name == context.battery_name {
        return Some(Fragment::EMPTY);
    }
    if name == context.adaptor_name {
        let online = event.attribute("online")?;
        let state = if online.starts_with('0') {
            "Unplugged"
        } else {
            "Plugged"
        };
        return Some(Fragment::from_fmt(format_args!("{subsystem}: {name}: {state} ")));
    }
    Some(Fragment::from_fmt(format_args!(
        "{subsystem}: {name}: {} ",
        event.action()
    )))
}

/// Maps device events onto notification slots.
#[derive(Debug, Clone)]
pub struct Classifier {
    context: ClassifierContext,
    actions: &'static [UdevAction],
}

impl Classifier {
    /// Classifier over [`UDEV_ACTIONS`].
    pub fn new(context: ClassifierContext) -> Self {
        Self {
            context,
            actions: UDEV_ACTIONS,
        }
    }

    /// Lay out the notification for `event`.
    ///
    /// Returns `None` when the event has no subsystem. Handlers run only for
    /// `change` events; when none of them succeeds the fallback slot reports
    /// `<subsystem>: <name>: <action> `.
    pub fn classify(&self, event: &DeviceEvent) -> Option<NotificationSlots> {
        let Some(subsystem) = event.subsystem() else {
            warn!("Device event without subsystem on {}", event.sysname());
            return None;
        };

        let mut slots = NotificationSlots::new();
        let mut handled = false;

        if event.action() == "change" {
            for (index, action) in self.actions.iter().enumerate() {
                if action.subsystem != subsystem {
                    continue;
                }
                match ((action.handler)(event, &self.context), slots.slot_mut(index)) {
                    (Some(fragment), Some(slot)) => {
                        *slot = fragment;
                        handled = true;
                    }
                    (None, _) => debug!("{subsystem} handler failed for {}", event.sysname()),
                    (Some(_), None) => {}
                }
            }
        }

        if !handled {
            *slots.fallback_mut() = Fragment::from_fmt(format_args!(
                "{subsystem}: {}: {} ",
                event.sysname(),
                event.action()
            ));
        }
        Some(slots)
    }
}
