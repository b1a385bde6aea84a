//! Small sysfs readers.
//!
//! Everything here is fail-soft: an unreadable file is logged at debug
//! level and reported as `-1` or `None`.

use std::fs;
use std::path::{Path, PathBuf};

use statusinfo_common::config::StatusConfig;
use statusinfo_common::consts::MAX_THERMAL_ZONES;
use tracing::{debug, info};

/// Trimmed content of a sysfs attribute.
pub fn read_attr(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text.trim().to_string()),
        Err(e) => {
            debug!("Cannot read {}: {e}", path.display());
            None
        }
    }
}

/// Leading decimal integer of `text`, like `strtol`.
pub fn parse_leading_long(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(['-', '+']));
    let end = text[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |i| i + digits_start);
    text[..end].parse().ok()
}

/// Integer value of a sysfs file, `-1` when it cannot be read or parsed.
pub fn read_sys_long(path: &Path) -> i64 {
    read_attr(path)
        .as_deref()
        .and_then(parse_leading_long)
        .unwrap_or(-1)
}

/// Probe hwmon zones for the first sensor whose name is in `thermal_names`.
///
/// Zones are probed in order and the search stops at the first zone that
/// does not exist.
pub fn find_thermal_input(config: &StatusConfig) -> Option<PathBuf> {
    for zone in 0..MAX_THERMAL_ZONES {
        let dir = config.thermal_zone_dir(zone);
        let Some(name) = read_attr(&dir.join("name")) else {
            info!(
                "Thermal zone {} not found: temperature readout not available",
                dir.display()
            );
            return None;
        };
        debug!("Thermal zone {}: {name}", dir.display());
        if config.thermal_names.iter().any(|n| *n == name) {
            info!("Using thermal zone {} ({name})", dir.display());
            return Some(dir.join(&config.temp_input));
        }
    }
    None
}

/// Temperature in whole degrees Celsius, `-1` when unreadable.
pub fn read_temperature(path: &Path) -> i64 {
    match read_sys_long(path) {
        -1 => -1,
        millidegrees => millidegrees / 1000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> StatusConfig {
        StatusConfig {
            sysfs_root: root.to_path_buf(),
            ..StatusConfig::default()
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn leading_integer() {
        assert_eq!(parse_leading_long("42\n"), Some(42));
        assert_eq!(parse_leading_long("  -7 mA"), Some(-7));
        assert_eq!(parse_leading_long("15000000"), Some(15_000_000));
        assert_eq!(parse_leading_long("abc"), None);
        assert_eq!(parse_leading_long(""), None);
    }

    #[test]
    fn unreadable_is_minus_one() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_sys_long(&dir.path().join("missing")), -1);
        write(dir.path(), "garbage", "n/a\n");
        assert_eq!(read_sys_long(&dir.path().join("garbage")), -1);
    }

    #[test]
    fn thermal_zone_matched_by_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "class/hwmon/hwmon0/name", "nvme\n");
        write(dir.path(), "class/hwmon/hwmon1/name", "k10temp\n");
        write(dir.path(), "class/hwmon/hwmon1/temp1_input", "48500\n");

        let path = find_thermal_input(&config_for(dir.path())).unwrap();
        assert!(path.ends_with("hwmon1/temp1_input"));
        assert_eq!(read_temperature(&path), 48);
    }

    #[test]
    fn thermal_probe_stops_at_first_gap() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "class/hwmon/hwmon0/name", "nvme\n");
        write(dir.path(), "class/hwmon/hwmon2/name", "acpitz\n");
        assert!(find_thermal_input(&config_for(dir.path())).is_none());
    }

    #[test]
    fn unreadable_temperature() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_temperature(&dir.path().join("temp1_input")), -1);
    }
}
