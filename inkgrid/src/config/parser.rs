//! INI parsing: the single place where INI keys map to struct fields.

use ini::Ini;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::pipeline::{COLOR_ADJUSTMENT_RANGE, TILE_DENSITY_RANGE, TILE_SIZE_RANGE};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("uploads_root") {
            let v = v.trim();
            if !v.is_empty() {
                config.storage.uploads_root = expand_tilde(v);
            }
        }
    }

    // [generation] section
    if let Some(section) = ini.section(Some("generation")) {
        if let Some(v) = section.get("tile_size") {
            config.generation.tile_size = parse_in_range("tile_size", v, &TILE_SIZE_RANGE)?;
        }
        if let Some(v) = section.get("tile_density") {
            config.generation.tile_density =
                parse_in_range("tile_density", v, &TILE_DENSITY_RANGE)?;
        }
        if let Some(v) = section.get("color_adjustment") {
            config.generation.color_adjustment =
                parse_in_range("color_adjustment", v, &COLOR_ADJUSTMENT_RANGE)?;
        }
        if let Some(v) = section.get("style") {
            config.generation.style = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "generation".to_string(),
                key: "style".to_string(),
                value: v.to_string(),
                reason: "must be one of: classic, random, flowing".to_string(),
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parses an integer `[generation]` value and checks it against `range`.
fn parse_in_range(
    key: &str,
    value: &str,
    range: &RangeInclusive<u32>,
) -> Result<u32, ConfigFileError> {
    let invalid = || ConfigFileError::InvalidValue {
        section: "generation".to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: format!(
            "must be an integer between {} and {}",
            range.start(),
            range.end()
        ),
    };

    let parsed: u32 = value.trim().parse().map_err(|_| invalid())?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(invalid())
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
