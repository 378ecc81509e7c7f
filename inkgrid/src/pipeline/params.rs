//! Generation parameters and per-user settings.
//!
//! Density, color adjustment and style are validated and persisted with each
//! job but do not influence tile placement; only `tile_size` reaches the
//! compositor.

use super::{MosaicError, TargetId, UserId};
use dashmap::DashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Accepted tile edge lengths in pixels.
pub const TILE_SIZE_RANGE: RangeInclusive<u32> = 10..=200;
/// Accepted tile density values.
pub const TILE_DENSITY_RANGE: RangeInclusive<u32> = 1..=100;
/// Accepted color adjustment values.
pub const COLOR_ADJUSTMENT_RANGE: RangeInclusive<u32> = 0..=100;

pub const DEFAULT_TILE_SIZE: u32 = 50;
pub const DEFAULT_TILE_DENSITY: u32 = 80;
pub const DEFAULT_COLOR_ADJUSTMENT: u32 = 50;

/// Mosaic style tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Classic,
    Random,
    Flowing,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Classic, Style::Random, Style::Flowing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Classic => "classic",
            Style::Random => "random",
            Style::Flowing => "flowing",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a style tag is not one of [`Style::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style '{0}' (expected classic, random or flowing)")]
pub struct UnknownStyle(pub String);

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Style::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}

/// Parameters captured with each generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    /// HD cell edge in pixels; SD cells are half this
    pub tile_size: u32,
    pub tile_density: u32,
    pub color_adjustment: u32,
    pub style: Style,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            tile_density: DEFAULT_TILE_DENSITY,
            color_adjustment: DEFAULT_COLOR_ADJUSTMENT,
            style: Style::Classic,
        }
    }
}

impl GenerationParams {
    /// Checks every numeric parameter against its accepted range.
    pub fn validate(&self) -> Result<(), MosaicError> {
        check_range("tile_size", self.tile_size, &TILE_SIZE_RANGE)?;
        check_range("tile_density", self.tile_density, &TILE_DENSITY_RANGE)?;
        check_range(
            "color_adjustment",
            self.color_adjustment,
            &COLOR_ADJUSTMENT_RANGE,
        )
    }
}

fn check_range(
    parameter: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), MosaicError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(MosaicError::invalid(
            parameter,
            value,
            format!("must be between {} and {}", range.start(), range.end()),
        ))
    }
}

/// Saved generation settings per user, optionally narrowed to one target.
///
/// Lookups for a target fall back to the user's general settings and then to
/// [`GenerationParams::default`].
#[derive(Debug, Default)]
pub struct SettingsStore {
    entries: DashMap<(UserId, Option<TargetId>), GenerationParams>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and upserts settings.
    pub fn save(
        &self,
        user: UserId,
        target: Option<TargetId>,
        params: GenerationParams,
    ) -> Result<(), MosaicError> {
        params.validate()?;
        self.entries.insert((user, target), params);
        Ok(())
    }

    pub fn get(&self, user: UserId, target: Option<TargetId>) -> GenerationParams {
        if let Some(params) = self.entries.get(&(user, target)) {
            return *params;
        }
        if target.is_some() {
            if let Some(params) = self.entries.get(&(user, None)) {
                return *params;
            }
        }
        GenerationParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;

    #[test]
    fn test_style_parse_case_insensitive() {
        assert_eq!("Classic".parse::<Style>().unwrap(), Style::Classic);
        assert_eq!(" FLOWING ".parse::<Style>().unwrap(), Style::Flowing);
        assert_eq!("random".parse::<Style>().unwrap(), Style::Random);
    }

    #[test]
    fn test_style_parse_unknown() {
        let err = "swirl".parse::<Style>().unwrap_err();
        assert!(err.to_string().contains("swirl"));
    }

    #[test]
    fn test_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.tile_size, 50);
        assert_eq!(params.tile_density, 80);
        assert_eq!(params.color_adjustment, 50);
        assert_eq!(params.style, Style::Classic);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_inclusive() {
        let mut params = GenerationParams {
            tile_size: 10,
            tile_density: 1,
            color_adjustment: 0,
            style: Style::Random,
        };
        assert!(params.validate().is_ok());

        params.tile_size = 200;
        params.tile_density = 100;
        params.color_adjustment = 100;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let params = GenerationParams {
            tile_size: 9,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(err.to_string().contains("tile_size"));

        let params = GenerationParams {
            tile_density: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = GenerationParams {
            color_adjustment: 101,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_settings_fallback_chain() {
        let store = SettingsStore::new();
        let user = UserId::new(1);
        let target = TargetId::new(3);

        assert_eq!(store.get(user, Some(target)), GenerationParams::default());

        let general = GenerationParams {
            tile_size: 80,
            ..Default::default()
        };
        store.save(user, None, general).unwrap();
        assert_eq!(store.get(user, Some(target)), general);

        let specific = GenerationParams {
            style: Style::Flowing,
            ..general
        };
        store.save(user, Some(target), specific).unwrap();
        assert_eq!(store.get(user, Some(target)), specific);
        assert_eq!(store.get(user, None), general);
        assert_eq!(store.get(UserId::new(2), None), GenerationParams::default());
    }

    #[test]
    fn test_settings_rejects_invalid() {
        let store = SettingsStore::new();
        let params = GenerationParams {
            tile_size: 500,
            ..Default::default()
        };
        assert!(store.save(UserId::new(1), None, params).is_err());
        assert_eq!(store.get(UserId::new(1), None), GenerationParams::default());
    }
}
