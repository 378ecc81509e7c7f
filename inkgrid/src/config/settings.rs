//! Settings structs for each configuration section.
//!
//! Pure data; parsing lives in [`super::parser`] and serialization in
//! [`super::writer`].

use crate::pipeline::{GenerationParams, OrchestratorConfig, Style};
use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub generation: GenerationSettings,
    pub logging: LoggingSettings,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Directory that image references resolve against
    pub uploads_root: PathBuf,
}

/// `[generation]` section: defaults for new jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Cell edge in pixels for the HD output (10-200)
    pub tile_size: u32,
    /// 1-100
    pub tile_density: u32,
    /// 0-100
    pub color_adjustment: u32,
    pub style: Style,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl ConfigFile {
    /// Generation parameters used when a request does not override them.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            tile_size: self.generation.tile_size,
            tile_density: self.generation.tile_density,
            color_adjustment: self.generation.color_adjustment,
            style: self.generation.style,
        }
    }

    /// Orchestrator settings derived from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            uploads_root: self.storage.uploads_root.clone(),
            seed: None,
        }
    }
}
