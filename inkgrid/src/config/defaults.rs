//! Default values for configuration settings and `ConfigFile::default()`.

use super::settings::*;
use crate::pipeline::{Style, DEFAULT_COLOR_ADJUSTMENT, DEFAULT_TILE_DENSITY, DEFAULT_TILE_SIZE};
use std::path::PathBuf;

/// Default uploads root, relative to the working directory.
pub const DEFAULT_UPLOADS_ROOT: &str = "./uploads";

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs/inkgrid.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                uploads_root: PathBuf::from(DEFAULT_UPLOADS_ROOT),
            },
            generation: GenerationSettings {
                tile_size: DEFAULT_TILE_SIZE,
                tile_density: DEFAULT_TILE_DENSITY,
                color_adjustment: DEFAULT_COLOR_ADJUSTMENT,
                style: Style::Classic,
            },
            logging: LoggingSettings {
                file: PathBuf::from(DEFAULT_LOG_FILE),
            },
        }
    }
}
