//! Configuration for inkgrid.
//!
//! Settings are read from an INI file at `~/.inkgrid/config.ini`. A missing
//! file yields defaults; a present file overlays only the keys it sets.
//!
//! ```ini
//! [storage]
//! uploads_root = ./uploads
//!
//! [generation]
//! tile_size = 50
//! tile_density = 80
//! color_adjustment = 50
//! style = classic
//!
//! [logging]
//! file = logs/inkgrid.log
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, GenerationSettings, LoggingSettings, StorageSettings};
