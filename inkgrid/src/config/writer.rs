//! INI serialization: `ConfigFile` → commented INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[storage]
; Root directory that image references resolve against.
; Mosaics are written to <uploads_root>/user_<id>/target_<id>/mosaics/
uploads_root = {}

[generation]
; Tile edge in pixels for the full-resolution output (10-200).
; The half-resolution output uses half this size.
tile_size = {}
; Tile density (1-100). Stored with each job.
tile_density = {}
; Color adjustment (0-100). Stored with each job.
color_adjustment = {}
; Mosaic style: classic, random or flowing
style = {}

[logging]
; Log file path. Cleared at the start of each session.
file = {}
"#,
        path_to_string(&config.storage.uploads_root),
        config.generation.tile_size,
        config.generation.tile_density,
        config.generation.color_adjustment,
        config.generation.style,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
