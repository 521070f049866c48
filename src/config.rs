use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::de::DeserializeOwned;

use crate::types::{AppError, Result};

/// Process-level settings, filled from the command line. `log_level` seeds the
/// tracing filter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub entry_name: String,
    pub log_level: String,
}

/// Decode a boot document into `T`.
///
/// The format follows the file extension (`.yaml`, `.yml`, `.json`). Sections that
/// `T` does not declare are ignored; missing ones fall back to `T`'s serde defaults.
/// Any failure (missing file, malformed document, type mismatch) is reported as
/// [`AppError::Config`] naming the offending path.
///
/// Scalars are coerced by the `config` crate, not by serde: a quoted `"yes"`,
/// `"on"` or `"true"` decodes into a `bool` field as `true` (`"no"`, `"off"`,
/// `"false"` as `false`), and numeric strings decode into integer fields.
pub fn load_boot_config<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading boot config");

    Config::builder()
        .add_source(File::from(path).required(true))
        .build()
        .and_then(|c| c.try_deserialize::<T>())
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
}
