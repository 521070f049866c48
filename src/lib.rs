pub mod capability;
pub mod config;
pub mod entries;
pub mod lifecycle;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::{load_boot_config, AppConfig};
pub use lifecycle::{AppContext, BootCoordinator, Entry, EntryContext};
pub use types::error::{AppError, Result};
