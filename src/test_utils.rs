use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::lifecycle::AppContext;
use crate::{capability, entries};

pub fn write_boot_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create boot file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write boot file");
    file.flush().expect("Failed to flush boot file");
    file
}

pub struct TestContext {
    pub ctx: Arc<AppContext>,
    pub boot_file: NamedTempFile, // Kept so the file lives as long as the context
}

impl TestContext {
    /// Fresh context with the built-in registration functions installed.
    pub fn new(boot_yaml: &str) -> Self {
        let ctx = Arc::new(AppContext::new());
        capability::install(&ctx);
        entries::install(&ctx);

        Self {
            ctx,
            boot_file: write_boot_file(boot_yaml),
        }
    }
}
