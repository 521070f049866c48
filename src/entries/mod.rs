pub mod my_entry;

pub use my_entry::{register_my_entries_from_config, register_my_entry, MyEntry, MyEntryOption};

use crate::lifecycle::AppContext;

/// Append the component bridges to the context's registration functions.
pub fn install(ctx: &AppContext) {
    ctx.register_entry_reg_fn(register_my_entries_from_config);
}
