mod entry;
mod orchestrator;
mod registry;

pub use entry::{Entry, EntryContext, EntryState};
pub use orchestrator::{BootCoordinator, BootPhase};
pub use registry::{AppContext, EntryMap, EntryRegFn};
