// ABOUTME: Session module - task sessions, their progress snapshots and the archive.
// ABOUTME: Sessions is the submit/poll entry point over a Manager.

mod archive;
mod sessions;
mod status;

pub use archive::{ArchiveStore, MemoryArchive, TaskSession};
pub use sessions::Sessions;
pub use status::{Snapshot, TaskStatus};
