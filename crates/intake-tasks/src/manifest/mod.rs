//! Run manifest: per-task entries, the run document, checksums and
//! persistence

mod checksum;
mod document;
mod entry;
mod persistence;

pub use checksum::{are_all_resources_complete, compute_checksums};
pub use document::{ManifestDocument, RunSummary};
pub use entry::{Resource, TaskManifest, TaskStatus};
pub use persistence::{save_with_policy, ManifestStore};
