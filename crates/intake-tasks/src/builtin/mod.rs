//! Built-in task types

mod download;
mod get_file_list;

pub use download::{Download, DownloadDefinition};
pub use get_file_list::{GetFileList, GetFileListDefinition};

use crate::registry::{registration, TaskRegistration};

/// Registry table of every built-in task type
pub fn registrations() -> Vec<TaskRegistration> {
    vec![registration::<GetFileList>(), registration::<Download>()]
}
