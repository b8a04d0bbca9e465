//! Intake Stores - remote object stores and downloaders
//!
//! The task engine talks to external resources through two traits defined
//! here: [`RemoteStore`] for bucket-style listing, reading and (conditional)
//! writing, and [`Downloader`] for fetching a single resource to local disk.
//!
//! Every object carries a generation number assigned by the store on each
//! successful write. [`RemoteStore::write_conditional`] only succeeds while the
//! remote generation still equals the caller's, which is what the manifest
//! persistence layer builds its optimistic concurrency on.

pub mod downloader;
pub mod error;
pub mod http;
pub mod listing;
pub mod local;
pub mod memory;
pub mod traits;
pub mod store_url;

pub use downloader::{RoutingDownloader, StoreDownloader};
pub use error::{DownloadError, Result, StoreError};
pub use http::HttpDownloader;
pub use local::LocalStore;
pub use memory::InMemoryStore;
pub use traits::{DownloadDescriptor, Downloader, LocalArtifact, RemoteStore};
pub use store_url::StoreUrl;
