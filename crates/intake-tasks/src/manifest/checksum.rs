//! Resource checksums and completeness

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::warn;

use super::entry::Resource;

/// Checksum every resource whose destination exists on disk.
///
/// Resources without a materialized artifact keep no checksum. Returns how
/// many checksums were computed.
pub fn compute_checksums(resources: &mut [Resource]) -> usize {
    let mut computed = 0;
    for resource in resources.iter_mut() {
        let Some(destination) = resource.destination.as_deref() else {
            continue;
        };
        let path = Path::new(destination);
        if !path.is_file() {
            continue;
        }
        match sha256_file(path) {
            Ok(digest) => {
                resource.checksum = Some(digest);
                computed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot checksum artifact"),
        }
    }
    computed
}

/// True iff every resource has a non-empty checksum and destination
pub fn are_all_resources_complete(resources: &[Resource]) -> bool {
    resources.iter().all(|r| {
        r.checksum.as_deref().is_some_and(|c| !c.is_empty())
            && r.destination.as_deref().is_some_and(|d| !d.is_empty())
    })
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resource(checksum: &str, destination: &str) -> Resource {
        Resource {
            source: "gs://bucket/x".to_string(),
            destination: Some(destination.to_string()),
            checksum: Some(checksum.to_string()),
        }
    }

    #[test]
    fn test_incomplete_when_any_checksum_empty() {
        let resources = vec![resource("x", "/a"), resource("", "/b")];
        assert!(!are_all_resources_complete(&resources));

        let resources = vec![resource("x", "/a"), resource("y", "/b")];
        assert!(are_all_resources_complete(&resources));
    }

    #[test]
    fn test_incomplete_without_destination() {
        let resources = vec![Resource::new("gs://bucket/x")];
        assert!(!are_all_resources_complete(&resources));
    }

    #[test]
    fn test_compute_skips_missing_artifacts() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("a.csv");
        std::fs::write(&present, "hello").unwrap();

        let mut resources = vec![
            Resource::new("gs://bucket/a.csv").with_destination(present.display().to_string()),
            Resource::new("gs://bucket/b.csv")
                .with_destination(temp.path().join("b.csv").display().to_string()),
            Resource::new("gs://bucket/c.csv"),
        ];

        assert_eq!(compute_checksums(&mut resources), 1);
        assert_eq!(
            resources[0].checksum.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert!(resources[1].checksum.is_none());
        assert!(resources[2].checksum.is_none());
        assert!(!are_all_resources_complete(&resources));
    }
}
