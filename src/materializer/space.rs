//! Free-space preflight.

use serde::Serialize;
use std::path::{Component, Path, PathBuf, Prefix};
use sysinfo::Disks;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::MaterializeError;

/// Why free space could not be determined. Never fatal to a run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no mounted disk contains {}", path.display())]
    NoMatchingDisk { path: PathBuf },

    #[error("could not resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reports the bytes available on the volume that would hold `path`.
pub trait DiskSpaceProbe {
    fn available_space(&self, path: &Path) -> Result<u64, ProbeError>;
}

/// Looks the volume up in the mounted disks reported by [`sysinfo`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl DiskSpaceProbe for SysinfoProbe {
    fn available_space(&self, path: &Path) -> Result<u64, ProbeError> {
        let target = nearest_existing_ancestor(path)?;
        let disks = Disks::new_with_refreshed_list();

        let mounts = disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point(), disk.available_space()));
        match select_disk(&target, mounts) {
            Some((mount_point, available)) => {
                debug!(
                    "SPACE | {:?} is on {:?}, {} bytes free",
                    target, mount_point, available
                );
                Ok(available)
            }
            None => Err(ProbeError::NoMatchingDisk { path: target }),
        }
    }
}

/// Picks the mount point that most specifically contains `target`.
pub(crate) fn select_disk<'a>(
    target: &Path,
    mounts: impl IntoIterator<Item = (&'a Path, u64)>,
) -> Option<(&'a Path, u64)> {
    mounts
        .into_iter()
        .filter(|(mount_point, _)| target.starts_with(mount_point))
        .max_by_key(|(mount_point, _)| mount_point.components().count())
}

/// Outcome of the preflight, kept in the run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpaceCheck {
    Passed { required: u64, available: u64 },
    Inconclusive,
    Skipped,
}

/// Fails when `required` bytes would eat into the last `margin` bytes of the
/// volume. A probe failure degrades to [`SpaceCheck::Inconclusive`].
pub fn preflight(
    probe: &impl DiskSpaceProbe,
    output_directory: &Path,
    required: u64,
    margin: u64,
) -> Result<SpaceCheck, MaterializeError> {
    let available = match probe.available_space(output_directory) {
        Ok(available) => available,
        Err(err) => {
            warn!(error = %err, "SPACE | free space unknown, continuing without the check");
            return Ok(SpaceCheck::Inconclusive);
        }
    };

    if available.saturating_sub(margin) < required {
        return Err(MaterializeError::InsufficientSpace {
            required,
            available,
            margin,
        });
    }

    Ok(SpaceCheck::Passed {
        required,
        available,
    })
}

/// The output directory usually does not exist yet, so resolve the closest
/// ancestor that does.
pub(crate) fn nearest_existing_ancestor(path: &Path) -> Result<PathBuf, ProbeError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ProbeError::Resolve {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };

    let existing = absolute
        .ancestors()
        .find(|ancestor| ancestor.exists())
        .ok_or_else(|| ProbeError::NoMatchingDisk {
            path: absolute.clone(),
        })?;

    let canonical = existing.canonicalize().map_err(|source| ProbeError::Resolve {
        path: existing.to_path_buf(),
        source,
    })?;
    Ok(strip_verbatim(&canonical))
}

/// Turns `\\?\C:\dir` into `C:\dir` and `\\?\UNC\server\share` into
/// `\\server\share`, the forms mount points are reported in. Other paths are
/// returned as they are.
pub(crate) fn strip_verbatim(path: &Path) -> PathBuf {
    let mut components = path.components();
    let base = match components.next() {
        Some(Component::Prefix(prefix)) => match prefix.kind() {
            Prefix::VerbatimDisk(letter) => format!("{}:", char::from(letter)),
            Prefix::VerbatimUNC(server, share) => format!(
                r"\\{}\{}",
                server.to_string_lossy(),
                share.to_string_lossy()
            ),
            _ => return path.to_path_buf(),
        },
        _ => return path.to_path_buf(),
    };

    let mut stripped = PathBuf::from(base);
    stripped.extend(components);
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixed(u64);

    impl DiskSpaceProbe for Fixed {
        fn available_space(&self, _path: &Path) -> Result<u64, ProbeError> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl DiskSpaceProbe for Broken {
        fn available_space(&self, path: &Path) -> Result<u64, ProbeError> {
            Err(ProbeError::NoMatchingDisk {
                path: path.to_path_buf(),
            })
        }
    }

    #[test]
    fn test_preflight_passes_with_room_to_spare() {
        let check = preflight(&Fixed(1_000), Path::new("out"), 400, 600).unwrap();
        assert_eq!(
            check,
            SpaceCheck::Passed {
                required: 400,
                available: 1_000
            }
        );
    }

    #[test]
    fn test_preflight_respects_margin() {
        let err = preflight(&Fixed(1_000), Path::new("out"), 401, 600).unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::InsufficientSpace {
                required: 401,
                available: 1_000,
                margin: 600
            }
        ));
    }

    #[test]
    fn test_preflight_margin_larger_than_disk() {
        assert!(preflight(&Fixed(100), Path::new("out"), 1, 600).is_err());
    }

    #[test]
    fn test_probe_failure_is_inconclusive() {
        let check = preflight(&Broken, Path::new("out"), u64::MAX, 0).unwrap();
        assert_eq!(check, SpaceCheck::Inconclusive);
    }

    #[test]
    fn test_nearest_existing_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("a").join("b").join("c");

        let resolved = nearest_existing_ancestor(&missing).unwrap();
        assert_eq!(resolved, strip_verbatim(&temp_dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn test_most_specific_mount_point_wins() {
        let mounts = [
            (Path::new("/"), 100),
            (Path::new("/home"), 50),
            (Path::new("/home/user/data"), 7),
        ];

        let pick = |target: &str| select_disk(Path::new(target), mounts).map(|(_, free)| free);
        assert_eq!(pick("/home/user"), Some(50));
        assert_eq!(pick("/home/user/data/run"), Some(7));
        assert_eq!(pick("/homework"), Some(100));
        assert_eq!(pick("/"), Some(100));
    }

    #[test]
    fn test_no_containing_mount_point() {
        let mounts = [(Path::new("/mnt/usb"), 10)];
        assert_eq!(select_disk(Path::new("/home/user"), mounts), None);
        assert_eq!(select_disk(Path::new("/home/user"), Vec::new()), None);
    }

    #[test]
    fn test_plain_paths_are_not_rewritten() {
        assert_eq!(strip_verbatim(Path::new("/srv/out")), PathBuf::from("/srv/out"));
        assert_eq!(strip_verbatim(Path::new("out")), PathBuf::from("out"));
    }

    #[cfg(windows)]
    #[test]
    fn test_verbatim_prefix_matches_drive_mount_point() {
        let stripped = strip_verbatim(Path::new(r"\\?\C:\Users\me\out"));
        assert_eq!(stripped, PathBuf::from(r"C:\Users\me\out"));

        let mounts = [(Path::new(r"C:\"), 42), (Path::new(r"D:\"), 9)];
        assert_eq!(select_disk(&stripped, mounts).map(|(_, free)| free), Some(42));

        let share = strip_verbatim(Path::new(r"\\?\UNC\server\share\out"));
        assert_eq!(share, PathBuf::from(r"\\server\share\out"));
    }

    #[cfg(windows)]
    #[test]
    fn test_resolved_directory_has_no_verbatim_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = nearest_existing_ancestor(&temp_dir.path().join("missing")).unwrap();
        assert!(!resolved.to_string_lossy().starts_with(r"\\?\"));
    }
}
