//! Timestamped snapshots of a brand directory.
//!
//! An archive holds the four artifact files that exist plus full copies of
//! `outputs/` and `inputs/`. Nothing in the brand directory is modified.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
#[cfg(not(unix))]
use tracing::warn;
use tracing::{debug, info, instrument};

use placeseo_shared::{ArtifactKind, BrandPaths, PlaceSeoError, Result};

/// Directory name format: filesystem safe and lexicographically sortable.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Snapshot `brand_dir` into `dest`, or `<brand_dir>/archives` when `None`.
/// Returns the new archive directory.
pub fn archive(brand_dir: &Path, dest: Option<&Path>) -> Result<PathBuf> {
    archive_at(brand_dir, dest, Utc::now())
}

#[instrument(skip_all, fields(brand_dir = %brand_dir.display()))]
pub fn archive_at(brand_dir: &Path, dest: Option<&Path>, now: DateTime<Utc>) -> Result<PathBuf> {
    if !brand_dir.is_dir() {
        return Err(PlaceSeoError::not_found("brand directory", brand_dir));
    }
    let paths = BrandPaths::new(brand_dir);

    let base = dest.map_or_else(|| paths.archives_dir(), Path::to_path_buf);
    let copied = [paths.outputs_dir(), paths.inputs_dir()];
    reject_nested_dest(&base, &copied)?;
    std::fs::create_dir_all(&base).map_err(|e| PlaceSeoError::io(&base, e))?;
    let target = create_unique_dir(&base, &now.format(TIMESTAMP_FORMAT).to_string())?;

    let mut files = 0;
    for kind in ArtifactKind::ALL {
        let source = paths.artifact(kind);
        if source.is_file() {
            copy_file(&source, &target.join(kind.file_name()))?;
            files += 1;
        }
    }
    for dir in copied {
        if let Some(name) = dir.file_name().filter(|_| dir.is_dir()) {
            files += copy_dir(&dir, &target.join(name))?;
        }
    }

    info!(archive = %target.display(), files, "archive created");
    Ok(target)
}

/// A destination inside a copied tree would end up copying itself.
fn reject_nested_dest(base: &Path, copied: &[PathBuf]) -> Result<()> {
    let base = resolve(base)?;
    for dir in copied.iter().filter(|d| d.is_dir()) {
        let dir = resolve(dir)?;
        if base.starts_with(&dir) {
            return Err(PlaceSeoError::config(format!(
                "archive destination {} is inside {}, which is archived",
                base.display(),
                dir.display()
            )));
        }
    }
    Ok(())
}

/// Canonical form of `path`, which may not exist yet: the longest existing
/// ancestor is canonicalized and the rest appended.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| PlaceSeoError::io(path, e))?;
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .map_err(|e| PlaceSeoError::io(existing, e))?;
    resolved.extend(rest.iter().rev());
    Ok(resolved)
}

/// `base/name`, or `base/name-1`, `base/name-2`… if taken.
fn create_unique_dir(base: &Path, name: &str) -> Result<PathBuf> {
    for n in 0u32.. {
        let candidate = if n == 0 {
            base.join(name)
        } else {
            base.join(format!("{name}-{n}"))
        };
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "archive name taken");
            }
            Err(e) => return Err(PlaceSeoError::io(&candidate, e)),
        }
    }
    Err(PlaceSeoError::io(
        base,
        std::io::Error::other("no free archive name"),
    ))
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to).map_err(|e| PlaceSeoError::io(from, e))?;
    Ok(())
}

/// Recursive copy preserving relative paths. Symlinks are recreated, not
/// followed. Returns the number of entries copied.
fn copy_dir(from: &Path, to: &Path) -> Result<usize> {
    std::fs::create_dir_all(to).map_err(|e| PlaceSeoError::io(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| PlaceSeoError::io(from, e))?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| PlaceSeoError::io(from, e))?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        let file_type = std::fs::symlink_metadata(&path)
            .map_err(|e| PlaceSeoError::io(&path, e))?
            .file_type();
        if file_type.is_symlink() {
            count += copy_symlink(&path, &target)?;
        } else if file_type.is_dir() {
            count += copy_dir(&path, &target)?;
        } else {
            copy_file(&path, &target)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<usize> {
    let link = std::fs::read_link(from).map_err(|e| PlaceSeoError::io(from, e))?;
    std::os::unix::fs::symlink(&link, to).map_err(|e| PlaceSeoError::io(to, e))?;
    Ok(1)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> Result<usize> {
    warn!(path = %from.display(), "skipping symlink");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 13, 17, 59, 4).unwrap() + chrono::Duration::milliseconds(887)
    }

    #[test]
    fn only_existing_artifacts_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("cafe_mori");
        std::fs::create_dir_all(&brand).unwrap();
        let intake = brand.join("intake.json");
        std::fs::write(&intake, "{\"brand\":\"cafe_mori\"}").unwrap();

        let archive = archive(&brand, None).unwrap();
        assert!(archive.starts_with(brand.join("archives")));
        assert_eq!(listing(&archive), vec!["intake.json"]);
        assert_eq!(
            std::fs::read(archive.join("intake.json")).unwrap(),
            std::fs::read(&intake).unwrap()
        );
        // source untouched apart from the archives directory
        assert_eq!(listing(&brand), vec!["archives", "intake.json"]);
        assert_eq!(std::fs::read_to_string(&intake).unwrap(), "{\"brand\":\"cafe_mori\"}");
    }

    #[test]
    fn directory_name_is_the_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("b");
        std::fs::create_dir_all(&brand).unwrap();
        let dest = dir.path().join("snapshots");

        let archive = archive_at(&brand, Some(&dest), fixed_time()).unwrap();
        assert_eq!(archive, dest.join("2025-11-13T17-59-04-887Z"));
    }

    #[test]
    fn same_millisecond_gets_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("b");
        std::fs::create_dir_all(&brand).unwrap();

        let first = archive_at(&brand, None, fixed_time()).unwrap();
        let second = archive_at(&brand, None, fixed_time()).unwrap();
        let third = archive_at(&brand, None, fixed_time()).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("887Z-1"));
        assert!(third.to_string_lossy().ends_with("887Z-2"));
    }

    #[test]
    fn outputs_and_inputs_are_copied_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("cafe_mori");
        std::fs::create_dir_all(brand.join("outputs/assets")).unwrap();
        std::fs::create_dir_all(brand.join("inputs")).unwrap();
        std::fs::write(brand.join("outputs/Guidebook.md"), "# Guidebook").unwrap();
        std::fs::write(brand.join("outputs/assets/photo.txt"), "x").unwrap();
        std::fs::write(brand.join("inputs/raw.json"), "{}").unwrap();
        std::fs::write(brand.join("improved.json"), "{}").unwrap();
        std::fs::write(brand.join("notes.txt"), "not archived").unwrap();

        let archive = archive(&brand, None).unwrap();
        assert_eq!(listing(&archive), vec!["improved.json", "inputs", "outputs"]);
        assert_eq!(
            std::fs::read_to_string(archive.join("outputs/assets/photo.txt")).unwrap(),
            "x"
        );
        assert!(archive.join("inputs/raw.json").is_file());
    }

    #[test]
    fn destination_inside_outputs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("cafe_mori");
        std::fs::create_dir_all(brand.join("outputs")).unwrap();
        std::fs::write(brand.join("outputs/Guidebook.md"), "# Guidebook").unwrap();

        let err = archive(&brand, Some(&brand.join("outputs/snapshots"))).unwrap_err();
        assert!(matches!(err, PlaceSeoError::Config { .. }));
        assert!(!brand.join("outputs/snapshots").exists());

        // relative spelling of the same place
        let sneaky = brand.join("inputs/../outputs");
        std::fs::create_dir_all(brand.join("inputs")).unwrap();
        assert!(archive(&brand, Some(&sneaky)).is_err());

        // a sibling with a shared prefix is fine
        assert!(archive(&brand, Some(&brand.join("outputs-archive"))).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recreated_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let brand = dir.path().join("cafe_mori");
        std::fs::create_dir_all(brand.join("outputs")).unwrap();
        std::fs::write(brand.join("outputs/Guidebook.md"), "# Guidebook").unwrap();
        // a loop back to the brand directory
        std::os::unix::fs::symlink(&brand, brand.join("outputs/loop")).unwrap();

        let archive = archive(&brand, None).unwrap();
        let copied = archive.join("outputs/loop");
        assert!(std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&copied).unwrap(), brand);
        assert!(archive.join("outputs/Guidebook.md").is_file());
    }

    #[test]
    fn missing_brand_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = archive(&dir.path().join("nobody"), None).unwrap_err();
        assert!(matches!(err, PlaceSeoError::NotFound { .. }));
        assert!(!dir.path().join("nobody").exists());
    }
}
