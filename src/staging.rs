//! Relocation of extracted files into the install path
//!
//! After extraction the scratch directory holds the archive's wrapper tree.
//! Every directory named `bin` or `lib`, at any depth, is drained into
//! `install_path/bin` or `install_path/lib`. Executables get mode 0755;
//! libraries keep the mode they were extracted with.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use walkdir::WalkDir;

use crate::binaries::{BIN_DIR, LIB_DIR};

/// Files moved by [`relocate_payload`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub binaries: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
}

/// Move extracted `bin`/`lib` contents from `scratch_dir` into `install_path`.
///
/// Matching is by directory basename, so nested `bin` directories are all
/// flattened into the single destination. The install path may be the
/// scratch directory itself, an ancestor of it, or lie inside it; a `bin`
/// or `lib` directory that already is the destination is adopted in place.
/// Not transactional: a failure part-way leaves already-moved files in place.
pub fn relocate_payload(scratch_dir: &Path, install_path: &Path) -> Result<Relocated> {
    let mut bin_sources = Vec::new();
    let mut lib_sources = Vec::new();

    for entry in WalkDir::new(scratch_dir).min_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to walk {}", scratch_dir.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let sources = match entry.file_name().to_str() {
            Some(BIN_DIR) => &mut bin_sources,
            Some(LIB_DIR) => &mut lib_sources,
            _ => continue,
        };
        sources.push(entry.into_path());
    }

    let mut relocated = Relocated::default();

    for source in &bin_sources {
        let moved = drain_dir(source, &install_path.join(BIN_DIR))?;
        for path in &moved {
            make_executable(path)?;
        }
        relocated.binaries.extend(moved);
    }

    for source in &lib_sources {
        let moved = drain_dir(source, &install_path.join(LIB_DIR))?;
        relocated.libraries.extend(moved);
    }

    // A destination visited as a source lists files that were also moved in
    relocated.binaries.sort();
    relocated.binaries.dedup();
    relocated.libraries.sort();
    relocated.libraries.dedup();

    Ok(relocated)
}

/// Move every non-directory entry directly inside `source` into `dest`.
///
/// When `source` is `dest` the entries stay put and are only listed.
fn drain_dir(source: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let in_place = dest.exists() && same_dir(source, dest)?;
    let mut moved = Vec::new();
    let entries = fs::read_dir(source)
        .with_context(|| format!("Failed to read directory {}", source.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to read directory {}", source.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to read metadata: {}", entry.path().display()))?;
        if file_type.is_dir() {
            continue;
        }

        let dest_path = dest.join(entry.file_name());
        if !in_place {
            if moved.is_empty() {
                fs::create_dir_all(dest)
                    .with_context(|| format!("Failed to create directory {}", dest.display()))?;
            }
            move_file(&entry.path(), &dest_path)?;
            debug!("Moved {} -> {}", entry.path().display(), dest_path.display());
        }
        moved.push(dest_path);
    }

    Ok(moved)
}

fn same_dir(a: &Path, b: &Path) -> Result<bool> {
    let resolve =
        |p: &Path| fs::canonicalize(p).with_context(|| format!("Failed to resolve {}", p.display()));
    Ok(resolve(a)? == resolve(b)?)
}

/// Rename `src` to `dst`, falling back to copy-and-delete across filesystems
fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let metadata = fs::symlink_metadata(src)
        .with_context(|| format!("Failed to read metadata: {}", src.display()))?;

    if metadata.file_type().is_symlink() {
        copy_symlink(src, dst)?;
    } else {
        fs::copy(src, dst).with_context(|| {
            format!("Failed to copy {} to {}", src.display(), dst.display())
        })?;
    }

    fs::remove_file(src).with_context(|| format!("Failed to remove {}", src.display()))?;
    Ok(())
}

fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            let target = fs::read_link(src)
                .with_context(|| format!("Failed to read link {}", src.display()))?;
            if fs::symlink_metadata(dst).is_ok() {
                fs::remove_file(dst)
                    .with_context(|| format!("Failed to replace {}", dst.display()))?;
            }
            std::os::unix::fs::symlink(&target, dst)
                .with_context(|| format!("Failed to create link {}", dst.display()))?;
        } else {
            fs::copy(src, dst).with_context(|| {
                format!("Failed to copy {} to {}", src.display(), dst.display())
            })?;
        }
    }
    Ok(())
}

/// Set executable permissions (755)
fn make_executable(path: &Path) -> Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .with_context(|| format!("Failed to read metadata: {}", path.display()))?
                .permissions();
            perms.set_mode(0o755);
            fs::set_permissions(path, perms)
                .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
        } else {
            let _ = path;
        }
    }
    Ok(())
}
