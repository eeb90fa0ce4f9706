//! Filtered archive extraction
//!
//! Unpacks only the `bin/` and `lib/` members of a prebuilt FFmpeg archive into
//! a scratch directory. The archive's own wrapper directory (for example
//! `ffmpeg-master-latest-linux64-gpl-shared/`) is kept; relocation into the
//! install path happens afterwards in [`crate::staging`].

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::error::InstallerError;

/// Archive container used by a platform's prebuilt distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// LZMA/xz-compressed tarball (Linux builds)
    TarXz,
    /// Zip archive (macOS builds)
    Zip,
}

impl ArchiveFormat {
    /// File extension of this format's archives
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Whether an archive member belongs to the installable payload.
///
/// Purely textual: any member whose path contains `bin/` or `lib/` qualifies.
pub fn is_payload_member(name: &str) -> bool {
    name.contains("bin/") || name.contains("lib/")
}

/// Extract the payload members of `archive_path` into `scratch_dir`.
///
/// Returns the number of payload members written. Fails with
/// [`InstallerError::NoBinariesFound`] when none were, including when every
/// match was skipped for escaping `scratch_dir`.
pub fn extract_payload(
    archive_path: &Path,
    format: ArchiveFormat,
    scratch_dir: &Path,
) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;

    let matched = match format {
        ArchiveFormat::TarXz => extract_from_tar_xz(BufReader::new(file), scratch_dir)?,
        ArchiveFormat::Zip => extract_from_zip(BufReader::new(file), scratch_dir)?,
    };

    if matched == 0 {
        return Err(InstallerError::NoBinariesFound.into());
    }

    debug!(
        "Extracted {} member(s) from {} into {}",
        matched,
        archive_path.display(),
        scratch_dir.display()
    );
    Ok(matched)
}

/// Extract matching members from an xz-compressed tar stream
fn extract_from_tar_xz<R: io::Read>(reader: R, scratch_dir: &Path) -> Result<usize> {
    let mut archive = Archive::new(XzDecoder::new(reader));
    let mut matched = 0;

    for entry in archive.entries().context("Failed to read tar.xz archive")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let name = entry
            .path()
            .context("Invalid tar entry path")?
            .to_string_lossy()
            .into_owned();

        if !is_payload_member(&name) {
            continue;
        }

        // unpack_in refuses paths that would land outside scratch_dir
        let unpacked = entry
            .unpack_in(scratch_dir)
            .with_context(|| format!("Failed to extract {name}"))?;
        if unpacked {
            matched += 1;
        } else {
            warn!("Skipped archive member outside extraction directory: {name}");
        }
    }

    Ok(matched)
}

/// Extract matching members from a zip archive
fn extract_from_zip<R: io::Read + io::Seek>(reader: R, scratch_dir: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader).context("Failed to read ZIP archive")?;
    let mut matched = 0;

    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry at index {i}"))?;
        let name = member.name().to_string();

        if !is_payload_member(&name) {
            continue;
        }

        let Some(relative) = member.enclosed_name() else {
            warn!("Skipped archive member outside extraction directory: {name}");
            continue;
        };
        let target = scratch_dir.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory {}", target.display()))?;
            matched += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        #[cfg(unix)]
        {
            if member.unix_mode().is_some_and(is_symlink_mode) {
                use std::io::Read;

                let mut link_target = String::new();
                member
                    .read_to_string(&mut link_target)
                    .with_context(|| format!("Failed to read link target of {name}"))?;
                if fs::symlink_metadata(&target).is_ok() {
                    fs::remove_file(&target)
                        .with_context(|| format!("Failed to replace {}", target.display()))?;
                }
                std::os::unix::fs::symlink(&link_target, &target)
                    .with_context(|| format!("Failed to create link {}", target.display()))?;
                matched += 1;
                continue;
            }
        }

        let mut outfile = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        io::copy(&mut member, &mut outfile).with_context(|| format!("Failed to extract {name}"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if let Some(mode) = member.unix_mode() {
                fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                    .with_context(|| format!("Failed to set permissions: {}", target.display()))?;
            }
        }
        matched += 1;
    }

    Ok(matched)
}

#[cfg(unix)]
fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170000 == 0o120000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tar_xz, write_zip};

    const MIXED: &[(&str, &[u8], u32)] = &[
        ("pkg/bin/ffmpeg", b"ffmpeg", 0o644),
        ("pkg/bin/ffprobe", b"ffprobe", 0o644),
        ("pkg/lib/libavcodec.so", b"codec", 0o644),
        ("pkg/doc/README.txt", b"docs", 0o644),
        ("pkg/LICENSE", b"gpl", 0o644),
    ];

    #[test]
    fn payload_filter_is_textual() {
        assert!(is_payload_member("pkg/bin/ffmpeg"));
        assert!(is_payload_member("pkg/lib/libavutil.so.59"));
        assert!(is_payload_member("lib/pkgconfig/libavcodec.pc"));
        assert!(!is_payload_member("pkg/doc/ffmpeg.html"));
        assert!(!is_payload_member("pkg/bin"));
        assert!(!is_payload_member("pkg/include/libavcodec/avcodec.h"));
    }

    #[test]
    fn tar_xz_extracts_only_payload_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ffmpeg.tar.xz");
        write_tar_xz(&archive, MIXED);

        let matched = extract_payload(&archive, ArchiveFormat::TarXz, dir.path()).unwrap();

        assert_eq!(matched, 3);
        assert!(dir.path().join("pkg/bin/ffmpeg").is_file());
        assert!(dir.path().join("pkg/bin/ffprobe").is_file());
        assert!(dir.path().join("pkg/lib/libavcodec.so").is_file());
        assert!(!dir.path().join("pkg/doc").exists());
        assert!(!dir.path().join("pkg/LICENSE").exists());
    }

    #[test]
    fn zip_extracts_only_payload_members() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ffmpeg.zip");
        write_zip(&archive, MIXED);

        let matched = extract_payload(&archive, ArchiveFormat::Zip, dir.path()).unwrap();

        assert_eq!(matched, 3);
        assert_eq!(fs::read(dir.path().join("pkg/lib/libavcodec.so")).unwrap(), b"codec");
        assert!(!dir.path().join("pkg/doc").exists());
    }

    #[test]
    fn archive_without_payload_reports_no_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let tar_path = dir.path().join("empty.tar.xz");
        let zip_path = dir.path().join("empty.zip");
        write_tar_xz(&tar_path, &[("pkg/doc/README.txt", b"docs", 0o644)]);
        write_zip(&zip_path, &[("pkg/doc/README.txt", b"docs", 0o644)]);

        for (path, format) in [(tar_path, ArchiveFormat::TarXz), (zip_path, ArchiveFormat::Zip)] {
            let err = extract_payload(&path, format, dir.path()).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<InstallerError>(),
                Some(InstallerError::NoBinariesFound)
            ));
        }
        assert!(!dir.path().join("pkg").exists());
    }

    #[test]
    fn escaping_members_do_not_count_as_payload() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let archive = scratch.join("ffmpeg.zip");
        write_zip(&archive, &[("../bin/ffmpeg", b"ffmpeg", 0o755)]);

        let err = extract_payload(&archive, ArchiveFormat::Zip, &scratch).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallerError>(),
            Some(InstallerError::NoBinariesFound)
        ));
        assert!(!root.path().join("bin").exists());
    }

    #[test]
    fn escaping_members_are_skipped_alongside_real_ones() {
        let root = tempfile::tempdir().unwrap();
        let scratch = root.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let archive = scratch.join("ffmpeg.zip");
        write_zip(
            &archive,
            &[
                ("../bin/ffmpeg", b"evil", 0o755),
                ("pkg/bin/ffmpeg", b"ffmpeg", 0o755),
            ],
        );

        let matched = extract_payload(&archive, ArchiveFormat::Zip, &scratch).unwrap();

        assert_eq!(matched, 1);
        assert!(scratch.join("pkg/bin/ffmpeg").is_file());
        assert!(!root.path().join("bin").exists());
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_payload(&dir.path().join("nope.zip"), ArchiveFormat::Zip, dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open archive"));
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tar.xz");
        fs::write(&archive, b"definitely not xz").unwrap();

        assert!(extract_payload(&archive, ArchiveFormat::TarXz, dir.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn zip_preserves_member_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ffmpeg.zip");
        write_zip(&archive, &[("pkg/lib/libavutil.dylib", b"util", 0o640)]);

        extract_payload(&archive, ArchiveFormat::Zip, dir.path()).unwrap();

        let mode = fs::metadata(dir.path().join("pkg/lib/libavutil.dylib"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn format_extensions() {
        assert_eq!(ArchiveFormat::TarXz.extension(), "tar.xz");
        assert_eq!(ArchiveFormat::Zip.extension(), "zip");
    }
}
