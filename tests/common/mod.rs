//! Fixtures shared by the unit and integration tests: archive builders and
//! fake FFmpeg binaries.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use xz2::write::XzEncoder;
use zip::write::SimpleFileOptions;

/// Serializes tests that write scripts and then execute them.
///
/// A fork in one test thread can inherit the write handle of a script another
/// thread is about to exec, which fails with ETXTBSY.
static EXEC_LOCK: Mutex<()> = Mutex::new(());

pub fn exec_guard() -> MutexGuard<'static, ()> {
    EXEC_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Archive entry: path inside the archive, contents, unix mode
pub type Entry<'a> = (&'a str, &'a [u8], u32);

/// Write an xz-compressed tarball
pub fn write_tar_xz(path: &Path, entries: &[Entry]) {
    let encoder = XzEncoder::new(File::create(path).unwrap(), 6);
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Write a zip archive
pub fn write_zip(path: &Path, entries: &[Entry]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data, mode) in entries {
        let options = SimpleFileOptions::default().unix_permissions(*mode);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// The three tools a complete installation provides
pub const TOOLS: [&str; 3] = ["ffmpeg", "ffprobe", "ffplay"];

/// Shell script body standing in for an FFmpeg tool that answers `-version`
pub const HEALTHY: &[u8] = b"#!/bin/sh\necho \"ffmpeg version test\"\nexit 0\n";

/// Shell script body for a tool that exits with an error
pub const BROKEN: &[u8] = b"#!/bin/sh\nexit 3\n";

/// Shell script body for a tool that hangs past any health-check timeout
pub const HANGING: &[u8] = b"#!/bin/sh\nsleep 5\n";

/// Write an executable script `name` under `dir`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Populate `dir` with all three tools as healthy scripts
#[cfg(unix)]
pub fn write_healthy_tools(dir: &Path) {
    for tool in TOOLS {
        write_script(dir, tool, HEALTHY);
    }
}
