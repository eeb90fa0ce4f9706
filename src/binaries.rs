//! FFmpeg executables and install layout names

/// Executables a complete FFmpeg installation provides
pub const BINARIES: &[&str] = &["ffmpeg", "ffprobe", "ffplay"];

/// Directory inside the install path holding executables
pub const BIN_DIR: &str = "bin";

/// Directory inside the install path holding shared libraries
pub const LIB_DIR: &str = "lib";

/// Flag passed to each binary during the health check
pub const VERSION_FLAG: &str = "-version";
