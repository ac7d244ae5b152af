// Tarball verification and installation
// npm tarballs are gzip'd tar files with everything under `package/`

use flate2::read::GzDecoder;
use sha1::{Digest, Sha1};
use std::fs;
use std::io;
use std::path::Path;

use super::AssetError;

pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn verify_sha1(data: &[u8], expected: &str) -> Result<(), AssetError> {
    let actual = sha1_hex(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(AssetError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Unpack `archive` and move `min/vs` (and `min-maps` when shipped) into `static_root`
///
/// The archive is staged in a hidden directory inside `static_root` so the
/// final moves are renames on the same filesystem.
pub fn install(archive: &[u8], static_root: &Path) -> Result<(), AssetError> {
    let staging = tempfile::Builder::new()
        .prefix(".monaco-")
        .tempdir_in(static_root)?;
    tar::Archive::new(GzDecoder::new(archive)).unpack(staging.path())?;

    let package = staging.path().join("package");
    let vs = package.join("min").join("vs");
    if !vs.is_dir() {
        return Err(AssetError::MissingContents("package/min/vs".to_string()));
    }
    replace_dir(&vs, &static_root.join("vs"))?;

    // min-maps is not part of every release (0.53.0 dropped it)
    let maps = package.join("min-maps");
    if maps.is_dir() {
        replace_dir(&maps, &static_root.join("min-maps"))?;
    }
    Ok(())
}

fn replace_dir(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst)?;
    }
    tracing::info!("Moving {} to {}", src.display(), dst.display());
    fs::rename(src, dst)
}
