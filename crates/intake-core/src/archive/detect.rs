//! Container type detection by extension and magic number.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{IntakeError, Result};

/// Number of leading bytes sniffed for magic-number detection. Large enough
/// to reach the ustar marker at offset 257 of a tar header.
const SNIFF_LEN: usize = 512;

/// Recognized container types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveType {
    /// ZIP archive.
    Zip,
    /// 7z archive.
    #[serde(rename = "7z")]
    SevenZ,
    /// Uncompressed tar archive.
    Tar,
    /// Gzip-compressed tar archive.
    TarGz,
    /// Bzip2-compressed tar archive.
    TarBz2,
    /// XZ-compressed tar archive.
    TarXz,
    /// Zstd-compressed tar archive.
    TarZst,
    /// Gzip-compressed single file.
    Gzip,
    /// Bzip2-compressed single file.
    Bzip2,
    /// XZ-compressed single file.
    Xz,
    /// Zstd-compressed single file.
    Zstd,
}

impl ArchiveType {
    /// Returns the lowercase type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZ => "7z",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Returns `true` for single-file compression wrappers.
    #[must_use]
    pub const fn is_single_file(self) -> bool {
        matches!(self, Self::Gzip | Self::Bzip2 | Self::Xz | Self::Zstd)
    }
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves a container type from the file name alone.
pub(crate) fn from_extension(path: &Path) -> Option<ArchiveType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let has_tar_stem = path
        .file_stem()
        .is_some_and(|stem| stem.to_string_lossy().to_ascii_lowercase().ends_with(".tar"));

    let archive_type = match ext.as_str() {
        "zip" => ArchiveType::Zip,
        "7z" => ArchiveType::SevenZ,
        "tar" => ArchiveType::Tar,
        "tgz" => ArchiveType::TarGz,
        "tbz" | "tbz2" => ArchiveType::TarBz2,
        "txz" => ArchiveType::TarXz,
        "tzst" => ArchiveType::TarZst,
        "gz" if has_tar_stem => ArchiveType::TarGz,
        "gz" => ArchiveType::Gzip,
        "bz2" if has_tar_stem => ArchiveType::TarBz2,
        "bz2" => ArchiveType::Bzip2,
        "xz" if has_tar_stem => ArchiveType::TarXz,
        "xz" => ArchiveType::Xz,
        "zst" if has_tar_stem => ArchiveType::TarZst,
        "zst" => ArchiveType::Zstd,
        _ => return None,
    };
    Some(archive_type)
}

/// Resolves a container type from leading file bytes.
///
/// Compression wrappers detected by magic alone map to their single-file
/// variants; a gzipped tar without an extension is found by the recursion
/// pass once the inner tar surfaces.
pub(crate) fn sniff_magic(header: &[u8]) -> Option<ArchiveType> {
    if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
        return Some(ArchiveType::Zip);
    }
    if header.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
        return Some(ArchiveType::SevenZ);
    }
    if header.starts_with(&[0x1F, 0x8B]) {
        return Some(ArchiveType::Gzip);
    }
    if header.starts_with(b"BZ") {
        return Some(ArchiveType::Bzip2);
    }
    if header.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
        return Some(ArchiveType::Xz);
    }
    if header.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
        return Some(ArchiveType::Zstd);
    }
    if header.windows(5).any(|window| window == b"ustar") {
        return Some(ArchiveType::Tar);
    }
    None
}

/// Detects the container type of a file, extension first, magic second.
pub(crate) fn detect_archive_type(path: &Path) -> Result<ArchiveType> {
    if let Some(archive_type) = from_extension(path) {
        return Ok(archive_type);
    }
    let mut header = [0_u8; SNIFF_LEN];
    let mut file = File::open(path)?;
    let mut filled = 0;
    loop {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == SNIFF_LEN {
            break;
        }
    }
    sniff_magic(&header[..filled]).ok_or_else(|| IntakeError::UnsupportedFormat {
        path: path.to_path_buf(),
    })
}

/// Non-failing probe used by the recursion pass: unreadable or unrecognized
/// files simply do not count as archives.
pub(crate) fn probe_archive_type(path: &Path) -> Option<ArchiveType> {
    detect_archive_type(path).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extension_detection() {
        assert_eq!(from_extension(Path::new("a.zip")), Some(ArchiveType::Zip));
        assert_eq!(from_extension(Path::new("a.7z")), Some(ArchiveType::SevenZ));
        assert_eq!(from_extension(Path::new("a.tar")), Some(ArchiveType::Tar));
        assert_eq!(from_extension(Path::new("a.tgz")), Some(ArchiveType::TarGz));
        assert_eq!(from_extension(Path::new("a.tar.gz")), Some(ArchiveType::TarGz));
        assert_eq!(from_extension(Path::new("a.tar.bz2")), Some(ArchiveType::TarBz2));
        assert_eq!(from_extension(Path::new("a.tbz2")), Some(ArchiveType::TarBz2));
        assert_eq!(from_extension(Path::new("a.tar.zst")), Some(ArchiveType::TarZst));
        assert_eq!(from_extension(Path::new("notes.gz")), Some(ArchiveType::Gzip));
        assert_eq!(from_extension(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(from_extension(Path::new("A.ZIP")), Some(ArchiveType::Zip));
        assert_eq!(from_extension(Path::new("A.TAR.GZ")), Some(ArchiveType::TarGz));
    }

    #[test]
    fn test_magic_detection() {
        assert_eq!(sniff_magic(b"PK\x03\x04rest"), Some(ArchiveType::Zip));
        assert_eq!(sniff_magic(b"PK\x05\x06"), Some(ArchiveType::Zip));
        assert_eq!(sniff_magic(&[0x1F, 0x8B, 0x08]), Some(ArchiveType::Gzip));
        assert_eq!(sniff_magic(b"BZh91AY"), Some(ArchiveType::Bzip2));
        assert_eq!(
            sniff_magic(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0x00]),
            Some(ArchiveType::SevenZ)
        );
        assert_eq!(
            sniff_magic(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]),
            Some(ArchiveType::Xz)
        );
        assert_eq!(sniff_magic(&[0x28, 0xB5, 0x2F, 0xFD]), Some(ArchiveType::Zstd));
        assert_eq!(sniff_magic(b"plain text"), None);
    }

    #[test]
    fn test_magic_detects_tar_marker() {
        let mut header = vec![0_u8; 512];
        header[257..262].copy_from_slice(b"ustar");
        assert_eq!(sniff_magic(&header), Some(ArchiveType::Tar));
    }

    #[test]
    fn test_detect_falls_back_to_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_extension");
        std::fs::write(&path, b"PK\x03\x04content").unwrap();
        assert_eq!(detect_archive_type(&path).unwrap(), ArchiveType::Zip);
    }

    #[test]
    fn test_detect_unknown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery");
        std::fs::write(&path, b"nothing recognizable here").unwrap();
        let err = detect_archive_type(&path).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat { path } if path.ends_with("mystery")));
    }

    #[test]
    fn test_probe_swallows_errors() {
        assert_eq!(probe_archive_type(&PathBuf::from("/nonexistent/file")), None);
    }
}
