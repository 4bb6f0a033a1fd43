//! Test helpers for building archives in memory.
//!
//! Used by the unit tests in this crate and by the integration tests under
//! `tests/`. Everything here panics on I/O errors; the helpers exist for
//! test code only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::{Cursor, Write};
use std::path::Path;

/// Builder for ZIP test archives.
///
/// # Examples
///
/// ```
/// use intake_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .file("file.txt", b"content")
///     .directory("dir/")
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn options() -> zip::write::SimpleFileOptions {
        zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644)
    }

    /// Adds a regular file stored uncompressed.
    #[must_use]
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.zip.start_file(path, Self::options()).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a deflate-compressed file, for expansion-ratio tests.
    #[must_use]
    pub fn deflated_file(mut self, path: &str, data: &[u8]) -> Self {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a file under a raw, unsanitized member name.
    ///
    /// The zip writer records whatever name it is given, so this is how the
    /// traversal tests plant `../`-style members.
    #[must_use]
    pub fn raw_name_file(mut self, name: &str, data: &[u8]) -> Self {
        self.zip.start_file(name, Self::options()).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory entry.
    #[must_use]
    pub fn directory(mut self, path: &str) -> Self {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Adds a symlink entry (stored as a file with the link mode bits).
    ///
    /// `unix_permissions` masks away the file-type bits, so the writer's
    /// dedicated symlink API is the only way to record the link mode.
    #[must_use]
    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let options = zip::write::SimpleFileOptions::default();
        self.zip.add_symlink(path, target, options).unwrap();
        self
    }

    /// Returns the archive bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }

    /// Writes the archive to `path`.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for TAR test archives.
///
/// # Examples
///
/// ```
/// use intake_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .file("file.txt", b"content")
///     .symlink("link", "file.txt")
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file.
    ///
    /// `set_path` refuses `..` components, so hostile names are written
    /// straight into the header bytes; the traversal tests depend on that.
    #[must_use]
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        if header.set_path(path).is_err() {
            header.as_old_mut().name[..path.len()].copy_from_slice(path.as_bytes());
        }
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn directory(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a symlink.
    #[must_use]
    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Adds a hardlink.
    #[must_use]
    pub fn hardlink(mut self, path: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Link);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Returns the archive bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    /// Writes the archive to `path`.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Gzip-compresses `data`.
#[must_use]
pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Writes a `.tar.gz` archive holding `entries` to `path`.
pub fn tar_gz_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let mut builder = TarTestBuilder::new();
    for (name, data) in entries {
        builder = builder.file(name, data);
    }
    std::fs::write(path, gzip_bytes(&builder.build())).unwrap();
}

/// Hand-crafted stored ZIP whose single member has the encryption flag set.
///
/// The zip writer cannot produce encrypted members without extra features,
/// so the headers are laid out by hand: one local file header, one central
/// directory record, one end-of-central-directory record. The "encrypted"
/// payload is junk; readers flag the member from the header bit alone.
#[must_use]
pub fn encrypted_zip_bytes() -> Vec<u8> {
    const NAME: &[u8] = b"secret.txt";
    // 12-byte ZipCrypto header plus 4 payload bytes.
    const PAYLOAD: [u8; 16] = [0xAA; 16];

    let mut out = Vec::new();
    let push_u16 = |out: &mut Vec<u8>, v: u16| out.extend_from_slice(&v.to_le_bytes());
    let push_u32 = |out: &mut Vec<u8>, v: u32| out.extend_from_slice(&v.to_le_bytes());

    // Local file header.
    push_u32(&mut out, 0x0403_4B50);
    push_u16(&mut out, 20); // version needed
    push_u16(&mut out, 0x0001); // flags: encrypted
    push_u16(&mut out, 0); // method: stored
    push_u32(&mut out, 0); // mod time/date
    push_u32(&mut out, 0); // crc32
    push_u32(&mut out, PAYLOAD.len() as u32); // compressed size
    push_u32(&mut out, 4); // uncompressed size
    push_u16(&mut out, NAME.len() as u16);
    push_u16(&mut out, 0); // extra len
    out.extend_from_slice(NAME);
    out.extend_from_slice(&PAYLOAD);

    let central_offset = out.len() as u32;

    // Central directory record.
    push_u32(&mut out, 0x0201_4B50);
    push_u16(&mut out, 20); // version made by
    push_u16(&mut out, 20); // version needed
    push_u16(&mut out, 0x0001);
    push_u16(&mut out, 0);
    push_u32(&mut out, 0);
    push_u32(&mut out, 0);
    push_u32(&mut out, PAYLOAD.len() as u32);
    push_u32(&mut out, 4);
    push_u16(&mut out, NAME.len() as u16);
    push_u16(&mut out, 0); // extra len
    push_u16(&mut out, 0); // comment len
    push_u16(&mut out, 0); // disk start
    push_u16(&mut out, 0); // internal attrs
    push_u32(&mut out, 0); // external attrs
    push_u32(&mut out, 0); // local header offset
    out.extend_from_slice(NAME);

    let central_size = out.len() as u32 - central_offset;

    // End of central directory.
    push_u32(&mut out, 0x0605_4B50);
    push_u16(&mut out, 0);
    push_u16(&mut out, 0);
    push_u16(&mut out, 1);
    push_u16(&mut out, 1);
    push_u32(&mut out, central_size);
    push_u32(&mut out, central_offset);
    push_u16(&mut out, 0); // comment len

    out
}
