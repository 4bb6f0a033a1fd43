//! Per-category deep checks.
//!
//! Each check takes a sniffed file and returns the issues it found, or an
//! error when the file could not be inspected at all. The validator treats
//! a check error as a finding in its own right, never as a pass.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::archive::sniff_magic;
use crate::config::PipelineConfig;
use crate::error::{IntakeError, Result};
use crate::format::FileFormat;

/// Bytes read from the head of a file for marker scans.
const HEAD_SCAN_LEN: usize = 8192;

/// Pixel-count ceiling for declared image dimensions. A PNG header claiming
/// more pixels than this is treated as a decompression bomb shape.
const MAX_DECLARED_PIXELS: u64 = 500_000_000;

/// OLE compound-file magic (legacy office documents).
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

fn read_head(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut head = vec![0_u8; HEAD_SCAN_LEN];
    let mut filled = 0;
    loop {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == head.len() {
            break;
        }
    }
    head.truncate(filled);
    Ok(head)
}

/// Archive deep check: encrypted members, member-count blowups, declared
/// expansion ratios, and nested archives.
///
/// Only zip carries enough header structure for a cheap full scan; gzip
/// exposes its declared uncompressed size in the trailer. Other container
/// types pass here and are bounded by the extraction budgets instead.
pub(super) fn check_archive(path: &Path, format: FileFormat, config: &PipelineConfig) -> Result<Vec<String>> {
    match format {
        FileFormat::Zip => check_zip(path, config),
        FileFormat::Gzip | FileFormat::TarGz => check_gzip_ratio(path, config),
        _ => Ok(Vec::new()),
    }
}

fn check_zip(path: &Path, config: &PipelineConfig) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| IntakeError::extraction("zip", err))?;

    let mut issues = Vec::new();
    if archive.len() > config.max_batch_size {
        issues.push(format!(
            "archive declares {} members, more than the batch limit of {}",
            archive.len(),
            config.max_batch_size
        ));
    }

    let mut compressed_total: u64 = 0;
    let mut uncompressed_total: u64 = 0;
    let mut encrypted = 0_usize;
    let mut nested = 0_usize;
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|err| IntakeError::extraction("zip", err))?;
        compressed_total = compressed_total.saturating_add(entry.compressed_size());
        uncompressed_total = uncompressed_total.saturating_add(entry.size());
        if entry.encrypted() {
            encrypted += 1;
        }
        if !entry.is_dir() && FileFormat::from_path(Path::new(entry.name())).is_some_and(FileFormat::is_container) {
            nested += 1;
        }
    }

    if encrypted > 0 {
        issues.push(format!("archive contains {encrypted} encrypted member(s)"));
    }
    if nested > 0 {
        issues.push(format!("archive contains {nested} nested archive(s)"));
    }
    if compressed_total > 0 {
        let ratio = uncompressed_total as f64 / compressed_total as f64;
        if ratio > config.max_expansion_ratio {
            issues.push(format!(
                "declared expansion ratio {ratio:.1} exceeds the ceiling of {:.1}",
                config.max_expansion_ratio
            ));
        }
    }
    Ok(issues)
}

/// Compares the gzip ISIZE trailer against the on-disk size.
///
/// ISIZE is modulo 2^32, so a truly huge stream can understate itself; the
/// extraction byte budget is the hard stop, this is the early warning.
fn check_gzip_ratio(path: &Path, config: &PipelineConfig) -> Result<Vec<String>> {
    let meta = std::fs::metadata(path)?;
    if meta.len() < 18 {
        // Too small to hold a gzip header and trailer.
        return Ok(Vec::new());
    }
    let mut file = File::open(path)?;
    use std::io::Seek;
    file.seek(std::io::SeekFrom::End(-4))?;
    let mut trailer = [0_u8; 4];
    file.read_exact(&mut trailer)?;
    let declared = u64::from(u32::from_le_bytes(trailer));

    let ratio = declared as f64 / meta.len() as f64;
    if ratio > config.max_expansion_ratio {
        return Ok(vec![format!(
            "declared expansion ratio {ratio:.1} exceeds the ceiling of {:.1}",
            config.max_expansion_ratio
        )]);
    }
    Ok(Vec::new())
}

/// Document deep check: macro-enabled formats, PDF active-content markers,
/// and OLE payloads hiding under a non-OLE extension.
pub(super) fn check_document(path: &Path, format: FileFormat) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    if matches!(format, FileFormat::Docm | FileFormat::Xlsm | FileFormat::Pptm) {
        issues.push(format!("macro-enabled document format: {format}"));
    }

    let head = read_head(path)?;
    if format == FileFormat::Pdf {
        for marker in [&b"/JavaScript"[..], b"/Launch", b"/OpenAction"] {
            if head.windows(marker.len()).any(|window| window == marker) {
                issues.push(format!(
                    "PDF contains active content marker {}",
                    String::from_utf8_lossy(marker)
                ));
            }
        }
    }

    let is_ole_format = matches!(format, FileFormat::Doc | FileFormat::Xls | FileFormat::Ppt);
    if !is_ole_format && head.starts_with(&OLE_MAGIC) {
        issues.push(format!("OLE compound file disguised under a {format} extension"));
    }
    Ok(issues)
}

/// Image deep check: header/extension mismatch and declared-dimension bombs.
pub(super) fn check_image(path: &Path, format: FileFormat) -> Result<Vec<String>> {
    // SVG is text; header sniffing does not apply.
    if format == FileFormat::Svg {
        return Ok(Vec::new());
    }
    let head = read_head(path)?;
    let mut issues = Vec::new();

    if let Some(actual) = sniff_image(&head) {
        if actual != format {
            issues.push(format!("file header is {actual} but the extension says {format}"));
        }
    } else if sniff_magic(&head).is_some() {
        issues.push(format!("archive payload disguised under a {format} extension"));
    }

    if let Some(pixels) = declared_pixels(&head) {
        if pixels > MAX_DECLARED_PIXELS {
            issues.push(format!(
                "declared dimensions cover {pixels} pixels, more than the {MAX_DECLARED_PIXELS} ceiling"
            ));
        }
    }
    Ok(issues)
}

/// Video deep check: header/extension mismatch.
pub(super) fn check_video(path: &Path, format: FileFormat) -> Result<Vec<String>> {
    let head = read_head(path)?;
    let mut issues = Vec::new();
    if let Some(actual) = sniff_video(&head) {
        if actual != format {
            issues.push(format!("file header is {actual} but the extension says {format}"));
        }
    } else if sniff_magic(&head).is_some() {
        issues.push(format!("archive payload disguised under a {format} extension"));
    }
    Ok(issues)
}

/// Audio deep check: header/extension mismatch.
pub(super) fn check_audio(path: &Path, format: FileFormat) -> Result<Vec<String>> {
    let head = read_head(path)?;
    let mut issues = Vec::new();
    if let Some(actual) = sniff_audio(&head) {
        if actual != format {
            issues.push(format!("file header is {actual} but the extension says {format}"));
        }
    } else if sniff_magic(&head).is_some() {
        issues.push(format!("archive payload disguised under a {format} extension"));
    }
    Ok(issues)
}

fn sniff_image(head: &[u8]) -> Option<FileFormat> {
    if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(FileFormat::Png);
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(FileFormat::Jpeg);
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return Some(FileFormat::Gif);
    }
    if head.starts_with(b"BM") {
        return Some(FileFormat::Bmp);
    }
    if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        return Some(FileFormat::Tiff);
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        return Some(FileFormat::Webp);
    }
    None
}

fn sniff_video(head: &[u8]) -> Option<FileFormat> {
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some(FileFormat::Mp4);
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"AVI " {
        return Some(FileFormat::Avi);
    }
    if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        // EBML covers both Matroska and WebM; either is a header match.
        return Some(FileFormat::Mkv);
    }
    None
}

fn sniff_audio(head: &[u8]) -> Option<FileFormat> {
    if head.starts_with(b"ID3") {
        return Some(FileFormat::Mp3);
    }
    if head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0 {
        return Some(FileFormat::Mp3);
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WAVE" {
        return Some(FileFormat::Wav);
    }
    if head.starts_with(b"fLaC") {
        return Some(FileFormat::Flac);
    }
    if head.starts_with(b"OggS") {
        return Some(FileFormat::Ogg);
    }
    None
}

/// Pixel count declared by a PNG IHDR or GIF logical screen descriptor.
fn declared_pixels(head: &[u8]) -> Option<u64> {
    if head.starts_with(&[0x89, b'P', b'N', b'G']) && head.len() >= 24 {
        let width = u32::from_be_bytes([head[16], head[17], head[18], head[19]]);
        let height = u32::from_be_bytes([head[20], head[21], head[22], head[23]]);
        return Some(u64::from(width) * u64::from(height));
    }
    if (head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a")) && head.len() >= 10 {
        let width = u16::from_le_bytes([head[6], head[7]]);
        let height = u16::from_le_bytes([head[8], head[9]]);
        return Some(u64::from(width) * u64::from(height));
    }
    None
}
