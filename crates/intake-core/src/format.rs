//! File format registry and category resolution.
//!
//! Maps file extensions to a closed set of recognized formats and buckets
//! each format into the coarse category used for per-category size limits
//! and deep security checks.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Coarse format category used for size limits and deep checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatCategory {
    /// Plain and markup text.
    Text,
    /// Raster and vector images.
    Image,
    /// Audio streams.
    Audio,
    /// Video streams.
    Video,
    /// Documents and container formats.
    Application,
}

impl FormatCategory {
    /// Returns the lowercase category name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for FormatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Recognized input formats.
///
/// The registry is deliberately closed: a file whose extension maps to none
/// of these variants is treated as unrecognized and the security validator
/// fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// Plain text (.txt, .text, .log).
    PlainText,
    /// HTML markup.
    Html,
    /// Markdown markup.
    Markdown,
    /// Comma-separated values.
    Csv,
    /// JSON data.
    Json,
    /// XML data.
    Xml,
    /// Portable Document Format.
    Pdf,
    /// Word document (OOXML).
    Docx,
    /// Word document with macros enabled.
    Docm,
    /// Excel workbook (OOXML).
    Xlsx,
    /// Excel workbook with macros enabled.
    Xlsm,
    /// PowerPoint presentation (OOXML).
    Pptx,
    /// PowerPoint presentation with macros enabled.
    Pptm,
    /// Legacy Word document (OLE).
    Doc,
    /// Legacy Excel workbook (OLE).
    Xls,
    /// Legacy PowerPoint presentation (OLE).
    Ppt,
    /// Rich Text Format.
    Rtf,
    /// EPUB e-book.
    Epub,
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// GIF image.
    Gif,
    /// BMP image.
    Bmp,
    /// TIFF image.
    Tiff,
    /// WebP image.
    Webp,
    /// SVG image.
    Svg,
    /// MP3 audio.
    Mp3,
    /// WAV audio.
    Wav,
    /// FLAC audio.
    Flac,
    /// Ogg audio.
    Ogg,
    /// M4A audio.
    M4a,
    /// MP4 video.
    Mp4,
    /// AVI video.
    Avi,
    /// Matroska video.
    Mkv,
    /// QuickTime video.
    Mov,
    /// WebM video.
    Webm,
    /// ZIP archive.
    Zip,
    /// 7z archive.
    SevenZ,
    /// Tar archive (uncompressed).
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

impl FileFormat {
    /// Resolves a format from a bare extension (without the leading dot).
    ///
    /// Matching is case-insensitive. Compound tar extensions (`.tar.gz`)
    /// cannot be resolved from the final extension alone; use
    /// [`FileFormat::from_path`] for those.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_ascii_lowercase();
        let format = match ext.as_str() {
            "txt" | "text" | "log" => Self::PlainText,
            "html" | "htm" => Self::Html,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "docm" => Self::Docm,
            "xlsx" => Self::Xlsx,
            "xlsm" => Self::Xlsm,
            "pptx" => Self::Pptx,
            "pptm" => Self::Pptm,
            "doc" => Self::Doc,
            "xls" => Self::Xls,
            "ppt" => Self::Ppt,
            "rtf" => Self::Rtf,
            "epub" => Self::Epub,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "svg" => Self::Svg,
            "mp3" => Self::Mp3,
            "wav" => Self::Wav,
            "flac" => Self::Flac,
            "ogg" => Self::Ogg,
            "m4a" => Self::M4a,
            "mp4" => Self::Mp4,
            "avi" => Self::Avi,
            "mkv" => Self::Mkv,
            "mov" => Self::Mov,
            "webm" => Self::Webm,
            "zip" => Self::Zip,
            "7z" => Self::SevenZ,
            "tar" => Self::Tar,
            "tgz" => Self::TarGz,
            "tbz" | "tbz2" => Self::TarBz2,
            "txz" => Self::TarXz,
            "tzst" => Self::TarZst,
            "gz" => Self::Gzip,
            "bz2" => Self::Bzip2,
            "xz" => Self::Xz,
            "zst" => Self::Zstd,
            _ => return None,
        };
        Some(format)
    }

    /// Resolves a format from a file path.
    ///
    /// Compound tar extensions are recognized by inspecting the file stem:
    /// `archive.tar.gz` resolves to [`FileFormat::TarGz`] rather than
    /// [`FileFormat::Gzip`].
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|e| e.to_str())?;
        let format = Self::from_extension(extension)?;

        let has_tar_stem = path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().to_ascii_lowercase().ends_with(".tar"));
        if has_tar_stem {
            let compound = match format {
                Self::Gzip => Some(Self::TarGz),
                Self::Bzip2 => Some(Self::TarBz2),
                Self::Xz => Some(Self::TarXz),
                Self::Zstd => Some(Self::TarZst),
                _ => None,
            };
            if let Some(compound) = compound {
                return Some(compound);
            }
        }
        Some(format)
    }

    /// Returns the category this format belongs to.
    #[must_use]
    pub const fn category(self) -> FormatCategory {
        match self {
            Self::PlainText | Self::Html | Self::Markdown | Self::Csv | Self::Json | Self::Xml => {
                FormatCategory::Text
            }
            Self::Png
            | Self::Jpeg
            | Self::Gif
            | Self::Bmp
            | Self::Tiff
            | Self::Webp
            | Self::Svg => FormatCategory::Image,
            Self::Mp3 | Self::Wav | Self::Flac | Self::Ogg | Self::M4a => FormatCategory::Audio,
            Self::Mp4 | Self::Avi | Self::Mkv | Self::Mov | Self::Webm => FormatCategory::Video,
            _ => FormatCategory::Application,
        }
    }

    /// Returns `true` for formats that bundle other files.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Zip
                | Self::SevenZ
                | Self::Tar
                | Self::TarGz
                | Self::TarBz2
                | Self::TarXz
                | Self::TarZst
                | Self::Gzip
                | Self::Bzip2
                | Self::Xz
                | Self::Zstd
        )
    }

    /// Returns `true` for document formats (PDF, office, e-book).
    #[must_use]
    pub const fn is_document(self) -> bool {
        matches!(
            self,
            Self::Pdf
                | Self::Docx
                | Self::Docm
                | Self::Xlsx
                | Self::Xlsm
                | Self::Pptx
                | Self::Pptm
                | Self::Doc
                | Self::Xls
                | Self::Ppt
                | Self::Rtf
                | Self::Epub
        )
    }

    /// Returns a lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Docm => "docm",
            Self::Xlsx => "xlsx",
            Self::Xlsm => "xlsm",
            Self::Pptx => "pptx",
            Self::Pptm => "pptm",
            Self::Doc => "doc",
            Self::Xls => "xls",
            Self::Ppt => "ppt",
            Self::Rtf => "rtf",
            Self::Epub => "epub",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Svg => "svg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
            Self::Mp4 => "mp4",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Mov => "mov",
            Self::Webm => "webm",
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
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_extension() {
        assert_eq!(FileFormat::from_extension("txt"), Some(FileFormat::PlainText));
        assert_eq!(FileFormat::from_extension("PDF"), Some(FileFormat::Pdf));
        assert_eq!(FileFormat::from_extension("jpeg"), Some(FileFormat::Jpeg));
        assert_eq!(FileFormat::from_extension("7z"), Some(FileFormat::SevenZ));
        assert_eq!(FileFormat::from_extension("unknown"), None);
    }

    #[test]
    fn test_from_path_compound_tar() {
        let path = PathBuf::from("archive.tar.gz");
        assert_eq!(FileFormat::from_path(&path), Some(FileFormat::TarGz));

        let path = PathBuf::from("archive.tar.bz2");
        assert_eq!(FileFormat::from_path(&path), Some(FileFormat::TarBz2));

        let path = PathBuf::from("archive.tgz");
        assert_eq!(FileFormat::from_path(&path), Some(FileFormat::TarGz));

        // A bare .gz without a .tar stem stays gzip
        let path = PathBuf::from("data.txt.gz");
        assert_eq!(FileFormat::from_path(&path), Some(FileFormat::Gzip));
    }

    #[test]
    fn test_from_path_no_extension() {
        let path = PathBuf::from("README");
        assert_eq!(FileFormat::from_path(&path), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(FileFormat::PlainText.category(), FormatCategory::Text);
        assert_eq!(FileFormat::Png.category(), FormatCategory::Image);
        assert_eq!(FileFormat::Mp3.category(), FormatCategory::Audio);
        assert_eq!(FileFormat::Mkv.category(), FormatCategory::Video);
        assert_eq!(FileFormat::Pdf.category(), FormatCategory::Application);
        assert_eq!(FileFormat::Zip.category(), FormatCategory::Application);
    }

    #[test]
    fn test_is_container() {
        assert!(FileFormat::Zip.is_container());
        assert!(FileFormat::TarGz.is_container());
        assert!(FileFormat::Gzip.is_container());
        assert!(!FileFormat::Pdf.is_container());
        assert!(!FileFormat::PlainText.is_container());
    }

    #[test]
    fn test_is_document() {
        assert!(FileFormat::Pdf.is_document());
        assert!(FileFormat::Docm.is_document());
        assert!(!FileFormat::Png.is_document());
        assert!(!FileFormat::Zip.is_document());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FileFormat::SevenZ.to_string(), "7z");
        assert_eq!(FileFormat::TarGz.to_string(), "tar.gz");
        assert_eq!(FormatCategory::Application.to_string(), "application");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&FileFormat::PlainText).unwrap();
        assert_eq!(json, "\"plain_text\"");
        let back: FileFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FileFormat::PlainText);
    }
}
