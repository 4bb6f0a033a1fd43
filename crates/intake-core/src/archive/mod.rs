//! Recursive archive expansion into scratch space.
//!
//! Extraction streams every member through a byte budget shared across the
//! whole expansion, resolves member names against the scratch root before
//! any write, and tolerates nested-archive failures by keeping the offending
//! file unexpanded so a later validation pass can reject it.

mod budget;
mod detect;
mod entry;
mod scratch;

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::Serialize;
use sevenz_rust2::{Archive, Password};
use xz2::read::XzDecoder;

use crate::config::PipelineConfig;
use crate::copy::{CopyBuffer, CopyRead};
use crate::error::{IntakeError, Result};

use budget::ExtractionBudget;

pub use detect::ArchiveType;
pub(crate) use detect::{detect_archive_type, probe_archive_type, sniff_magic};
pub use scratch::ScratchDir;

/// Archive member skipped for safety rather than extracted.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMember {
    /// Member name as recorded in the archive.
    pub name: String,
    /// Why the member was not extracted.
    pub reason: String,
}

/// Nested archive that failed to expand and was kept as a file.
#[derive(Debug, Clone, Serialize)]
pub struct NestedFailure {
    /// Path of the archive file inside the scratch tree.
    pub path: PathBuf,
    /// Rendered failure reason.
    pub error: String,
}

/// Result of expanding one archive.
#[derive(Debug, Serialize)]
pub struct ArchiveExtraction {
    /// Extracted regular files, in codec listing order. Successfully
    /// expanded nested archives are replaced by their children.
    pub extracted_files: Vec<PathBuf>,
    /// Bytes written during extraction, including nested archives that were
    /// later replaced by their children.
    pub total_size: u64,
    /// Detected container type of the root archive.
    pub archive_type: ArchiveType,
    /// Members skipped for safety (traversal, links, special files).
    pub skipped_members: Vec<SkippedMember>,
    /// Nested archives kept unexpanded after a failed expansion.
    pub nested_failures: Vec<NestedFailure>,
    #[serde(skip)]
    scratch: ScratchDir,
}

impl ArchiveExtraction {
    /// Canonical root of the scratch tree holding the extracted files.
    #[must_use]
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Keeps the extracted tree on disk and returns its root.
    ///
    /// Without this call the tree is removed when the value drops.
    #[must_use]
    pub fn release(self) -> PathBuf {
        self.scratch.release()
    }
}

#[derive(Debug, Default)]
struct Outcome {
    files: Vec<PathBuf>,
    skipped: Vec<SkippedMember>,
    nested_failures: Vec<NestedFailure>,
}

impl Outcome {
    fn skip(&mut self, name: &str, reason: &str) {
        tracing::debug!(member = name, reason, "skipping archive member");
        self.skipped.push(SkippedMember {
            name: name.to_owned(),
            reason: reason.to_owned(),
        });
    }
}

/// Expands archives with containment, budgets, and bounded recursion.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    config: Arc<PipelineConfig>,
}

impl ArchiveExtractor {
    /// Creates an extractor bound to a configuration.
    #[must_use]
    pub const fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Expands `archive` into a fresh scratch directory.
    ///
    /// With `recursive` set, extracted files that themselves look like
    /// archives are expanded in place until `max_depth` nested expansions
    /// have run; anything deeper stays on disk as an ordinary file. A nested
    /// archive that fails to expand is kept as-is and recorded in
    /// [`ArchiveExtraction::nested_failures`] instead of failing the parent.
    ///
    /// # Errors
    ///
    /// Fails with [`IntakeError::NotFound`] when the source is missing,
    /// [`IntakeError::UnsupportedFormat`] when neither extension nor magic
    /// bytes identify a container, [`IntakeError::SizeExceeded`] when the
    /// root archive breaks the file-count or byte budget, and
    /// [`IntakeError::ExtractionFailed`] for codec-level failures. On any
    /// error the scratch directory is removed before the error propagates.
    pub fn extract(&self, archive: &Path, recursive: bool) -> Result<ArchiveExtraction> {
        if !archive.exists() {
            return Err(IntakeError::NotFound {
                path: archive.to_path_buf(),
            });
        }
        let archive_type = detect_archive_type(archive)?;
        let scratch = ScratchDir::new()?;
        let mut budget = ExtractionBudget::new(
            self.config.max_batch_size,
            self.config.max_size_bytes(),
            self.config.max_file_size_bytes(),
        );
        let mut outcome = Outcome::default();
        let depth = if recursive { self.config.max_depth } else { 0 };

        extract_into(archive, archive_type, scratch.path(), &mut budget, &mut outcome, depth)?;

        tracing::debug!(
            archive = %archive.display(),
            archive_type = %archive_type,
            files = outcome.files.len(),
            total_bytes = budget.total_bytes(),
            skipped = outcome.skipped.len(),
            "extraction complete"
        );
        Ok(ArchiveExtraction {
            extracted_files: outcome.files,
            total_size: budget.total_bytes(),
            archive_type,
            skipped_members: outcome.skipped,
            nested_failures: outcome.nested_failures,
            scratch,
        })
    }
}

/// Extracts one archive into `dest`, then expands any nested archives among
/// the files it produced while `remaining_depth` allows.
fn extract_into(
    archive: &Path,
    archive_type: ArchiveType,
    dest: &Path,
    budget: &mut ExtractionBudget,
    outcome: &mut Outcome,
    remaining_depth: usize,
) -> Result<()> {
    let start = outcome.files.len();
    match archive_type {
        ArchiveType::Zip => extract_zip(archive, dest, budget, outcome)?,
        ArchiveType::SevenZ => extract_sevenz(archive, dest, budget, outcome)?,
        ArchiveType::Tar => extract_tar(File::open(archive)?, dest, budget, outcome)?,
        ArchiveType::TarGz => {
            extract_tar(GzDecoder::new(File::open(archive)?), dest, budget, outcome)?;
        }
        ArchiveType::TarBz2 => {
            extract_tar(BzDecoder::new(File::open(archive)?), dest, budget, outcome)?;
        }
        ArchiveType::TarXz => {
            extract_tar(XzDecoder::new(File::open(archive)?), dest, budget, outcome)?;
        }
        ArchiveType::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(File::open(archive)?)?;
            extract_tar(decoder, dest, budget, outcome)?;
        }
        ArchiveType::Gzip => {
            extract_single(GzDecoder::new(File::open(archive)?), archive, dest, budget, outcome)?;
        }
        ArchiveType::Bzip2 => {
            extract_single(BzDecoder::new(File::open(archive)?), archive, dest, budget, outcome)?;
        }
        ArchiveType::Xz => {
            extract_single(XzDecoder::new(File::open(archive)?), archive, dest, budget, outcome)?;
        }
        ArchiveType::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(File::open(archive)?)?;
            extract_single(decoder, archive, dest, budget, outcome)?;
        }
    }

    if remaining_depth == 0 {
        return Ok(());
    }

    let produced: Vec<PathBuf> = outcome.files[start..].to_vec();
    for file in produced {
        let Some(nested_type) = probe_archive_type(&file) else {
            continue;
        };
        let nested_dest = nested_dir(&file);
        let files_mark = outcome.files.len();
        let skipped_mark = outcome.skipped.len();
        let failures_mark = outcome.nested_failures.len();

        let attempt = fs::create_dir_all(&nested_dest)
            .map_err(IntakeError::from)
            .and_then(|()| {
                extract_into(&file, nested_type, &nested_dest, budget, outcome, remaining_depth - 1)
            });
        match attempt {
            Ok(()) => {
                // Children replace the expanded archive file.
                outcome.files.retain(|path| path != &file);
                let _ = fs::remove_file(&file);
            }
            Err(err) => {
                tracing::warn!(
                    archive = %file.display(),
                    error = %err,
                    "nested extraction failed, keeping archive member as a file"
                );
                // Collapse partial output of the failed subtree into a
                // single failure record; budget charges are not refunded.
                outcome.files.truncate(files_mark);
                outcome.skipped.truncate(skipped_mark);
                outcome.nested_failures.truncate(failures_mark);
                let _ = fs::remove_dir_all(&nested_dest);
                outcome.nested_failures.push(NestedFailure {
                    path: file.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Sibling directory a nested archive expands into.
fn nested_dir(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map_or_else(|| "nested".to_owned(), |n| n.to_string_lossy().into_owned());
    archive.with_file_name(format!("{name}.d"))
}

/// Output name for a single-file compression wrapper.
fn output_name(archive: &Path) -> String {
    archive
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty() && stem != "." && stem != "..")
        .unwrap_or_else(|| "data".to_owned())
}

/// Streams one member to disk under the current allowance.
///
/// A member that still has input left once the allowance is filled is
/// removed again and converted into the budget's size error; lying size
/// headers therefore cannot smuggle oversized members through.
fn stream_member<R: Read + ?Sized>(
    reader: &mut R,
    candidate: &Path,
    budget: &mut ExtractionBudget,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    if let Some(parent) = candidate.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(candidate)?;
    match buffer.copy_limited(reader, &mut out, budget.file_allowance()) {
        Ok(CopyRead::Complete(written)) => {
            drop(out);
            budget.charge_bytes(written)?;
            Ok(written)
        }
        Ok(CopyRead::CapHit(written)) => {
            drop(out);
            let _ = fs::remove_file(candidate);
            Err(budget.allowance_error(written))
        }
        Err(err) => {
            drop(out);
            let _ = fs::remove_file(candidate);
            Err(err.into())
        }
    }
}

fn extract_zip(
    archive: &Path,
    dest: &Path,
    budget: &mut ExtractionBudget,
    outcome: &mut Outcome,
) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|err| IntakeError::extraction("zip", err))?;
    let mut buffer = CopyBuffer::new();

    for index in 0..zip.len() {
        // Raw access first so link and containment checks never decompress
        // the member.
        let (name, is_dir, is_symlink, encrypted) = {
            let entry = zip
                .by_index_raw(index)
                .map_err(|err| IntakeError::extraction("zip", err))?;
            let is_symlink = entry
                .unix_mode()
                .is_some_and(|mode| mode & 0o170_000 == 0o120_000);
            (entry.name().to_owned(), entry.is_dir(), is_symlink, entry.encrypted())
        };
        if encrypted {
            return Err(IntakeError::SecurityViolation {
                reason: format!("encrypted archive member: {name}"),
            });
        }
        if is_symlink {
            outcome.skip(&name, "symbolic link member");
            continue;
        }
        let candidate = match entry::resolve_member_path(dest, Path::new(&name)) {
            Ok(candidate) => candidate,
            Err(err) => {
                outcome.skip(&name, &err.to_string());
                continue;
            }
        };
        if is_dir {
            fs::create_dir_all(&candidate)?;
            continue;
        }
        budget.charge_file()?;
        let mut entry = zip
            .by_index(index)
            .map_err(|err| IntakeError::extraction("zip", err))?;
        stream_member(&mut entry, &candidate, budget, &mut buffer)?;
        outcome.files.push(candidate);
    }
    Ok(())
}

fn extract_tar<R: Read>(
    reader: R,
    dest: &Path,
    budget: &mut ExtractionBudget,
    outcome: &mut Outcome,
) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    let mut buffer = CopyBuffer::new();
    let entries = tar
        .entries()
        .map_err(|err| IntakeError::extraction("tar", err))?;

    for entry in entries {
        let mut entry = entry.map_err(|err| IntakeError::extraction("tar", err))?;
        let raw = entry
            .path()
            .map_err(|err| IntakeError::extraction("tar", err))?
            .into_owned();
        let name = raw.display().to_string();
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            outcome.skip(&name, "link member");
            continue;
        }
        let candidate = match entry::resolve_member_path(dest, &raw) {
            Ok(candidate) => candidate,
            Err(err) => {
                outcome.skip(&name, &err.to_string());
                continue;
            }
        };
        if entry_type.is_dir() {
            fs::create_dir_all(&candidate)?;
            continue;
        }
        if !entry_type.is_file() {
            outcome.skip(&name, "special member");
            continue;
        }
        budget.charge_file()?;
        stream_member(&mut entry, &candidate, budget, &mut buffer)?;
        outcome.files.push(candidate);
    }
    Ok(())
}

fn extract_sevenz(
    archive: &Path,
    dest: &Path,
    budget: &mut ExtractionBudget,
    outcome: &mut Outcome,
) -> Result<()> {
    let mut source = File::open(archive)?;
    // Header probe surfaces encrypted archives with a clear reason before
    // any member is touched.
    Archive::read(&mut source, &Password::empty()).map_err(classify_sevenz_error)?;
    source.rewind()?;

    // The callback must return the codec's error type; typed failures are
    // stashed here and extraction stops via `Ok(false)`.
    let failure: RefCell<Option<IntakeError>> = RefCell::new(None);
    let mut buffer = CopyBuffer::new();

    let result = {
        let budget = &mut *budget;
        let outcome = &mut *outcome;
        let failure = &failure;
        let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                          reader: &mut dyn Read,
                          _dest_dir: &PathBuf|
         -> std::result::Result<bool, sevenz_rust2::Error> {
            let name = entry.name.clone();
            let candidate = match entry::resolve_member_path(dest, Path::new(&name)) {
                Ok(candidate) => candidate,
                Err(err) => {
                    outcome.skip(&name, &err.to_string());
                    return Ok(true);
                }
            };
            if entry.is_directory() {
                if let Err(err) = fs::create_dir_all(&candidate) {
                    *failure.borrow_mut() = Some(err.into());
                    return Ok(false);
                }
                return Ok(true);
            }
            if let Err(err) = budget.charge_file() {
                *failure.borrow_mut() = Some(err);
                return Ok(false);
            }
            match stream_member(reader, &candidate, budget, &mut buffer) {
                Ok(_) => {
                    outcome.files.push(candidate);
                    Ok(true)
                }
                Err(err) => {
                    *failure.borrow_mut() = Some(err);
                    Ok(false)
                }
            }
        };
        sevenz_rust2::decompress_with_extract_fn(&mut source, dest, extract_fn)
    };

    if let Some(err) = failure.into_inner() {
        return Err(err);
    }
    result.map_err(classify_sevenz_error)?;
    Ok(())
}

fn extract_single<R: Read>(
    reader: R,
    source: &Path,
    dest: &Path,
    budget: &mut ExtractionBudget,
    outcome: &mut Outcome,
) -> Result<()> {
    let candidate = dest.join(output_name(source));
    budget.charge_file()?;
    let mut reader = reader;
    let mut buffer = CopyBuffer::new();
    stream_member(&mut reader, &candidate, budget, &mut buffer)?;
    outcome.files.push(candidate);
    Ok(())
}

fn classify_sevenz_error(err: sevenz_rust2::Error) -> IntakeError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        return IntakeError::SecurityViolation {
            reason: format!("encrypted archive: {text}"),
        };
    }
    IntakeError::extraction("7z", text)
}
