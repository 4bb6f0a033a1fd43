//! Per-file and batch orchestration of the safety gate.
//!
//! One [`FileTask`] flows through basic validation, the admission check,
//! security validation, archive expansion for containers, the external
//! content-extraction seam, and sanitization, producing one [`FileVerdict`].
//! Batches run on a semaphore-bounded worker pool with a per-task deadline.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::archive::{ArchiveExtraction, ArchiveExtractor, ArchiveType, ScratchDir};
use crate::config::{PipelineConfig, SecurityRules};
use crate::content::Content;
use crate::error::{IntakeError, Result};
use crate::format::FileFormat;
use crate::monitor::ResourceMonitor;
use crate::sanitize::{ContentSanitizer, RuleSet, SanitizedContent};
use crate::security::{SecurityResult, SecurityValidator};
use crate::validation::{FileValidator, ValidationResult};

/// Where a task's bytes come from.
#[derive(Debug, Clone)]
pub enum TaskSource {
    /// A file already on disk.
    Path(PathBuf),
    /// An in-memory buffer, spilled to scratch space before validation.
    Bytes {
        /// File name the buffer should be treated as having; drives format
        /// detection. Only the final path component is used.
        name: String,
        /// The raw bytes.
        data: Vec<u8>,
    },
}

/// One submission to the pipeline.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// The bytes to validate.
    pub source: TaskSource,
    /// Caller-asserted format, overriding extension detection.
    pub declared_format: Option<FileFormat>,
    /// Per-task configuration override.
    pub options: Option<Arc<PipelineConfig>>,
}

impl FileTask {
    /// Creates a task for a file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TaskSource::Path(path.into()),
            declared_format: None,
            options: None,
        }
    }

    /// Creates a task for an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            source: TaskSource::Bytes {
                name: name.into(),
                data,
            },
            declared_format: None,
            options: None,
        }
    }

    /// Asserts the format instead of relying on extension detection.
    #[must_use]
    pub const fn with_format(mut self, format: FileFormat) -> Self {
        self.declared_format = Some(format);
        self
    }

    /// Overrides the pipeline configuration for this task only.
    #[must_use]
    pub fn with_options(mut self, options: Arc<PipelineConfig>) -> Self {
        self.options = Some(options);
        self
    }

    /// Path used to identify this task in verdicts and logs.
    #[must_use]
    pub fn display_path(&self) -> PathBuf {
        match &self.source {
            TaskSource::Path(path) => path.clone(),
            TaskSource::Bytes { name, .. } => PathBuf::from(name),
        }
    }
}

/// Extracts text and metadata from an accepted file.
///
/// This is the seam to the format-specific extractors outside this crate.
/// The pipeline calls it only for files that passed both validators, and
/// passes its output through the sanitizer before returning it.
pub trait ContentExtractor: Send + Sync {
    /// Extracts content from `path`, which was validated as `format`.
    fn extract(&self, path: &Path, format: FileFormat) -> Result<Content>;
}

/// What happened to one archive expansion, kept for the verdict after the
/// scratch space is gone.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    /// Detected container type.
    pub archive_type: ArchiveType,
    /// Number of files the expansion produced.
    pub files: usize,
    /// Bytes written during expansion.
    pub total_size: u64,
    /// Members skipped for safety.
    pub skipped_members: Vec<String>,
    /// Nested archives kept unexpanded after a failed expansion.
    pub nested_failures: Vec<String>,
}

impl ExtractionSummary {
    fn from_extraction(extraction: &ArchiveExtraction) -> Self {
        Self {
            archive_type: extraction.archive_type,
            files: extraction.extracted_files.len(),
            total_size: extraction.total_size,
            skipped_members: extraction
                .skipped_members
                .iter()
                .map(|member| member.name.clone())
                .collect(),
            nested_failures: extraction
                .nested_failures
                .iter()
                .map(|failure| failure.path.display().to_string())
                .collect(),
        }
    }
}

/// The pipeline's decision about one file.
#[derive(Debug, Serialize)]
pub struct FileVerdict {
    /// The submitted path (or buffer name).
    pub path: PathBuf,
    /// Whether the file passed every gate it reached.
    pub accepted: bool,
    /// Basic validation outcome, when validation ran.
    pub validation: Option<ValidationResult>,
    /// Security assessment, when it ran.
    pub security: Option<SecurityResult>,
    /// Sanitized extracted content, when a content extractor is wired in.
    pub content: Option<SanitizedContent>,
    /// Archive expansion details for containers.
    pub extraction: Option<ExtractionSummary>,
    /// Verdicts for extracted archive members.
    pub children: Vec<FileVerdict>,
    /// Processing error, for tasks that failed outside the validators.
    pub error: Option<String>,
}

impl FileVerdict {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            accepted: false,
            validation: None,
            security: None,
            content: None,
            extraction: None,
            children: Vec::new(),
            error: None,
        }
    }

    fn failed(path: PathBuf, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path)
        }
    }

    /// Serializes the verdict for logging and telemetry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The validators and extractor for one configuration.
///
/// Bundled so a rule swap or per-task override replaces them wholesale;
/// in-flight work keeps the bundle it started with.
struct Stages {
    validator: FileValidator,
    security: SecurityValidator,
    extractor: ArchiveExtractor,
}

impl Stages {
    fn new(config: Arc<PipelineConfig>) -> Self {
        Self {
            validator: FileValidator::new(Arc::clone(&config)),
            security: SecurityValidator::new(Arc::clone(&config)),
            extractor: ArchiveExtractor::new(config),
        }
    }
}

/// Orchestrates the full safety gate per submitted file.
pub struct FileValidationPipeline {
    config: Arc<PipelineConfig>,
    stages: RwLock<Arc<Stages>>,
    sanitizer: Arc<ContentSanitizer>,
    monitor: ResourceMonitor,
    content_extractor: Option<Arc<dyn ContentExtractor>>,
}

impl std::fmt::Debug for FileValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileValidationPipeline")
            .field("config", &self.config)
            .field("has_content_extractor", &self.content_extractor.is_some())
            .finish_non_exhaustive()
    }
}

impl FileValidationPipeline {
    /// Creates a pipeline from a configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            stages: RwLock::new(Arc::new(Stages::new(Arc::clone(&config)))),
            sanitizer: Arc::new(ContentSanitizer::new(&config)),
            monitor: ResourceMonitor::new(Arc::clone(&config)),
            content_extractor: None,
            config,
        }
    }

    /// Wires in the external content extractor.
    #[must_use]
    pub fn with_content_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.content_extractor = Some(extractor);
        self
    }

    /// The pipeline's resource monitor.
    #[must_use]
    pub const fn monitor(&self) -> &ResourceMonitor {
        &self.monitor
    }

    /// Replaces the security rule toggles wholesale. Validations already in
    /// flight finish with the rules they started with.
    pub fn set_security_rules(&self, rules: SecurityRules) {
        let mut config = PipelineConfig::clone(&self.config);
        config.security_rules = rules;
        let stages = Arc::new(Stages::new(Arc::new(config)));
        let mut guard = self.stages.write().unwrap_or_else(PoisonError::into_inner);
        *guard = stages;
    }

    /// Replaces the sanitization rule set wholesale.
    pub fn set_sanitization_rules(&self, rules: RuleSet) {
        self.sanitizer.set_sanitization_rules(rules);
    }

    fn stages(&self) -> Arc<Stages> {
        let guard = self.stages.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Processes one task end-to-end: validate, admit, assess, expand if a
    /// container, extract content, sanitize.
    ///
    /// Never panics and never returns an error: every failure mode lands in
    /// the verdict, so batch processing can apply `continue_on_error`
    /// uniformly.
    #[must_use]
    pub fn process_file(&self, task: &FileTask) -> FileVerdict {
        let shown = task.display_path();
        match self.try_process(task) {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::warn!(path = %shown.display(), error = %err, "task processing failed");
                FileVerdict::failed(shown, err.to_string())
            }
        }
    }

    fn try_process(&self, task: &FileTask) -> Result<FileVerdict> {
        // Spilled buffers live in their own scratch dir for the duration of
        // the call.
        let (path, _spill) = match &task.source {
            TaskSource::Path(path) => (path.clone(), None),
            TaskSource::Bytes { name, data } => {
                let scratch = ScratchDir::new()?;
                let file_name = Path::new(name)
                    .file_name()
                    .map_or_else(|| "upload.bin".into(), ToOwned::to_owned);
                let file_path = scratch.path().join(file_name);
                std::fs::write(&file_path, data)?;
                (file_path, Some(scratch))
            }
        };

        let (stages, sanitizer) = match &task.options {
            Some(options) => (
                Arc::new(Stages::new(Arc::clone(options))),
                Arc::new(ContentSanitizer::new(options)),
            ),
            None => (self.stages(), Arc::clone(&self.sanitizer)),
        };

        let mut verdict = FileVerdict::new(task.display_path());

        let validation = stages.validator.validate(&path, task.declared_format);
        let valid = validation.is_valid;
        verdict.validation = Some(validation);
        if !valid {
            return Ok(verdict);
        }

        // Admission gates the expensive stages; validation above is a stat
        // and an open.
        let admission = self.monitor.are_resources_available();
        if let Some(reason) = admission.reason() {
            verdict.error = Some(
                IntakeError::ResourceExhausted {
                    reason: reason.to_owned(),
                }
                .to_string(),
            );
            return Ok(verdict);
        }

        let security = stages.security.validate(&path, task.declared_format);
        let safe = security.is_safe;
        verdict.security = Some(security);
        if !safe {
            return Ok(verdict);
        }

        let format = task.declared_format.or_else(|| FileFormat::from_path(&path));
        let Some(format) = format else {
            // The validators admit a declared-format task; without any
            // format nothing downstream can run.
            verdict.error = Some(
                IntakeError::UnsupportedFormat { path: path.clone() }.to_string(),
            );
            return Ok(verdict);
        };

        if format.is_container() {
            match stages.extractor.extract(&path, true) {
                Ok(extraction) => {
                    verdict.extraction = Some(ExtractionSummary::from_extraction(&extraction));
                    for member in &extraction.extracted_files {
                        verdict.children.push(self.process_member(member, &stages, &sanitizer));
                    }
                    // Scratch space drops with `extraction`; the verdicts
                    // carry everything that survives.
                }
                Err(err) => {
                    verdict.error = Some(err.to_string());
                    return Ok(verdict);
                }
            }
        } else {
            match self.extract_content(&path, format, &sanitizer) {
                Ok(content) => verdict.content = content,
                Err(err) => {
                    verdict.error = Some(err.to_string());
                    return Ok(verdict);
                }
            }
        }

        verdict.accepted = true;
        Ok(verdict)
    }

    /// Processes one extracted archive member: validation and security
    /// again, content extraction, sanitization. Members are not
    /// re-extracted; nesting was already bounded inside the extractor.
    fn process_member(&self, path: &Path, stages: &Stages, sanitizer: &ContentSanitizer) -> FileVerdict {
        let mut verdict = FileVerdict::new(path.to_path_buf());

        let validation = stages.validator.validate(path, None);
        let valid = validation.is_valid;
        verdict.validation = Some(validation);
        if !valid {
            return verdict;
        }

        let security = stages.security.validate(path, None);
        let safe = security.is_safe;
        verdict.security = Some(security);
        if !safe {
            return verdict;
        }

        if let Some(format) = FileFormat::from_path(path) {
            match self.extract_content(path, format, sanitizer) {
                Ok(content) => verdict.content = content,
                Err(err) => {
                    verdict.error = Some(err.to_string());
                    return verdict;
                }
            }
        }

        verdict.accepted = true;
        verdict
    }

    /// Runs the external extractor and sanitizes its output. Containers
    /// have no text of their own and are skipped.
    fn extract_content(
        &self,
        path: &Path,
        format: FileFormat,
        sanitizer: &ContentSanitizer,
    ) -> Result<Option<SanitizedContent>> {
        let Some(extractor) = &self.content_extractor else {
            return Ok(None);
        };
        if format.is_container() {
            return Ok(None);
        }
        let content = extractor.extract(path, format)?;
        Ok(Some(sanitizer.sanitize(&content)))
    }

    /// Processes a batch on a bounded worker pool.
    ///
    /// At most `max_threads` tasks run concurrently, each raced against
    /// `conversion_timeout`. A timed-out task is abandoned, not
    /// interrupted: its verdict records the timeout and its scratch space
    /// is reclaimed when the abandoned work finishes. With
    /// `continue_on_error` disabled, dispatch stops after the first
    /// unaccepted verdict; tasks already in flight finish and their
    /// verdicts are kept. Verdicts come back in submission order.
    pub async fn process_batch(self: &Arc<Self>, tasks: Vec<FileTask>) -> Vec<FileVerdict> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_threads.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let continue_on_error = self.config.continue_on_error;
        let deadline = self.config.conversion_timeout;
        let total = tasks.len();
        let mut join_set = tokio::task::JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            // Re-checked after the permit wait so a failure observed in the
            // meantime stops dispatch.
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let pipeline = Arc::clone(self);
            let stop = Arc::clone(&stop);
            join_set.spawn(async move {
                let _permit = permit;
                let shown = task.display_path();
                let worker = tokio::task::spawn_blocking(move || pipeline.process_file(&task));
                let verdict = match tokio::time::timeout(deadline, worker).await {
                    Ok(Ok(verdict)) => verdict,
                    Ok(Err(join_err)) => {
                        tracing::error!(path = %shown.display(), error = %join_err, "worker panicked");
                        FileVerdict::failed(shown, format!("worker panicked: {join_err}"))
                    }
                    Err(_) => {
                        tracing::warn!(
                            path = %shown.display(),
                            timeout_secs = deadline.as_secs(),
                            "task abandoned after deadline"
                        );
                        FileVerdict::failed(
                            shown,
                            IntakeError::Timeout {
                                seconds: deadline.as_secs(),
                            }
                            .to_string(),
                        )
                    }
                };
                if !continue_on_error && !verdict.accepted {
                    stop.store(true, Ordering::SeqCst);
                }
                (index, verdict)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok(pair) = joined {
                indexed.push(pair);
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let verdicts: Vec<FileVerdict> = indexed.into_iter().map(|(_, verdict)| verdict).collect();
        tracing::info!(
            submitted = total,
            processed = verdicts.len(),
            accepted = verdicts.iter().filter(|verdict| verdict.accepted).count(),
            "batch complete"
        );
        verdicts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;

    /// Test extractor that echoes a fixed payload per file.
    struct EchoExtractor;

    impl ContentExtractor for EchoExtractor {
        fn extract(&self, path: &Path, format: FileFormat) -> Result<Content> {
            Ok(Content::from_text(format!("content of {}", path.display())).with_format(format))
        }
    }

    /// Test extractor that always fails.
    struct BrokenExtractor;

    impl ContentExtractor for BrokenExtractor {
        fn extract(&self, _path: &Path, _format: FileFormat) -> Result<Content> {
            Err(IntakeError::SanitizationFailure {
                field: "text".to_owned(),
            })
        }
    }

    fn pipeline() -> Arc<FileValidationPipeline> {
        Arc::new(FileValidationPipeline::new(PipelineConfig::default()))
    }

    fn pipeline_with(mutate: impl FnOnce(&mut PipelineConfig)) -> Arc<FileValidationPipeline> {
        let mut config = PipelineConfig::default();
        mutate(&mut config);
        Arc::new(FileValidationPipeline::new(config))
    }

    #[test]
    fn test_plain_file_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let verdict = pipeline().process_file(&FileTask::from_path(&path));
        assert!(verdict.accepted);
        assert!(verdict.validation.as_ref().unwrap().is_valid);
        assert!(verdict.security.as_ref().unwrap().is_safe);
        assert!(verdict.children.is_empty());
    }

    #[test]
    fn test_missing_file_rejected() {
        let verdict = pipeline().process_file(&FileTask::from_path("/nonexistent/file.txt"));
        assert!(!verdict.accepted);
        assert!(!verdict.validation.as_ref().unwrap().is_valid);
        assert!(verdict.security.is_none());
    }

    #[test]
    fn test_bytes_submission() {
        let task = FileTask::from_bytes("report.txt", b"in-memory payload".to_vec());
        let verdict = pipeline().process_file(&task);
        assert!(verdict.accepted, "error: {:?}", verdict.error);
        assert_eq!(verdict.path, PathBuf::from("report.txt"));
    }

    #[test]
    fn test_bytes_name_reduced_to_file_name() {
        let task = FileTask::from_bytes("../../escape.txt", b"payload".to_vec());
        let verdict = pipeline().process_file(&task);
        // The traversal shape in the name cannot place the spill outside
        // scratch space; the task still processes under the base name.
        assert!(verdict.accepted, "error: {:?}", verdict.error);
    }

    #[test]
    fn test_executable_rejected_by_security() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.sh");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();

        let verdict = pipeline().process_file(&FileTask::from_path(&path).with_format(FileFormat::PlainText));
        assert!(!verdict.accepted);
        assert!(!verdict.security.as_ref().unwrap().is_safe);
    }

    #[test]
    fn test_archive_members_get_child_verdicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        ZipTestBuilder::new()
            .file("a.txt", b"alpha")
            .file("b.txt", b"beta")
            .write_to(&path);

        let verdict = pipeline().process_file(&FileTask::from_path(&path));
        assert!(verdict.accepted);
        let extraction = verdict.extraction.as_ref().unwrap();
        assert_eq!(extraction.files, 2);
        assert_eq!(verdict.children.len(), 2);
        assert!(verdict.children.iter().all(|child| child.accepted));
    }

    #[test]
    fn test_archive_with_hostile_member_flags_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.zip");
        ZipTestBuilder::new()
            .file("fine.txt", b"ok")
            .file("evil.exe", b"MZ\x90\x00")
            .write_to(&path);

        let verdict = pipeline().process_file(&FileTask::from_path(&path));
        assert!(verdict.accepted);
        assert_eq!(verdict.children.len(), 2);
        let rejected: Vec<_> = verdict.children.iter().filter(|child| !child.accepted).collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].path.ends_with("evil.exe"));
    }

    #[test]
    fn test_content_extraction_and_sanitization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, b"irrelevant").unwrap();

        struct ScriptyExtractor;
        impl ContentExtractor for ScriptyExtractor {
            fn extract(&self, _path: &Path, format: FileFormat) -> Result<Content> {
                Ok(Content::from_text("<script>alert(1)</script><p>hi</p>").with_format(format))
            }
        }

        let pipeline = Arc::new(
            FileValidationPipeline::new(PipelineConfig::default())
                .with_content_extractor(Arc::new(ScriptyExtractor)),
        );
        let verdict = pipeline.process_file(&FileTask::from_path(&path));
        assert!(verdict.accepted);
        let content = verdict.content.as_ref().unwrap();
        assert_eq!(content.content.text, "<p>hi</p>");
        assert!(content.sanitization_applied.contains(&"remove_scripts".to_owned()));
    }

    #[test]
    fn test_broken_extractor_fails_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let pipeline = Arc::new(
            FileValidationPipeline::new(PipelineConfig::default())
                .with_content_extractor(Arc::new(BrokenExtractor)),
        );
        let verdict = pipeline.process_file(&FileTask::from_path(&path));
        assert!(!verdict.accepted);
        assert!(verdict.error.as_ref().unwrap().contains("sanitization failed"));
    }

    #[test]
    fn test_security_rule_swap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.sh");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();

        let pipeline = pipeline();
        let task = FileTask::from_path(&path).with_format(FileFormat::PlainText);
        assert!(!pipeline.process_file(&task).accepted);

        pipeline.set_security_rules(SecurityRules {
            reject_executable: false,
            ..SecurityRules::default()
        });
        assert!(pipeline.process_file(&task).accepted);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = Vec::new();
        for index in 0..6 {
            let path = dir.path().join(format!("file{index}.txt"));
            std::fs::write(&path, format!("file {index}")).unwrap();
            tasks.push(FileTask::from_path(&path));
        }

        let pipeline = pipeline_with(|config| config.max_threads = 2);
        let verdicts = pipeline.process_batch(tasks).await;
        assert_eq!(verdicts.len(), 6);
        for (index, verdict) in verdicts.iter().enumerate() {
            assert!(verdict.accepted);
            assert!(verdict.path.ends_with(format!("file{index}.txt")));
        }
    }

    #[tokio::test]
    async fn test_batch_continue_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, b"fine").unwrap();

        let tasks = vec![
            FileTask::from_path("/nonexistent/bad.txt"),
            FileTask::from_path(&good),
        ];
        let pipeline = pipeline_with(|config| {
            config.continue_on_error = true;
            config.max_threads = 1;
        });
        let verdicts = pipeline.process_batch(tasks).await;
        assert_eq!(verdicts.len(), 2);
        assert!(!verdicts[0].accepted);
        assert!(verdicts[1].accepted);
    }

    #[tokio::test]
    async fn test_batch_stops_on_error_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, b"fine").unwrap();

        let tasks = vec![
            FileTask::from_path("/nonexistent/bad.txt"),
            FileTask::from_path(&good),
            FileTask::from_path(&good),
        ];
        let pipeline = pipeline_with(|config| {
            config.continue_on_error = false;
            config.max_threads = 1;
        });
        let verdicts = pipeline.process_batch(tasks).await;
        // The failing task is recorded; dispatch stops before the rest.
        assert!(!verdicts[0].accepted);
        assert!(verdicts.len() < 3);
    }

    #[tokio::test]
    async fn test_batch_timeout_abandons_task() {
        struct SlowExtractor;
        impl ContentExtractor for SlowExtractor {
            fn extract(&self, _path: &Path, format: FileFormat) -> Result<Content> {
                std::thread::sleep(std::time::Duration::from_millis(300));
                Ok(Content::from_text("late").with_format(format))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.txt");
        std::fs::write(&path, b"data").unwrap();

        let mut config = PipelineConfig::default();
        config.conversion_timeout = std::time::Duration::from_millis(50);
        let pipeline = Arc::new(
            FileValidationPipeline::new(config).with_content_extractor(Arc::new(SlowExtractor)),
        );
        let verdicts = pipeline.process_batch(vec![FileTask::from_path(&path)]).await;
        assert_eq!(verdicts.len(), 1);
        assert!(!verdicts[0].accepted);
        assert!(verdicts[0].error.as_ref().unwrap().contains("timed out"));
    }

    #[test]
    fn test_verdict_serializes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let verdict = pipeline().process_file(&FileTask::from_path(&path));
        let json = verdict.to_json();
        assert_eq!(json["accepted"], true);
        assert_eq!(json["validation"]["is_valid"], true);
    }
}
