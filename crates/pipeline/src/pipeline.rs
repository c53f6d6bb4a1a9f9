use crate::error::Result;
use crate::stage::{Stage, StageState};
use crate::stages;
use shelve_archive::{ArchiveIdentity, Classification, DIRECTORY_FILE_DEFAULT};
use shelve_catalog::CatalogStore;
use shelve_manifest::{FileFetcher, TreeSource};
use shelve_package::Packager;
use shelve_storage::ObjectStore;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// The external collaborators a pipeline run talks to.
///
/// Constructed once by the caller and lent to the pipeline for the duration
/// of a run.
#[derive(Clone, Copy)]
pub struct Clients<'a> {
    pub tree: &'a dyn TreeSource,
    pub fetcher: &'a dyn FileFetcher,
    pub catalog: &'a dyn CatalogStore,
    pub store: &'a dyn ObjectStore,
}

/// Where and how a pipeline stages, bundles and ships archives.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Scratch space; each run uses `<work_dir>/<archive id>/`.
    pub work_dir: PathBuf,
    /// Saved bundles land in `<archive_root>/<archive id>/`.
    pub archive_root: PathBuf,
    /// Filename of the manifest document inside the bundle.
    pub manifest_file: String,
    /// Payload filename without extension; the packager adds one.
    pub payload_stem: String,
    pub packager: Packager,
    pub include_native: bool,
    /// Upload target for archives whose `directory_path` names no bucket;
    /// otherwise the catalogued bucket and location are used.
    pub bucket: String,
    pub key_prefix: String,
    /// Remove the local bundle (and scratch space) when the run ends.
    pub cleanup: bool,
}

impl PipelineSettings {
    pub fn new(archive_root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        let archive_root = archive_root.into();
        Self {
            work_dir: archive_root.join(".staging"),
            archive_root,
            manifest_file: DIRECTORY_FILE_DEFAULT.to_string(),
            payload_stem: "data".to_string(),
            packager: Packager::default(),
            include_native: false,
            bucket: bucket.into(),
            key_prefix: String::new(),
            cleanup: true,
        }
    }
}

/// One archive to produce: which folder, under what identity, classified how.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub folder: String,
    pub identity: ArchiveIdentity,
    pub classification: Classification,
}

impl ArchiveRequest {
    pub fn new(folder: impl Into<String>, identity: ArchiveIdentity) -> Self {
        Self {
            folder: folder.into(),
            identity,
            classification: Classification::default(),
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub archive_id: String,
    /// True only if every stage through upload succeeded.
    pub success: bool,
    /// Messages of every failed stage, joined by newlines.
    pub error_message: String,
    /// Final state of every stage, in execution order.
    pub stages: Vec<(Stage, StageState)>,
    /// The saved bundle directory, if bundling succeeded.
    pub local_path: Option<PathBuf>,
    /// Directories the cleanup stage removed, in removal order.
    pub cleaned: Vec<PathBuf>,
}

impl PipelineOutcome {
    pub fn state(&self, stage: Stage) -> &StageState {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, state)| state)
            .unwrap_or(&NOT_RUN)
    }
}

static NOT_RUN: StageState = StageState::NotRun;

/// Records stage results and turns failures into messages.
struct Report {
    states: Vec<(Stage, StageState)>,
    messages: Vec<String>,
    local_path: Option<PathBuf>,
    cleaned: Vec<PathBuf>,
}

impl Report {
    fn new() -> Self {
        Self {
            states: Stage::ALL.iter().map(|stage| (*stage, StageState::NotRun)).collect(),
            messages: Vec::new(),
            local_path: None,
            cleaned: Vec::new(),
        }
    }

    fn set(&mut self, stage: Stage, state: StageState) {
        if let Some((_, slot)) = self.states.iter_mut().find(|(s, _)| *s == stage) {
            *slot = state;
        }
    }

    /// Record a stage result; `None` means later gated stages must not run.
    fn record<T>(&mut self, stage: Stage, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                tracing::debug!(%stage, "Stage succeeded");
                self.set(stage, StageState::Succeeded);
                Some(value)
            },
            Err(err) => {
                let message = err.to_string();
                tracing::error!(%stage, error = %message, "Stage failed");
                self.messages.push(message.clone());
                self.set(stage, StageState::Failed(message));
                None
            },
        }
    }

    fn finish(self, archive_id: &str) -> PipelineOutcome {
        let success = self
            .states
            .iter()
            .filter(|(stage, _)| stage.is_gated())
            .all(|(_, state)| state.is_success());
        PipelineOutcome {
            archive_id: archive_id.to_string(),
            success,
            error_message: self.messages.join("\n"),
            stages: self.states,
            local_path: self.local_path,
            cleaned: self.cleaned,
        }
    }
}

/// Runs the archive-and-ship stages in order.
///
/// Each of snapshot, fetch+package, bundle, catalog and upload only runs if
/// the stage before it succeeded. Cleanup runs whenever it is enabled,
/// regardless of how the other stages went. Stages run strictly one after
/// another; nothing is retried.
///
/// # Examples
///
/// ```no_run
/// use shelve_archive::ArchiveIdentity;
/// use shelve_pipeline::{ArchiveRequest, Clients, Pipeline, PipelineSettings};
///
/// async fn archive(clients: Clients<'_>) -> bool {
///     let settings = PipelineSettings::new("/var/lib/shelve/archives", "bucket1");
///     let request = ArchiveRequest::new("Finances", ArchiveIdentity::now("Q1"));
///     let outcome = Pipeline::new(clients, settings).run(&request).await;
///     if !outcome.success {
///         eprintln!("{}", outcome.error_message);
///     }
///     outcome.success
/// }
/// ```
pub struct Pipeline<'a> {
    clients: Clients<'a>,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(clients: Clients<'a>, settings: PipelineSettings) -> Self {
        Self { clients, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[instrument(skip_all, fields(id = %request.identity, folder = %request.folder))]
    pub async fn run(&self, request: &ArchiveRequest) -> PipelineOutcome {
        let archive_id = request.identity.id();
        let staging = self.settings.work_dir.join(archive_id);
        let mut report = Report::new();

        tracing::info!("Starting archive run");
        // `None` here only means a stage failed; the report has the details.
        _ = self.run_gated(request, &staging, &mut report).await;

        if self.settings.cleanup {
            for directory in [self.settings.archive_root.join(archive_id), staging] {
                if stages::remove_tree(&directory).await {
                    report.cleaned.push(directory);
                }
            }
            report.set(Stage::Cleanup, StageState::Succeeded);
        }

        let outcome = report.finish(archive_id);
        match outcome.success {
            true => tracing::info!("Archive run succeeded"),
            false => tracing::warn!("Archive run failed"),
        }
        outcome
    }

    async fn run_gated(&self, request: &ArchiveRequest, staging: &Path, report: &mut Report) -> Option<()> {
        let settings = &self.settings;
        let manifest_path = staging.join(&settings.manifest_file);
        let download_dir = staging.join("download");
        let payload_path = staging.join(settings.packager.payload_name(&settings.payload_stem));

        let manifest = report.record(
            Stage::Snapshot,
            stages::snapshot(self.clients.tree, &request.folder, settings.include_native, &manifest_path).await,
        )?;
        let payload = report.record(
            Stage::Package,
            stages::fetch_and_package(self.clients.fetcher, &manifest, &download_dir, settings.packager, &payload_path)
                .await,
        )?;
        let bundle = report.record(
            Stage::Bundle,
            stages::bundle(
                &request.identity,
                &request.classification,
                manifest,
                &manifest_path,
                &payload,
                &settings.archive_root,
            ),
        )?;
        let directory = bundle.local_path()?.to_path_buf();
        report.local_path = Some(directory.clone());
        let record = report.record(Stage::Catalog, stages::catalog(self.clients.catalog, &bundle).await)?;
        let (bucket, location) = stages::upload_location(&record, &settings.bucket, &settings.key_prefix);
        report.record(
            Stage::Upload,
            stages::upload(self.clients.store, &directory, &bucket, &location).await,
        )?;
        Some(())
    }
}
