//! Collection loop: a fast scan/forward job and a slow resend job
//! interleaved in one polling loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use bulletin_decoder::{BulletinDecoder, DecodedReports};
use glob::Pattern;
use ingestion::{ChangeDetector, IngestionError, NewData};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use wmo_common::now_timestamp;

use crate::config::CollectorConfig;
use crate::delivery::DeliveryPipeline;
use crate::metrics::CollectorMetrics;
use crate::spool::write_unique;

/// Pause between loop turns when no job was due.
const IDLE_SLEEP: Duration = Duration::from_secs(1);

/// Fixed settings of one collection loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub source_dir: PathBuf,
    pub pattern: Pattern,
    pub work_dir: PathBuf,
    pub bulletin_log_dir: PathBuf,
    pub state_path: PathBuf,
    pub poll_interval: Duration,
    pub resend_interval: Duration,
    pub ignore_before: Option<SystemTime>,
    /// Write decoded output to files instead of sending it.
    pub test_mode: bool,
}

impl LoopSettings {
    pub fn from_config(config: &CollectorConfig, test_mode: bool) -> Result<Self> {
        let pattern = Pattern::new(&config.file_pattern)
            .with_context(|| format!("Invalid file_pattern: {}", config.file_pattern))?;

        Ok(Self {
            source_dir: config.source_dir.clone(),
            pattern,
            work_dir: config.work_dir.clone(),
            bulletin_log_dir: config.bulletin_log_dir(),
            state_path: config.state_path(),
            poll_interval: config.poll_interval(),
            resend_interval: config.resend_interval(),
            ignore_before: config
                .ignore_files_before_startup
                .then(SystemTime::now),
            test_mode,
        })
    }
}

/// Counts from one scan/forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectSummary {
    pub files: usize,
    pub reports: usize,
    pub decode_warnings: usize,
}

pub struct CollectionLoop {
    settings: LoopSettings,
    detector: ChangeDetector,
    decoder: BulletinDecoder,
    pipeline: DeliveryPipeline,
    metrics: Arc<CollectorMetrics>,
}

impl CollectionLoop {
    pub fn new(
        settings: LoopSettings,
        detector: ChangeDetector,
        decoder: BulletinDecoder,
        pipeline: DeliveryPipeline,
        metrics: Arc<CollectorMetrics>,
    ) -> Self {
        Self {
            settings,
            detector,
            decoder,
            pipeline,
            metrics,
        }
    }

    /// Reload the file state saved by a previous run.
    pub async fn restore_state(&mut self) {
        match ingestion::load_states(&self.settings.state_path).await {
            Ok(states) => self.detector.restore(states),
            Err(e) => warn!(
                path = %self.settings.state_path.display(),
                error = %e,
                "Cannot load file state, starting fresh"
            ),
        }
    }

    pub async fn save_state(&self) {
        if let Err(e) = ingestion::save_states(&self.settings.state_path, self.detector.states()).await
        {
            error!(error = %e, "Cannot save file state");
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run until `cancel` fires.
    pub async fn run_forever(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut last_collect: Option<Instant> = None;
        let mut last_resend: Option<Instant> = None;

        info!(
            source_dir = %self.settings.source_dir.display(),
            pattern = %self.settings.pattern,
            test_mode = self.settings.test_mode,
            "Starting collection loop"
        );

        while !cancel.is_cancelled() {
            let mut ran = false;

            if is_due(last_collect, self.settings.poll_interval) {
                self.collect_cycle(&cancel).await;
                last_collect = Some(Instant::now());
                ran = true;
            }

            if !self.settings.test_mode
                && !cancel.is_cancelled()
                && is_due(last_resend, self.settings.resend_interval)
            {
                self.resend_cycle(&cancel).await;
                last_resend = Some(Instant::now());
                ran = true;
            }

            if !ran {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_SLEEP) => {}
                }
            }
        }

        info!("Shutting down collection loop");
        self.save_state().await;
        Ok(())
    }

    /// Run each job once.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> CollectSummary {
        let summary = self.collect_cycle(cancel).await;
        if !self.settings.test_mode {
            self.resend_cycle(cancel).await;
        }
        self.save_state().await;
        summary
    }

    /// Scan the source directory and forward new content.
    #[instrument(skip_all)]
    pub async fn collect_cycle(&mut self, cancel: &CancellationToken) -> CollectSummary {
        let mut summary = CollectSummary::default();

        let has_new_data = match self
            .detector
            .scan(
                &self.settings.source_dir,
                &self.settings.pattern,
                self.settings.ignore_before,
                cancel,
            )
            .await
        {
            Ok(has_new_data) => has_new_data,
            Err(IngestionError::Cancelled) => return summary,
            Err(e) => {
                warn!(error = %e, "Cannot scan source directory");
                return summary;
            }
        };

        if !has_new_data {
            return summary;
        }

        info!("New observations to collect");

        for path in self.detector.pending() {
            if cancel.is_cancelled() {
                break;
            }
            let Some(data) = self.detector.collect(&path).await else {
                continue;
            };

            self.metrics.record_file_collected();
            summary.files += 1;

            let decoded = self.decoder.split(&data.bytes);
            summary.reports += decoded.report_count();
            if decoded.has_errors() {
                summary.decode_warnings += 1;
            }

            self.handle_decoded(&data, &decoded, cancel).await;
        }

        self.save_state().await;
        summary
    }

    async fn handle_decoded(
        &self,
        data: &NewData,
        decoded: &DecodedReports,
        cancel: &CancellationToken,
    ) {
        let file_name = data.file_name();
        let timestamp = now_timestamp();

        info!(
            file = %file_name,
            bytes = data.bytes.len(),
            bulletins = decoded.bulletins,
            reports = decoded.report_count(),
            "Decoded new data"
        );

        let unmatched = decoded.unmatched.trim();
        if !unmatched.is_empty() {
            warn!(file = %file_name, unmatched = %unmatched, "Text outside bulletins");
            dump(
                &self.settings.bulletin_log_dir,
                &format!("unmatched_{}_{}", file_name, timestamp),
                decoded.unmatched.as_bytes(),
            )
            .await;
        }

        if decoded.has_errors() {
            self.metrics.record_bulletin_error();
            warn!(file = %file_name, errors = %decoded.errors, "Problems decoding bulletins");
            dump(
                &self.settings.bulletin_log_dir,
                &format!("datawarn_{}_{}", file_name, timestamp),
                &data.bytes,
            )
            .await;
        }

        if self.settings.test_mode {
            dump(
                &self.settings.work_dir,
                &format!("WMORaport_{}_{}", file_name, timestamp),
                decoded.to_string().as_bytes(),
            )
            .await;
            dump(
                &self.settings.work_dir,
                &format!("{}_{}", file_name, timestamp),
                &data.bytes,
            )
            .await;
            return;
        }

        if decoded.is_empty() {
            return;
        }

        let summary = self.pipeline.deliver(decoded, cancel).await;
        if summary.lost > 0 {
            error!(file = %file_name, lost = summary.lost, "Reports lost, see log for payloads");
        }
    }

    /// Resend queued reports.
    pub async fn resend_cycle(&mut self, cancel: &CancellationToken) {
        if let Err(e) = self.pipeline.resend(cancel).await {
            error!(error = %e, "Resend cycle failed");
        }
    }
}

fn is_due(last: Option<Instant>, interval: Duration) -> bool {
    match last {
        None => true,
        Some(t) => t.elapsed() >= interval,
    }
}

async fn dump(dir: &Path, base: &str, content: &[u8]) {
    match write_unique(dir, base, content).await {
        Ok(Some(path)) => info!(path = %path.display(), "Wrote file"),
        Ok(None) => error!(dir = %dir.display(), base = %base, "No free file name"),
        Err(e) => error!(dir = %dir.display(), base = %base, error = %e, "Cannot write file"),
    }
}
