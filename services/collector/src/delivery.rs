//! Report delivery with at-least-once semantics.
//!
//! Fresh reports are sent immediately. Reports that fail in a way worth
//! retrying are written to the retry queue, which a slower resend cycle
//! drains. When the endpoint cannot be reached the remainder of the batch
//! goes straight to the queue.

use std::sync::Arc;

use bulletin_decoder::DecodedReports;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use wmo_common::ReportDefinitions;

use crate::endpoint::{ObservationEndpoint, ResponseCode, SubmitResponse};
use crate::error::Result;
use crate::metrics::CollectorMetrics;
use crate::retry_queue::{PendingDelivery, QueueEntry, RetryQueue};

/// Decode failures that mean the station is unknown downstream. These are
/// treated as delivered.
const UNKNOWN_STATION_MARKERS: [&str; 2] = ["unknown station/position", "Missing or unknown stationid!"];

/// What a single send attempt amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendOutcome {
    /// Delivered, or nothing more can be done.
    Accepted,
    /// Refused for good; dropped.
    Rejected,
    /// Refused for now; keep for a resend.
    Retryable,
    /// Endpoint unreachable; stop sending for this batch.
    LinkDown,
}

impl SendOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Retryable => "retryable",
            Self::LinkDown => "link_down",
        }
    }

    /// The report is finished with and any queued copy can go.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// Map an endpoint answer to a send outcome.
pub fn classify(answer: &Result<SubmitResponse>) -> SendOutcome {
    let response = match answer {
        Ok(response) => response,
        Err(_) => return SendOutcome::LinkDown,
    };

    match response.result {
        ResponseCode::Ok => SendOutcome::Accepted,
        ResponseCode::NoDecoder => SendOutcome::Rejected,
        ResponseCode::DecodeError => {
            if UNKNOWN_STATION_MARKERS
                .iter()
                .any(|m| response.message.contains(m))
            {
                SendOutcome::Accepted
            } else {
                SendOutcome::Rejected
            }
        }
        ResponseCode::NotSaved | ResponseCode::Error => SendOutcome::Retryable,
    }
}

/// Counts from delivering one decoded batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub accepted: usize,
    pub rejected: usize,
    pub queued: usize,
    /// Reports that could neither be delivered nor queued.
    pub lost: usize,
    pub link_down: bool,
}

/// Counts from one pass over the retry queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResendSummary {
    pub delivered: usize,
    pub kept: usize,
    pub malformed: usize,
    pub link_down: bool,
}

pub struct DeliveryPipeline {
    endpoint: Arc<dyn ObservationEndpoint>,
    queue: RetryQueue,
    definitions: ReportDefinitions,
    metrics: Arc<CollectorMetrics>,
}

impl DeliveryPipeline {
    pub fn new(
        endpoint: Arc<dyn ObservationEndpoint>,
        queue: RetryQueue,
        definitions: ReportDefinitions,
        metrics: Arc<CollectorMetrics>,
    ) -> Self {
        Self {
            endpoint,
            queue,
            definitions,
            metrics,
        }
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Send one payload and log the answer.
    async fn send(&self, entry: &PendingDelivery) -> SendOutcome {
        let answer = self
            .endpoint
            .submit(&entry.payload, &entry.decoder_key)
            .await;
        let outcome = classify(&answer);
        self.metrics.record_send(outcome);

        match (&answer, outcome) {
            (Err(e), _) => {
                warn!(endpoint = %self.endpoint.name(), error = %e, "Cannot reach endpoint");
            }
            (Ok(resp), SendOutcome::Accepted) if resp.result != ResponseCode::Ok => {
                info!(decoder = %entry.decoder_key, message = %resp.message, "Report for unknown station");
            }
            (Ok(resp), SendOutcome::Rejected) => {
                error!(
                    decoder = %entry.decoder_key,
                    result = ?resp.result,
                    message = %resp.message,
                    "Report refused, dropping it"
                );
            }
            (Ok(resp), SendOutcome::Retryable) => {
                error!(
                    decoder = %entry.decoder_key,
                    result = ?resp.result,
                    message = %resp.message,
                    "Report not saved, queueing for resend"
                );
            }
            _ => {}
        }

        outcome
    }

    /// Queue an entry for a later resend. A failed write is logged and
    /// reported as `false`; it never stops the batch.
    async fn enqueue(&self, entry: &PendingDelivery) -> bool {
        match self.queue.persist(entry).await {
            Ok(_) => {
                self.metrics.record_queued();
                true
            }
            Err(e) => {
                error!(
                    decoder = %entry.decoder_key,
                    error = %e,
                    payload = %entry.payload,
                    "Cannot queue report for resend, report lost"
                );
                false
            }
        }
    }

    /// Build the queue entries for every report in `decoded`.
    pub fn entries(&self, decoded: &DecodedReports) -> Vec<PendingDelivery> {
        decoded
            .iter()
            .map(|(report_type, key, body)| {
                let decoder = self
                    .definitions
                    .decoder_for(report_type)
                    .map(str::to_string)
                    .unwrap_or_else(|| report_type.default_decoder());
                PendingDelivery::new(key.decoder_key(&decoder), key.payload(body))
            })
            .collect()
    }

    /// Send freshly decoded reports.
    ///
    /// Once the link is down, or shutdown was requested, the remaining
    /// reports are queued without being sent. Failing to queue one report
    /// does not stop the rest of the batch.
    #[instrument(skip_all, fields(reports = decoded.report_count()))]
    pub async fn deliver(
        &self,
        decoded: &DecodedReports,
        cancel: &CancellationToken,
    ) -> DeliverySummary {
        let mut summary = DeliverySummary::default();

        for entry in self.entries(decoded) {
            let must_queue = if summary.link_down || cancel.is_cancelled() {
                true
            } else {
                match self.send(&entry).await {
                    SendOutcome::Accepted => {
                        summary.accepted += 1;
                        false
                    }
                    SendOutcome::Rejected => {
                        summary.rejected += 1;
                        false
                    }
                    SendOutcome::Retryable => true,
                    SendOutcome::LinkDown => {
                        summary.link_down = true;
                        true
                    }
                }
            };

            if must_queue {
                if self.enqueue(&entry).await {
                    summary.queued += 1;
                } else {
                    summary.lost += 1;
                }
            }
        }

        if summary.queued > 0 {
            self.refresh_queue_depth().await;
        }

        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            queued = summary.queued,
            lost = summary.lost,
            link_down = summary.link_down,
            "Delivered reports"
        );
        summary
    }

    async fn refresh_queue_depth(&self) {
        match self.queue.len().await {
            Ok(depth) => self.metrics.set_retry_queue_depth(depth),
            Err(e) => warn!(error = %e, "Cannot count retry queue"),
        }
    }

    /// Try to send every queued report once, in the order they were queued.
    #[instrument(skip_all)]
    pub async fn resend(&self, cancel: &CancellationToken) -> Result<ResendSummary> {
        let mut summary = ResendSummary::default();
        let files = self.queue.list().await?;

        for path in &files {
            if cancel.is_cancelled() {
                break;
            }

            let entry = match self.queue.read(path).await {
                Ok(QueueEntry::Valid(entry)) => entry,
                Ok(QueueEntry::Malformed) => {
                    warn!(path = %path.display(), "Malformed queue file, deleting it");
                    self.queue.remove(path).await?;
                    summary.malformed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read queue file");
                    summary.kept += 1;
                    continue;
                }
            };

            match self.send(&entry).await {
                outcome if outcome.is_final() => {
                    self.queue.remove(path).await?;
                    summary.delivered += 1;
                }
                SendOutcome::LinkDown => {
                    summary.link_down = true;
                    break;
                }
                _ => summary.kept += 1,
            }
        }

        self.refresh_queue_depth().await;

        if !files.is_empty() {
            info!(
                queued = files.len(),
                delivered = summary.delivered,
                kept = summary.kept,
                malformed = summary.malformed,
                link_down = summary.link_down,
                "Resend cycle done"
            );
        }
        Ok(summary)
    }
}
