//! WMO bulletin collector service.
//!
//! Watches a drop directory for bulletin files, decodes new content into
//! per-station reports and forwards them to an observation service. Reports
//! that cannot be delivered are kept on disk and resent later.

pub mod config;
pub mod delivery;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod retry_queue;
pub mod scheduler;
pub mod spool;

use std::sync::Arc;

use anyhow::Result;
use bulletin_decoder::BulletinDecoder;
use ingestion::ChangeDetector;

pub use config::CollectorConfig;
pub use delivery::{DeliveryPipeline, SendOutcome};
pub use endpoint::{HttpEndpoint, MultiEndpoint, ObservationEndpoint, ResponseCode, SubmitResponse};
pub use error::DeliveryError;
pub use metrics::CollectorMetrics;
pub use retry_queue::{PendingDelivery, RetryQueue};
pub use scheduler::{CollectionLoop, LoopSettings};

/// Wire up a collection loop from configuration.
///
/// The file state of a previous run is restored.
pub async fn build_loop(
    config: &CollectorConfig,
    test_mode: bool,
    endpoint: Arc<dyn ObservationEndpoint>,
    metrics: Arc<CollectorMetrics>,
) -> Result<CollectionLoop> {
    let definitions = config.report_definitions();
    let settings = LoopSettings::from_config(config, test_mode)?;

    let detector = ChangeDetector::new(config.tmp_dir(), config.debug);
    let decoder = BulletinDecoder::new(definitions.wanted_types());
    let pipeline = DeliveryPipeline::new(
        endpoint,
        RetryQueue::new(&config.work_dir),
        definitions,
        metrics.clone(),
    );

    let mut collection = CollectionLoop::new(settings, detector, decoder, pipeline, metrics);
    collection.restore_state().await;
    Ok(collection)
}
