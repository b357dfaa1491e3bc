//! Sync service - runs a process and delivers its orders.

use crate::{
    Correlator, DataExchange, Diagnostic, LatestChangeJudge, NoCorrelation, SyncConfig,
    SyncError, SyncJudge, SyncOrder, SyncOutcome, SyncProcess, SyncResult,
};
use chrono::{DateTime, Utc};
use fieldsync_model::MappingManual;
use fieldsync_types::{RunId, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// The result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    /// Both orders were delivered (or had nothing to deliver).
    pub delivered: bool,
    pub internal_order_delivered: bool,
    pub integration_order_delivered: bool,
    /// Every diagnostic of the run, delivery failures included. They are
    /// moved here, so `outcome.diagnostics` is left empty.
    pub diagnostics: Vec<Diagnostic>,
    pub outcome: SyncOutcome,
}

/// Builds a [`SyncProcess`] per integration and delivers what it produces.
#[derive(Clone)]
pub struct SyncService {
    judge: Arc<dyn SyncJudge>,
    correlator: Arc<dyn Correlator>,
    config: SyncConfig,
    internal: Option<Arc<dyn DataExchange>>,
}

impl SyncService {
    pub fn new(
        judge: Arc<dyn SyncJudge>,
        correlator: Arc<dyn Correlator>,
        config: SyncConfig,
    ) -> Self {
        Self {
            judge,
            correlator,
            config,
            internal: None,
        }
    }

    /// Latest-change judge, no correlation, default config.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(LatestChangeJudge),
            Arc::new(NoCorrelation),
            SyncConfig::default(),
        )
    }

    /// Fixes the internal side, for use with
    /// [`process_integration_sync`](Self::process_integration_sync).
    #[must_use]
    pub fn for_internal(mut self, internal: Arc<dyn DataExchange>) -> Self {
        self.internal = Some(internal);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// A process for one integration's manual.
    pub fn create_process(&self, manual: Arc<MappingManual>) -> SyncProcess {
        SyncProcess::new(
            manual,
            Arc::clone(&self.judge),
            Arc::clone(&self.correlator),
            self.config.clone(),
        )
    }

    /// Runs one sync and delivers both orders.
    pub async fn sync(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        manual: Arc<MappingManual>,
        from: DateTime<Utc>,
    ) -> SyncResult<RunResult> {
        let outcome = self
            .create_process(manual)
            .run(internal, integration, from)
            .await?;
        Ok(self.deliver(internal, integration, outcome).await)
    }

    /// Like [`sync`](Self::sync), but gives up with
    /// [`SyncError::Cancelled`] if `cancel` is set while fetching.
    pub async fn sync_until_cancelled(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        manual: Arc<MappingManual>,
        from: DateTime<Utc>,
        cancel: watch::Receiver<bool>,
    ) -> SyncResult<RunResult> {
        let outcome = self
            .create_process(manual)
            .run_until_cancelled(internal, integration, from, cancel)
            .await?;
        Ok(self.deliver(internal, integration, outcome).await)
    }

    /// Syncs `integration` against the internal side set with
    /// [`for_internal`](Self::for_internal).
    pub async fn process_integration_sync(
        &self,
        integration: &dyn DataExchange,
        manual: Arc<MappingManual>,
        from: DateTime<Utc>,
    ) -> SyncResult<RunResult> {
        let internal = self.internal.as_deref().ok_or_else(|| {
            SyncError::Configuration("no internal exchange configured".to_string())
        })?;
        self.sync(internal, integration, manual, from).await
    }

    /// Delivers the integration order, then the internal one. A failure on
    /// one side is recorded and does not stop the other.
    async fn deliver(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        mut outcome: SyncOutcome,
    ) -> RunResult {
        let mut diagnostics = std::mem::take(&mut outcome.diagnostics);

        let integration_order_delivered = self
            .deliver_order(integration, &outcome.integration_order, &mut diagnostics)
            .await;
        let internal_order_delivered = self
            .deliver_order(internal, &outcome.internal_order, &mut diagnostics)
            .await;

        let delivered = internal_order_delivered && integration_order_delivered;
        info!(
            "Run {} finished: delivered={} ({} diagnostic(s))",
            outcome.run_id,
            delivered,
            diagnostics.len()
        );

        RunResult {
            run_id: outcome.run_id,
            delivered,
            internal_order_delivered,
            integration_order_delivered,
            diagnostics,
            outcome,
        }
    }

    async fn deliver_order(
        &self,
        exchange: &dyn DataExchange,
        order: &SyncOrder,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        let side: Side = order.destination();
        if order.is_empty() && self.config.skip_empty_orders {
            return true;
        }

        match exchange.execute_sync_order(order).await {
            Ok(()) => {
                info!(
                    "Delivered {} object(s) to {} ({})",
                    order.object_count(),
                    exchange.name(),
                    side
                );
                true
            }
            Err(source) => {
                let err = SyncError::Delivery { side, source };
                warn!("{}", err);
                diagnostics.push(Diagnostic::delivery_failed(side, err.to_string()));
                false
            }
        }
    }
}
