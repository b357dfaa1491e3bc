//! One sync run between the internal side and one integration.
//!
//! The process is stateless across runs. It fetches both change reports
//! concurrently, translates them through the mapping manual, judges fields
//! both sides touched, and assembles one [`SyncOrder`] per side. It never
//! delivers; that is the service's job.

use crate::mapper::{MappedField, MappedObject, ObjectMapper};
use crate::{
    ChangeReport, Correlator, DataExchange, Diagnostic, FieldCandidate, FieldChange,
    LatestChangeJudge, NoCorrelation, RequestDao, SyncError, SyncJudge, SyncOrder, SyncResult,
    Verdict, Winner,
};
use chrono::{DateTime, Utc};
use fieldsync_model::MappingManual;
use fieldsync_types::{RunId, Side};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

/// Configuration for sync runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for fetching both change reports (ms). `None` waits
    /// indefinitely.
    pub fetch_timeout_ms: Option<u64>,
    /// Do not deliver orders that contain no objects.
    pub skip_empty_orders: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: Some(30_000),
            skip_empty_orders: true,
        }
    }
}

impl SyncConfig {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

/// Everything one run produced, before delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub run_id: RunId,
    /// Changes to apply to the internal side.
    pub internal_order: SyncOrder,
    /// Changes to apply to the integration side.
    pub integration_order: SyncOrder,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncOutcome {
    /// The order for `side`.
    pub fn order_for(&self, side: Side) -> &SyncOrder {
        match side {
            Side::Internal => &self.internal_order,
            Side::Integration => &self.integration_order,
        }
    }
}

/// Runs syncs for one integration's mapping manual.
#[derive(Clone)]
pub struct SyncProcess {
    manual: Arc<MappingManual>,
    judge: Arc<dyn SyncJudge>,
    correlator: Arc<dyn Correlator>,
    config: SyncConfig,
}

impl SyncProcess {
    pub fn new(
        manual: Arc<MappingManual>,
        judge: Arc<dyn SyncJudge>,
        correlator: Arc<dyn Correlator>,
        config: SyncConfig,
    ) -> Self {
        Self {
            manual,
            judge,
            correlator,
            config,
        }
    }

    /// A process with the latest-change judge and no correlation.
    pub fn with_defaults(manual: Arc<MappingManual>) -> Self {
        Self::new(
            manual,
            Arc::new(LatestChangeJudge),
            Arc::new(NoCorrelation),
            SyncConfig::default(),
        )
    }

    pub fn manual(&self) -> &MappingManual {
        &self.manual
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The request sent to `side`.
    pub fn build_request(&self, side: Side, from: DateTime<Utc>) -> RequestDao {
        RequestDao::for_side(&self.manual, side, from)
    }

    /// Runs one sync. Cannot be cancelled except by dropping the future.
    pub async fn run(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        from: DateTime<Utc>,
    ) -> SyncResult<SyncOutcome> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_until_cancelled(internal, integration, from, cancel_rx)
            .await
    }

    /// Runs one sync, aborting with [`SyncError::Cancelled`] if `cancel`
    /// flips to `true` before both reports have arrived.
    pub async fn run_until_cancelled(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        from: DateTime<Utc>,
        cancel: watch::Receiver<bool>,
    ) -> SyncResult<SyncOutcome> {
        let run_id = RunId::new();
        let span = info_span!(
            "sync_run",
            run_id = %run_id,
            integration = %self.manual.integration()
        );
        async move {
            check_side(internal, Side::Internal)?;
            check_side(integration, Side::Integration)?;

            info!(
                "Starting sync with {} from {} ({} mappings, judge {})",
                integration.name(),
                from,
                self.manual.len(),
                self.judge.name()
            );

            let (internal_report, integration_report) =
                self.fetch_reports(internal, integration, from, cancel).await?;

            check_report(&internal_report, Side::Internal)?;
            check_report(&integration_report, Side::Integration)?;

            let outcome = self.reconcile(run_id, &internal_report, &integration_report);
            info!(
                "Sync assembled: {} object(s) for internal, {} for {}, {} diagnostic(s)",
                outcome.internal_order.object_count(),
                outcome.integration_order.object_count(),
                integration.name(),
                outcome.diagnostics.len()
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn fetch_reports(
        &self,
        internal: &dyn DataExchange,
        integration: &dyn DataExchange,
        from: DateTime<Utc>,
        cancel: watch::Receiver<bool>,
    ) -> SyncResult<(ChangeReport, ChangeReport)> {
        let internal_request = self.build_request(Side::Internal, from);
        let integration_request = self.build_request(Side::Integration, from);

        let fetch = async {
            tokio::try_join!(
                async {
                    internal
                        .get_sync_report(&internal_request)
                        .await
                        .map_err(|source| SyncError::Fetch {
                            side: Side::Internal,
                            source,
                        })
                },
                async {
                    integration
                        .get_sync_report(&integration_request)
                        .await
                        .map_err(|source| SyncError::Fetch {
                            side: Side::Integration,
                            source,
                        })
                },
            )
        };

        let bounded = async {
            match self.config.fetch_timeout() {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(SyncError::Timeout),
                },
                None => fetch.await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled(cancel) => {
                warn!("Sync cancelled while fetching change reports");
                Err(SyncError::Cancelled)
            }
            result = bounded => {
                if let Err(err) = &result {
                    warn!("Sync aborted: {}", err);
                }
                result
            }
        }
    }

    /// Turns two change reports into two sync orders. Pure: no I/O, no clock.
    pub fn reconcile(
        &self,
        run_id: RunId,
        internal: &ChangeReport,
        integration: &ChangeReport,
    ) -> SyncOutcome {
        let mut diagnostics: Vec<Diagnostic> = internal
            .diagnostics()
            .iter()
            .chain(integration.diagnostics())
            .cloned()
            .collect();

        let mapper = ObjectMapper::new(&self.manual, self.correlator.as_ref());
        let mut internal_objects = mapper.map_report(internal, &mut diagnostics);
        let mut integration_objects = mapper.map_report(integration, &mut diagnostics);

        let pairs = pair_objects(&mut internal_objects, &mut integration_objects);
        let paired_integration: HashSet<usize> = pairs.iter().map(|(_, j)| *j).collect();
        let partner: HashMap<usize, usize> = pairs.into_iter().collect();

        let mut internal_order = SyncOrder::new(Side::Internal);
        let mut integration_order = SyncOrder::new(Side::Integration);

        for (i, object) in internal_objects.iter().enumerate() {
            match partner.get(&i) {
                Some(&j) => self.judge_pair(
                    object,
                    &integration_objects[j],
                    &mut internal_order,
                    &mut integration_order,
                    &mut diagnostics,
                ),
                None => self.pass_through(object, &mut integration_order, &mut diagnostics),
            }
        }
        for (j, object) in integration_objects.iter().enumerate() {
            if !paired_integration.contains(&j) {
                self.pass_through(object, &mut internal_order, &mut diagnostics);
            }
        }

        SyncOutcome {
            run_id,
            internal_order,
            integration_order,
            diagnostics,
        }
    }

    /// Delivers every field of an object the other side did not report.
    fn pass_through(
        &self,
        object: &MappedObject,
        order: &mut SyncOrder,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut fields = Vec::new();
        for field in &object.fields {
            let offer = candidate(object, field);
            let verdict = match object.source_side {
                Side::Internal => self.judge.decide(Some(offer), None),
                Side::Integration => self.judge.decide(None, Some(offer)),
            };
            if verdict.winning_side() == Some(object.source_side) {
                fields.extend(self.settle(object, field, verdict, diagnostics));
            }
        }
        if !fields.is_empty() {
            diagnostics.extend(order.add(object.change_with(fields)));
        }
    }

    /// Judges every field of a pair of objects reported by both sides.
    fn judge_pair(
        &self,
        internal: &MappedObject,
        integration: &MappedObject,
        internal_order: &mut SyncOrder,
        integration_order: &mut SyncOrder,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut to_integration = Vec::new();
        let mut to_internal = Vec::new();

        for field in &internal.fields {
            let counterpart = integration
                .fields
                .iter()
                .find(|other| other.source_field == field.target_field);
            let verdict = self.judge.decide(
                Some(candidate(internal, field)),
                counterpart.map(|other| candidate(integration, other)),
            );

            let winner = verdict.winner;
            match winner {
                Winner::Internal => {
                    to_integration.extend(self.settle(internal, field, verdict, diagnostics));
                }
                Winner::Integration => {
                    if let Some(other) = counterpart {
                        to_internal.extend(self.settle(integration, other, verdict, diagnostics));
                    }
                }
                Winner::NoChange if verdict.unresolved => {
                    let detail = format!(
                        "both sides changed {}.{}: internal {} vs integration {}",
                        internal.target_entity,
                        field.target_field,
                        field.source_value,
                        counterpart
                            .map(|o| o.source_value.to_string())
                            .unwrap_or_default(),
                    );
                    warn!("{}", detail);
                    diagnostics.push(Diagnostic::conflict_unresolved(
                        &internal.target_entity,
                        internal.target_id.as_deref(),
                        &field.target_field,
                        detail,
                    ));
                }
                Winner::NoChange => {
                    debug!(
                        "No change for {}.{} on {:?}",
                        internal.target_entity, field.target_field, internal.target_id
                    );
                }
            }
        }

        for field in &integration.fields {
            if internal.field(&field.source_field).is_some() {
                continue;
            }
            let verdict = self.judge.decide(None, Some(candidate(integration, field)));
            if verdict.winner == Winner::Integration {
                to_internal.extend(self.settle(integration, field, verdict, diagnostics));
            }
        }

        if !to_integration.is_empty() {
            diagnostics.extend(integration_order.add(internal.change_with(to_integration)));
        }
        if !to_internal.is_empty() {
            diagnostics.extend(internal_order.add(integration.change_with(to_internal)));
        }
    }

    /// The field a verdict delivers, carrying the judged value in the kind the
    /// destination declares. A judge that names a winner without a value
    /// delivers the mapped value unchanged.
    fn settle(
        &self,
        winner: &MappedObject,
        field: &MappedField,
        verdict: Verdict,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<FieldChange> {
        let Some(value) = verdict.value else {
            return Some(field.to_change());
        };
        let destination = winner.source_side.opposite();
        let declared = self
            .manual
            .declared_kind(destination, &winner.target_entity, &field.target_field);
        let converted = match declared {
            Some(kind) => value.coerce(kind),
            None => Ok(value),
        };

        match converted {
            Ok(value) => Some(field.with_value(value)),
            Err(err) => {
                warn!(
                    "Judged value for {}.{} does not fit the {} side: {}",
                    winner.target_entity, field.target_field, destination, err
                );
                diagnostics.push(Diagnostic::normalization_failed(
                    winner.source_side,
                    &winner.source_entity,
                    winner.source_id.as_deref(),
                    &field.source_field,
                    &err.with_field(&field.source_field),
                ));
                None
            }
        }
    }
}

fn candidate<'a>(object: &MappedObject, field: &'a MappedField) -> FieldCandidate<'a> {
    FieldCandidate::new(&field.source_value)
        .changed_at(field.changed_at)
        .object_changed_at(object.changed_at)
}

/// Finds internal and integration objects that describe the same record.
///
/// Two objects pair up when they map into each other's entity and the
/// correlated id of one is the reported id of the other. An object split
/// across several destination entities is indexed once per entity, so each
/// copy can pair on its own. Each object pairs at most once. Paired objects
/// get each other's ids as destination ids.
fn pair_objects(
    internal: &mut [MappedObject],
    integration: &mut [MappedObject],
) -> Vec<(usize, usize)> {
    // (entity, id, entity on the other side) -> integration object
    let mut by_source: HashMap<(&str, &str, &str), usize> = HashMap::new();
    let mut by_target: HashMap<(&str, &str, &str), usize> = HashMap::new();
    for (j, object) in integration.iter().enumerate() {
        let source = object.source_entity.as_str();
        let target = object.target_entity.as_str();
        if let Some(id) = object.source_id.as_deref() {
            by_source.entry((source, id, target)).or_insert(j);
        }
        if let Some(id) = object.target_id.as_deref() {
            by_target.entry((target, id, source)).or_insert(j);
        }
    }

    let mut taken = HashSet::new();
    let mut pairs = Vec::new();
    for (i, object) in internal.iter().enumerate() {
        let source = object.source_entity.as_str();
        let target = object.target_entity.as_str();
        let forward = object
            .target_id
            .as_deref()
            .and_then(|id| by_source.get(&(target, id, source)));
        let backward = object
            .source_id
            .as_deref()
            .and_then(|id| by_target.get(&(source, id, target)));

        if let Some(&j) = forward.or(backward) {
            if taken.insert(j) {
                pairs.push((i, j));
            }
        }
    }

    for &(i, j) in &pairs {
        integration[j].target_id = internal[i].source_id.clone();
        internal[i].target_id = integration[j].source_id.clone();
    }
    pairs
}

fn check_side(exchange: &dyn DataExchange, expected: Side) -> SyncResult<()> {
    if exchange.side() == expected {
        Ok(())
    } else {
        Err(SyncError::Protocol(format!(
            "exchange '{}' speaks for the {} side, expected {}",
            exchange.name(),
            exchange.side(),
            expected
        )))
    }
}

fn check_report(report: &ChangeReport, expected: Side) -> SyncResult<()> {
    if report.source() == expected {
        Ok(())
    } else {
        Err(SyncError::Protocol(format!(
            "{} exchange returned a report from the {} side",
            expected,
            report.source()
        )))
    }
}

/// Resolves once the flag is set. A dropped sender never cancels.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
