//! Relationship import engine.
//!
//! Applies one relationship mapping to one row source. Each data row is
//! resolved into a [`RelationshipUpsert`] and handed to an
//! [`UpsertExecutor`]; the row's outcome is folded into a
//! [`MappingSummary`]. Row-level problems never escape this module. The only
//! error returned is an [`ImportAborted`]: the source became unreadable, and
//! the summary of rows handled before that point travels with it.
//!
//! With `concurrency > 1` rows are pipelined through a bounded set of worker
//! tasks. A semaphore permit is taken before a row is dispatched, so reading
//! stalls while the pool is full.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use graphlink_core::{
    EndpointRef, FieldSelector, MappingSummary, Record, RelationshipMapping, RelationshipUpsert,
    UpsertOutcome,
};
use graphlink_graph::UpsertExecutor;

use crate::error::SourceReadError;

/// A row source failed part way; `summary` covers the rows already handled.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ImportAborted {
    pub summary: MappingSummary,
    #[source]
    pub error: SourceReadError,
}

/// Tuning knobs for an import.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum upserts in flight at once. `1` processes rows strictly in order.
    pub concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Drives mappings over row sources against a shared executor.
pub struct ImportEngine<E> {
    executor: Arc<E>,
    options: EngineOptions,
    shutdown: watch::Receiver<bool>,
}

impl<E: UpsertExecutor + 'static> ImportEngine<E> {
    pub fn new(executor: Arc<E>, options: EngineOptions) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self {
            executor,
            options,
            shutdown,
        }
    }

    /// Stop reading new rows once `shutdown` turns true. In-flight upserts
    /// are allowed to finish.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Import every data row of `rows` under `mapping`.
    pub async fn import_relationships<I>(
        &self,
        rows: I,
        mapping: &RelationshipMapping,
    ) -> Result<MappingSummary, ImportAborted>
    where
        I: IntoIterator<Item = Result<Record, SourceReadError>>,
    {
        let mut rows = rows.into_iter();
        let mut summary = MappingSummary::new(mapping.relationship_type());

        let header = match rows.next() {
            Some(Ok(header)) => header,
            Some(Err(error)) if error.is_fatal() => {
                return Err(ImportAborted { summary, error });
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Header record unreadable; name selectors will not resolve");
                Record::default()
            }
            None => {
                tracing::warn!(mapping = %mapping, "Row source is empty");
                return Ok(summary);
            }
        };
        let columns = Columns::bind(mapping, &header);

        let concurrency = self.options.concurrency.max(1);
        let permits = Arc::new(Semaphore::new(concurrency));
        let mut in_flight: JoinSet<(usize, UpsertOutcome)> = JoinSet::new();
        let mut fatal = None;

        let mut row = 0;
        loop {
            if self.is_shutting_down() {
                tracing::warn!(row, mapping = %mapping, "Shutdown requested, no further rows read");
                summary.cancelled = true;
                break;
            }
            let Some(item) = rows.next() else {
                break;
            };
            row += 1;

            let record = match item {
                Ok(record) => record,
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(row, error = %e, "Skipping unreadable row");
                    summary.record(
                        row,
                        UpsertOutcome::SkippedInvalid {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let request = match columns.resolve(mapping, &record) {
                Ok(request) => request,
                Err(reason) => {
                    tracing::warn!(row, rel_type = %mapping.relationship_type(), %reason, "Skipping row");
                    summary.record(row, UpsertOutcome::SkippedInvalid { reason });
                    continue;
                }
            };

            if concurrency == 1 {
                let outcome = execute(self.executor.as_ref(), row, &request).await;
                summary.record(row, outcome);
                continue;
            }

            while let Some(done) = in_flight.try_join_next() {
                collect(&mut summary, done);
            }

            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let executor = self.executor.clone();
            in_flight.spawn(async move {
                let outcome = execute(executor.as_ref(), row, &request).await;
                drop(permit);
                (row, outcome)
            });
        }

        while let Some(done) = in_flight.join_next().await {
            collect(&mut summary, done);
        }

        summary.failures.sort_by_key(|f| f.row);

        if let Some(error) = fatal {
            tracing::error!(
                mapping = %mapping,
                error = %error,
                processed = summary.processed,
                "Row source failed, import aborted"
            );
            return Err(ImportAborted { summary, error });
        }

        tracing::info!(
            rel_type = %summary.relationship_type,
            processed = summary.processed,
            created = summary.created,
            existing = summary.matched_existing,
            applied = summary.applied,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Relationship import complete"
        );

        Ok(summary)
    }
}

/// Issue one upsert and classify the result.
async fn execute<E: UpsertExecutor + ?Sized>(
    executor: &E,
    row: usize,
    request: &RelationshipUpsert,
) -> UpsertOutcome {
    match executor.upsert(request).await {
        Ok(effect) => effect.into(),
        Err(e) => {
            tracing::warn!(
                row,
                rel_type = %request.relationship_type,
                from = %request.from.value,
                to = %request.to.value,
                error = %e,
                "Upsert failed"
            );
            UpsertOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn collect(
    summary: &mut MappingSummary,
    done: Result<(usize, UpsertOutcome), tokio::task::JoinError>,
) {
    match done {
        Ok((row, outcome)) => summary.record(row, outcome),
        Err(e) => {
            // The row index died with the task.
            tracing::error!(error = %e, "Upsert worker panicked");
            summary.record(
                0,
                UpsertOutcome::Failed {
                    reason: format!("upsert worker panicked: {e}"),
                },
            );
        }
    }
}

/// Column positions for both endpoints, bound against the header once.
struct Columns {
    from: Option<usize>,
    to: Option<usize>,
}

impl Columns {
    fn bind(mapping: &RelationshipMapping, header: &Record) -> Self {
        let from = mapping.from().selector.column(header);
        let to = mapping.to().selector.column(header);

        for (side, selector, column) in [
            ("from", &mapping.from().selector, from),
            ("to", &mapping.to().selector, to),
        ] {
            if column.is_none() {
                tracing::warn!(
                    mapping = %mapping,
                    side,
                    selector = %selector,
                    "Selector not found in header; every row will be skipped"
                );
            }
        }

        Self { from, to }
    }

    fn resolve(
        &self,
        mapping: &RelationshipMapping,
        record: &Record,
    ) -> Result<RelationshipUpsert, String> {
        let from = mapping.from();
        let to = mapping.to();
        let from_value = field_value(&from.selector, self.from, record)?;
        let to_value = field_value(&to.selector, self.to, record)?;

        Ok(RelationshipUpsert {
            from: EndpointRef {
                label: from.label.clone(),
                key: from.key.clone(),
                value: from_value.to_string(),
            },
            to: EndpointRef {
                label: to.label.clone(),
                key: to.key.clone(),
                value: to_value.to_string(),
            },
            relationship_type: mapping.relationship_type().to_string(),
        })
    }
}

fn field_value<'r>(
    selector: &FieldSelector,
    column: Option<usize>,
    record: &'r Record,
) -> Result<&'r str, String> {
    let Some(column) = column else {
        return Err(format!("{selector} is not in the header"));
    };
    match record.get(column) {
        None => Err(format!(
            "{selector} is out of range for a row of {} fields",
            record.len()
        )),
        Some(value) if value.trim().is_empty() => Err(format!("{selector} is empty")),
        Some(value) => Ok(value),
    }
}
