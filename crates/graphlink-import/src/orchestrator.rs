//! Import run orchestration.
//!
//! Runs every (row source, mapping) job of a plan through the engine in plan
//! order and gathers the per-job summaries into a [`RunReport`]. A job whose
//! source cannot be read is recorded as aborted, keeping the counts of the
//! rows it handled, and the run moves on. Row failures inside a job never
//! affect the verdict.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use graphlink_core::{MappingSummary, RelationshipMapping};
use graphlink_graph::UpsertExecutor;

use crate::engine::{ImportAborted, ImportEngine};
use crate::source::{CsvRowSource, SourceOptions};

/// One row source paired with the mapping applied to it.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub source: PathBuf,
    pub mapping: RelationshipMapping,
}

/// Ordered list of jobs for one run.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    pub jobs: Vec<ImportJob>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Completed { summary: MappingSummary },
    /// The source failed part way; `summary` covers the rows read before it.
    Aborted {
        error: String,
        summary: MappingSummary,
    },
}

impl JobStatus {
    pub fn summary(&self) -> &MappingSummary {
        match self {
            JobStatus::Completed { summary } | JobStatus::Aborted { summary, .. } => summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub source: PathBuf,
    pub relationship_type: String,
    pub mapping: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobReport {
    /// One human-readable line describing how the job ended.
    pub fn completion_line(&self) -> String {
        let summary = self.status.summary();
        let mut line = format!(
            "{} from {}: {} created, {} existing, {} skipped, {} failed",
            self.relationship_type,
            self.source.display(),
            summary.created,
            summary.matched_existing,
            summary.skipped,
            summary.failed,
        );
        if summary.applied > 0 {
            line.push_str(&format!(", {} applied", summary.applied));
        }
        match &self.status {
            JobStatus::Aborted { error, .. } => {
                line.push_str(&format!(" (aborted after {} rows: {error})", summary.processed));
            }
            JobStatus::Completed { .. } if summary.cancelled => line.push_str(" (cancelled)"),
            JobStatus::Completed { .. } => {}
        }
        line
    }
}

/// Totals across every job, including rows handled by aborted jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub processed: u64,
    pub created: u64,
    pub matched_existing: u64,
    pub applied: u64,
    pub skipped: u64,
    pub failed: u64,
    pub aborted_jobs: u64,
}

/// The only artifact that outlives a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when a shutdown signal cut the run short.
    pub cancelled: bool,
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    /// True iff every job read its whole source. Skipped and failed rows do
    /// not count against the run.
    pub fn succeeded(&self) -> bool {
        !self.cancelled
            && self.jobs.iter().all(|job| match &job.status {
                JobStatus::Completed { summary } => !summary.cancelled,
                JobStatus::Aborted { .. } => false,
            })
    }

    pub fn totals(&self) -> RunTotals {
        let mut totals = RunTotals::default();
        for job in &self.jobs {
            if let JobStatus::Aborted { .. } = job.status {
                totals.aborted_jobs += 1;
            }
            let summary = job.status.summary();
            totals.processed += summary.processed;
            totals.created += summary.created;
            totals.matched_existing += summary.matched_existing;
            totals.applied += summary.applied;
            totals.skipped += summary.skipped;
            totals.failed += summary.failed;
        }
        totals
    }

    /// Human-readable report: one line per job, the row failures, and a
    /// closing verdict.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for job in &self.jobs {
            out.push_str(&job.completion_line());
            out.push('\n');
            for failure in &job.status.summary().failures {
                out.push_str(&format!("  row {}: {}\n", failure.row, failure.reason));
            }
        }

        let totals = self.totals();
        let verdict = if self.succeeded() {
            "Import run succeeded"
        } else if self.cancelled {
            "Import run cancelled"
        } else {
            "Import run failed"
        };
        out.push_str(&format!(
            "{verdict}: {} jobs, {} rows, {} created, {} existing, {} skipped, {} failed\n",
            self.jobs.len(),
            totals.processed,
            totals.created,
            totals.matched_existing,
            totals.skipped,
            totals.failed,
        ));
        out
    }
}

/// Runs plans through an engine, opening each job's CSV source.
pub struct Orchestrator<E> {
    engine: ImportEngine<E>,
    source_options: SourceOptions,
}

impl<E: UpsertExecutor + 'static> Orchestrator<E> {
    pub fn new(engine: ImportEngine<E>, source_options: SourceOptions) -> Self {
        Self {
            engine,
            source_options,
        }
    }

    pub async fn run(&self, plan: &ImportPlan) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut jobs = Vec::with_capacity(plan.jobs.len());
        let mut cancelled = false;

        tracing::info!(run_id = %run_id, jobs = plan.jobs.len(), "Import run started");

        for job in &plan.jobs {
            if self.engine.is_shutting_down() {
                tracing::warn!(run_id = %run_id, "Shutdown requested, remaining jobs not started");
                cancelled = true;
                break;
            }

            let status = match self.run_job(job).await {
                Ok(summary) => JobStatus::Completed { summary },
                Err(ImportAborted { summary, error }) => {
                    tracing::error!(
                        run_id = %run_id,
                        source = %job.source.display(),
                        rel_type = %job.mapping.relationship_type(),
                        processed = summary.processed,
                        error = %error,
                        "Job aborted"
                    );
                    JobStatus::Aborted {
                        error: error.to_string(),
                        summary,
                    }
                }
            };

            let report = JobReport {
                source: job.source.clone(),
                relationship_type: job.mapping.relationship_type().to_string(),
                mapping: job.mapping.to_string(),
                status,
            };
            tracing::info!(run_id = %run_id, "{}", report.completion_line());
            jobs.push(report);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            jobs,
        };

        let totals = report.totals();
        tracing::info!(
            run_id = %run_id,
            succeeded = report.succeeded(),
            processed = totals.processed,
            created = totals.created,
            failed = totals.failed,
            aborted_jobs = totals.aborted_jobs,
            "Import run finished"
        );
        report
    }

    async fn run_job(&self, job: &ImportJob) -> Result<MappingSummary, ImportAborted> {
        let rows = CsvRowSource::open(&job.source, &self.source_options).map_err(|error| {
            ImportAborted {
                summary: MappingSummary::new(job.mapping.relationship_type()),
                error,
            }
        })?;
        tracing::info!(
            source = %job.source.display(),
            mapping = %job.mapping,
            "Importing relationships"
        );
        self.engine.import_relationships(rows, &job.mapping).await
    }
}
