//! Configuration for graphlink.
//!
//! Loaded from (in priority order):
//! 1. Environment variables (`GRAPHLINK__` prefix, `__` separator,
//!    e.g. `GRAPHLINK__NEO4J__PASSWORD`)
//! 2. Config file (`graphlink.toml` by default)
//! 3. Defaults
//!
//! Store credentials have no default and must come from one of the first two.

use std::path::PathBuf;

use serde::Deserialize;

use graphlink_core::{ConfigurationError, EndpointMapping, FieldSelector, RelationshipMapping};
use graphlink_graph::GraphConfig;

use crate::engine::EngineOptions;
use crate::error::{ImportError, Result};
use crate::orchestrator::{ImportJob, ImportPlan};
use crate::source::SourceOptions;

/// The `[import]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Maximum upserts in flight per mapping.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Field delimiter for CSV sources.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Trim whitespace around CSV fields.
    #[serde(default = "default_true")]
    pub trim: bool,

    /// Relationship jobs, run in declaration order.
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

/// One `[[import.jobs]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    /// Path of the CSV file supplying the rows.
    pub source: PathBuf,

    pub relationship_type: String,

    pub from: EndpointSpec,

    pub to: EndpointSpec,

    /// Disabled jobs stay declared but are not run.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One side of a job: `{ label, key, column }` or `{ label, key, field }`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSpec {
    pub label: String,
    pub key: String,

    /// Zero-based column position.
    #[serde(default)]
    pub column: Option<usize>,

    /// Header column name.
    #[serde(default)]
    pub field: Option<String>,
}

impl EndpointSpec {
    fn build(
        &self,
        selector_field: &'static str,
    ) -> std::result::Result<EndpointMapping, ConfigurationError> {
        let selector = match (self.column, &self.field) {
            (Some(idx), None) => FieldSelector::Position(idx),
            (None, Some(name)) => FieldSelector::Name(name.clone()),
            (Some(_), Some(_)) => {
                return Err(ConfigurationError::AmbiguousSelector {
                    field: selector_field,
                })
            }
            (None, None) => {
                return Err(ConfigurationError::EmptyField {
                    field: selector_field,
                })
            }
        };
        Ok(EndpointMapping::new(&self.label, &self.key, selector))
    }
}

impl JobSpec {
    /// Validate this entry into a relationship mapping.
    pub fn mapping(&self) -> std::result::Result<RelationshipMapping, ConfigurationError> {
        RelationshipMapping::new(
            self.from.build("from.selector")?,
            self.to.build("to.selector")?,
            &self.relationship_type,
        )
    }
}

impl ImportConfig {
    /// Build the run plan from every enabled job. Any invalid mapping fails
    /// the whole plan before a single row is read.
    pub fn plan(&self) -> Result<ImportPlan> {
        let mut jobs = Vec::new();
        for spec in &self.jobs {
            if !spec.enabled {
                tracing::info!(
                    rel_type = %spec.relationship_type,
                    source = %spec.source.display(),
                    "Job disabled, skipping"
                );
                continue;
            }
            jobs.push(ImportJob {
                source: spec.source.clone(),
                mapping: spec.mapping()?,
            });
        }
        Ok(ImportPlan { jobs })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            concurrency: self.concurrency.max(1),
        }
    }

    pub fn source_options(&self) -> Result<SourceOptions> {
        if !self.delimiter.is_ascii() {
            return Err(ImportError::Config(format!(
                "import.delimiter must be an ASCII character, got {:?}",
                self.delimiter
            )));
        }
        Ok(SourceOptions {
            delimiter: self.delimiter as u8,
            trim: self.trim,
        })
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            delimiter: default_delimiter(),
            trim: true,
            jobs: Vec::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Layer the config file and environment.
pub fn load(file_prefix: &str) -> Result<config::Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("GRAPHLINK")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(cfg)
}

/// Read the `[import]` section, falling back to defaults when absent.
pub fn import_config(cfg: &config::Config) -> Result<ImportConfig> {
    match cfg.get::<ImportConfig>("import") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(ImportConfig::default()),
        Err(e) => Err(e.into()),
    }
}

/// Read the `[neo4j]` section. A missing password is an error.
pub fn graph_config(cfg: &config::Config) -> Result<GraphConfig> {
    let defaults = GraphConfig::default();
    let password = cfg.get_string("neo4j.password").map_err(|_| {
        ImportError::Config(
            "neo4j.password is not set (config file or GRAPHLINK__NEO4J__PASSWORD)".to_string(),
        )
    })?;

    Ok(GraphConfig {
        uri: cfg.get_string("neo4j.uri").unwrap_or(defaults.uri),
        user: cfg.get_string("neo4j.user").unwrap_or(defaults.user),
        password,
        max_connections: cfg
            .get::<u32>("neo4j.max_connections")
            .unwrap_or(defaults.max_connections),
        fetch_size: cfg
            .get::<usize>("neo4j.fetch_size")
            .unwrap_or(defaults.fetch_size),
    })
}
