pub mod aggregator;
pub mod input;
pub mod path_parser;
pub mod report;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::shared::{AsRankError, Result};

pub use aggregator::{
    path_contributions, AggregateTables, AggregationOutput, Aggregator, AggregatorConfig,
    ASNStats, Contribution, RelationshipKey,
};
pub use path_parser::{AsSetPolicy, PathParser};

pub const ASN_STATS_FILE: &str = "asn_stats.csv";
pub const RELATIONSHIPS_FILE: &str = "relationships.csv";
pub const TOP_ASNS_FILE: &str = "top_asns.txt";
pub const SUMMARY_FILE: &str = "summary.json";

/// Configuration for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// BGP table dump, plain, `.gz` or `.bz2`
    pub input: PathBuf,

    /// Directory receiving all stage-1 outputs
    pub output_dir: PathBuf,

    pub parser: PathParser,

    pub aggregator: AggregatorConfig,
}

impl ExtractConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        ExtractConfig {
            input: input.into(),
            output_dir: PathBuf::from("output"),
            parser: PathParser::new(),
            aggregator: AggregatorConfig::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_parser(mut self, parser: PathParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_aggregator(mut self, aggregator: AggregatorConfig) -> Self {
        self.aggregator = aggregator;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub input: PathBuf,
    pub lines_read: u64,
    pub paths_collected: u64,
    pub unique_asns: usize,
    pub unique_relationships: usize,
    pub workers: usize,
    pub elapsed_secs: f64,
    pub finished_at: DateTime<Utc>,
}

/// Runs stage 1 end to end: dump in, statistics, relationships and reports out.
pub struct Extractor {
    pub config: ExtractConfig,
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Self {
        Extractor { config }
    }

    pub fn run(&self) -> Result<ExtractionSummary> {
        let start = Instant::now();
        self.config.aggregator.validate()?;

        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| AsRankError::write(output_dir, e))?;

        info!(input = %self.config.input.display(), workers = self.config.aggregator.workers, "extracting AS paths");
        let reader = input::open_input(&self.config.input)?;
        let aggregator = Aggregator::new(self.config.parser.clone(), self.config.aggregator.clone());
        let AggregationOutput { tables, lines_read } = aggregator.run(reader)?;

        let ranking = report::rank_asns(&tables);
        report::write_asn_stats(&output_dir.join(ASN_STATS_FILE), &ranking)?;
        report::write_relationships(
            &output_dir.join(RELATIONSHIPS_FILE),
            &report::sorted_relationships(&tables),
        )?;
        report::write_top_asns(&output_dir.join(TOP_ASNS_FILE), &ranking)?;

        let summary = ExtractionSummary {
            input: self.config.input.clone(),
            lines_read,
            paths_collected: tables.paths,
            unique_asns: tables.stats.len(),
            unique_relationships: tables.relationships.len(),
            workers: self.config.aggregator.workers,
            elapsed_secs: start.elapsed().as_secs_f64(),
            finished_at: Utc::now(),
        };
        let summary_path = output_dir.join(SUMMARY_FILE);
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
            .map_err(|e| AsRankError::write(&summary_path, e))?;

        info!(
            asns = summary.unique_asns,
            relationships = summary.unique_relationships,
            elapsed_secs = summary.elapsed_secs,
            "extraction complete"
        );
        Ok(summary)
    }
}
