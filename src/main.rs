use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ascone::extractor::{AggregatorConfig, AsSetPolicy, ExtractConfig, Extractor, PathParser};
use ascone::shared::{DEFAULT_PROVIDER_RATIO, DEFAULT_RECORD_TYPE, DEFAULT_TOP_N};
use ascone::topology::{ConeConfig, ConeRunner, HeaderMode};

#[derive(Parser)]
#[command(name = "ascone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract AS adjacency statistics from a BGP table dump
    Extract {
        /// Table dump in bgpdump -m format (plain, .gz or .bz2)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Queue capacity in batches (defaults to 4 per worker)
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Lines per batch handed to a worker
        #[arg(long, default_value_t = 512)]
        batch_size: usize,

        /// Record type accepted in field 0
        #[arg(long, default_value = DEFAULT_RECORD_TYPE)]
        record_type: String,

        /// What to keep from AS sets: first or discard
        #[arg(long, default_value = "first")]
        as_set_policy: AsSetPolicy,

        /// Periodic progress output (also enabled by -v)
        #[arg(long)]
        progress: bool,
    },

    /// Infer provider/customer links and rank ASNs by customer cone size
    Cone {
        /// Edge list, e.g. relationships.csv from `extract`
        #[arg(short, long)]
        input: PathBuf,

        /// Ranked output table
        #[arg(short, long, default_value = "as_rank_caida.csv")]
        output: PathBuf,

        /// Number of top ASNs to display
        #[arg(short, long, default_value_t = DEFAULT_TOP_N)]
        top: usize,

        /// Degree ratio a provider needs over its customer
        #[arg(long, default_value_t = DEFAULT_PROVIDER_RATIO)]
        ratio: f64,

        /// Header row handling: auto, present or absent
        #[arg(long, default_value = "auto")]
        header: HeaderMode,

        /// ASN that may never be inferred as a customer (repeatable)
        #[arg(long = "protect", value_name = "ASN")]
        protected: Vec<String>,

        /// Also write the provider -> customers graph as JSON
        #[arg(long)]
        graph_json: Option<PathBuf>,
    },
}

impl Cli {
    /// Periodic progress is on with `--progress` or any `-v`.
    fn progress_enabled(&self, progress_flag: bool) -> bool {
        progress_flag || self.verbose > 0
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let extract_progress = match &cli.command {
        Commands::Extract { progress, .. } => cli.progress_enabled(*progress),
        Commands::Cone { .. } => false,
    };

    match cli.command {
        Commands::Extract {
            input,
            output,
            workers,
            queue_capacity,
            batch_size,
            record_type,
            as_set_policy,
            ..
        } => {
            let mut aggregator = AggregatorConfig::new()
                .with_batch_size(batch_size)
                .with_progress(extract_progress);
            if let Some(workers) = workers {
                aggregator = aggregator.with_workers(workers);
            }
            if let Some(capacity) = queue_capacity {
                aggregator = aggregator.with_queue_capacity(capacity);
            }
            let parser = PathParser::new()
                .with_record_type(record_type)
                .with_as_set_policy(as_set_policy);

            let config = ExtractConfig::new(&input)
                .with_output_dir(&output)
                .with_parser(parser)
                .with_aggregator(aggregator);
            let summary = Extractor::new(config)
                .run()
                .with_context(|| format!("extraction of {} failed", input.display()))?;

            println!("\nProcessing complete in {:.2}s", summary.elapsed_secs);
            println!("Analyzed {} unique ASNs", summary.unique_asns);
            println!("Found {} unique AS relationships", summary.unique_relationships);
            println!("Results written to: {}/", output.display());
        }
        Commands::Cone {
            input,
            output,
            top,
            ratio,
            header,
            protected,
            graph_json,
        } => {
            let mut config = ConeConfig::new(&input)
                .with_output(&output)
                .with_top_n(top)
                .with_provider_ratio(ratio)
                .with_header(header)
                .with_protected_asns(protected);
            if let Some(path) = graph_json {
                config = config.with_graph_json(path);
            }

            let report = ConeRunner::new(config)
                .run()
                .with_context(|| format!("cone computation on {} failed", input.display()))?;

            print!("{}", report.top_table(top));
            println!(
                "\nInferred {} customer links and {} peering links.",
                report.stats.customer_links, report.stats.peer_links
            );
            println!(
                "Done in {:.2}s. Results saved to {}",
                report.elapsed_secs,
                output.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_progress(args: &[&str]) -> bool {
        let cli = Cli::try_parse_from(args).unwrap();
        match &cli.command {
            Commands::Extract { progress, .. } => cli.progress_enabled(*progress),
            Commands::Cone { .. } => panic!("expected the extract subcommand"),
        }
    }

    #[test]
    fn verbose_turns_on_progress() {
        assert!(!extract_progress(&["ascone", "extract", "-i", "rib.gz"]));
        assert!(extract_progress(&["ascone", "-v", "extract", "-i", "rib.gz"]));
        assert!(extract_progress(&["ascone", "extract", "-i", "rib.gz", "--verbose"]));
        assert!(extract_progress(&["ascone", "extract", "-i", "rib.gz", "--progress"]));
    }
}
