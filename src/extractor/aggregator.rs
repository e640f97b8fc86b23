use std::collections::HashMap;
use std::io::BufRead;
use std::mem;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::shared::{AsRankError, NeighborSide, Result, ASN};

use super::path_parser::PathParser;

const READ_PROGRESS_INTERVAL: u64 = 100_000;
const MERGE_PROGRESS_INTERVAL: u64 = 10_000;

/// Per-AS neighbor statistics accumulated over every observed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASNStats {
    pub asn: ASN,
    /// Upstream neighbors and how often each was seen.
    pub left_neighbors: HashMap<ASN, u64>,
    /// Downstream neighbors and how often each was seen.
    pub right_neighbors: HashMap<ASN, u64>,
    pub total_paths: u64,
}

impl ASNStats {
    pub fn new(asn: ASN) -> Self {
        ASNStats {
            asn,
            left_neighbors: HashMap::new(),
            right_neighbors: HashMap::new(),
            total_paths: 0,
        }
    }

    pub fn left_count(&self) -> usize {
        self.left_neighbors.len()
    }

    pub fn right_count(&self) -> usize {
        self.right_neighbors.len()
    }

    pub fn total_neighbors(&self) -> usize {
        self.left_count() + self.right_count()
    }

    fn merge(&mut self, other: ASNStats) {
        for (asn, count) in other.left_neighbors {
            *self.left_neighbors.entry(asn).or_insert(0) += count;
        }
        for (asn, count) in other.right_neighbors {
            *self.right_neighbors.entry(asn).or_insert(0) += count;
        }
        self.total_paths += other.total_paths;
    }
}

/// Directed, side-typed adjacency: `to` was seen on `side` of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipKey {
    pub from: ASN,
    pub to: ASN,
    pub side: NeighborSide,
}

impl RelationshipKey {
    pub fn new(from: impl Into<ASN>, to: impl Into<ASN>, side: NeighborSide) -> Self {
        RelationshipKey {
            from: from.into(),
            to: to.into(),
            side,
        }
    }
}

/// What one position of a path adds to the tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub asn: ASN,
    pub left: Option<ASN>,
    pub right: Option<ASN>,
}

/// Splits a path into one contribution per position. Stateless, safe to run on any thread.
pub fn path_contributions(path: &[ASN]) -> Vec<Contribution> {
    path.iter()
        .enumerate()
        .map(|(i, asn)| Contribution {
            asn: asn.clone(),
            left: if i > 0 { Some(path[i - 1].clone()) } else { None },
            right: path.get(i + 1).cloned(),
        })
        .collect()
}

/// The two result tables of an aggregation run.
///
/// Applying contributions and merging tables are both commutative and associative, so the
/// final tables do not depend on how paths were partitioned or in which order they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateTables {
    pub stats: HashMap<ASN, ASNStats>,
    pub relationships: HashMap<RelationshipKey, u64>,
    /// Number of paths applied.
    pub paths: u64,
}

impl AggregateTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates paths on the calling thread. Paths with fewer than two hops are skipped.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[ASN]>,
    {
        let mut tables = Self::new();
        for path in paths {
            tables.add_path(path.as_ref());
        }
        tables
    }

    pub fn add_path(&mut self, path: &[ASN]) {
        if path.len() >= 2 {
            self.apply_path(path_contributions(path));
        }
    }

    pub fn apply_path(&mut self, contributions: Vec<Contribution>) {
        for contribution in contributions {
            let Contribution { asn, left, right } = contribution;
            let stats = self
                .stats
                .entry(asn.clone())
                .or_insert_with(|| ASNStats::new(asn.clone()));
            stats.total_paths += 1;

            if let Some(left) = left {
                *stats.left_neighbors.entry(left.clone()).or_insert(0) += 1;
                *self
                    .relationships
                    .entry(RelationshipKey::new(asn.clone(), left, NeighborSide::Left))
                    .or_insert(0) += 1;
            }

            if let Some(right) = right {
                *stats.right_neighbors.entry(right.clone()).or_insert(0) += 1;
                *self
                    .relationships
                    .entry(RelationshipKey::new(asn.clone(), right, NeighborSide::Right))
                    .or_insert(0) += 1;
            }
        }
        self.paths += 1;
    }

    pub fn merge(&mut self, other: AggregateTables) {
        for (asn, stats) in other.stats {
            match self.stats.get_mut(&asn) {
                Some(existing) => existing.merge(stats),
                None => {
                    self.stats.insert(asn, stats);
                }
            }
        }
        for (key, count) in other.relationships {
            *self.relationships.entry(key).or_insert(0) += count;
        }
        self.paths += other.paths;
    }

    pub fn get(&self, asn: &str) -> Option<&ASNStats> {
        self.stats.get(asn)
    }

    pub fn relationship_count(&self, from: &str, to: &str, side: NeighborSide) -> u64 {
        self.relationships
            .get(&RelationshipKey::new(from, to, side))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Number of parsing workers.
    pub workers: usize,
    /// Capacity of each queue, in batches. Defaults to four batches per worker.
    pub queue_capacity: Option<usize>,
    /// Lines handed to a worker at a time.
    pub batch_size: usize,
    /// Show a spinner while reading and log merge counters.
    pub progress: bool,
}

impl AggregatorConfig {
    pub fn new() -> Self {
        AggregatorConfig {
            workers: num_cpus::get().max(1),
            queue_capacity: None,
            batch_size: 512,
            progress: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers * 4)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AsRankError::config("workers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(AsRankError::config("batch size must be at least 1"));
        }
        if self.effective_queue_capacity() == 0 {
            return Err(AsRankError::config("queue capacity must be at least 1"));
        }
        Ok(())
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct AggregationOutput {
    pub tables: AggregateTables,
    pub lines_read: u64,
}

type LineBatch = Vec<String>;
type ContributionBatch = Vec<Vec<Contribution>>;

/// Reader -> worker pool -> single merger pipeline.
///
/// The calling thread reads lines into bounded batches, workers normalize them into
/// contribution batches on a second bounded queue, and one merger thread owns the result
/// tables and applies every contribution. Shutdown is by channel closure: the reader drops
/// its sender at end of input, workers exit once the line queue is drained, and the merger
/// exits after the last worker has dropped its sender.
pub struct Aggregator {
    pub parser: PathParser,
    pub config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(parser: PathParser, config: AggregatorConfig) -> Self {
        Aggregator { parser, config }
    }

    pub fn run<R: BufRead>(&self, reader: R) -> Result<AggregationOutput> {
        self.config.validate()?;
        let capacity = self.config.effective_queue_capacity();
        let progress = self.progress_bar()?;

        let (line_tx, line_rx) = mpsc::sync_channel::<LineBatch>(capacity);
        let (path_tx, path_rx) = mpsc::sync_channel::<ContributionBatch>(capacity);
        let line_rx = Arc::new(Mutex::new(line_rx));

        let (tables, lines_read) = thread::scope(|scope| -> Result<(AggregateTables, u64)> {
            let log_merges = self.config.progress;
            let merger = scope.spawn(move || merge_contributions(path_rx, log_merges));

            let workers: Vec<_> = (0..self.config.workers)
                .map(|id| {
                    let lines = Arc::clone(&line_rx);
                    let paths = path_tx.clone();
                    let parser = &self.parser;
                    scope.spawn(move || run_worker(id, parser, lines, paths))
                })
                .collect();
            // Workers now hold the only handles on both queues besides the reader's sender.
            drop(path_tx);
            drop(line_rx);

            let read_result = self.feed_lines(reader, line_tx, &progress);

            for worker in workers {
                worker
                    .join()
                    .map_err(|_| AsRankError::ThreadPanicked("worker"))?;
            }
            let tables = merger
                .join()
                .map_err(|_| AsRankError::ThreadPanicked("merger"))?;

            Ok((tables, read_result?))
        })?;

        progress.finish_and_clear();
        info!(
            lines = lines_read,
            paths = tables.paths,
            asns = tables.stats.len(),
            relationships = tables.relationships.len(),
            "aggregation finished"
        );

        Ok(AggregationOutput { tables, lines_read })
    }

    fn progress_bar(&self) -> Result<ProgressBar> {
        if !self.config.progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner} {pos} lines read")?,
        );
        Ok(pb)
    }

    fn feed_lines<R: BufRead>(
        &self,
        mut reader: R,
        lines: SyncSender<LineBatch>,
        progress: &ProgressBar,
    ) -> Result<u64> {
        let batch_size = self.config.batch_size;
        let mut buf = Vec::with_capacity(4096);
        let mut batch = Vec::with_capacity(batch_size);
        let mut lines_read = 0u64;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).map_err(AsRankError::Read)?;
            if n == 0 {
                break;
            }
            batch.push(String::from_utf8_lossy(&buf).into_owned());
            lines_read += 1;

            if lines_read % READ_PROGRESS_INTERVAL == 0 {
                progress.set_position(lines_read);
            }

            if batch.len() == batch_size {
                let full = mem::replace(&mut batch, Vec::with_capacity(batch_size));
                if lines.send(full).is_err() {
                    // Every worker is gone; the join reports why.
                    break;
                }
            }
        }

        if !batch.is_empty() && lines.send(batch).is_err() {
            // Every worker is gone; the join reports why.
            debug!("final line batch dropped, no worker left to take it");
        }
        progress.set_position(lines_read);
        Ok(lines_read)
    }
}

fn run_worker(
    id: usize,
    parser: &PathParser,
    lines: Arc<Mutex<Receiver<LineBatch>>>,
    paths: SyncSender<ContributionBatch>,
) {
    let mut handled = 0u64;
    loop {
        let batch = match lines.lock() {
            Ok(rx) => match rx.recv() {
                Ok(batch) => batch,
                Err(_) => break,
            },
            Err(_) => break,
        };

        let contributions: ContributionBatch = batch
            .iter()
            .filter_map(|line| parser.parse_line(line))
            .filter(|path| path.len() >= 2)
            .map(|path| path_contributions(&path))
            .collect();
        handled += batch.len() as u64;

        if contributions.is_empty() {
            continue;
        }
        if paths.send(contributions).is_err() {
            break;
        }
    }
    debug!(worker = id, lines = handled, "worker finished");
}

fn merge_contributions(paths: Receiver<ContributionBatch>, log_progress: bool) -> AggregateTables {
    let mut tables = AggregateTables::new();
    let mut next_report = MERGE_PROGRESS_INTERVAL;

    for batch in paths {
        for path in batch {
            tables.apply_path(path);
        }
        if log_progress && tables.paths >= next_report {
            info!(paths = tables.paths, "collected paths");
            while next_report <= tables.paths {
                next_report += MERGE_PROGRESS_INTERVAL;
            }
        }
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(asns: &[&str]) -> Vec<ASN> {
        asns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn contributions_cover_every_position() {
        let contributions = path_contributions(&path(&["1", "2", "3"]));
        assert_eq!(contributions.len(), 3);
        assert_eq!(contributions[0].left, None);
        assert_eq!(contributions[0].right.as_deref(), Some("2"));
        assert_eq!(contributions[1].left.as_deref(), Some("1"));
        assert_eq!(contributions[1].right.as_deref(), Some("3"));
        assert_eq!(contributions[2].right, None);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = AggregatorConfig::new().with_workers(0);
        assert!(config.validate().is_err());
    }
}
