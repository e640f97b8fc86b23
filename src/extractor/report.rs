use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::shared::{AsRankError, Result, ASN};

use super::aggregator::{AggregateTables, RelationshipKey};

pub const TOP_ASN_LIMIT: usize = 100;
pub const TIER1_MIN_TOTAL: usize = 50;
pub const TIER1_MAX_LEFT: usize = 10;
pub const TIER1_MIN_RIGHT: usize = 20;
pub const TIER1_LIMIT: usize = 20;

/// One row of the ASN statistics table. Counts are distinct neighbors, not observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsnRank {
    pub asn: ASN,
    pub left: usize,
    pub right: usize,
    pub total: usize,
    pub total_paths: u64,
}

impl AsnRank {
    pub fn percent_downstream(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.right as f64 / self.total as f64 * 100.0
    }
}

/// All ASNs, most neighbors first. Ties are broken by identifier.
pub fn rank_asns(tables: &AggregateTables) -> Vec<AsnRank> {
    let mut ranking: Vec<AsnRank> = tables
        .stats
        .values()
        .map(|stats| AsnRank {
            asn: stats.asn.clone(),
            left: stats.left_count(),
            right: stats.right_count(),
            total: stats.total_neighbors(),
            total_paths: stats.total_paths,
        })
        .collect();
    ranking.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.asn.cmp(&b.asn)));
    ranking
}

/// ASNs that look like the top of the hierarchy: many neighbors, almost all downstream.
pub fn tier1_candidates(ranking: &[AsnRank]) -> Vec<AsnRank> {
    let mut candidates: Vec<AsnRank> = ranking
        .iter()
        .filter(|rank| {
            rank.total > TIER1_MIN_TOTAL
                && rank.left < TIER1_MAX_LEFT
                && rank.right > TIER1_MIN_RIGHT
        })
        .cloned()
        .collect();
    // Stable, so equal left counts keep their neighbor-count order.
    candidates.sort_by_key(|rank| rank.left);
    candidates.truncate(TIER1_LIMIT);
    candidates
}

/// Relationship edges, most observed first. Ties are broken by key.
pub fn sorted_relationships(tables: &AggregateTables) -> Vec<(&RelationshipKey, u64)> {
    let mut rows: Vec<(&RelationshipKey, u64)> = tables
        .relationships
        .iter()
        .map(|(key, &count)| (key, count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

pub fn write_asn_stats(path: &Path, ranking: &[AsnRank]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "ASN,Left_Count,Right_Count,Total_Neighbors,Total_Paths")?;
        for rank in ranking {
            writeln!(
                out,
                "{},{},{},{},{}",
                rank.asn, rank.left, rank.right, rank.total, rank.total_paths
            )?;
        }
        out.flush()
    };
    write().map_err(|e| AsRankError::write(path, e))?;

    info!(path = %path.display(), rows = ranking.len(), "wrote ASN statistics");
    Ok(())
}

pub fn write_relationships(path: &Path, rows: &[(&RelationshipKey, u64)]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "From_ASN,To_ASN,Type,Count")?;
        for (key, count) in rows {
            writeln!(out, "{},{},{},{}", key.from, key.to, key.side, count)?;
        }
        out.flush()
    };
    write().map_err(|e| AsRankError::write(path, e))?;

    info!(path = %path.display(), rows = rows.len(), "wrote relationships");
    Ok(())
}

pub fn render_top_asns(ranking: &[AsnRank]) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "Top {} ASNs by Total Neighbor Count", TOP_ASN_LIMIT);
    let _ = writeln!(report, "=====================================\n");
    for (i, rank) in ranking.iter().take(TOP_ASN_LIMIT).enumerate() {
        let _ = writeln!(
            report,
            "{:>3}. AS{:<6} - Left: {:>4}, Right: {:>4}, Total: {:>4}",
            i + 1,
            rank.asn,
            rank.left,
            rank.right,
            rank.total
        );
    }

    let _ = writeln!(report, "\n\nTier 1 Analysis (ASNs with very few left neighbors)");
    let _ = writeln!(report, "===================================================\n");
    for rank in tier1_candidates(ranking) {
        let _ = writeln!(
            report,
            "AS{:<6} - Left: {:>4}, Right: {:>4} ({:.1}% downstream)",
            rank.asn,
            rank.left,
            rank.right,
            rank.percent_downstream()
        );
    }

    report
}

pub fn write_top_asns(path: &Path, ranking: &[AsnRank]) -> Result<()> {
    fs::write(path, render_top_asns(ranking)).map_err(|e| AsRankError::write(path, e))?;
    info!(path = %path.display(), "wrote top ASN analysis");
    Ok(())
}
