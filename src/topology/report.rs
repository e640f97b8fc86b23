use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::shared::{AsRankError, Result};

use super::graph::{CustomerGraph, TopologyNode};

pub fn write_cone_ranking(path: &Path, ranking: &[&TopologyNode]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "Rank,ASN,Cone_Size,Node_Degree,Direct_Customers")?;
        for (i, node) in ranking.iter().enumerate() {
            writeln!(
                out,
                "{},{},{},{},{}",
                i + 1,
                node.asn,
                node.cone_size,
                node.degree,
                node.customers.len()
            )?;
        }
        out.flush()
    };
    write().map_err(|e| AsRankError::write(path, e))?;

    info!(path = %path.display(), rows = ranking.len(), "wrote cone ranking");
    Ok(())
}

/// Console table of the `top_n` largest cones with their customer efficiency ratio.
pub fn render_top_cones(ranking: &[&TopologyNode], top_n: usize) -> String {
    let mut table = String::new();

    let _ = writeln!(table, "\n=== TOP {} ASNs BY CONE SIZE ===", top_n);
    let _ = writeln!(
        table,
        "{:<6} {:<10} {:<12} {:<12} {:<10}",
        "Rank", "ASN", "Cone", "Degree", "Ratio"
    );
    let _ = writeln!(table, "{}", "-".repeat(55));

    for (i, node) in ranking.iter().take(top_n).enumerate() {
        let _ = writeln!(
            table,
            "{:<6} AS{:<8} {:<12} {:<12} {:.1}x",
            i + 1,
            node.asn,
            node.cone_size,
            node.degree,
            node.customer_efficiency()
        );
    }

    table
}

pub fn write_downstream_graph(path: &Path, graph: &CustomerGraph) -> Result<()> {
    let downstream = graph.downstream_map();
    let json = serde_json::to_string_pretty(&downstream)?;
    fs::write(path, json).map_err(|e| AsRankError::write(path, e))?;

    info!(path = %path.display(), providers = downstream.len(), "wrote downstream graph");
    Ok(())
}
