use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use ascone::extractor::report::{rank_asns, render_top_asns};
use ascone::extractor::{AggregateTables, AggregatorConfig, ExtractConfig, Extractor};
use ascone::shared::AsRankError;
use ascone::topology::{ConeConfig, ConeRunner, HeaderMode};

fn dump(paths: &[&str]) -> String {
    paths
        .iter()
        .map(|path| format!("TABLE_DUMP2|1609459200|B|192.0.2.1|65000|10.0.0.0/8|{}|IGP\n", path))
        .collect()
}

fn sample_dump() -> String {
    dump(&["10 20 1", "10 20 2", "10 20 3", "10 20 4", "10 20 5", "10 30 6"])
}

fn extract(dir: &Path, input: PathBuf) -> ascone::Result<ascone::extractor::ExtractionSummary> {
    let config = ExtractConfig::new(input)
        .with_output_dir(dir.join("out"))
        .with_aggregator(AggregatorConfig::new().with_workers(2).with_batch_size(2));
    Extractor::new(config).run()
}

#[test]
fn test_extract_then_rank_cones() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("rib.txt");
    fs::write(&input, sample_dump()).unwrap();

    let summary = extract(dir.path(), input).unwrap();
    assert_eq!(summary.lines_read, 6);
    assert_eq!(summary.paths_collected, 6);
    assert_eq!(summary.unique_asns, 9);
    // 10-20, 10-30, 20-1..20-5, 30-6 in both directions.
    assert_eq!(summary.unique_relationships, 16);

    let out = dir.path().join("out");
    let stats = fs::read_to_string(out.join("asn_stats.csv")).unwrap();
    let mut lines = stats.lines();
    assert_eq!(
        lines.next(),
        Some("ASN,Left_Count,Right_Count,Total_Neighbors,Total_Paths")
    );
    assert_eq!(lines.next(), Some("20,1,5,6,5"));
    assert_eq!(lines.next(), Some("10,0,2,2,6"));

    let relationships = fs::read_to_string(out.join("relationships.csv")).unwrap();
    assert!(relationships.starts_with("From_ASN,To_ASN,Type,Count\n10,20,right,5\n20,10,left,5\n"));
    assert!(relationships.contains("\n20,1,right,1\n"));

    let summary_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary_json["unique_asns"], 9);
    assert_eq!(summary_json["workers"], 2);
    assert!(summary_json["finished_at"].is_string());

    assert!(fs::read_to_string(out.join("top_asns.txt"))
        .unwrap()
        .starts_with("Top 100 ASNs by Total Neighbor Count"));

    // Stage 2 reads the relationship table directly.
    let ranking = dir.path().join("cones.csv");
    let graph_json = dir.path().join("graph.json");
    let config = ConeConfig::new(out.join("relationships.csv"))
        .with_output(&ranking)
        .with_graph_json(&graph_json);
    let report = ConeRunner::new(config).run().unwrap();

    assert_eq!(report.edges_read, 16);
    assert_eq!(report.stats.total_links, 8);
    // 20 (degree 6) over its five leaves; 10-20, 10-30 and 30-6 stay peers.
    assert_eq!(report.stats.customer_links, 5);
    assert_eq!(report.stats.peer_links, 3);
    assert_eq!(report.cyclic_components, 0);

    let table = fs::read_to_string(&ranking).unwrap();
    let mut rows = table.lines();
    assert_eq!(rows.next(), Some("Rank,ASN,Cone_Size,Node_Degree,Direct_Customers"));
    assert_eq!(rows.next(), Some("1,20,5,6,5"));
    assert_eq!(table.lines().count(), 10);

    let downstream: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&graph_json).unwrap()).unwrap();
    assert_eq!(downstream["20"], serde_json::json!(["1", "2", "3", "4", "5"]));
    assert!(downstream.get("10").is_none());

    let top = report.top_table(1);
    assert!(top.contains("=== TOP 1 ASNs BY CONE SIZE ==="));
    assert!(top.contains("AS20"));
    assert!(top.contains("1.0x"));
}

#[test]
fn test_gzip_input_matches_plain() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("rib.txt.gz");
    let mut encoder = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
    encoder.write_all(sample_dump().as_bytes()).unwrap();
    encoder.finish().unwrap();

    let summary = extract(dir.path(), input).unwrap();
    assert_eq!(summary.paths_collected, 6);
    assert_eq!(summary.unique_relationships, 16);
}

#[test]
fn test_bzip2_input_matches_plain() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("rib.txt.bz2");
    let mut encoder = BzEncoder::new(File::create(&input).unwrap(), bzip2::Compression::default());
    encoder.write_all(sample_dump().as_bytes()).unwrap();
    encoder.finish().unwrap();

    let summary = extract(dir.path(), input).unwrap();
    assert_eq!(summary.lines_read, 6);
    assert_eq!(summary.paths_collected, 6);
    assert_eq!(summary.unique_relationships, 16);
}

#[test]
fn test_missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.txt");

    let result = extract(dir.path(), missing.clone());
    match result {
        Err(AsRankError::OpenInput { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected an open error, got {:?}", other),
    }

    let result = ConeRunner::new(ConeConfig::new(&missing)).run();
    assert!(matches!(result, Err(AsRankError::OpenInput { .. })));
}

#[test]
fn test_cone_runner_with_headerless_input_and_protection() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("edges.csv");
    let mut edges = String::new();
    for leaf in 1..=5 {
        edges.push_str(&format!("100,{}\n", leaf));
    }
    fs::write(&input, edges).unwrap();

    let config = ConeConfig::new(&input)
        .with_output(dir.path().join("cones.csv"))
        .with_header(HeaderMode::Absent)
        .with_protected_asns(vec!["5".to_string()]);
    let report = ConeRunner::new(config).run().unwrap();

    assert_eq!(report.edges_read, 5);
    assert_eq!(report.stats.protected_dropped, 1);
    assert_eq!(report.graph.get("100").unwrap().cone_size, 4);
}

#[test]
fn test_invalid_ratio_fails_before_reading() {
    let dir = TempDir::new().unwrap();
    let config = ConeConfig::new(dir.path().join("missing.csv")).with_provider_ratio(-1.0);
    let result = ConeRunner::new(config).run();
    assert!(matches!(result, Err(AsRankError::Config(_))));
}

#[test]
fn test_tier1_section_lists_downstream_heavy_asns() {
    let mut paths = Vec::new();
    for upstream in 0..5 {
        for downstream in 0..50 {
            paths.push(vec![
                format!("1{}", upstream),
                "3356".to_string(),
                format!("2{:02}", downstream),
            ]);
        }
    }
    let tables = AggregateTables::from_paths(&paths);
    let report = render_top_asns(&rank_asns(&tables));

    assert!(report.contains("  1. AS3356   - Left:    5, Right:   50, Total:   55"));
    assert!(report.contains("AS3356   - Left:    5, Right:   50 (90.9% downstream)"));
}
