use ascone::extractor::{AsSetPolicy, PathParser};

fn dump_line(path: &str) -> String {
    format!(
        "TABLE_DUMP2|1609459200|B|192.0.2.1|65000|10.0.0.0/8|{}|IGP|192.0.2.1|0|0||NAG||",
        path
    )
}

fn asns(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_table_dump_line_collapses_sets_and_keeps_loops() {
    let parser = PathParser::new();
    let path = parser
        .parse_line(&dump_line("700 701 {702,703} 701 704"))
        .expect("table dump line should carry a path");

    // The set keeps its first member; 701 reappears after 702, which is a loop, not prepending.
    assert_eq!(path, asns(&["700", "701", "702", "701", "704"]));
}

#[test]
fn test_prepending_is_collapsed() {
    let parser = PathParser::new();
    let path = parser.parse_line(&dump_line("3356 3356 3356 174 174 65001")).unwrap();
    assert_eq!(path, asns(&["3356", "174", "65001"]));
}

#[test]
fn test_prepending_across_a_set_is_collapsed() {
    let parser = PathParser::new();
    let path = parser.parse_line(&dump_line("700 {700,800} 900")).unwrap();
    assert_eq!(path, asns(&["700", "900"]));
}

#[test]
fn test_irrelevant_records_yield_no_path() {
    let parser = PathParser::new();

    assert_eq!(parser.parse_line(""), None);
    assert_eq!(parser.parse_line("garbage without delimiters"), None);
    assert_eq!(
        parser.parse_line("TABLE_DUMP|1609459200|B|192.0.2.1|65000|10.0.0.0/8|700 701|IGP"),
        None,
        "wrong record type"
    );
    assert_eq!(
        parser.parse_line("TABLE_DUMP2|1609459200|B|192.0.2.1|65000|10.0.0.0/8"),
        None,
        "only six fields"
    );
    assert_eq!(parser.parse_line(&dump_line("")), None, "empty path");
    assert_eq!(parser.parse_line(&dump_line("   ")), None, "blank path");
}

#[test]
fn test_exactly_seven_fields_is_enough() {
    let parser = PathParser::new();
    let path = parser
        .parse_line("TABLE_DUMP2|1609459200|B|192.0.2.1|65000|10.0.0.0/8|1 2")
        .unwrap();
    assert_eq!(path, asns(&["1", "2"]));
}

#[test]
fn test_single_hop_path_is_returned() {
    // Discarding short paths is the caller's job.
    let parser = PathParser::new();
    assert_eq!(parser.parse_line(&dump_line("65001")), Some(asns(&["65001"])));
}

#[test]
fn test_trailing_carriage_return_is_ignored() {
    let parser = PathParser::new();
    let line = "TABLE_DUMP2|1609459200|B|192.0.2.1|65000|10.0.0.0/8|1 2\r\n";
    assert_eq!(parser.parse_line(line), Some(asns(&["1", "2"])));
}

#[test]
fn test_set_spread_over_several_tokens() {
    let parser = PathParser::new();
    let path = parser.parse_line(&dump_line("700 {702, 703, 705} 704")).unwrap();
    assert_eq!(path, asns(&["700", "702", "704"]));
}

#[test]
fn test_bare_comma_group_keeps_first_member() {
    let parser = PathParser::new();
    let path = parser.parse_line(&dump_line("700 702,703 704")).unwrap();
    assert_eq!(path, asns(&["700", "702", "704"]));
}

#[test]
fn test_discard_policy_drops_sets() {
    let parser = PathParser::new().with_as_set_policy(AsSetPolicy::Discard);
    let path = parser
        .parse_line(&dump_line("700 701 {702,703} 701 704"))
        .unwrap();
    // With the set gone the two 701s become adjacent and collapse.
    assert_eq!(path, asns(&["700", "701", "704"]));
}

#[test]
fn test_custom_record_type_and_field() {
    let parser = PathParser::new()
        .with_record_type("R")
        .with_delimiter(';')
        .with_path_field(2);
    assert_eq!(parser.parse_line("R;x;1 2 2 3"), Some(asns(&["1", "2", "3"])));
    assert_eq!(parser.parse_line("TABLE_DUMP2;x;1 2"), None);
}

#[test]
fn test_normalizing_a_canonical_path_is_idempotent() {
    let parser = PathParser::new();
    let canonical_paths = vec![
        asns(&["700", "701", "702", "701", "704"]),
        asns(&["1", "2"]),
        asns(&["3356"]),
        asns(&["64512", "4200000000", "13335", "64512"]),
    ];

    for canonical in canonical_paths {
        let once = parser.normalize(canonical.iter().map(String::as_str));
        assert_eq!(once, canonical);
        let twice = parser.normalize(once.iter().map(String::as_str));
        assert_eq!(twice, once);
    }
}

#[test]
fn test_normalized_output_has_no_adjacent_duplicates() {
    let parser = PathParser::new();
    let path = parser.normalize("1 1 {1,2} 2 2,3 3 {3} 4 , {} 4".split_whitespace());
    assert_eq!(path, asns(&["1", "2", "3", "4"]));
    assert!(path.windows(2).all(|pair| pair[0] != pair[1]));
}

#[test]
fn test_unclosed_set_does_not_swallow_path() {
    let parser = PathParser::new();
    assert_eq!(
        parser.parse_line("TABLE_DUMP2|0|B|x|1|p|700 {701,702 703 704|IGP"),
        Some(asns(&["700", "701", "703", "704"]))
    );
    assert_eq!(
        parser.parse_line(&dump_line("700 {701 702 703")),
        Some(asns(&["700", "701", "702", "703"]))
    );
    // A later closed set still spans its own tokens only.
    assert_eq!(
        parser.parse_line(&dump_line("700 {701 702 {703, 704} 705")),
        Some(asns(&["700", "701", "702", "703", "705"]))
    );
}
