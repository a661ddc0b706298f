use harvester_core::{parse_identifiers, Identifier};
use pretty_assertions::assert_eq;

fn names(items: &[Identifier]) -> Vec<&str> {
    items.iter().map(Identifier::as_str).collect()
}

#[test]
fn header_then_three_names_keeps_order() {
    let parsed = parse_identifiers("Supplier\nZeta Farm\nAlpha Bio\nMid Coop\n");
    assert_eq!(names(&parsed), vec!["Zeta Farm", "Alpha Bio", "Mid Coop"]);
}

#[test]
fn header_tokens_are_case_insensitive_and_anywhere() {
    let parsed = parse_identifiers("NAMES\nA\n  suppliers  \nB\nName,Country\nC\n");
    assert_eq!(names(&parsed), vec!["A", "B", "C"]);
}

#[test]
fn blank_lines_and_blank_fields_are_skipped() {
    let parsed = parse_identifiers("\n   \nA\n,DE\n\r\nB\r\n");
    assert_eq!(names(&parsed), vec!["A", "B"]);
}

#[test]
fn only_first_field_is_used() {
    let parsed = parse_identifiers("Acme GmbH,DE,2024\n\"Bio, Inc.\",NL\n");
    assert_eq!(names(&parsed), vec!["Acme GmbH", "Bio, Inc."]);
}

#[test]
fn duplicates_are_kept() {
    let parsed = parse_identifiers("A\nA\nB\n");
    assert_eq!(names(&parsed), vec!["A", "A", "B"]);
}

#[test]
fn empty_source_yields_nothing() {
    assert!(parse_identifiers("").is_empty());
    assert!(parse_identifiers("supplier\n\n").is_empty());
}
