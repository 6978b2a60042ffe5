//! Integration tests for parsing the candidate selection answer.

use voclabel::session::parse_selection;

#[test]
fn test_out_of_range_index_is_dropped() {
    assert_eq!(parse_selection("1,3", 2), vec![1]);
}

#[test]
fn test_empty_selection() {
    assert!(parse_selection("", 4).is_empty());
    assert!(parse_selection("   ", 4).is_empty());
}

#[test]
fn test_malformed_tokens_are_dropped() {
    assert_eq!(parse_selection("a, 2 ,,-1,0,2.5,2", 3), vec![2]);
    assert!(parse_selection("none", 3).is_empty());
    assert!(parse_selection("99999999999999999999999999", 3).is_empty());
}

#[test]
fn test_order_of_answer_is_kept_and_repeats_collapse() {
    assert_eq!(parse_selection("3,1,3", 3), vec![3, 1]);
}
