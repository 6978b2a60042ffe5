//! Integration tests for the session label vocabulary.
//!
//! Tests cover:
//! - Index reuse versus new label creation
//! - Exact-text matching (case and inner whitespace kept)
//! - Growth-only ordering across many choices

mod common;

use common::*;
use voclabel::vocabulary::{LabelChoice, Resolution};

fn names(vocabulary: &Vocabulary) -> Vec<String> {
    vocabulary.list_labels().iter().map(|l| l.to_string()).collect()
}

#[test]
fn test_free_text_is_added_then_reused_by_index() {
    let mut vocabulary = Vocabulary::new();

    let created = vocabulary.resolve("cat");
    let Resolution::Added(cat) = created else {
        panic!("expected a new label, got {:?}", created);
    };

    let reused = vocabulary.resolve("1");
    let Resolution::Reused(again) = reused else {
        panic!("expected reuse, got {:?}", reused);
    };

    assert!(cat.ptr_eq(&again));
    assert_eq!(names(&vocabulary), vec!["cat"]);
}

#[test]
fn test_matching_is_case_sensitive() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.resolve("cat");
    vocabulary.resolve("Cat");
    vocabulary.resolve("big  cat");
    vocabulary.resolve("big cat");

    assert_eq!(names(&vocabulary), vec!["cat", "Cat", "big  cat", "big cat"]);
}

#[test]
fn test_existing_text_is_not_duplicated() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.resolve("dog");
    vocabulary.resolve("cat");

    let result = vocabulary.resolve("dog");

    assert_eq!(result, Resolution::Reused(Label::new("dog").unwrap()));
    assert_eq!(vocabulary.len(), 2);
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.resolve("  tree ");

    assert_eq!(names(&vocabulary), vec!["tree"]);
}

#[test]
fn test_out_of_range_index_asks_for_name() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.resolve("car");

    assert_eq!(vocabulary.parse_choice("2"), LabelChoice::CreateNew);
    assert_eq!(vocabulary.parse_choice("0"), LabelChoice::CreateNew);
    assert_eq!(vocabulary.resolve("7"), Resolution::NeedsName);

    let named = vocabulary.resolve_new_name("truck");
    assert_eq!(named, Resolution::Added(Label::new("truck").unwrap()));
    assert_eq!(names(&vocabulary), vec!["car", "truck"]);
}

#[test]
fn test_numeric_new_name_is_literal_and_index_wins_later() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.resolve("car");

    assert_eq!(vocabulary.resolve("5"), Resolution::NeedsName);
    vocabulary.resolve_new_name("1");
    assert_eq!(names(&vocabulary), vec!["car", "1"]);

    // "1" is in range, so it means the first entry, not the label named "1"
    assert_eq!(vocabulary.resolve("1"), Resolution::Reused(Label::new("car").unwrap()));
    assert_eq!(vocabulary.resolve("2"), Resolution::Reused(Label::new("1").unwrap()));
}

#[test]
fn test_empty_answers_skip() {
    let mut vocabulary = Vocabulary::new();

    assert_eq!(vocabulary.resolve(""), Resolution::Skipped);
    assert_eq!(vocabulary.resolve("   "), Resolution::Skipped);
    assert_eq!(vocabulary.resolve_new_name(""), Resolution::Skipped);
    assert!(vocabulary.is_empty());
}

#[test]
fn test_vocabulary_only_grows_in_insertion_order() {
    let mut vocabulary = Vocabulary::new();
    let inputs = ["a", "b", "1", "c", "2", "a", "9", "", "d", "3"];
    let mut previous: Vec<String> = Vec::new();

    for input in inputs {
        if vocabulary.resolve(input) == Resolution::NeedsName {
            vocabulary.resolve_new_name("e");
        }
        let current = names(&vocabulary);
        assert!(current.len() >= previous.len());
        assert_eq!(&current[..previous.len()], previous.as_slice());
        previous = current;
    }

    assert_eq!(previous, vec!["a", "b", "c", "e", "d"]);
}
