//! Integration tests for the capacity guard
//!
//! These tests verify that the guard:
//! - Uses the fixed per-level capacity table
//! - Flags content strictly above the threshold and nothing below it
//! - Holds as a property across arbitrary lengths and levels

use proptest::prelude::*;
use qrstudio::EccLevel;
use qrstudio::models::capacity::{capacity_for, content_length, is_too_long};

#[test]
fn test_capacity_table() {
    assert_eq!(capacity_for(EccLevel::L), 2953);
    assert_eq!(capacity_for(EccLevel::M), 2331);
    assert_eq!(capacity_for(EccLevel::Q), 1663);
    assert_eq!(capacity_for(EccLevel::H), 1273);
}

#[test]
fn test_short_url_fits_at_level_m() {
    // 19 characters against a capacity of 2331.
    let content = "https://example.com";
    assert_eq!(content_length(content), 19);
    assert!(!is_too_long(content, EccLevel::M));
}

#[test]
fn test_three_thousand_chars_rejected_at_level_h() {
    let content = "a".repeat(3000);
    assert!(is_too_long(&content, EccLevel::H));
}

#[test]
fn test_boundary_is_strictly_greater_than() {
    for level in EccLevel::ALL {
        let max = capacity_for(level);
        assert!(!is_too_long(&"x".repeat(max), level), "exact capacity must fit at {level}");
        assert!(is_too_long(&"x".repeat(max + 1), level), "capacity + 1 must not fit at {level}");
    }
}

#[test]
fn test_empty_content_always_fits() {
    for level in EccLevel::ALL {
        assert!(!is_too_long("", level));
    }
}

proptest! {
    /// For all lengths and levels: is_too_long == (length > capacity[level]).
    #[test]
    fn prop_guard_matches_table(length in 0usize..4000, level_index in 0usize..4) {
        let level = EccLevel::ALL[level_index];
        let content = "x".repeat(length);
        prop_assert_eq!(is_too_long(&content, level), length > capacity_for(level));
    }

    /// A stricter level never accepts content that a looser one rejects.
    #[test]
    fn prop_capacity_is_monotonic(length in 0usize..4000) {
        let content = "x".repeat(length);
        if is_too_long(&content, EccLevel::L) {
            prop_assert!(is_too_long(&content, EccLevel::M));
        }
        if is_too_long(&content, EccLevel::M) {
            prop_assert!(is_too_long(&content, EccLevel::Q));
        }
        if is_too_long(&content, EccLevel::Q) {
            prop_assert!(is_too_long(&content, EccLevel::H));
        }
    }
}
