//! Division classification
//!
//! Divisions are never stored; they are recomputed from the current rating
//! every time they are read.

use crate::types::{DivisionTier, Rating};

/// Ratings strictly above this are Elite
pub const ELITE_FLOOR_EXCLUSIVE: Rating = 1800;

/// Lowest Masters rating
pub const MASTERS_FLOOR: Rating = 1650;

/// Lowest Pro rating
pub const PRO_FLOOR: Rating = 1500;

/// Division for a rating
///
/// 1800 itself is still Masters; 1650 is Masters and 1500 is Pro.
pub fn classify_division(rating: Rating) -> DivisionTier {
    if rating > ELITE_FLOOR_EXCLUSIVE {
        DivisionTier::Elite
    } else if rating >= MASTERS_FLOOR {
        DivisionTier::Masters
    } else if rating >= PRO_FLOOR {
        DivisionTier::Pro
    } else {
        DivisionTier::Open
    }
}

/// Whether a squadron may enter an event run for `target_tier`
///
/// With `allow_lower_tiers` a squadron from a stronger division qualifies for
/// weaker ones; otherwise its division must match exactly.
pub fn is_qualified_for_division(
    current_rating: Rating,
    target_tier: DivisionTier,
    allow_lower_tiers: bool,
) -> bool {
    let current_rank = classify_division(current_rating).rank();
    let target_rank = target_tier.rank();

    if allow_lower_tiers {
        current_rank >= target_rank
    } else {
        current_rank == target_rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify_division(1801), DivisionTier::Elite);
        assert_eq!(classify_division(1800), DivisionTier::Masters);
        assert_eq!(classify_division(1650), DivisionTier::Masters);
        assert_eq!(classify_division(1649), DivisionTier::Pro);
        assert_eq!(classify_division(1500), DivisionTier::Pro);
        assert_eq!(classify_division(1499), DivisionTier::Open);
    }

    #[test]
    fn test_classification_extremes() {
        assert_eq!(classify_division(2500), DivisionTier::Elite);
        assert_eq!(classify_division(800), DivisionTier::Open);
        assert_eq!(classify_division(0), DivisionTier::Open);
    }

    #[test]
    fn test_exact_division_qualification() {
        assert!(is_qualified_for_division(1700, DivisionTier::Masters, false));
        assert!(!is_qualified_for_division(1900, DivisionTier::Masters, false));
        assert!(!is_qualified_for_division(1550, DivisionTier::Masters, false));
    }

    #[test]
    fn test_lower_tier_qualification() {
        assert!(is_qualified_for_division(1900, DivisionTier::Masters, true));
        assert!(is_qualified_for_division(1900, DivisionTier::Open, true));
        assert!(is_qualified_for_division(1700, DivisionTier::Masters, true));
        assert!(!is_qualified_for_division(1550, DivisionTier::Masters, true));
        assert!(!is_qualified_for_division(1499, DivisionTier::Pro, true));
    }
}
