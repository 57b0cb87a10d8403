//! Name similarity for duplicate ingredient detection
//!
//! Scores are in [0, 1]. The first rule that matches decides the score:
//!
//! 1. exact match (trimmed, case-insensitive): 1.0
//! 2. longer name starts with the shorter: 0.95
//! 3. longer name contains the shorter (4+ chars): 0.85
//! 4. significant tokens equal: 0.95, or one token string contains the other: 0.9
//! 5. token overlap ratio `2m / (a + b)` of at least 0.5: ratio x 0.9
//! 6. otherwise 0

use serde::Serialize;

/// Generic spirit and category words that carry no identity
pub const STOP_WORDS: &[&str] = &[
    "aperitivo", "liqueur", "bitters", "syrup", "rum", "gin", "vodka", "whiskey", "whisky",
    "tequila", "mezcal", "brandy", "cognac", "amaro", "vermouth",
];

/// Default score at which two names are considered duplicates
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.6;

const MIN_CONTAINED_LEN: usize = 4;
const MIN_OVERLAP_RATIO: f64 = 0.5;

fn significant_tokens(name: &str) -> Vec<&str> {
    name.split_whitespace()
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(t))
        .collect()
}

/// Similarity score between two ingredient names
pub fn similarity(name_a: &str, name_b: &str) -> f64 {
    let a = name_a.trim().to_lowercase();
    let b = name_b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let (longer, shorter) = if a.chars().count() >= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };

    if longer.starts_with(shorter.as_str()) {
        return 0.95;
    }
    if longer.contains(shorter.as_str()) && shorter.chars().count() >= MIN_CONTAINED_LEN {
        return 0.85;
    }

    let tokens_a = significant_tokens(&a);
    let tokens_b = significant_tokens(&b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let joined_a = tokens_a.join(" ");
    let joined_b = tokens_b.join(" ");
    if joined_a == joined_b {
        return 0.95;
    }
    if joined_a.contains(&joined_b) || joined_b.contains(&joined_a) {
        return 0.9;
    }

    let matches = tokens_a.iter().filter(|t| tokens_b.contains(t)).count();
    let ratio = (2 * matches) as f64 / (tokens_a.len() + tokens_b.len()) as f64;
    if ratio >= MIN_OVERLAP_RATIO {
        return ratio * 0.9;
    }

    0.0
}

/// A member of a duplicate group with its score against the anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub index: usize,
    pub score: f64,
}

/// A set of near-duplicate names headed by the earliest one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub anchor: usize,
    pub members: Vec<GroupMember>,
}

/// Group near-duplicate names.
///
/// Single greedy pass in input order: each ungrouped name is compared with
/// every later ungrouped name, and matches join its group. Members are only
/// compared with the anchor, so grouping is not transitive.
pub fn group_duplicates<S: AsRef<str>>(names: &[S], threshold: f64) -> Vec<DuplicateGroup> {
    let mut grouped = vec![false; names.len()];
    let mut groups = Vec::new();

    for i in 0..names.len() {
        if grouped[i] {
            continue;
        }

        let mut members = Vec::new();
        for j in (i + 1)..names.len() {
            if grouped[j] {
                continue;
            }
            let score = similarity(names[i].as_ref(), names[j].as_ref());
            if score >= threshold {
                grouped[j] = true;
                members.push(GroupMember { index: j, score });
            }
        }

        if !members.is_empty() {
            grouped[i] = true;
            groups.push(DuplicateGroup { anchor: i, members });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(similarity("  Campari ", "campari"), 1.0);
    }

    #[test]
    fn test_empty_names_never_match() {
        assert_eq!(similarity("", "  "), 0.0);
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("Campari", " "), 0.0);
    }

    #[test]
    fn test_prefix_match() {
        assert_eq!(similarity("Grey Goose Vodka", "Grey Goose"), 0.95);
        assert_eq!(similarity("Grey Goose", "Grey Goose Vodka"), 0.95);
    }

    #[test]
    fn test_contained_match() {
        assert_eq!(similarity("Fresh Lime Juice", "Lime Juice"), 0.85);
        // Too short to count as contained
        assert_ne!(similarity("Old Tom Gin", "Tom"), 0.85);
    }

    #[test]
    fn test_stop_words_ignored() {
        // "aperol aperitivo" and "aperol" are a prefix pair already
        assert_eq!(similarity("Aperol Aperitivo", "Aperol"), 0.95);
        // Same significant tokens once the category word is dropped
        assert_eq!(similarity("Plantation Rum Pineapple", "Plantation Pineapple"), 0.95);
        // Token string containment
        assert_eq!(
            similarity("Rum Smith Cross Jamaica", "Gin Smith Cross Jamaica Navy"),
            0.9
        );
    }

    #[test]
    fn test_token_overlap() {
        // tokens: [simple, demerara] vs [demerara, rich] -> 2*1/4 = 0.5
        let score = similarity("Simple Demerara", "Demerara Rich");
        assert!((score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(similarity("Campari", "Aperol"), 0.0);
        assert_eq!(similarity("Gin", "Rum"), 0.0);
        assert_eq!(similarity("", "Aperol"), 0.0);
    }

    #[test]
    fn test_grouping_is_greedy_and_anchor_based() {
        let names = ["Grey Goose", "Campari", "Grey Goose Vodka", "Campari Bitter", "Aperol"];
        let groups = group_duplicates(&names, DEFAULT_DUPLICATE_THRESHOLD);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].anchor, 0);
        assert_eq!(groups[0].members.len(), 1);
        assert_eq!(groups[0].members[0].index, 2);
        assert_eq!(groups[1].anchor, 1);
        assert_eq!(groups[1].members[0].index, 3);
    }

    #[test]
    fn test_grouping_not_transitive() {
        // B is similar to both A and C, but A and C are not similar.
        // A claims B, leaving C ungrouped.
        let names = ["Lime Juice", "Lime Juice Cordial Fresh", "Cordial Fresh"];
        assert!(similarity(names[0], names[2]) < DEFAULT_DUPLICATE_THRESHOLD);
        let groups = group_duplicates(&names, DEFAULT_DUPLICATE_THRESHOLD);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].anchor, 0);
        assert_eq!(groups[0].members.len(), 1);
        assert_eq!(groups[0].members[0].index, 1);
    }
}
