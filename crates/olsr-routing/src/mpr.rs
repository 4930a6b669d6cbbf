//! Multipoint relay selection
//!
//! Greedy set cover over the two-hop neighborhood: repeatedly take the
//! bidirectional neighbor covering the most still-uncovered two-hop nodes,
//! ties going to the greatest id, until everything is covered or no
//! candidate contributes anything.

use std::collections::{BTreeMap, BTreeSet};

use olsr_core::NodeId;

/// Select the MPR set from each bidirectional neighbor's two-hop set
pub fn select_mpr(coverage: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> BTreeSet<NodeId> {
    let mut uncovered: BTreeSet<&NodeId> = coverage.values().flatten().collect();
    let mut candidates: BTreeMap<&NodeId, &BTreeSet<NodeId>> = coverage.iter().collect();
    let mut selected = BTreeSet::new();

    while !uncovered.is_empty() {
        let best = candidates
            .iter()
            .map(|(id, covers)| {
                let count = covers.iter().filter(|n| uncovered.contains(n)).count();
                (count, *id)
            })
            .filter(|(count, _)| *count > 0)
            .max();

        let Some((_, chosen)) = best else {
            break;
        };

        if let Some(covers) = candidates.remove(chosen) {
            for node in covers {
                uncovered.remove(node);
            }
        }
        selected.insert(chosen.clone());
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| id(s)).collect()
    }

    fn coverage(entries: &[(&str, &[&str])]) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        entries.iter().map(|(n, c)| (id(n), set(c))).collect()
    }

    #[test]
    fn test_no_two_hop_neighbors_selects_nothing() {
        let cov = coverage(&[("B", &[]), ("C", &[])]);
        assert!(select_mpr(&cov).is_empty());
        assert!(select_mpr(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_single_full_cover_selects_only_it() {
        let cov = coverage(&[("B", &["X", "Y", "Z"]), ("C", &["X"]), ("D", &["Y", "Z"])]);
        assert_eq!(select_mpr(&cov), set(&["B"]));
    }

    #[test]
    fn test_disjoint_halves_select_both() {
        let cov = coverage(&[("B", &["W", "X"]), ("C", &["Y", "Z"])]);
        assert_eq!(select_mpr(&cov), set(&["B", "C"]));
    }

    #[test]
    fn test_tie_breaks_to_greatest_id() {
        let cov = coverage(&[("B", &["X"]), ("C", &["X"])]);
        assert_eq!(select_mpr(&cov), set(&["C"]));
    }

    #[test]
    fn test_greedy_picks_largest_first() {
        // D covers 3, then B covers the remaining V
        let cov = coverage(&[
            ("B", &["V", "W"]),
            ("C", &["W", "X"]),
            ("D", &["W", "X", "Y"]),
        ]);
        let mpr = select_mpr(&cov);
        assert!(mpr.contains(&id("D")));
        assert!(mpr.contains(&id("B")));
        assert!(!mpr.contains(&id("C")));
    }

    #[test]
    fn test_cover_is_complete() {
        let cov = coverage(&[
            ("B", &["P", "Q"]),
            ("C", &["Q", "R", "S"]),
            ("D", &["S", "T"]),
            ("E", &["P"]),
        ]);
        let mpr = select_mpr(&cov);
        let covered: BTreeSet<NodeId> = mpr
            .iter()
            .flat_map(|m| cov[m].iter().cloned())
            .collect();
        let all: BTreeSet<NodeId> = cov.values().flatten().cloned().collect();
        assert_eq!(covered, all);
        assert!(mpr.len() < cov.len());
    }

    #[test]
    fn test_large_neighborhood_terminates() {
        let cov: BTreeMap<NodeId, BTreeSet<NodeId>> = (0..500)
            .map(|i| {
                let covers = (i..i + 3).map(|j| id(&format!("t{j}"))).collect();
                (id(&format!("n{i}")), covers)
            })
            .collect();
        let mpr = select_mpr(&cov);
        assert!(!mpr.is_empty());
        assert!(mpr.len() <= cov.len());
    }
}
