//! Declarative block filter. Absent criteria are unconstrained; present
//! criteria AND-combine.
//!
//! `kinds` is an `Option`: `None` means unconstrained, `Some(∅)` is the
//! impossible query that matches nothing. The impossible form is produced by
//! `merge_queries` when two queries pin conflicting `source` values; a select
//! against it returns an empty result, never an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockHash};
use crate::kind::{BlockKind, Sensitivity};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    /// Kind membership. `None` ⇒ unconstrained; `Some(∅)` ⇒ matches nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<BTreeSet<BlockKind>>,
    /// Block tags must contain *all* listed tags.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_sensitivity: Option<Sensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sensitivity: Option<Sensitivity>,
    /// Exact `meta.source` equality.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Inclusive unix-seconds range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_created_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_created_at: Option<u64>,
    /// ∃ derivation parent in this set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub derived_from_any: BTreeSet<BlockHash>,
    /// ∄ derivation parent in this set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub not_derived_from_any: BTreeSet<BlockHash>,
    /// ∃ outbound citation in this set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub references_any: BTreeSet<BlockHash>,
    /// Block hash must not be in this set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude_hashes: BTreeSet<BlockHash>,
}

impl Query {
    /// The query that matches every block.
    pub fn any() -> Self {
        Self::default()
    }

    /// The query that matches no block.
    pub fn impossible() -> Self {
        Self {
            kinds: Some(BTreeSet::new()),
            ..Self::default()
        }
    }

    pub fn is_impossible(&self) -> bool {
        matches!(&self.kinds, Some(set) if set.is_empty())
    }

    /// Evaluate the filter against a block and its outgoing edges (supplied
    /// by the graph; dangling hashes on either side are tolerated).
    pub fn matches(
        &self,
        block: &Block,
        derived_from: &[BlockHash],
        references: &BTreeSet<BlockHash>,
    ) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&block.meta.kind) {
                return false;
            }
        }
        if !self.tags.iter().all(|t| block.meta.tags.contains(t)) {
            return false;
        }
        if let Some(min) = self.min_sensitivity {
            if block.meta.sensitivity < min {
                return false;
            }
        }
        if let Some(max) = self.max_sensitivity {
            if block.meta.sensitivity > max {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if block.meta.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_created_at {
            if block.meta.created_at < min {
                return false;
            }
        }
        if let Some(max) = self.max_created_at {
            if block.meta.created_at > max {
                return false;
            }
        }
        if !self.derived_from_any.is_empty()
            && !derived_from.iter().any(|h| self.derived_from_any.contains(h))
        {
            return false;
        }
        if derived_from
            .iter()
            .any(|h| self.not_derived_from_any.contains(h))
        {
            return false;
        }
        if !self.references_any.is_empty()
            && references.is_disjoint(&self.references_any)
        {
            return false;
        }
        if self.exclude_hashes.contains(&block.block_hash) {
            return false;
        }
        true
    }
}

/// AND-combine queries: kinds intersect, tags union, sensitivity bounds
/// tighten, hash sets union, timestamp ranges narrow. Conflicting `source`
/// values collapse the result to the impossible query.
pub fn merge_queries(queries: &[Query]) -> Query {
    let mut out = Query::any();
    for q in queries {
        out = merge_two(out, q);
    }
    out
}

fn merge_two(mut a: Query, b: &Query) -> Query {
    a.kinds = match (a.kinds.take(), &b.kinds) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y.clone()),
        (Some(x), Some(y)) => Some(x.intersection(y).copied().collect()),
    };
    a.tags.extend(b.tags.iter().cloned());
    a.min_sensitivity = max_opt(a.min_sensitivity, b.min_sensitivity);
    a.max_sensitivity = min_opt(a.max_sensitivity, b.max_sensitivity);
    a.min_created_at = max_opt(a.min_created_at, b.min_created_at);
    a.max_created_at = min_opt(a.max_created_at, b.max_created_at);
    a.derived_from_any.extend(b.derived_from_any.iter().cloned());
    a.not_derived_from_any
        .extend(b.not_derived_from_any.iter().cloned());
    a.references_any.extend(b.references_any.iter().cloned());
    a.exclude_hashes.extend(b.exclude_hashes.iter().cloned());
    a.source = match (a.source.take(), &b.source) {
        (None, None) => None,
        (Some(s), None) => Some(s),
        (None, Some(s)) => Some(s.clone()),
        (Some(s1), Some(s2)) if &s1 == s2 => Some(s1),
        (Some(_), Some(_)) => {
            // Conflicting equality constraints: nothing can match.
            return Query::impossible();
        }
    };
    a
}

fn max_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

fn min_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockMeta;

    fn block(kind: BlockKind, sensitivity: Sensitivity, created_at: u64) -> Block {
        Block {
            block_hash: BlockHash::from_hex_unchecked("0".repeat(64)),
            meta: BlockMeta {
                kind,
                sensitivity,
                codec_id: "unsafe-text".into(),
                codec_version: "1".into(),
                created_at,
                source: Some("session:a".into()),
                tags: BTreeSet::from(["x".to_string(), "y".to_string()]),
            },
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        let b = block(BlockKind::Memory, Sensitivity::Restricted, 5);
        assert!(Query::any().matches(&b, &[], &BTreeSet::new()));
    }

    #[test]
    fn criteria_and_combine() {
        let b = block(BlockKind::Memory, Sensitivity::Internal, 50);
        let q = Query {
            kinds: Some(BTreeSet::from([BlockKind::Memory])),
            tags: BTreeSet::from(["x".to_string()]),
            max_sensitivity: Some(Sensitivity::Internal),
            min_created_at: Some(10),
            max_created_at: Some(100),
            ..Query::default()
        };
        assert!(q.matches(&b, &[], &BTreeSet::new()));

        let stricter = Query {
            tags: BTreeSet::from(["missing".to_string()]),
            ..q
        };
        assert!(!stricter.matches(&b, &[], &BTreeSet::new()));
    }

    #[test]
    fn merge_tightens_bounds_and_intersects_kinds() {
        let q1 = Query {
            kinds: Some(BTreeSet::from([BlockKind::Memory, BlockKind::History])),
            min_sensitivity: Some(Sensitivity::Public),
            min_created_at: Some(10),
            ..Query::default()
        };
        let q2 = Query {
            kinds: Some(BTreeSet::from([BlockKind::History, BlockKind::Turn])),
            min_sensitivity: Some(Sensitivity::Internal),
            max_created_at: Some(99),
            ..Query::default()
        };
        let m = merge_queries(&[q1, q2]);
        assert_eq!(m.kinds, Some(BTreeSet::from([BlockKind::History])));
        assert_eq!(m.min_sensitivity, Some(Sensitivity::Internal));
        assert_eq!(m.min_created_at, Some(10));
        assert_eq!(m.max_created_at, Some(99));
    }

    #[test]
    fn conflicting_sources_collapse_to_impossible() {
        let q1 = Query {
            source: Some("session:a".into()),
            ..Query::default()
        };
        let q2 = Query {
            source: Some("session:b".into()),
            ..Query::default()
        };
        let m = merge_queries(&[q1, q2]);
        assert!(m.is_impossible());
        let b = block(BlockKind::Memory, Sensitivity::Public, 0);
        assert!(!m.matches(&b, &[], &BTreeSet::new()));
    }

    #[test]
    fn edge_criteria_consult_supplied_edges() {
        let b = block(BlockKind::Memory, Sensitivity::Public, 0);
        let parent: BlockHash = "a".repeat(64).parse().unwrap();
        let q = Query {
            derived_from_any: BTreeSet::from([parent.clone()]),
            ..Query::default()
        };
        assert!(!q.matches(&b, &[], &BTreeSet::new()));
        assert!(q.matches(&b, &[parent.clone()], &BTreeSet::new()));

        let not_q = Query {
            not_derived_from_any: BTreeSet::from([parent.clone()]),
            ..Query::default()
        };
        assert!(!not_q.matches(&b, &[parent], &BTreeSet::new()));
    }
}
