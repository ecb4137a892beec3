// src/ingest/dedup.rs
use std::collections::HashSet;

use crate::ingest::types::CanonicalFeature;

/// Keep the first feature per id, drop later repeats, preserve order.
/// Returns (kept, removed_count). The seen-set lives only for this call.
pub fn dedup_by_id(features: Vec<CanonicalFeature>) -> (Vec<CanonicalFeature>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(features.len());
    let mut keep = Vec::with_capacity(features.len());
    let mut dedup_out = 0usize;

    for f in features {
        if !seen.insert(f.id.clone()) {
            dedup_out += 1;
            continue;
        }
        keep.push(f);
    }

    (keep, dedup_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Point, Tags};

    fn feat(id: &str, lng: f64) -> CanonicalFeature {
        CanonicalFeature {
            id: id.into(),
            point: Point { lng, lat: 10.0 },
            direction: 0.0,
            kind: "flock".into(),
            timestamp: String::new(),
            region: None,
            tags: Tags::new(),
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let (kept, removed) = dedup_by_id(vec![feat("a", 1.0), feat("b", 2.0), feat("a", 3.0)]);
        let ids: Vec<&str> = kept.iter().map(|f| f.id()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(kept[0].point().lng, 1.0);
        assert_eq!(removed, 1);
    }

    #[test]
    fn empty_input_is_fine() {
        let (kept, removed) = dedup_by_id(Vec::new());
        assert!(kept.is_empty());
        assert_eq!(removed, 0);
    }
}
