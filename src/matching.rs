//! Picking a single best hit out of a search result set.
//!
//! Two policies exist and are used by different flows:
//!
//! - [`best_match`] ranks every hit by a weighted field score, breaking ties
//!   on the CRM's own `result_score`. Hits that match nothing still take part.
//! - [`best_gated_match`] only admits hits where at least one field matches,
//!   then takes the highest `result_score`.

use crate::types::SearchHit;

pub const TITLE_WEIGHT: i32 = 3;
pub const ORGANIZATION_WEIGHT: i32 = 2;
pub const PERSON_WEIGHT: i32 = 1;

/// Initial accumulator score. Every real hit scores at least 0, so the first
/// hit always replaces the sentinel.
const SENTINEL_SCORE: i32 = -1;

/// The winning hit annotated with the scores that ranked it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub hit: SearchHit,
    /// Locally computed field score.
    pub score: i32,
    /// Remote relevance score (`0.0` when absent).
    pub result_score: f64,
}

struct FieldMatches {
    title: bool,
    organization: bool,
    person: bool,
}

impl FieldMatches {
    fn of(hit: &SearchHit, term: &str) -> Self {
        let needle = term.to_lowercase();
        let contains = |field: Option<&str>| {
            field
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false)
        };
        Self {
            title: contains(hit.title.as_deref()),
            organization: contains(hit.organization_name()),
            person: contains(hit.person_name()),
        }
    }

    fn any(&self) -> bool {
        self.title || self.organization || self.person
    }

    fn score(&self) -> i32 {
        let mut score = 0;
        if self.title {
            score += TITLE_WEIGHT;
        }
        if self.organization {
            score += ORGANIZATION_WEIGHT;
        }
        if self.person {
            score += PERSON_WEIGHT;
        }
        score
    }
}

/// Additive, case-insensitive substring score of `term` against title (3),
/// organization name (2) and person name (1).
pub fn score_hit(hit: &SearchHit, term: &str) -> i32 {
    FieldMatches::of(hit, term).score()
}

/// Whether `term` occurs in at least one scored field of `hit`.
pub fn matches_any_field(hit: &SearchHit, term: &str) -> bool {
    FieldMatches::of(hit, term).any()
}

/// Strictly higher remote score. A missing score on either side never
/// outranks and is never outranked.
fn outranks(candidate: Option<f64>, incumbent: Option<f64>) -> bool {
    matches!((candidate, incumbent), (Some(c), Some(i)) if c > i)
}

/// Left fold over `items`: a hit replaces the current best when its local
/// score is strictly higher, or equal with a strictly higher remote score.
/// Earlier hits win full ties. Returns `None` only for an empty list.
pub fn best_match(items: &[SearchHit], term: &str) -> Option<MatchCandidate> {
    let (best, _, _) = items.iter().fold(
        (None::<&SearchHit>, SENTINEL_SCORE, None::<f64>),
        |(best, best_score, best_remote), hit| {
            let score = score_hit(hit, term);
            if score > best_score
                || (score == best_score && outranks(hit.result_score, best_remote))
            {
                (Some(hit), score, hit.result_score)
            } else {
                (best, best_score, best_remote)
            }
        },
    );

    best.map(|hit| MatchCandidate {
        hit: hit.clone(),
        score: score_hit(hit, term),
        result_score: hit.remote_score(),
    })
}

/// Admit only hits matching at least one field, then keep the one with the
/// highest remote score (first wins ties).
pub fn best_gated_match(items: &[SearchHit], term: &str) -> Option<MatchCandidate> {
    items
        .iter()
        .filter(|hit| matches_any_field(hit, term))
        .fold(None::<&SearchHit>, |best, hit| match best {
            Some(current) if !outranks(hit.result_score, current.result_score) => Some(current),
            _ => Some(hit),
        })
        .map(|hit| MatchCandidate {
            hit: hit.clone(),
            score: score_hit(hit, term),
            result_score: hit.remote_score(),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::types::{NamedRef, RecordId};

    fn hit(
        id: i64,
        title: &str,
        org: Option<&str>,
        person: Option<&str>,
        remote: f64,
    ) -> SearchHit {
        let named = |name: &str| NamedRef {
            name: Some(name.to_string()),
            ..Default::default()
        };
        SearchHit {
            id: RecordId::Int(id),
            title: Some(title.to_string()),
            organization: org.map(named),
            person: person.map(named),
            result_score: Some(remote),
            extra: Map::new(),
        }
    }

    #[test]
    fn weights_are_additive_and_case_insensitive() {
        let h = hit(1, "ACME Corp Renewal", Some("acme corp"), Some("Acme Corp Buyer"), 0.0);
        assert_eq!(score_hit(&h, "Acme Corp"), 6);
        assert_eq!(score_hit(&h, "renewal"), 3);
        assert_eq!(score_hit(&h, "buyer"), 1);
        assert_eq!(score_hit(&h, "globex"), 0);
    }

    #[test]
    fn local_score_dominates_remote_score() {
        let items = vec![
            hit(1, "Unrelated", None, None, 100.0),
            hit(2, "Acme Corp deal", None, None, 1.0),
        ];
        let best = best_match(&items, "acme corp").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(2));
        assert_eq!(best.score, 3);
        assert_eq!(best.result_score, 1.0);
    }

    #[test]
    fn equal_local_score_breaks_tie_on_remote_score() {
        let items = vec![
            hit(1, "Acme one", None, None, 0.4),
            hit(2, "Acme two", None, None, 0.9),
            hit(3, "Acme three", None, None, 0.9),
        ];
        let best = best_match(&items, "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(2));
    }

    #[test]
    fn zero_score_hits_still_win_when_nothing_matches() {
        let items = vec![
            hit(1, "Alpha", None, None, 0.2),
            hit(2, "Beta", None, None, 0.1),
        ];
        let best = best_match(&items, "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(1));
        assert_eq!(best.score, 0);
    }

    #[test]
    fn missing_remote_score_never_breaks_a_tie() {
        let mut unscored = hit(1, "Acme", None, None, 0.0);
        unscored.result_score = None;
        let scored = hit(2, "Acme", None, None, 0.5);

        let best = best_match(&[unscored.clone(), scored.clone()], "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(1));
        assert_eq!(best.result_score, 0.0);

        let best = best_match(&[scored.clone(), unscored.clone()], "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(2));

        let gated = best_gated_match(&[unscored, scored], "acme").unwrap();
        assert_eq!(gated.hit.id, RecordId::Int(1));
    }

    #[test]
    fn missing_remote_score_still_loses_on_local_score() {
        let mut unscored = hit(1, "Acme", Some("Acme"), None, 0.0);
        unscored.result_score = None;
        let weaker = hit(2, "Acme", None, None, 9.0);
        let best = best_match(&[weaker, unscored], "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(1));
    }

    #[test]
    fn empty_list_has_no_match() {
        assert!(best_match(&[], "acme").is_none());
        assert!(best_gated_match(&[], "acme").is_none());
    }

    #[test]
    fn gated_match_excludes_non_matching_hits() {
        let items = vec![
            hit(1, "Unrelated", None, None, 100.0),
            hit(2, "Other", None, Some("Jane from Acme"), 0.3),
            hit(3, "Acme Corp", Some("Acme Corp"), None, 0.2),
        ];
        // Gated policy ranks admitted hits by remote score only.
        let best = best_gated_match(&items, "acme").unwrap();
        assert_eq!(best.hit.id, RecordId::Int(2));
        assert_eq!(best.score, 1);

        // The ranked policy prefers the stronger field match instead.
        assert_eq!(best_match(&items, "acme").unwrap().hit.id, RecordId::Int(3));
    }

    #[test]
    fn gated_match_is_none_without_any_field_match() {
        let items = vec![hit(1, "Alpha", None, None, 9.0)];
        assert!(best_gated_match(&items, "acme").is_none());
    }

    #[test]
    fn candidate_keeps_extra_fields() {
        let mut h = hit(5, "Acme", None, None, 1.0);
        h.extra.insert("status".into(), json!("open"));
        let best = best_match(&[h], "acme").unwrap();
        assert_eq!(best.hit.extra.get("status"), Some(&json!("open")));
    }
}
