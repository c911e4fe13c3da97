//! Candidate resolution
//!
//! Turns ordered candidate rows into identifiers. In indulgent mode every
//! candidate is handed back; in strict mode exactly one identifier is
//! returned or the request fails.
//!
//! ## Tie-break
//!
//! ```text
//! rows (score asc, canonical desc)
//!   best = rows[0]
//!   for r in rows[1..]:
//!     r.score != best.score              -> stop, best wins
//!     r.work  != best.work               -> Ambiguous
//!     r.work  == best.work, !canonical   -> NonCanonical
//!     r.work  == best.work,  canonical   -> keep scanning
//! ```
//!
//! Scores come from increasingly permissive match tiers, so two distinct
//! works sharing the best score cannot be told apart, and a best work whose
//! top row lacks the canonical flag gives no principled URI to return.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::{Result, TranslatorError};
use crate::model::{CandidateRow, Identifier};

/// Resolution policy for multi-candidate results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Return every candidate
    #[default]
    Indulgent,
    /// Return exactly one candidate or fail
    Strict,
}

impl ResolutionMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ResolutionMode::Strict
        } else {
            ResolutionMode::Indulgent
        }
    }
}

/// Resolve ordered candidate rows into identifiers.
///
/// Rows are expected in `(score asc, canonical desc)` order; out-of-order
/// input is re-sorted (stably) before anything else looks at it.
pub fn resolve(mut rows: Vec<CandidateRow>, mode: ResolutionMode) -> Result<Vec<Identifier>> {
    if rows.is_empty() {
        return Err(TranslatorError::NoResult);
    }
    order_candidates(&mut rows);

    if rows.len() == 1 {
        debug!("Success: single result");
        return Ok(vec![rows[0].to_identifier()]);
    }

    match mode {
        ResolutionMode::Indulgent => {
            debug!(count = rows.len(), "Success: multiple results in indulgent mode");
            Ok(to_identifiers(&rows))
        }
        ResolutionMode::Strict => {
            debug!(
                count = rows.len(),
                "Multiple results in strict mode, choosing best candidate"
            );
            let best = choose_best_candidate(&rows)?;
            Ok(vec![best.to_identifier()])
        }
    }
}

/// Pick the single fittest row, or explain why none can be picked.
fn choose_best_candidate(rows: &[CandidateRow]) -> Result<&CandidateRow> {
    let Some((best, rest)) = rows.split_first() else {
        return Err(TranslatorError::NoResult);
    };

    for row in rest {
        if row.score != best.score {
            break;
        }
        if row.work_id != best.work_id {
            return Err(TranslatorError::Ambiguous {
                candidates: to_identifiers(rows),
            });
        }
        if !best.canonical {
            return Err(TranslatorError::NonCanonical {
                candidates: to_identifiers(rows),
            });
        }
    }

    Ok(best)
}

/// Ensure `(score asc, canonical desc)` order.
///
/// Already-ordered input is left untouched; otherwise a stable sort keeps
/// the store's relative order among equal keys.
pub fn order_candidates(rows: &mut [CandidateRow]) {
    let ordered = rows
        .windows(2)
        .all(|pair| candidate_order(&pair[0], &pair[1]) != Ordering::Greater);
    if !ordered {
        warn!(count = rows.len(), "Candidate rows arrived out of order, re-sorting");
        rows.sort_by(candidate_order);
    }
}

fn candidate_order(a: &CandidateRow, b: &CandidateRow) -> Ordering {
    a.score
        .cmp(&b.score)
        .then_with(|| b.canonical.cmp(&a.canonical))
}

fn to_identifiers(rows: &[CandidateRow]) -> Vec<Identifier> {
    rows.iter().map(CandidateRow::to_identifier).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn work_a() -> Uuid {
        Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000001").unwrap()
    }

    fn work_b() -> Uuid {
        Uuid::parse_str("bbbbbbbb-0000-4000-8000-000000000002").unwrap()
    }

    fn row(work_id: Uuid, value: &str, canonical: bool, score: u32) -> CandidateRow {
        CandidateRow {
            work_id,
            work_type: "monograph".into(),
            uri_scheme: "urn:isbn".into(),
            uri_value: value.into(),
            canonical,
            score,
        }
    }

    #[test]
    fn single_row_resolves_in_strict_mode() {
        let rows = vec![row(work_a(), "1", true, 0)];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].parts.value, "1");
    }

    #[test]
    fn single_non_canonical_row_still_resolves() {
        let rows = vec![row(work_a(), "1", false, 3)];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result.len(), 1);
        assert!(!result[0].canonical);
    }

    #[test]
    fn two_works_tied_at_best_score_are_ambiguous() {
        let rows = vec![row(work_a(), "1", true, 0), row(work_b(), "2", true, 0)];

        let err = resolve(rows, ResolutionMode::Strict).unwrap_err();

        assert!(matches!(err, TranslatorError::Ambiguous { .. }));
        assert_eq!(err.candidates().len(), 2);
    }

    #[test]
    fn repeated_work_without_canonical_is_non_canonical() {
        let rows = vec![row(work_a(), "1", false, 0), row(work_a(), "2", false, 0)];

        let err = resolve(rows, ResolutionMode::Strict).unwrap_err();

        assert!(matches!(err, TranslatorError::NonCanonical { .. }));
        assert_eq!(err.candidates().len(), 2);
    }

    #[test]
    fn scan_stops_at_first_score_change() {
        let rows = vec![row(work_a(), "1", true, 0), row(work_b(), "2", true, 1)];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].work.as_ref().map(|w| w.id), Some(work_a()));
    }

    #[test]
    fn canonical_best_keeps_scanning_for_other_tied_works() {
        let rows = vec![
            row(work_a(), "1", true, 0),
            row(work_a(), "2", false, 0),
            row(work_b(), "3", false, 0),
        ];

        let err = resolve(rows, ResolutionMode::Strict).unwrap_err();

        assert!(matches!(err, TranslatorError::Ambiguous { .. }));
        assert_eq!(err.candidates().len(), 3);
    }

    #[test]
    fn canonical_best_over_same_work_resolves() {
        let rows = vec![
            row(work_a(), "1", true, 0),
            row(work_a(), "2", false, 0),
            row(work_b(), "3", true, 2),
        ];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].parts.value, "1");
    }

    #[test]
    fn multiple_canonical_rows_for_one_work_are_accepted() {
        let rows = vec![row(work_a(), "1", true, 0), row(work_a(), "2", true, 0)];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result[0].parts.value, "1");
    }

    #[test]
    fn indulgent_mode_returns_every_candidate() {
        let rows = vec![
            row(work_a(), "1", true, 0),
            row(work_b(), "2", true, 0),
            row(work_b(), "3", false, 4),
        ];

        let result = resolve(rows, ResolutionMode::Indulgent).unwrap();

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|i| i.work.is_some()));
    }

    #[test]
    fn empty_input_is_no_result() {
        let err = resolve(vec![], ResolutionMode::Strict).unwrap_err();
        assert!(matches!(err, TranslatorError::NoResult));
    }

    #[test]
    fn out_of_order_rows_are_sorted_before_tie_break() {
        let rows = vec![
            row(work_b(), "2", true, 1),
            row(work_a(), "1", false, 0),
            row(work_a(), "0", true, 0),
        ];

        let result = resolve(rows, ResolutionMode::Strict).unwrap();

        assert_eq!(result[0].parts.value, "0");
    }

    #[test]
    fn ordering_is_stable_for_equal_keys() {
        let mut rows = vec![
            row(work_a(), "late", false, 2),
            row(work_b(), "first", true, 1),
            row(work_a(), "second", true, 1),
        ];

        order_candidates(&mut rows);

        let values: Vec<_> = rows.iter().map(|r| r.uri_value.as_str()).collect();
        assert_eq!(values, ["first", "second", "late"]);
    }
}
