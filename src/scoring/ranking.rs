use crate::scoring::candidates::FailureModeCandidate;
use crate::scoring::contribution::Contribution;
use serde::Serialize;
use std::cmp::Ordering;

/// A candidate with its raw summed score, before normalization.
#[derive(Debug, Clone)]
pub struct ScoredMode {
    pub candidate: FailureModeCandidate,
    pub score: f32,
    pub contributions: Vec<Contribution>,
}

/// A failure mode in the final ranking, with its share of the total score
/// expressed as a percentage.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMode {
    pub candidate: FailureModeCandidate,
    pub score: f32,
    pub probability_pct: f32,
    pub contributions: Vec<Contribution>,
}

/// Converts raw scores into a ranked probability distribution:
/// `probability_pct = 100 * score / total`, sorted descending. The sort is
/// stable, so ties keep their candidate-enumeration order. Callers must drop
/// zero-score modes first; with a zero total the percentages are meaningless.
pub fn normalize(mut scored: Vec<ScoredMode>) -> Vec<RankedMode> {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let total: f32 = scored.iter().map(|mode| mode.score).sum();
    scored
        .into_iter()
        .map(|mode| RankedMode {
            probability_pct: mode.score / total * 100.0,
            candidate: mode.candidate,
            score: mode.score,
            contributions: mode.contributions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: i32, name: &str, score: f32) -> ScoredMode {
        ScoredMode {
            candidate: FailureModeCandidate {
                id,
                name: name.into(),
                description: None,
                image_path: None,
            },
            score,
            contributions: Vec::new(),
        }
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let ranked = normalize(vec![
            scored(1, "A", 12.5),
            scored(2, "B", 3.25),
            scored(3, "C", 7.0),
        ]);
        let total: f32 = ranked.iter().map(|m| m.probability_pct).sum();
        assert!((total - 100.0).abs() < 1e-4);
    }

    #[test]
    fn ranking_is_descending_with_exact_shares() {
        let ranked = normalize(vec![scored(2, "B", 10.0), scored(1, "A", 30.0)]);
        assert_eq!(ranked[0].candidate.name, "A");
        assert_eq!(ranked[1].candidate.name, "B");
        assert!((ranked[0].probability_pct - 75.0).abs() < 1e-6);
        assert!((ranked[1].probability_pct - 25.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let ranked = normalize(vec![
            scored(1, "first", 5.0),
            scored(2, "second", 5.0),
            scored(3, "third", 5.0),
        ]);
        let names: Vec<&str> = ranked.iter().map(|m| m.candidate.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn single_mode_takes_the_full_distribution() {
        let ranked = normalize(vec![scored(1, "only", 2.0)]);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].probability_pct - 100.0).abs() < 1e-6);
    }
}
