//! Tests for the selection tiers.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;

const NOW: i64 = 1_700_000_000_000;

fn rng() -> StdRng {
    StdRng::seed_from_u64(11)
}

fn pick(candidates: &[Candidate]) -> Option<Selection> {
    select(candidates, NOW, &Blend::default(), &mut rng())
}

// -- helpers ---------------------------------------------------------------

#[test]
fn normalize_scales_into_unit_range() {
    assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
    assert_eq!(normalize(10.0, 0.0, 10.0), 1.0);
    assert_eq!(normalize(0.0, 0.0, 10.0), 0.0);
}

#[test]
fn normalize_zero_width_range_collapses_to_zero() {
    assert_eq!(normalize(0.7, 0.7, 0.7), 0.0);
}

#[test]
fn weight_score_is_the_true_fraction() {
    assert_eq!(weight_score([(0.5, true), (0.5, false)]), Some(0.5));
    assert_eq!(weight_score([(0.25, true), (0.75, false)]), Some(0.25));
    assert_eq!(weight_score([(1.0, true)]), Some(1.0));
    assert_eq!(weight_score(std::iter::empty()), None);
    assert_eq!(weight_score([(0.0, true), (0.0, false)]), Some(0.0));
}

#[test]
fn weight_score_is_not_a_count() {
    // Two light true criteria lose to one heavy true criterion.
    let light = weight_score([(0.1, true), (0.1, true), (0.8, false)]).unwrap();
    let heavy = weight_score([(0.9, true), (0.05, false), (0.05, false)]).unwrap();
    assert!(heavy > light);
}

// -- tiers -----------------------------------------------------------------

#[test]
fn no_candidates_selects_nothing() {
    assert_eq!(pick(&[]), None);
}

#[test]
fn single_candidate_always_wins() {
    for candidate in [
        Candidate::new(Some(0.0), NOW - 10),
        Candidate::new(None, 0),
        Candidate::new(Some(1.0), 0),
    ] {
        assert_eq!(
            pick(&[candidate]),
            Some(Selection {
                index: 0,
                tier: Tier::Single
            })
        );
    }
}

#[test]
fn never_used_candidate_beats_used_one() {
    let candidates = [
        Candidate::new(Some(1.0), NOW - 5_000),
        Candidate::new(Some(0.2), 0),
    ];
    assert_eq!(
        pick(&candidates),
        Some(Selection {
            index: 1,
            tier: Tier::NeverUsed
        })
    );
}

#[test]
fn highest_scoring_never_used_wins() {
    let candidates = [
        Candidate::new(Some(0.3), 0),
        Candidate::new(Some(0.9), NOW - 1),
        Candidate::new(Some(0.8), 0),
        Candidate::new(None, 0),
    ];
    assert_eq!(pick(&candidates).unwrap().index, 2);
}

#[test]
fn never_used_tie_keeps_binding_order() {
    let candidates = [
        Candidate::new(Some(0.5), NOW - 1),
        Candidate::new(Some(0.5), 0),
        Candidate::new(Some(0.5), 0),
    ];
    assert_eq!(pick(&candidates).unwrap().index, 1);
}

#[test]
fn never_used_without_scores_still_selects() {
    let candidates = [Candidate::new(None, 0), Candidate::new(Some(0.0), 0)];
    assert_eq!(
        pick(&candidates),
        Some(Selection {
            index: 0,
            tier: Tier::NeverUsed
        })
    );
}

#[test]
fn no_criteria_picks_least_recently_used() {
    let candidates = [
        Candidate::new(None, NOW - 2_000),
        Candidate::new(None, NOW - 3_000),
        Candidate::new(None, NOW - 1_000),
    ];
    assert_eq!(
        pick(&candidates),
        Some(Selection {
            index: 1,
            tier: Tier::LeastRecentlyUsed
        })
    );
}

#[test]
fn weighted_prefers_higher_score_at_equal_recency() {
    let t = NOW - 60_000;
    let candidates = [
        Candidate::new(Some(0.5), t),
        Candidate::new(Some(1.0), t),
        Candidate::new(Some(0.75), t),
    ];
    assert_eq!(
        pick(&candidates),
        Some(Selection {
            index: 1,
            tier: Tier::Weighted
        })
    );
}

#[test]
fn weighted_ignores_zero_scores_and_ruleless_candidates() {
    let candidates = [
        Candidate::new(Some(0.0), NOW - 90_000),
        Candidate::new(None, NOW - 90_000),
        Candidate::new(Some(0.4), NOW - 1_000),
    ];
    let scores = weighted_scores(&candidates, NOW, &Blend::default());
    assert_eq!(scores[0], None);
    assert_eq!(scores[1], None);
    assert!(scores[2].is_some());
    assert_eq!(pick(&candidates).unwrap().index, 2);
}

#[test]
fn weighted_blend_matches_formula() {
    let candidates = [
        Candidate::new(Some(0.5), NOW - 10_000),
        Candidate::new(Some(1.0), NOW - 4_000),
    ];
    let scores = weighted_scores(&candidates, NOW, &Blend::default());
    // First: lowest score and oldest time, both normalize to 0.
    assert_eq!(scores[0], Some(0.0));
    // Second: normalized score 1, normalized time 1 scaled by 4 elapsed seconds.
    let expected = 0.6 * 1.0 + 0.4 * (1.0 * 4.0);
    assert!((scores[1].unwrap() - expected).abs() < 1e-9);
}

#[test]
fn blend_factors_are_configurable() {
    let candidates = [
        Candidate::new(Some(0.5), NOW - 10_000),
        Candidate::new(Some(1.0), NOW - 4_000),
    ];
    let score_only = Blend {
        score_weight: 1.0,
        recency_weight: 0.0,
    };
    let scores = weighted_scores(&candidates, NOW, &score_only);
    assert_eq!(scores[1], Some(1.0));
}

#[test]
fn weighted_ties_pick_among_tied_only() {
    let t = NOW - 30_000;
    let candidates = [
        Candidate::new(Some(0.5), t),
        Candidate::new(Some(0.25), t),
        Candidate::new(Some(0.5), t),
    ];
    let mut rng = rng();
    let mut seen = [0usize; 3];
    for _ in 0..200 {
        let selection = select(&candidates, NOW, &Blend::default(), &mut rng).unwrap();
        assert_eq!(selection.tier, Tier::Weighted);
        seen[selection.index] += 1;
    }
    // Both leaders score 0.6 * 1 + 0; the 0.25 candidate scores 0.
    assert_eq!(seen[1], 0);
    assert!(seen[0] > 0 && seen[2] > 0);
}

#[test]
fn weighted_with_no_eligible_falls_back_to_unconditional_rule() {
    let candidates = [
        Candidate::new(Some(0.0), NOW - 50_000),
        Candidate::new(None, NOW - 2_000),
        Candidate::new(None, NOW - 9_000),
    ];
    assert_eq!(
        pick(&candidates),
        Some(Selection {
            index: 2,
            tier: Tier::Fallback
        })
    );
}

#[test]
fn weighted_with_no_eligible_and_no_unconditional_rule_selects_nothing() {
    let candidates = [
        Candidate::new(Some(0.0), NOW - 50_000),
        Candidate::new(Some(0.0), NOW - 2_000),
    ];
    assert_eq!(pick(&candidates), None);
}
