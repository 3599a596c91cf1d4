//! Tiered choice of one winning rule among the candidates for an event.
//!
//! The decision works on [`Candidate`] snapshots (score and last-used time
//! captured once per call), so it is a pure function of its inputs plus the
//! RNG used to break ties. Tiers, in order:
//!
//! 1. **Single**: exactly one candidate wins unconditionally.
//! 2. **NeverUsed**: if any candidate was never used, the never-used one
//!    with the highest score wins (no criteria counts as 0, first wins ties).
//! 3. **LeastRecentlyUsed**: if no candidate has criteria, the oldest
//!    last-used time wins (first wins ties).
//! 4. **Weighted**: candidates with criteria and a positive score are
//!    blended as `score_weight * normalized_score + recency_weight *
//!    normalized_recency`; a uniform random pick among those tied for the
//!    maximum wins.
//! 5. **Fallback**: if the weighted tier has no eligible candidate, the
//!    least recently used candidate without criteria wins, or nobody does.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

#[cfg(test)]
mod tests;

/// Per-rule inputs to the decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Weighted fraction of true criteria; `None` when the rule has no criteria.
    pub score: Option<f64>,
    /// Epoch milliseconds, `0` for never used.
    pub last_used: i64,
}

impl Candidate {
    pub fn new(score: Option<f64>, last_used: i64) -> Self {
        Self { score, last_used }
    }

    pub fn is_never_used(&self) -> bool {
        self.last_used == 0
    }

    fn is_weighted_eligible(&self) -> bool {
        self.score.is_some_and(|s| s > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Single,
    NeverUsed,
    LeastRecentlyUsed,
    Weighted,
    Fallback,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Single => write!(f, "single"),
            Tier::NeverUsed => write!(f, "never_used"),
            Tier::LeastRecentlyUsed => write!(f, "least_recently_used"),
            Tier::Weighted => write!(f, "weighted"),
            Tier::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Index into the candidate slice.
    pub index: usize,
    pub tier: Tier,
}

/// Blend factors for the weighted tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub score_weight: f64,
    pub recency_weight: f64,
}

impl Default for Blend {
    fn default() -> Self {
        Self {
            score_weight: 0.6,
            recency_weight: 0.4,
        }
    }
}

/// Scale `value` into `[0, 1]` relative to `[minimum, maximum]`.
///
/// A zero-width range uses a divisor of 1, so every value equal to the
/// minimum maps to 0.
pub fn normalize(value: f64, minimum: f64, maximum: f64) -> f64 {
    let numerator = value - minimum;
    let mut denominator = maximum - minimum;
    if denominator == 0.0 {
        denominator = 1.0;
    }
    numerator / denominator
}

/// Weighted score of a rule: sum of true weights over sum of all weights.
///
/// `None` for a rule without criteria. If every weight is zero the quotient
/// is undefined and the rule scores 0.
pub fn weight_score(criteria: impl IntoIterator<Item = (f64, bool)>) -> Option<f64> {
    let mut any = false;
    let mut total = 0.0;
    let mut true_weight = 0.0;
    for (weight, is_true) in criteria {
        any = true;
        total += weight;
        if is_true {
            true_weight += weight;
        }
    }
    if !any {
        return None;
    }
    Some(if total > 0.0 { true_weight / total } else { 0.0 })
}

/// Final weighted-tier score per candidate; `None` for ineligible ones.
pub fn weighted_scores(candidates: &[Candidate], now: i64, blend: &Blend) -> Vec<Option<f64>> {
    let eligible: Vec<(f64, i64)> = candidates
        .iter()
        .filter(|c| c.is_weighted_eligible())
        .filter_map(|c| c.score.map(|s| (s, c.last_used)))
        .collect();
    if eligible.is_empty() {
        return vec![None; candidates.len()];
    }

    let lowest_score = eligible.iter().map(|(s, _)| *s).fold(f64::INFINITY, f64::min);
    let highest_score = eligible.iter().map(|(s, _)| *s).fold(f64::NEG_INFINITY, f64::max);
    let oldest = eligible.iter().map(|(_, t)| *t).min().unwrap_or(0) as f64;
    let newest = eligible.iter().map(|(_, t)| *t).max().unwrap_or(0) as f64;

    candidates
        .iter()
        .map(|c| {
            let score = c.score.filter(|_| c.is_weighted_eligible())?;
            let normalized_score = normalize(score, lowest_score, highest_score);
            let elapsed_secs = (now - c.last_used) as f64 / 1000.0;
            let normalized_recency = normalize(c.last_used as f64, oldest, newest) * elapsed_secs;
            Some(blend.score_weight * normalized_score + blend.recency_weight * normalized_recency)
        })
        .collect()
}

/// Pick the winning candidate, or `None` when no tier yields one.
pub fn select<R: Rng + ?Sized>(
    candidates: &[Candidate],
    now: i64,
    blend: &Blend,
    rng: &mut R,
) -> Option<Selection> {
    match candidates.len() {
        0 => return None,
        1 => {
            return Some(Selection {
                index: 0,
                tier: Tier::Single,
            })
        }
        _ => {}
    }

    if candidates.iter().any(Candidate::is_never_used) {
        return highest_never_used(candidates).map(|index| Selection {
            index,
            tier: Tier::NeverUsed,
        });
    }

    if candidates.iter().all(|c| c.score.is_none()) {
        return least_recently_used(candidates, |_| true).map(|index| Selection {
            index,
            tier: Tier::LeastRecentlyUsed,
        });
    }

    let mut highest: Option<f64> = None;
    let mut tied: Vec<usize> = Vec::new();
    for (index, score) in weighted_scores(candidates, now, blend).into_iter().enumerate() {
        let Some(score) = score else { continue };
        match highest {
            Some(h) if score < h => {}
            Some(h) if score == h => tied.push(index),
            _ => {
                highest = Some(score);
                tied.clear();
                tied.push(index);
            }
        }
    }

    if let Some(&index) = tied.choose(rng) {
        return Some(Selection {
            index,
            tier: Tier::Weighted,
        });
    }

    least_recently_used(candidates, |c| c.score.is_none()).map(|index| Selection {
        index,
        tier: Tier::Fallback,
    })
}

fn highest_never_used(candidates: &[Candidate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_never_used() {
            continue;
        }
        let score = candidate.score.unwrap_or(0.0);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

fn least_recently_used(
    candidates: &[Candidate],
    filter: impl Fn(&Candidate) -> bool,
) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| filter(c))
        .min_by_key(|(_, c)| c.last_used)
        .map(|(index, _)| index)
}
