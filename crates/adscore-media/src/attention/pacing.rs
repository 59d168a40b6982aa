//! Goal-conditioned pacing score.

use adscore_models::{CreativeGoal, PacingParams};

use super::profiles::AgeGroupProfile;

/// Pacing fit of a single cut rate: `exp(-lambda * (rate - f_star)^2)`.
#[inline]
pub fn pacing_score(cut_rate: f64, params: PacingParams) -> f64 {
    let diff = cut_rate - params.f_star;
    let score = (-params.lambda * diff * diff).exp();
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Pacing score per timestamp.
pub fn pacing_series(cut_rate: &[f64], params: PacingParams) -> Vec<f64> {
    cut_rate.iter().map(|c| pacing_score(*c, params)).collect()
}

/// Resolves pacing parameters from a profile and optional overrides.
#[derive(Debug, Clone, Copy)]
pub struct PacingScorer {
    params: PacingParams,
}

impl PacingScorer {
    pub fn new(params: PacingParams) -> Self {
        Self { params }
    }

    /// Target for `goal` in `profile`, with `f_star` and `lambda` each
    /// independently overridable.
    pub fn for_goal(
        profile: &AgeGroupProfile,
        goal: CreativeGoal,
        f_star: Option<f64>,
        lambda: Option<f64>,
    ) -> Self {
        let base = profile.pacing_for(goal);
        Self {
            params: PacingParams {
                f_star: f_star.filter(|v| v.is_finite()).unwrap_or(base.f_star),
                lambda: lambda.filter(|v| v.is_finite()).unwrap_or(base.lambda),
            },
        }
    }

    pub fn params(&self) -> PacingParams {
        self.params
    }

    pub fn score(&self, cut_rate: &[f64]) -> Vec<f64> {
        pacing_series(cut_rate, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attention::profiles::AgeGroupTable;
    use adscore_models::AgeGroup;

    const P: PacingParams = PacingParams {
        f_star: 0.5,
        lambda: 0.5,
    };

    #[test]
    fn test_peak_at_target() {
        assert_eq!(pacing_score(0.5, P), 1.0);
    }

    #[test]
    fn test_symmetric_and_monotone() {
        for d in [0.1, 0.4, 1.0, 3.0] {
            let lo = pacing_score(0.5 - d, P);
            let hi = pacing_score(0.5 + d, P);
            assert!((lo - hi).abs() < 1e-12);
        }
        let scores = pacing_series(&[0.5, 0.7, 1.0, 2.0, 5.0], P);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_calm_brand_zero_rate() {
        let table = AgeGroupTable::builtin();
        let scorer = PacingScorer::for_goal(
            table.get(AgeGroup::General),
            CreativeGoal::CalmBrand,
            None,
            None,
        );
        let s = scorer.score(&[0.0]);
        assert!((s[0] - (-0.04f64).exp()).abs() < 1e-12);
        assert!((s[0] - 0.9608).abs() < 1e-4);
    }

    #[test]
    fn test_overrides_are_independent() {
        let table = AgeGroupTable::builtin();
        let profile = table.get(AgeGroup::Children);
        let scorer = PacingScorer::for_goal(profile, CreativeGoal::Hook, None, Some(2.0));
        assert_eq!(scorer.params().f_star, 0.7);
        assert_eq!(scorer.params().lambda, 2.0);

        let scorer = PacingScorer::for_goal(profile, CreativeGoal::Hook, Some(1.0), None);
        assert_eq!(scorer.params().f_star, 1.0);
        assert_eq!(scorer.params().lambda, 0.3);
    }
}
