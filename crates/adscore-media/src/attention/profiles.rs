//! Audience profiles: fusion weights, time decay, grading thresholds and
//! pacing targets per age group.
//!
//! The table is built once with [`AgeGroupTable::builtin`] and passed to the
//! stages that need it. Lookups are total: unknown keys resolve to the
//! `general` profile and unknown goals to the `hook` pacing target.

use adscore_models::{AgeGroup, CreativeGoal, PacingParams};
use serde::Serialize;

/// Weight of each signal in the fused attention curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    pub saliency: f64,
    pub motion: f64,
    pub semantic: f64,
    pub pacing: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            saliency: 0.50,
            motion: 0.25,
            semantic: 0.15,
            pacing: 0.10,
        }
    }
}

/// Linear multiplier applied from the first to the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeDecay {
    pub start: f64,
    pub end: f64,
}

impl Default for TimeDecay {
    fn default() -> Self {
        Self {
            start: 1.2,
            end: 1.0,
        }
    }
}

/// Grade and hook cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
    pub hook_excellent: f64,
    pub hook_good: f64,
    pub hook_fair: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        STANDARD_THRESHOLDS
    }
}

impl Thresholds {
    /// Overall score counted as strong attention capture.
    pub fn strong(&self) -> f64 {
        (self.excellent + self.good) / 2.0
    }
}

/// Target cut rate and sensitivity per creative goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalPacing {
    pub hook: PacingParams,
    pub explainer: PacingParams,
    pub calm_brand: PacingParams,
}

impl GoalPacing {
    pub fn get(&self, goal: CreativeGoal) -> PacingParams {
        match goal {
            CreativeGoal::Hook => self.hook,
            CreativeGoal::Explainer => self.explainer,
            CreativeGoal::CalmBrand => self.calm_brand,
        }
    }
}

/// One audience profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupProfile {
    pub key: AgeGroup,
    pub name: &'static str,
    pub description: &'static str,
    pub weights: FusionWeights,
    pub time_decay: TimeDecay,
    pub thresholds: Thresholds,
    pub pacing: GoalPacing,
}

impl AgeGroupProfile {
    /// Pacing target for a goal.
    pub fn pacing_for(&self, goal: CreativeGoal) -> PacingParams {
        self.pacing.get(goal)
    }

    /// Pacing target for a goal key; unknown goals use the hook target.
    pub fn pacing_for_key(&self, goal: &str) -> PacingParams {
        self.pacing_for(goal.parse().unwrap_or(CreativeGoal::Hook))
    }
}

const fn pace(f_star: f64, lambda: f64) -> PacingParams {
    PacingParams { f_star, lambda }
}

const STANDARD_THRESHOLDS: Thresholds = Thresholds {
    excellent: 0.75,
    good: 0.60,
    fair: 0.45,
    hook_excellent: 0.70,
    hook_good: 0.55,
    hook_fair: 0.40,
};

const CRITICAL_THRESHOLDS: Thresholds = Thresholds {
    excellent: 0.70,
    good: 0.55,
    fair: 0.40,
    hook_excellent: 0.65,
    hook_good: 0.50,
    hook_fair: 0.35,
};

/// Read-only table of the six audience profiles.
#[derive(Debug, Clone)]
pub struct AgeGroupTable {
    profiles: Vec<AgeGroupProfile>,
}

impl AgeGroupTable {
    /// The calibrated profiles.
    pub fn builtin() -> Self {
        let general_weights = FusionWeights::default();
        let general_pacing = GoalPacing {
            hook: pace(0.5, 0.5),
            explainer: pace(0.3, 1.2),
            calm_brand: pace(0.2, 1.0),
        };

        let profiles = vec![
            AgeGroupProfile {
                key: AgeGroup::GenZ,
                name: "Gen Z (18-27)",
                description: "Digital natives, high attention to motion and fast pacing",
                weights: FusionWeights {
                    saliency: 0.40,
                    motion: 0.35,
                    semantic: 0.15,
                    pacing: 0.10,
                },
                time_decay: TimeDecay {
                    start: 1.3,
                    end: 0.9,
                },
                thresholds: CRITICAL_THRESHOLDS,
                pacing: GoalPacing {
                    hook: pace(0.6, 0.4),
                    explainer: pace(0.4, 1.0),
                    calm_brand: pace(0.3, 0.8),
                },
            },
            AgeGroupProfile {
                key: AgeGroup::Millennial,
                name: "Millennials (28-43)",
                description: "Balanced attention, values both engagement and information",
                weights: general_weights,
                time_decay: TimeDecay::default(),
                thresholds: STANDARD_THRESHOLDS,
                pacing: general_pacing,
            },
            AgeGroupProfile {
                key: AgeGroup::GenX,
                name: "Gen X (44-59)",
                description: "Prefers clarity and moderate pacing, less tolerance for rapid cuts",
                weights: FusionWeights {
                    saliency: 0.55,
                    motion: 0.20,
                    semantic: 0.15,
                    pacing: 0.10,
                },
                time_decay: TimeDecay {
                    start: 1.1,
                    end: 1.0,
                },
                thresholds: STANDARD_THRESHOLDS,
                pacing: GoalPacing {
                    hook: pace(0.4, 0.6),
                    explainer: pace(0.25, 1.4),
                    calm_brand: pace(0.15, 1.2),
                },
            },
            AgeGroupProfile {
                key: AgeGroup::Boomer,
                name: "Boomers (60+)",
                description: "Prefers slower pacing, clear visuals, and less rapid changes",
                weights: FusionWeights {
                    saliency: 0.60,
                    motion: 0.15,
                    semantic: 0.15,
                    pacing: 0.10,
                },
                time_decay: TimeDecay {
                    start: 1.0,
                    end: 1.0,
                },
                thresholds: CRITICAL_THRESHOLDS,
                pacing: GoalPacing {
                    hook: pace(0.3, 0.8),
                    explainer: pace(0.2, 1.5),
                    calm_brand: pace(0.1, 1.3),
                },
            },
            AgeGroupProfile {
                key: AgeGroup::Children,
                name: "Children (5-17)",
                description:
                    "Very high attention to motion and fast pacing, shorter attention spans",
                weights: FusionWeights {
                    saliency: 0.35,
                    motion: 0.40,
                    semantic: 0.15,
                    pacing: 0.10,
                },
                time_decay: TimeDecay {
                    start: 1.4,
                    end: 0.8,
                },
                thresholds: Thresholds {
                    excellent: 0.65,
                    good: 0.50,
                    fair: 0.35,
                    hook_excellent: 0.60,
                    hook_good: 0.45,
                    hook_fair: 0.30,
                },
                pacing: GoalPacing {
                    hook: pace(0.7, 0.3),
                    explainer: pace(0.5, 0.8),
                    calm_brand: pace(0.4, 0.6),
                },
            },
            AgeGroupProfile {
                key: AgeGroup::General,
                name: "General Audience",
                description: "Default settings for mixed demographics",
                weights: general_weights,
                time_decay: TimeDecay::default(),
                thresholds: STANDARD_THRESHOLDS,
                pacing: general_pacing,
            },
        ];

        Self { profiles }
    }

    /// Profile for an age group.
    pub fn get(&self, group: AgeGroup) -> &AgeGroupProfile {
        self.profiles
            .iter()
            .find(|p| p.key == group)
            .unwrap_or_else(|| self.general())
    }

    /// Profile for a key; unknown keys resolve to `general`.
    pub fn profile(&self, key: &str) -> &AgeGroupProfile {
        self.get(AgeGroup::from_key(key))
    }

    /// Pacing target for an age-group key and goal key.
    pub fn pacing_for(&self, age_group: &str, goal: &str) -> PacingParams {
        self.profile(age_group).pacing_for_key(goal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgeGroupProfile> {
        self.profiles.iter()
    }

    fn general(&self) -> &AgeGroupProfile {
        // builtin() always contains General as its last entry
        &self.profiles[self.profiles.len() - 1]
    }
}

impl Default for AgeGroupTable {
    fn default() -> Self {
        Self::builtin()
    }
}
