//! Rule-based grading and explanation of an attention score.
//!
//! Pure function of the scalar results: overall score, opening retention,
//! average cut rate, creative goal and its target rate, plus an optional
//! audience profile. Without a profile the general thresholds apply and no
//! audience name is rendered.

use adscore_models::{
    round3, AgeGroup, CreativeGoal, DetailedExplanation, Grade, HookQuality, Interpretation,
    PacingFit,
};

use super::profiles::{AgeGroupProfile, Thresholds};

/// Cut-rate distance from target still counted as aligned.
const PACING_TOLERANCE: f64 = 0.3;
/// Cut-rate distance flagged as a weakness.
const PACING_WEAKNESS: f64 = 0.5;
/// Cut-rate distance that triggers a pacing recommendation.
const PACING_RECOMMENDATION: f64 = 0.4;

/// Grade an overall score.
pub fn grade_for(overall: f64, thresholds: &Thresholds) -> Grade {
    if overall >= thresholds.excellent {
        Grade::A
    } else if overall >= thresholds.good {
        Grade::B
    } else if overall >= thresholds.fair {
        Grade::C
    } else {
        Grade::D
    }
}

/// Classify the opening retention.
pub fn hook_quality_for(first_5s: f64, thresholds: &Thresholds) -> HookQuality {
    if first_5s >= thresholds.hook_excellent {
        HookQuality::Excellent
    } else if first_5s >= thresholds.hook_good {
        HookQuality::Good
    } else if first_5s >= thresholds.hook_fair {
        HookQuality::Weak
    } else {
        HookQuality::Poor
    }
}

/// Compare the measured cut rate with the goal target.
pub fn pacing_fit_for(avg_cut_rate: f64, f_star: f64) -> PacingFit {
    if (avg_cut_rate - f_star).abs() <= PACING_TOLERANCE {
        PacingFit::Aligned
    } else if avg_cut_rate > f_star + PACING_TOLERANCE {
        PacingFit::TooFast
    } else {
        PacingFit::TooSlow
    }
}

fn audience_suffix(name: Option<&str>) -> String {
    name.map(|n| format!(" for {n}")).unwrap_or_default()
}

fn summary(grade: Grade, suffix: &str) -> String {
    match grade {
        Grade::A => format!(
            "This ad is highly likely to perform well and capture viewer attention effectively{suffix}."
        ),
        Grade::B => format!(
            "This ad shows solid potential but has room for improvement to maximize engagement{suffix}."
        ),
        Grade::C => format!(
            "This ad may struggle to maintain attention and could benefit from significant optimization{suffix}."
        ),
        Grade::D => format!(
            "This ad is unlikely to perform well and requires substantial changes to improve engagement{suffix}."
        ),
    }
}

fn prediction(grade: Grade, suffix: &str) -> String {
    match grade {
        Grade::A => format!(
            "High likelihood of strong performance{suffix}: expect above-average view-through rates, engagement, and conversion potential."
        ),
        Grade::B => format!(
            "Moderate performance expected{suffix}: competitive view-through rates with potential for optimization gains."
        ),
        Grade::C => format!(
            "Below-average performance likely{suffix}: may struggle with viewer retention and may need significant revisions."
        ),
        Grade::D => format!(
            "Poor performance expected{suffix}: high risk of low engagement, view-through, and conversion rates."
        ),
    }
}

fn hook_analysis(quality: HookQuality) -> &'static str {
    match quality {
        HookQuality::Excellent => "Excellent hook - the opening seconds are highly engaging and likely to capture attention immediately.",
        HookQuality::Good => "Good hook - the opening captures attention but could be more compelling.",
        HookQuality::Weak => "Weak hook - the opening may not be strong enough to prevent viewers from skipping.",
        HookQuality::Poor => "Poor hook - the opening fails to grab attention, risking immediate viewer drop-off.",
    }
}

fn pacing_analysis(fit: PacingFit, goal_name: &str, f_star: f64, avg_cut_rate: f64) -> String {
    let rates = format!("target: {f_star:.1} cuts/sec, actual: {avg_cut_rate:.2} cuts/sec");
    match fit {
        PacingFit::Aligned => format!("Pacing aligns well with {goal_name} goal ({rates})."),
        PacingFit::TooFast => format!(
            "Pacing is too fast for {goal_name} goal. Consider slowing down cuts ({rates})."
        ),
        PacingFit::TooSlow => format!(
            "Pacing is too slow for {goal_name} goal. Consider increasing cut frequency ({rates})."
        ),
    }
}

fn audience_recommendation(group: AgeGroup) -> Option<&'static str> {
    match group {
        AgeGroup::GenZ => Some("Consider increasing motion and faster pacing - Gen Z responds well to dynamic content"),
        AgeGroup::Boomer => Some("Consider slower pacing and clearer visuals - Boomers prefer less rapid changes"),
        AgeGroup::GenX => Some("Balance clarity with engagement - Gen X values both visual clarity and moderate pacing"),
        AgeGroup::Children => Some("Maximize motion and fast pacing - Children have high attention to movement and prefer dynamic, fast-paced content"),
        AgeGroup::Millennial | AgeGroup::General => None,
    }
}

/// Grade a run and explain the result.
pub fn interpret(
    overall: f64,
    first_5s: f64,
    avg_cut_rate: f64,
    goal: CreativeGoal,
    f_star: f64,
    profile: Option<&AgeGroupProfile>,
) -> Interpretation {
    let thresholds = profile.map(|p| p.thresholds).unwrap_or_default();
    let audience = profile.map(|p| p.name);
    let suffix = audience_suffix(audience);
    let goal_name = goal.display_name();

    let grade = grade_for(overall, &thresholds);
    let hook_quality = hook_quality_for(first_5s, &thresholds);
    let pacing_fit = pacing_fit_for(avg_cut_rate, f_star);
    let pacing_diff = (avg_cut_rate - f_star).abs();
    let strong = thresholds.strong();

    let mut strengths = Vec::new();
    if overall >= strong {
        strengths.push("Strong overall attention capture".to_string());
    }
    if first_5s >= thresholds.hook_good {
        strengths.push("Effective opening hook".to_string());
    }
    if pacing_diff <= PACING_TOLERANCE {
        strengths.push("Well-matched pacing for creative goal".to_string());
    }
    if overall >= thresholds.fair && first_5s < overall * 0.9 {
        strengths.push("Maintains engagement beyond initial hook".to_string());
    }
    if strengths.is_empty() {
        strengths.push("Identified areas for improvement".to_string());
    }

    let mut weaknesses = Vec::new();
    if first_5s < thresholds.hook_good {
        weaknesses.push("Weak opening hook - first 5 seconds need more impact".to_string());
    }
    if overall < thresholds.good {
        weaknesses.push("Overall attention score below optimal threshold".to_string());
    }
    if pacing_diff > PACING_WEAKNESS {
        weaknesses.push(format!("Pacing doesn't match {goal_name} goal effectively"));
    }
    if first_5s > overall * 1.2 {
        weaknesses.push("Attention drops significantly after initial hook".to_string());
    }
    if weaknesses.is_empty() {
        weaknesses.push("Minor optimizations possible".to_string());
    }

    let mut recommendations = Vec::new();
    if first_5s < thresholds.hook_good {
        recommendations.push(
            "Strengthen the opening 3-5 seconds with more compelling visuals, motion, or contrast"
                .to_string(),
        );
    }
    if pacing_diff > PACING_RECOMMENDATION {
        if avg_cut_rate > f_star {
            recommendations.push(format!(
                "Reduce cut frequency to better match {goal_name} pacing (aim for ~{f_star:.1} cuts/sec)"
            ));
        } else {
            recommendations.push(format!(
                "Increase cut frequency to create more dynamic pacing (aim for ~{f_star:.1} cuts/sec)"
            ));
        }
    }
    if overall < strong {
        recommendations.push(
            "Increase visual saliency in key frames - use contrast, color, and composition to draw attention"
                .to_string(),
        );
    }
    if first_5s < overall * 0.85 {
        recommendations.push(
            "Maintain engagement throughout - avoid attention drop-off after the hook".to_string(),
        );
    }
    if let Some(tip) = profile.and_then(|p| audience_recommendation(p.key)) {
        recommendations.push(tip.to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Continue monitoring performance and A/B test variations".to_string());
    }

    Interpretation {
        rating: grade.rating().to_string(),
        grade,
        overall_score: round3(overall),
        score_percentage: format!("{:.1}%", overall * 100.0),
        hook_quality,
        pacing_fit,
        performance_prediction: prediction(grade, &suffix),
        detailed_explanation: DetailedExplanation {
            summary: summary(grade, &suffix),
            hook_analysis: hook_analysis(hook_quality).to_string(),
            pacing_analysis: pacing_analysis(pacing_fit, goal_name, f_star, avg_cut_rate),
            strengths,
            weaknesses,
            recommendations,
        },
        age_group: audience.map(str::to_string),
    }
}
