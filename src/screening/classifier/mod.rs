pub mod calibration;
pub mod decision;
pub mod indicators;

use crate::screening::types::{
    ClassificationResult, FeatureBundle, ModelKind, Percentages, Probabilities,
};

use calibration::{APNEA, INSOMNIA, NORMAL};
use decision::DecisionInput;
use indicators::{IndicatorSet, ModelProfile, ScaledScores};

/// 特征向量 + 模型 → 分类结果。纯函数，从不失败；
/// 分数无法归一化时返回置信度为 0 的 `Inconclusive`。
pub fn classify(features: &FeatureBundle, model: ModelKind) -> ClassificationResult {
    let features = features.sanitized();
    let profile = ModelProfile::for_model(model);
    let scaled = ScaledScores::from_bundle(&features);

    let insomnia_set = IndicatorSet::insomnia(&scaled);
    let apnea_set = IndicatorSet::apnea(&scaled);
    let normal_set = IndicatorSet::normal(&scaled);

    let scores = [
        insomnia_set.score(&profile),
        apnea_set.score(&profile),
        normal_set.score(&profile),
    ];

    let Some(calibrated) = calibration::calibrate(scores, profile.accuracy_multiplier, &scaled)
    else {
        tracing::warn!(%model, "Degenerate indicator scores, returning inconclusive");
        return ClassificationResult::degenerate(model);
    };

    let pct = calibrated.percents;
    let input = DecisionInput {
        insomnia: i32::from(pct[INSOMNIA]),
        apnea: i32::from(pct[APNEA]),
        normal: i32::from(pct[NORMAL]),
        scaled: &scaled,
        insomnia_set: &insomnia_set,
        apnea_set: &apnea_set,
        normal_set: &normal_set,
    };
    let (rule, verdict) = decision::decide(&input);

    tracing::debug!(
        %model,
        label = %verdict.label,
        ?rule,
        branch = ?calibrated.branch,
        gap = calibrated.gap,
        insomnia = pct[INSOMNIA],
        apnea = pct[APNEA],
        normal = pct[NORMAL],
        "Facial features classified"
    );

    let percentages = Percentages {
        insomnia: pct[INSOMNIA],
        apnea: pct[APNEA],
        normal: pct[NORMAL],
    };

    ClassificationResult {
        label: verdict.label,
        model,
        confidence_percent: verdict.confidence.clamp(0, 100) as u8,
        reason: verdict.reason,
        contributing_features: verdict.features,
        probabilities: Probabilities::from(percentages),
        percentages,
        rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::synthesis::synthesize_features;
    use calibration::{close_branch_factor, Calibrated, SuppressionBranch};
    use crate::screening::types::{DecisionRule, DisorderLabel, Seed};

    fn bundle(eye: f64, blink: f64, jaw: f64, tension: f64, symmetry: f64, fold: f64) -> FeatureBundle {
        FeatureBundle {
            eye_openness: eye,
            blink_rate: blink,
            jaw_relaxation: jaw,
            facial_tension: tension,
            facial_symmetry: symmetry,
            nasolabial_fold_depth: fold,
            ..FeatureBundle::default()
        }
    }

    fn pct(r: &ClassificationResult) -> [u8; 3] {
        [
            r.percentages.insomnia,
            r.percentages.apnea,
            r.percentages.normal,
        ]
    }

    fn calibrate_bundle(fb: &FeatureBundle, model: ModelKind) -> Calibrated {
        let profile = ModelProfile::for_model(model);
        let scaled = ScaledScores::from_bundle(&fb.sanitized());
        let scores = [
            IndicatorSet::insomnia(&scaled).score(&profile),
            IndicatorSet::apnea(&scaled).score(&profile),
            IndicatorSet::normal(&scaled).score(&profile),
        ];
        calibration::calibrate(scores, profile.accuracy_multiplier, &scaled)
            .expect("non-degenerate scores")
    }

    #[test]
    fn strong_apnea_profile_is_sleep_apnea() {
        let fb = bundle(0.1, 0.2, 0.8, 0.3, 0.5, 0.7);
        for (model, expected) in [
            (ModelKind::Standard, [22, 48, 30]),
            (ModelKind::Enhanced, [22, 49, 29]),
            (ModelKind::Ml, [22, 48, 30]),
        ] {
            let r = classify(&fb, model);
            assert_eq!(r.label, DisorderLabel::SleepApnea, "model {model}");
            assert_eq!(r.confidence_percent, 65);
            assert_eq!(pct(&r), expected, "model {model}");
        }
    }

    #[test]
    fn relaxed_symmetric_profile_is_normal_sleep() {
        let fb = bundle(0.9, 0.1, 0.85, 0.1, 0.9, 0.1);
        for (model, conf, expected) in [
            (ModelKind::Standard, 44, [24, 32, 44]),
            (ModelKind::Ml, 45, [21, 34, 45]),
        ] {
            let r = classify(&fb, model);
            assert_eq!(r.label, DisorderLabel::NormalSleep, "model {model}");
            assert_eq!(r.rule, DecisionRule::NormalMargin);
            assert_eq!(r.confidence_percent, conf);
            assert_eq!(pct(&r), expected, "model {model}");
        }
    }

    #[test]
    fn enhanced_relaxed_profile_tips_into_apnea_at_exact_margin() {
        // 48 - 33 == 15，边界值计入呼吸暂停
        let r = classify(&bundle(0.9, 0.1, 0.85, 0.1, 0.9, 0.1), ModelKind::Enhanced);
        assert_eq!(pct(&r), [19, 48, 33]);
        assert_eq!(r.label, DisorderLabel::SleepApnea);
        assert_eq!(r.rule, DecisionRule::ApneaMargin);
        assert_eq!(r.confidence_percent, 65);
    }

    #[test]
    fn neutral_bundle_takes_close_branch() {
        // 校准后 [76.5, 88, 55]，差距 11.5
        let fb = bundle(0.5, 0.5, 0.5, 0.5, 0.5, 0.5);
        let c = calibrate_bundle(&fb, ModelKind::Standard);
        assert_eq!(c.branch, SuppressionBranch::Close);
        assert!((c.gap - 11.5).abs() < 1e-9, "gap {}", c.gap);
        assert!((close_branch_factor(c.gap) - 0.785).abs() < 1e-9);
        assert_eq!(c.percents, [31, 46, 23]);

        let r = classify(&fb, ModelKind::Standard);
        assert_eq!(r.label, DisorderLabel::SleepApnea);
        assert_eq!(r.rule, DecisionRule::ApneaMargin);
    }

    #[test]
    fn clamped_leaders_take_close_branch_with_runner_up_cap() {
        // 上限截断后 [90, 92, 52]，差距 2；失眠缩放后仍被 65 封顶
        let fb = bundle(0.3, 0.3, 0.3, 0.3, 0.5, 0.3);
        let c = calibrate_bundle(&fb, ModelKind::Standard);
        assert_eq!(c.branch, SuppressionBranch::Close);
        assert!((c.gap - 2.0).abs() < 1e-9, "gap {}", c.gap);
        assert!((close_branch_factor(c.gap) - 0.88).abs() < 1e-9);
        assert_eq!(c.percents, [32, 45, 23]);

        let r = classify(&fb, ModelKind::Standard);
        assert_eq!(r.label, DisorderLabel::SleepApnea);
        assert_eq!(r.rule, DecisionRule::DisorderFallback);
        assert_eq!(r.confidence_percent, 45);
    }

    #[test]
    fn fallback_seed_regression_fixture() {
        let fb = synthesize_features(Seed::FALLBACK);
        let r = classify(&fb, ModelKind::Standard);
        assert_eq!(r.label, DisorderLabel::SleepApnea);
        assert_eq!(r.confidence_percent, 65);
        assert_eq!(pct(&r), [32, 51, 17]);

        assert_eq!(pct(&classify(&fb, ModelKind::Enhanced)), [31, 51, 18]);
        assert_eq!(pct(&classify(&fb, ModelKind::Ml)), [32, 51, 17]);
    }

    #[test]
    fn classification_is_idempotent() {
        let fb = synthesize_features(Seed(2_024));
        for model in [ModelKind::Standard, ModelKind::Enhanced, ModelKind::Ml] {
            assert_eq!(classify(&fb, model), classify(&fb, model));
        }
    }

    #[test]
    fn all_zero_bundle_still_produces_distribution() {
        let r = classify(&bundle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), ModelKind::Enhanced);
        assert_eq!(r.percentages.total(), 100);
        assert!((r.probabilities.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_inputs_are_sanitized() {
        let fb = bundle(f64::NAN, f64::INFINITY, 0.8, -3.0, 0.5, 0.7);
        let r = classify(&fb, ModelKind::Standard);
        assert_eq!(r.percentages.total(), 100);
        assert!(r.confidence_percent <= 100);
    }

    #[test]
    fn degenerate_result_is_inconclusive_with_zero_confidence() {
        let r = ClassificationResult::degenerate(ModelKind::Ml);
        assert_eq!(r.label, DisorderLabel::Inconclusive);
        assert_eq!(r.confidence_percent, 0);
        assert_eq!(r.rule, DecisionRule::Degenerate);
        assert_eq!(r.percentages.total(), 100);
        assert!((r.probabilities.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn probabilities_are_fractions_of_percentages() {
        let r = classify(&bundle(0.1, 0.2, 0.8, 0.3, 0.5, 0.7), ModelKind::Standard);
        assert!((r.probabilities.insomnia - 0.22).abs() < 1e-9);
        assert!((r.probabilities.apnea - 0.48).abs() < 1e-9);
        assert!((r.probabilities.normal - 0.30).abs() < 1e-9);
    }
}
