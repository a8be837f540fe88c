//! 结果展示视图：把分类结果整理成前端直接渲染的结构。

use serde::Serialize;

use crate::screening::classifier::calibration::round_half_up;
use crate::screening::types::{ClassificationResult, DisorderLabel, FeatureBundle, ModelKind};

const NO_FEATURES: &str = "None detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityBars {
    pub insomnia: u8,
    pub apnea: u8,
    pub normal: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    pub eye_openness: u8,
    pub blink_rate: u8,
    pub jaw_relaxation: u8,
    pub facial_tension: u8,
    pub facial_symmetry: u8,
    pub nasolabial_fold_depth: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub disorder: String,
    pub model: ModelKind,
    pub accuracy_percent: u8,
    pub reason: String,
    pub features_text: String,
    pub probability_bars: ProbabilityBars,
    pub measurements: Measurements,
}

fn percent(v: f64) -> u8 {
    round_half_up(v.clamp(0.0, 1.0) * 100.0) as u8
}

impl ResultView {
    /// `pin` 为固定显示的准确率；被选中标签的概率条同样显示该值。
    /// `Inconclusive` 不固定任何概率条。
    pub fn build(result: &ClassificationResult, features: &FeatureBundle, pin: Option<u8>) -> Self {
        let p = &result.percentages;
        let mut bars = ProbabilityBars {
            insomnia: p.insomnia,
            apnea: p.apnea,
            normal: p.normal,
        };
        if let Some(pinned) = pin {
            match result.label {
                DisorderLabel::Insomnia => bars.insomnia = pinned,
                DisorderLabel::SleepApnea => bars.apnea = pinned,
                DisorderLabel::NormalSleep => bars.normal = pinned,
                DisorderLabel::Inconclusive => {}
            }
        }

        let features_text = if result.contributing_features.is_empty() {
            NO_FEATURES.to_string()
        } else {
            result.contributing_features.join(", ")
        };

        Self {
            disorder: result.label.display_name().to_string(),
            model: result.model,
            accuracy_percent: pin.unwrap_or(result.confidence_percent),
            reason: result.reason.clone(),
            features_text,
            probability_bars: bars,
            measurements: Measurements {
                eye_openness: percent(features.eye_openness),
                blink_rate: percent(features.blink_rate),
                jaw_relaxation: percent(features.jaw_relaxation),
                facial_tension: percent(features.facial_tension),
                facial_symmetry: percent(features.facial_symmetry),
                nasolabial_fold_depth: percent(features.nasolabial_fold_depth),
            },
        }
    }
}
