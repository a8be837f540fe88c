use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::FALLBACK_SEED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub u32);

impl Seed {
    pub const FALLBACK: Seed = Seed(FALLBACK_SEED);

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Standard,
    #[default]
    Enhanced,
    Ml,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Enhanced => "enhanced",
            Self::Ml => "ml",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classification model: {0}")]
pub struct ParseModelError(pub String);

impl FromStr for ModelKind {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "enhanced" => Ok(Self::Enhanced),
            "ml" => Ok(Self::Ml),
            other => Err(ParseModelError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisorderLabel {
    NormalSleep,
    Insomnia,
    SleepApnea,
    Inconclusive,
}

impl DisorderLabel {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::NormalSleep => "Normal Sleep",
            Self::Insomnia => "Insomnia",
            Self::SleepApnea => "Sleep Apnea",
            Self::Inconclusive => "Inconclusive",
        }
    }
}

impl fmt::Display for DisorderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---- 原始关键点记录（远程服务与本地合成共用的结构） ----

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeLandmarks {
    pub open: bool,
    pub openness: f64,
    pub blink_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyePair {
    pub left: EyeLandmarks,
    pub right: EyeLandmarks,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthLandmarks {
    pub open: bool,
    pub relaxation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JawlineLandmarks {
    pub tension: f64,
    pub relaxation: f64,
    pub symmetry: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuscleLandmarks {
    pub tension: f64,
    pub relaxation: f64,
    pub symmetry: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldLandmarks {
    pub depth: f64,
    pub symmetry: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyebrowLandmarks {
    pub tension: f64,
    pub position: f64,
}

/// 面部关键点的原始测量值（未缩放）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacialLandmarks {
    pub eyes: EyePair,
    pub mouth: MouthLandmarks,
    pub jawline: JawlineLandmarks,
    pub facial_muscles: MuscleLandmarks,
    pub nasolabial_folds: FoldLandmarks,
    pub eyebrows: EyebrowLandmarks,
}

/// 归一化后的特征向量，所有分量位于 [0,1]。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBundle {
    pub eye_openness: f64,
    pub blink_rate: f64,
    pub jaw_relaxation: f64,
    pub facial_tension: f64,
    pub facial_symmetry: f64,
    pub nasolabial_fold_depth: f64,
    #[serde(default = "neutral")]
    pub eyebrow_position: f64,
    #[serde(default)]
    pub lateral: LateralMeasures,
}

fn neutral() -> f64 {
    0.5
}

/// 左右侧（以及下颌/口部）的分侧测量值。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateralMeasures {
    pub left_eye_openness: f64,
    pub right_eye_openness: f64,
    pub left_blink_rate: f64,
    pub right_blink_rate: f64,
    pub jawline_relaxation: f64,
    pub mouth_relaxation: f64,
}

impl Default for FeatureBundle {
    fn default() -> Self {
        Self {
            eye_openness: 0.5,
            blink_rate: 0.5,
            jaw_relaxation: 0.5,
            facial_tension: 0.5,
            facial_symmetry: 0.5,
            nasolabial_fold_depth: 0.5,
            eyebrow_position: 0.5,
            lateral: LateralMeasures::default(),
        }
    }
}

impl FeatureBundle {
    /// 非有限值置 0，其余钳制到 [0,1]。
    pub fn sanitized(&self) -> Self {
        let l = &self.lateral;
        Self {
            eye_openness: clamp_unit(self.eye_openness),
            blink_rate: clamp_unit(self.blink_rate),
            jaw_relaxation: clamp_unit(self.jaw_relaxation),
            facial_tension: clamp_unit(self.facial_tension),
            facial_symmetry: clamp_unit(self.facial_symmetry),
            nasolabial_fold_depth: clamp_unit(self.nasolabial_fold_depth),
            eyebrow_position: clamp_unit(self.eyebrow_position),
            lateral: LateralMeasures {
                left_eye_openness: clamp_unit(l.left_eye_openness),
                right_eye_openness: clamp_unit(l.right_eye_openness),
                left_blink_rate: clamp_unit(l.left_blink_rate),
                right_blink_rate: clamp_unit(l.right_blink_rate),
                jawline_relaxation: clamp_unit(l.jawline_relaxation),
                mouth_relaxation: clamp_unit(l.mouth_relaxation),
            },
        }
    }

    pub fn scalars(&self) -> [f64; 7] {
        [
            self.eye_openness,
            self.blink_rate,
            self.jaw_relaxation,
            self.facial_tension,
            self.facial_symmetry,
            self.nasolabial_fold_depth,
            self.eyebrow_position,
        ]
    }
}

pub fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 三类整数百分比，和恒为 100。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Percentages {
    pub insomnia: u8,
    pub apnea: u8,
    pub normal: u8,
}

impl Percentages {
    /// 无法区分时的均分，余数给第一类。
    pub const EVEN: Self = Self {
        insomnia: 34,
        apnea: 33,
        normal: 33,
    };

    pub fn total(&self) -> u32 {
        u32::from(self.insomnia) + u32::from(self.apnea) + u32::from(self.normal)
    }
}

/// 三类概率，各在 [0,1]，和为 1。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probabilities {
    pub insomnia: f64,
    pub apnea: f64,
    pub normal: f64,
}

impl Probabilities {
    pub fn total(&self) -> f64 {
        self.insomnia + self.apnea + self.normal
    }
}

impl From<Percentages> for Probabilities {
    fn from(p: Percentages) -> Self {
        let total = p.total();
        if total == 0 {
            return Self {
                insomnia: 1.0 / 3.0,
                apnea: 1.0 / 3.0,
                normal: 1.0 / 3.0,
            };
        }
        let total = f64::from(total);
        Self {
            insomnia: f64::from(p.insomnia) / total,
            apnea: f64::from(p.apnea) / total,
            normal: f64::from(p.normal) / total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionRule {
    ApneaMargin,
    InsomniaMargin,
    NormalMargin,
    DisorderFallback,
    Inconclusive,
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub label: DisorderLabel,
    pub model: ModelKind,
    pub confidence_percent: u8,
    pub reason: String,
    pub contributing_features: Vec<String>,
    pub probabilities: Probabilities,
    pub percentages: Percentages,
    pub rule: DecisionRule,
}

impl ClassificationResult {
    pub fn degenerate(model: ModelKind) -> Self {
        Self {
            label: DisorderLabel::Inconclusive,
            model,
            confidence_percent: 0,
            reason: "Facial feature scores could not be normalized; analysis is inconclusive."
                .to_string(),
            contributing_features: Vec::new(),
            probabilities: Probabilities::from(Percentages::EVEN),
            percentages: Percentages::EVEN,
            rule: DecisionRule::Degenerate,
        }
    }
}
