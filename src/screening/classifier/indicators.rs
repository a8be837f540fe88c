use crate::screening::types::{clamp_unit, FeatureBundle, ModelKind};

/// 指标引用的六个顶层特征
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    Eye,
    Blink,
    Jaw,
    Tension,
    Symmetry,
    Fold,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelProfile {
    pub accuracy_multiplier: f64,
    eye: f64,
    blink: f64,
    jaw: f64,
    tension: f64,
    symmetry: f64,
    fold: f64,
}

impl ModelProfile {
    pub fn for_model(model: ModelKind) -> Self {
        match model {
            ModelKind::Standard => Self {
                accuracy_multiplier: 1.7,
                eye: 1.5,
                blink: 1.4,
                jaw: 1.5,
                tension: 1.6,
                symmetry: 1.5,
                fold: 1.4,
            },
            ModelKind::Enhanced => Self {
                accuracy_multiplier: 2.8,
                eye: 2.5,
                blink: 2.2,
                jaw: 2.7,
                tension: 2.3,
                symmetry: 2.4,
                fold: 2.6,
            },
            ModelKind::Ml => Self {
                accuracy_multiplier: 2.5,
                eye: 2.4,
                blink: 2.0,
                jaw: 2.1,
                tension: 2.2,
                symmetry: 2.3,
                fold: 2.2,
            },
        }
    }

    pub fn weight(&self, source: FeatureSource) -> f64 {
        match source {
            FeatureSource::Eye => self.eye,
            FeatureSource::Blink => self.blink,
            FeatureSource::Jaw => self.jaw,
            FeatureSource::Tension => self.tension,
            FeatureSource::Symmetry => self.symmetry,
            FeatureSource::Fold => self.fold,
        }
    }
}

/// 基础增益后的六个特征分数，均在 [0,1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledScores {
    pub eye: f64,
    pub blink: f64,
    pub jaw: f64,
    pub tension: f64,
    pub symmetry: f64,
    pub fold: f64,
}

impl ScaledScores {
    pub fn from_bundle(fb: &FeatureBundle) -> Self {
        Self {
            eye: clamp_unit(fb.eye_openness * 1.8),
            blink: clamp_unit(fb.blink_rate * 1.4),
            jaw: clamp_unit(fb.jaw_relaxation * 1.9),
            tension: clamp_unit(fb.facial_tension * 1.65),
            symmetry: clamp_unit(fb.facial_symmetry * 1.4),
            fold: clamp_unit(fb.nasolabial_fold_depth * 1.7),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Indicator {
    pub source: FeatureSource,
    pub value: f64,
    pub weight: f64,
    pub description: &'static str,
    pub threshold: f64,
}

impl Indicator {
    fn new(
        source: FeatureSource,
        value: f64,
        weight: f64,
        description: &'static str,
        threshold: f64,
    ) -> Self {
        Self {
            source,
            value,
            weight,
            description,
            threshold,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.value >= self.threshold
    }

    pub fn passes_relaxed(&self) -> bool {
        self.value >= self.threshold * 0.8
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub entries: Vec<Indicator>,
    min_significant: usize,
    boost_per_feature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetScore {
    pub raw: f64,
    pub significant: usize,
}

impl IndicatorSet {
    pub fn insomnia(s: &ScaledScores) -> Self {
        use FeatureSource::*;
        Self {
            entries: vec![
                Indicator::new(Blink, s.blink, 0.45, "Frequent blinking", 0.35),
                Indicator::new(Eye, 1.0 - s.eye, 0.40, "Partially open eyes", 0.30),
                Indicator::new(Tension, s.tension, 0.35, "Increased facial muscle tension", 0.35),
                Indicator::new(Symmetry, 1.0 - s.symmetry, 0.20, "Slight facial asymmetry", 0.25),
                Indicator::new(Jaw, 1.0 - s.jaw, 0.30, "Jaw tension", 0.30),
            ],
            min_significant: 3,
            boost_per_feature: 0.25,
        }
    }

    pub fn apnea(s: &ScaledScores) -> Self {
        use FeatureSource::*;
        Self {
            entries: vec![
                Indicator::new(Eye, 1.0 - s.eye, 0.45, "Drooping eyelids", 0.45),
                Indicator::new(Jaw, s.jaw, 0.50, "Relaxed lower jaw", 0.55),
                Indicator::new(Fold, s.fold, 0.45, "Deepened nasolabial folds", 0.50),
                Indicator::new(Symmetry, 1.0 - s.symmetry, 0.35, "Facial asymmetry", 0.40),
                Indicator::new(Blink, 1.0 - s.blink, 0.30, "Irregular blinking", 0.35),
            ],
            min_significant: 3,
            boost_per_feature: 0.25,
        }
    }

    pub fn normal(s: &ScaledScores) -> Self {
        use FeatureSource::*;
        Self {
            entries: vec![
                Indicator::new(Tension, 1.0 - s.tension, 0.35, "Relaxed facial muscles", 0.60),
                Indicator::new(Eye, 1.0 - s.eye, 0.35, "Closed eyes", 0.65),
                Indicator::new(Symmetry, s.symmetry, 0.30, "Symmetrical expressions", 0.60),
                Indicator::new(Jaw, s.jaw, 0.35, "Relaxed jaw", 0.60),
                Indicator::new(Blink, 1.0 - s.blink, 0.30, "Regular blinking", 0.55),
                Indicator::new(Fold, 1.0 - s.fold, 0.40, "Absence of eye bags", 0.55),
            ],
            min_significant: 4,
            boost_per_feature: 0.10,
        }
    }

    pub fn score(&self, profile: &ModelProfile) -> SetScore {
        let mut raw = self.entries.iter().fold(0.0, |acc, e| {
            acc + e.value * profile.weight(e.source) * e.weight
        });
        let significant = self.entries.iter().filter(|e| e.is_significant()).count();
        if significant >= self.min_significant {
            raw *= 1.0 + significant as f64 * self.boost_per_feature;
        }
        SetScore { raw, significant }
    }

    pub fn significant_descriptions(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_significant())
            .map(|e| e.description.to_string())
            .collect()
    }

    pub fn relaxed_descriptions(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.passes_relaxed())
            .map(|e| e.description.to_string())
            .collect()
    }
}
