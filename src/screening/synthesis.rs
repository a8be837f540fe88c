use crate::screening::types::{
    EyeLandmarks, EyePair, EyebrowLandmarks, FacialLandmarks, FeatureBundle, FoldLandmarks,
    JawlineLandmarks, MouthLandmarks, MuscleLandmarks, Seed,
};

const EYE_OPEN_THRESHOLD: f64 = 0.45;
const MOUTH_OPEN_THRESHOLD: f64 = 0.65;

/// 基于 `sin(seed)` 的确定性伪随机数，同一 (seed, offset) 永远得到同一值。
pub fn seeded_random(seed: Seed, min: f64, max: f64, offset: u32) -> f64 {
    let v = f64::from(seed.0) + f64::from(offset) * 1000.0;
    let x = v.sin() * 10_000.0;
    let frac = (x - x.floor()).abs();
    min + frac * (max - min)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisorderBias {
    pub apnea: f64,
    pub insomnia: f64,
    pub normal: f64,
}

impl DisorderBias {
    pub fn from_seed(seed: Seed) -> Self {
        let b = f64::from(seed.0 % 100) / 100.0;
        if b < 0.33 {
            Self {
                apnea: 0.45,
                insomnia: 0.02,
                normal: 0.01,
            }
        } else if b < 0.66 {
            Self {
                apnea: 0.02,
                insomnia: 0.45,
                normal: 0.01,
            }
        } else {
            Self {
                apnea: 0.05,
                insomnia: 0.05,
                normal: 0.40,
            }
        }
    }
}

/// 八个基础因子，已乘上偏置系数
#[derive(Debug, Clone, Copy)]
struct BaseFactors {
    eye: f64,
    blink: f64,
    jaw: f64,
    tension: f64,
    symmetry: f64,
    mouth: f64,
    fold: f64,
    brow: f64,
}

impl BaseFactors {
    fn derive(seed: Seed, bias: DisorderBias) -> Self {
        let r = |min, max, offset| seeded_random(seed, min, max, offset);
        Self {
            eye: r(0.25, 1.0, 1) * (1.0 - bias.apnea * 0.5),
            blink: r(0.15, 0.85, 2) * (1.0 + bias.insomnia * 0.5),
            jaw: r(0.15, 1.0, 3) * (1.0 + bias.apnea * 0.6),
            tension: r(0.05, 0.9, 4) * (1.0 + bias.insomnia * 0.6),
            symmetry: r(0.15, 1.0, 5) * (1.0 - bias.apnea * 0.4),
            mouth: r(0.0, 1.0, 6) * (1.0 + bias.apnea * 0.7),
            fold: r(0.15, 1.0, 7) * (1.0 + bias.apnea * 0.8),
            brow: r(0.4, 1.0, 8) * (1.0 - bias.insomnia * 0.3),
        }
    }
}

pub fn synthesize_landmarks(seed: Seed) -> FacialLandmarks {
    let bias = DisorderBias::from_seed(seed);
    let f = BaseFactors::derive(seed, bias);

    let boost = (1.0 - f.symmetry).max(0.0).powf(0.7);
    let attenuate = |v: f64, c: f64| (v * (1.0 - boost * c)).max(0.0);
    let amplify = |v: f64, c: f64| v * (1.0 + boost * c);

    let right_openness = attenuate(f.eye, 0.3);

    FacialLandmarks {
        eyes: EyePair {
            left: EyeLandmarks {
                open: f.eye > EYE_OPEN_THRESHOLD,
                openness: f.eye,
                blink_rate: f.blink,
            },
            right: EyeLandmarks {
                open: right_openness > EYE_OPEN_THRESHOLD,
                openness: right_openness,
                blink_rate: attenuate(f.blink, 0.25),
            },
        },
        mouth: MouthLandmarks {
            open: f.mouth > MOUTH_OPEN_THRESHOLD,
            relaxation: attenuate(f.jaw, 0.2),
        },
        jawline: JawlineLandmarks {
            tension: amplify(1.0 - f.jaw, 0.15),
            relaxation: attenuate(f.jaw, 0.15),
            symmetry: f.symmetry,
        },
        facial_muscles: MuscleLandmarks {
            tension: amplify(f.tension, 0.2),
            relaxation: attenuate(1.0 - f.tension, 0.2),
            symmetry: f.symmetry,
        },
        nasolabial_folds: FoldLandmarks {
            depth: amplify(f.fold, 0.25),
            symmetry: attenuate(f.symmetry, 0.15),
        },
        eyebrows: EyebrowLandmarks {
            tension: amplify(f.tension, 0.3) * 0.9,
            position: attenuate(f.brow, 0.1),
        },
    }
}

pub fn synthesize_features(seed: Seed) -> FeatureBundle {
    FeatureBundle::from_landmarks(&synthesize_landmarks(seed))
}
