//! 关键点 → 特征分析
//!
//! 每个分析器对原始关键点做非线性缩放（幂次）、不对称加成和疾病指示加成，
//! 最终钳制到 [0,1]。眼睛开合度下限 0.1、下颌放松度下限 0.15。

use crate::screening::types::{clamp_unit, FacialLandmarks, FeatureBundle, LateralMeasures};

fn relative_gap(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    if m > 0.0 {
        (a - b).abs() / m
    } else {
        0.0
    }
}

fn bounded(v: f64, lo: f64) -> f64 {
    if v.is_finite() {
        v.clamp(lo, 1.0)
    } else {
        lo
    }
}

fn eye_openness(left: f64, right: f64) -> f64 {
    let sl = left.max(0.0).powf(1.5);
    let sr = right.max(0.0).powf(1.5);
    let asymmetry_boost = (relative_gap(left, right) * 1.8).min(0.35);
    let weighted = (sl * 0.55 + sr * 0.45) * 1.45;
    let dynamic_boost = ((sl - sr).abs() * 1.4).min(0.3);
    let apnea_boost = (0.3 - weighted).max(0.0) * 0.7;
    bounded(
        weighted * (1.0 + dynamic_boost + asymmetry_boost + apnea_boost),
        0.1,
    )
}

fn blink_rate(left: f64, right: f64) -> f64 {
    let sl = left.max(0.0).powf(1.45);
    let sr = right.max(0.0).powf(1.45);
    let asymmetry_boost = (relative_gap(left, right) * 1.5).min(0.3);
    let symmetry = 1.0 - (sl - sr).abs();
    let lw = 0.6 * (1.0 + (1.0 - symmetry) * 0.25);
    let rw = 0.4 * (1.0 + (1.0 - symmetry) * 0.25);
    let base = (sl * lw + sr * rw) * 1.4;

    // 不规则眨眼加权更高
    let pattern = if symmetry > 0.85 {
        1.0
    } else if symmetry > 0.7 {
        1.15
    } else {
        1.3
    };
    let indicator_boost = (base * 0.3).min(0.2);
    let dynamic_boost = ((1.0 - symmetry) * 0.4).min(0.2);
    clamp_unit(base * pattern * (1.0 + dynamic_boost + asymmetry_boost + indicator_boost))
}

fn jaw_relaxation(relaxation: f64, tension: f64, symmetry: f64) -> f64 {
    let asymmetry_boost = ((1.0 - symmetry) * 1.6).min(0.3);
    let score = (relaxation * 0.7 + (1.0 - tension) * 0.2 + symmetry * 0.1).max(0.0);
    let scaled = score.powf(1.45);
    let tension_factor = if tension < 0.2 {
        1.4
    } else if tension < 0.4 {
        1.2
    } else {
        0.9
    };
    let apnea_boost = ((1.0 - tension) * 0.5).min(0.25);
    bounded(
        scaled * tension_factor * (1.0 + asymmetry_boost + apnea_boost),
        0.15,
    )
}

fn facial_tension(tension: f64, relaxation: f64, symmetry: f64) -> f64 {
    let asymmetry_boost = ((1.0 - symmetry) * 1.5).min(0.25);
    let score = (tension * 0.55 + (1.0 - relaxation) * 0.3 + (1.0 - symmetry) * 0.15).max(0.0);
    let scaled = score.powf(1.4);
    let pattern = if symmetry < 0.65 {
        1.3
    } else if symmetry < 0.8 {
        1.15
    } else {
        1.0
    };
    let indicator_boost = (tension * 0.3).min(0.2);
    clamp_unit(scaled * pattern * (1.0 + asymmetry_boost + indicator_boost))
}

impl FeatureBundle {
    pub fn from_landmarks(lm: &FacialLandmarks) -> Self {
        let left = &lm.eyes.left;
        let right = &lm.eyes.right;

        let eye_symmetry = 1.0 - (left.openness - right.openness).abs();
        let facial_symmetry = clamp_unit(
            eye_symmetry * 0.4 + lm.jawline.symmetry * 0.3 + lm.nasolabial_folds.symmetry * 0.3,
        );

        Self {
            eye_openness: eye_openness(left.openness, right.openness),
            blink_rate: blink_rate(left.blink_rate, right.blink_rate),
            jaw_relaxation: jaw_relaxation(
                lm.jawline.relaxation,
                lm.jawline.tension,
                lm.jawline.symmetry,
            ),
            facial_tension: facial_tension(
                lm.facial_muscles.tension,
                lm.facial_muscles.relaxation,
                lm.facial_muscles.symmetry,
            ),
            facial_symmetry,
            nasolabial_fold_depth: clamp_unit(lm.nasolabial_folds.depth),
            eyebrow_position: clamp_unit(lm.eyebrows.position),
            lateral: LateralMeasures {
                left_eye_openness: clamp_unit(left.openness),
                right_eye_openness: clamp_unit(right.openness),
                left_blink_rate: clamp_unit(left.blink_rate),
                right_blink_rate: clamp_unit(right.blink_rate),
                jawline_relaxation: clamp_unit(lm.jawline.relaxation),
                mouth_relaxation: clamp_unit(lm.mouth.relaxation),
            },
        }
    }
}
