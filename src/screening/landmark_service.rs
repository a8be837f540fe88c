//! 关键点服务端模拟：`POST /process_facial_image` 背后的算法。
//!
//! 与客户端的像素种子不同，这里对编码后的字节做采样加权求和，
//! 得到 `[0, 100000)` 的种子，再用 sin/cos 双重稳定的生成器产生关键点。

use crate::constants::FALLBACK_SEED;
use crate::screening::seed::decode_payload;
use crate::screening::types::{
    EyeLandmarks, EyePair, EyebrowLandmarks, FacialLandmarks, FoldLandmarks, JawlineLandmarks,
    MouthLandmarks, MuscleLandmarks,
};

const MAX_SAMPLED_BYTES: usize = 500;
const SEED_MODULUS: u64 = 100_000;

/// 对字节做最多约 500 个位置的采样加权和；空输入返回 `None`。
pub fn byte_hash_seed(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let sample = bytes.len().min(MAX_SAMPLED_BYTES);
    let step = (bytes.len() / sample).max(1);
    let hash: u64 = bytes
        .iter()
        .enumerate()
        .step_by(step)
        .map(|(i, &b)| (u64::from(b) * (i as u64 % 7 + 1)) % 10_000)
        .sum();
    Some((u64::from(FALLBACK_SEED) + hash) % SEED_MODULUS)
}

/// 表单里的 `image` 字段：data URL 或裸 base64。无法解码时使用默认种子。
pub fn seed_from_form_image(image: &str) -> u64 {
    decode_payload(image)
        .ok()
        .and_then(|bytes| byte_hash_seed(&bytes))
        .unwrap_or(u64::from(FALLBACK_SEED))
}

fn stable_random(seed: u64, min: f64, max: f64, offset: u64) -> f64 {
    let x = (((seed * 9781 + offset * 577) % 10_000) as f64).sin() * 10_000.0;
    let mut r = x - x.floor();
    r = (r + (seed as f64 / 7919.0 + offset as f64).cos()) / 2.0;
    r -= r.floor();
    min + r * (max - min)
}

pub fn simulate_landmarks(seed: u64) -> FacialLandmarks {
    let r = |min, max, offset| stable_random(seed, min, max, offset);
    let eye = r(0.3, 1.0, 1);
    let blink = r(0.2, 0.8, 2);
    let jaw = r(0.2, 1.0, 3);
    let tension = r(0.1, 0.8, 4);
    let symmetry = r(0.2, 1.0, 5);
    let mouth = r(0.0, 1.0, 6);
    let fold = r(0.2, 1.0, 7);
    let brow = r(0.5, 1.0, 8);

    let asymmetry = symmetry * 0.4 + 0.8;
    FacialLandmarks {
        eyes: EyePair {
            left: EyeLandmarks {
                open: eye > 0.5,
                openness: eye,
                blink_rate: blink,
            },
            right: EyeLandmarks {
                open: eye > 0.5,
                openness: eye * asymmetry,
                blink_rate: blink * asymmetry,
            },
        },
        mouth: MouthLandmarks {
            open: mouth > 0.7,
            relaxation: jaw,
        },
        jawline: JawlineLandmarks {
            tension: 1.0 - jaw,
            relaxation: jaw,
            symmetry,
        },
        facial_muscles: MuscleLandmarks {
            tension,
            relaxation: 1.0 - tension,
            symmetry,
        },
        nasolabial_folds: FoldLandmarks {
            depth: fold,
            symmetry,
        },
        eyebrows: EyebrowLandmarks {
            tension: tension * 0.8,
            position: brow,
        },
    }
}

pub fn simulate_from_payload(image: &str) -> FacialLandmarks {
    let seed = seed_from_form_image(image);
    tracing::debug!(seed, "Simulating facial landmarks");
    simulate_landmarks(seed)
}
