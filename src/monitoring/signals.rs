//! EEG / HRV 波形合成。
//!
//! 时间 `t` 为墙钟秒数；各标签有独立的频段权重表，
//! 另外叠加概率性的瞬态事件、伪迹和噪声。数值只用于展示，不要求可复现。

use std::f64::consts::PI;

use rand::Rng;
use serde::Serialize;

use super::state::{MonitorCondition, SignalProbabilities};

/// 60000 / 75 bpm
pub const BASE_RR_INTERVAL_MS: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BandWeights {
    delta: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
}

impl BandWeights {
    const fn new(delta: f64, theta: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }

    const RESTING: Self = Self::new(0.4, 0.3, 0.2, 0.1, 0.0);

    fn mix(&self, t: f64) -> f64 {
        let wave = |amp: f64, hz: f64| amp * (2.0 * PI * hz * t).sin();
        wave(25.0, 2.0) * self.delta
            + wave(15.0, 6.0) * self.theta
            + wave(35.0, 10.0) * self.alpha
            + wave(10.0, 20.0) * self.beta
            + wave(5.0, 35.0) * self.gamma
    }
}

/// 频段权重 + 瞬态事件 + 伪迹概率
struct EegProfile {
    weights: BandWeights,
    transient: f64,
    artifact_probability: f64,
}

fn sleep_cycle_profile<R: Rng + ?Sized>(t: f64, rng: &mut R) -> EegProfile {
    let cycle = (t % 90.0) / 90.0;
    let (weights, transient) = if cycle < 0.1 {
        (BandWeights::new(0.1, 0.4, 0.3, 0.2, 0.0), 0.0)
    } else if cycle < 0.4 {
        // N2 睡眠纺锤波
        let spindle = if rng.gen_bool(0.2) {
            20.0 * (2.0 * PI * 13.0 * t).sin() * (-(t % 1.0) * 10.0).exp()
        } else {
            0.0
        };
        (BandWeights::new(0.3, 0.4, 0.2, 0.1, 0.0), spindle)
    } else if cycle < 0.7 {
        (BandWeights::new(0.7, 0.2, 0.05, 0.05, 0.0), 0.0)
    } else {
        (BandWeights::new(0.1, 0.3, 0.3, 0.3, 0.0), 0.0)
    };
    EegProfile {
        weights,
        transient,
        artifact_probability: 0.0,
    }
}

fn insomnia_profile<R: Rng + ?Sized>(t: f64, rng: &mut R) -> EegProfile {
    let stress = (t / 10.0).sin() * 0.3 + 0.7;
    let mut transient = 0.0;
    if rng.gen_bool(0.15) {
        transient += 25.0 * (2.0 * PI * 15.0 * t).sin() * (-(t % 0.5) * 5.0).exp();
    }
    if rng.gen_bool(0.3) {
        transient += 15.0 * (2.0 * PI * 10.0 * t).sin() * (2.0 * PI * 2.0 * t).sin();
    }
    EegProfile {
        weights: BandWeights::new(0.1, 0.2, 0.3 + stress * 0.1, 0.3 + stress * 0.1, 0.1 * stress),
        transient,
        artifact_probability: 0.0,
    }
}

fn apnea_profile<R: Rng + ?Sized>(t: f64, rng: &mut R) -> EegProfile {
    let phase = (t % 60.0) / 60.0;
    let mut transient = 0.0;
    let weights = if phase < 0.6 {
        let p = phase / 0.6;
        BandWeights::new(0.4 * (1.0 - p), 0.3, 0.1 + 0.1 * p, 0.1 + 0.2 * p, 0.1 * p)
    } else if phase < 0.7 {
        transient += 30.0 * (2.0 * PI * 12.0 * t).sin() * (-(phase - 0.6) * 50.0).exp();
        BandWeights::new(0.1, 0.2, 0.3, 0.3, 0.1)
    } else {
        let r = (phase - 0.7) / 0.3;
        BandWeights::new(
            0.1 + 0.3 * r,
            0.2 + 0.1 * r,
            0.3 - 0.1 * r,
            0.3 - 0.2 * r,
            0.1 * (1.0 - r),
        )
    };
    // K 复合波
    if phase > 0.8 && rng.gen_bool(0.1) {
        transient += 40.0 * (-(t % 0.3) * 15.0).exp() - 20.0;
    }
    EegProfile {
        weights,
        transient,
        artifact_probability: 0.2,
    }
}

fn rls_profile(t: f64) -> EegProfile {
    let phase = (t % 30.0) / 30.0;
    if phase < 0.1 {
        EegProfile {
            weights: BandWeights::new(0.1, 0.2, 0.3, 0.3, 0.1),
            transient: 50.0 * (2.0 * PI * 5.0 * t).sin() * (-phase * 30.0).exp(),
            artifact_probability: 0.5,
        }
    } else {
        EegProfile {
            weights: BandWeights::new(0.3, 0.3, 0.2, 0.2, 0.0),
            transient: 0.0,
            artifact_probability: 0.1,
        }
    }
}

fn artifact<R: Rng + ?Sized>(t: f64, rng: &mut R) -> f64 {
    match rng.gen_range(0..3) {
        0 => 20.0 * rng.gen::<f64>() * (2.0 * PI * 50.0 * t).sin(),
        1 => 40.0 * (rng.gen::<f64>() - 0.5),
        _ => {
            if rng.gen::<f64>() < 0.5 {
                -30.0
            } else {
                30.0
            }
        }
    }
}

/// 单个 EEG 采样（µV 量级）。瞬态事件叠加在频段混合之后。
pub fn eeg_sample<R: Rng + ?Sized>(t: f64, condition: MonitorCondition, rng: &mut R) -> f64 {
    let profile = match condition {
        MonitorCondition::NormalSleep => sleep_cycle_profile(t, rng),
        MonitorCondition::Insomnia => insomnia_profile(t, rng),
        MonitorCondition::SleepApnea => apnea_profile(t, rng),
        MonitorCondition::Rls => rls_profile(t),
        MonitorCondition::Unlabeled | MonitorCondition::Unrecognized => EegProfile {
            weights: BandWeights::RESTING,
            transient: 0.0,
            artifact_probability: 0.0,
        },
    };

    let mut signal = profile.weights.mix(t) + profile.transient;
    if profile.artifact_probability > 0.0 && rng.gen_bool(profile.artifact_probability) {
        signal += artifact(t, rng);
    }
    let noise = if condition.is_disorder_noise() { 15.0 } else { 8.0 };
    signal + (rng.gen::<f64>() - 0.5) * noise
}

/// 单个 RR 间期（毫秒），围绕 800ms 波动。
pub fn hrv_sample<R: Rng + ?Sized>(
    t: f64,
    condition: MonitorCondition,
    probs: &SignalProbabilities,
    rng: &mut R,
) -> f64 {
    let p = probs.clamped();
    let variation = match condition {
        MonitorCondition::SleepApnea => {
            let phase = (t / 4.0).sin();
            if phase > 0.7 {
                let severity = 0.7 + p.apnea * 0.3;
                (t / 2.0).sin() * 200.0 * severity
                    + (t * 3.0).sin() * 50.0 * severity
                    + rng.gen::<f64>() * 50.0
            } else if phase < -0.7 {
                ((t / 3.0).sin() * 50.0 + (t * 5.0).sin() * 80.0 + rng.gen::<f64>() * 30.0)
                    * (1.0 + p.apnea)
            } else {
                let cycle = (t / 15.0).sin();
                ((t / 5.0).sin() * 80.0 + (t * 0.8).sin() * 20.0 + rng.gen::<f64>() * 40.0)
                    * (1.0 + cycle * p.apnea)
            }
        }
        MonitorCondition::Insomnia => {
            let stress = (t / 10.0).sin() * 0.5 + 0.5;
            let arousal = (t / 8.0).cos() * 0.3 + 0.7;
            let sympathetic = (t / 6.0).sin() * 0.4 + 0.6;
            t.sin() * 100.0 * stress
                + (t * 2.0).cos() * 50.0 * arousal
                + (t * 0.5).sin() * 30.0 * sympathetic
                + rng.gen::<f64>() * 70.0 * (0.5 + p.insomnia * 0.5)
        }
        MonitorCondition::Rls => {
            let movement_phase = (t / 20.0).sin();
            if rng.gen::<f64>() < 0.15 + p.rls * 0.2 {
                let intensity = 150.0 + p.rls * 100.0;
                let mt = t % 10.0;
                if mt < 1.0 {
                    intensity * (1.0 - mt) + rng.gen::<f64>() * 50.0
                } else if mt < 3.0 {
                    -intensity * 0.5 * (mt - 1.0) / 2.0 + rng.gen::<f64>() * 70.0
                } else {
                    mt.sin() * 50.0 + rng.gen::<f64>() * 40.0
                }
            } else {
                ((t / 3.0).sin() * 70.0
                    + (t / 6.0).cos() * 30.0
                    + (t / 12.0).sin() * 50.0 * movement_phase
                    + rng.gen::<f64>() * 50.0)
                    * (1.0 + movement_phase * p.rls)
            }
        }
        MonitorCondition::NormalSleep
        | MonitorCondition::Unlabeled
        | MonitorCondition::Unrecognized => {
            let circadian = (t / 300.0).sin() * 0.3 + 0.7;
            ((t / 6.0).sin() * 60.0
                + (t / 10.0).sin() * 30.0
                + (t * 0.75).sin() * 40.0
                + rng.gen::<f64>() * 20.0)
                * circadian
        }
    };
    BASE_RR_INTERVAL_MS + variation
}

/// HRV 解读，仅在主导疾病概率超过一半时才偏离 `Normal`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HrvStatus {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Reduced HRV - Apnea Pattern")]
    ReducedApnea,
    #[serde(rename = "Erratic HRV - Apnea Pattern")]
    ErraticApnea,
    #[serde(rename = "Reduced HRV - Insomnia Pattern")]
    ReducedInsomnia,
    #[serde(rename = "Elevated HRV - RLS Pattern")]
    ElevatedRls,
}

impl HrvStatus {
    pub fn classify(
        condition: MonitorCondition,
        probs: &SignalProbabilities,
        sdnn: f64,
        rmssd: f64,
    ) -> Self {
        match condition {
            MonitorCondition::SleepApnea if probs.apnea > 0.5 => {
                if sdnn < 30.0 || rmssd < 15.0 {
                    Self::ReducedApnea
                } else if sdnn > 100.0 || rmssd > 80.0 {
                    Self::ErraticApnea
                } else {
                    Self::Normal
                }
            }
            MonitorCondition::Insomnia if probs.insomnia > 0.5 && (sdnn < 25.0 || rmssd < 20.0) => {
                Self::ReducedInsomnia
            }
            MonitorCondition::Rls if probs.rls > 0.5 && rmssd > 50.0 => Self::ElevatedRls,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvMetrics {
    pub heart_rate_bpm: f64,
    /// 总体标准差
    pub sdnn_ms: f64,
    pub rmssd_ms: f64,
    pub status: HrvStatus,
}

impl HrvMetrics {
    /// 少于两个 RR 间期时无法计算，返回 None。
    pub fn from_intervals<'a, I>(
        intervals: I,
        condition: MonitorCondition,
        probs: &SignalProbabilities,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let rr: Vec<f64> = intervals.into_iter().copied().filter(|v| v.is_finite()).collect();
        if rr.len() < 2 {
            return None;
        }
        let n = rr.len() as f64;
        let mean = rr.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return None;
        }
        let sdnn = (rr.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let rmssd = (rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

        Some(Self {
            heart_rate_bpm: 60_000.0 / mean,
            sdnn_ms: sdnn,
            rmssd_ms: rmssd,
            status: HrvStatus::classify(condition, probs, sdnn, rmssd),
        })
    }
}
