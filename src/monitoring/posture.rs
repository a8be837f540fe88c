//! 睡姿与呼吸模式的加权采样。权重按标签条件给出，采样前归一化到和为 1。

use rand::Rng;

use super::state::{MonitorCondition, RespiratoryPattern, SignalProbabilities, SleepPosition};

pub fn normalize<const N: usize>(weights: [f64; N]) -> [f64; N] {
    let weights = weights.map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return [1.0 / N as f64; N];
    }
    weights.map(|w| w / sum)
}

/// 累积分布采样；浮点误差导致未命中时返回最后一个权重为正的下标。
pub fn sample_index<const N: usize>(weights: &[f64; N], r: f64) -> usize {
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if r <= acc {
            return i;
        }
    }
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(N.saturating_sub(1))
}

pub fn position_weights<R: Rng + ?Sized>(
    condition: MonitorCondition,
    probs: &SignalProbabilities,
    previous: SleepPosition,
    rng: &mut R,
) -> [f64; 4] {
    let current = previous.index();
    match condition {
        MonitorCondition::SleepApnea => {
            let severity = probs.apnea;
            let mut w = [0.5 + severity * 0.3, 0.1, 0.2, 0.2 - severity * 0.1];
            if previous == SleepPosition::Supine {
                w[0] += 0.2;
            }
            if severity > 0.7 && rng.gen_bool(0.3) {
                w = [0.2, 0.2, 0.3, 0.3];
            }
            w
        }
        MonitorCondition::Insomnia => {
            let mut w = [0.25; 4];
            if probs.insomnia > 0.7 {
                // 重度失眠倾向于翻身
                for (i, v) in w.iter_mut().enumerate() {
                    *v += if i == current { -0.15 } else { 0.05 };
                }
            } else {
                w[current] += 0.1;
            }
            w
        }
        MonitorCondition::Rls => {
            let severity = probs.rls;
            let mut w = [
                0.15 - severity * 0.1,
                0.15 - severity * 0.1,
                0.35 + severity * 0.1,
                0.35 + severity * 0.1,
            ];
            if severity > 0.6 && rng.gen_bool(0.4) {
                w = match previous {
                    SleepPosition::Left => [0.05, 0.05, 0.2, 0.7],
                    SleepPosition::Right => [0.05, 0.05, 0.7, 0.2],
                    _ => [0.05, 0.05, 0.45, 0.45],
                };
            }
            w
        }
        MonitorCondition::NormalSleep | MonitorCondition::Unrecognized => {
            let mut w = [0.3, 0.2, 0.25, 0.25];
            w[current] += 0.2;
            w
        }
        MonitorCondition::Unlabeled => [0.25; 4],
    }
}

pub fn pattern_weights<R: Rng + ?Sized>(
    condition: MonitorCondition,
    probs: &SignalProbabilities,
    previous: RespiratoryPattern,
    now_ms: i64,
    rng: &mut R,
) -> [f64; 5] {
    use RespiratoryPattern::*;

    let current = previous.index();
    match condition {
        MonitorCondition::SleepApnea => {
            let aw = (probs.apnea * 1.2).min(1.0);
            let mut w = match (now_ms / 25_000).rem_euclid(4) {
                0 => [0.1, 0.5 + aw * 0.3, 0.3 + aw * 0.1, 0.05, 0.05],
                1 => [0.05, 0.25, 0.6 + aw * 0.25, 0.05, 0.05],
                2 => [0.15, 0.2, 0.15, 0.4 + aw * 0.25, 0.1],
                _ => [0.35 - aw * 0.2, 0.25, 0.15, 0.15, 0.1],
            };
            if aw > 0.7 && matches!(previous, Periodic | CheyneStokes) {
                w[current] += 0.2;
            }
            w
        }
        MonitorCondition::Insomnia => {
            let iw = (probs.insomnia * 1.15).min(1.0);
            let arousal = (now_ms as f64 / 22_000.0).sin() * 0.6 + 0.5;
            let mut w = if arousal > 0.7 {
                [0.1, 0.05, 0.0, 0.5 + iw * 0.3, 0.35 + iw * 0.2]
            } else {
                [0.35 - iw * 0.15, 0.1, 0.0, 0.35 + iw * 0.15, 0.2 + iw * 0.15]
            };
            if matches!(previous, Irregular | Shallow) {
                w[current] += 0.15;
            }
            w
        }
        MonitorCondition::Rls => {
            let rls = probs.rls;
            let severity = 0.5 + rls * 0.5;
            let in_episode = rng.gen::<f64>() < 0.2 * severity;
            let mut w = if in_episode {
                [0.2, 0.1, 0.0, 0.6 + rls * 0.2, 0.1]
            } else {
                [0.6 - rls * 0.2, 0.1, 0.0, 0.2 + rls * 0.1, 0.1 + rls * 0.1]
            };
            if matches!(previous, Normal | Irregular) {
                w[current] += 0.2;
            }
            w
        }
        MonitorCondition::NormalSleep | MonitorCondition::Unrecognized => {
            let mut w = [0.8, 0.1, 0.0, 0.05, 0.05];
            if previous == Normal {
                w[0] += 0.15;
            }
            w
        }
        MonitorCondition::Unlabeled => {
            let mut w = [0.7, 0.15, 0.05, 0.05, 0.05];
            w[current] += 0.1;
            w
        }
    }
}

pub fn sample_position<R: Rng + ?Sized>(
    condition: MonitorCondition,
    probs: &SignalProbabilities,
    previous: SleepPosition,
    rng: &mut R,
) -> SleepPosition {
    let weights = normalize(position_weights(condition, probs, previous, rng));
    SleepPosition::ALL[sample_index(&weights, rng.gen())]
}

pub fn sample_pattern<R: Rng + ?Sized>(
    condition: MonitorCondition,
    probs: &SignalProbabilities,
    previous: RespiratoryPattern,
    now_ms: i64,
    rng: &mut R,
) -> RespiratoryPattern {
    let weights = normalize(pattern_weights(condition, probs, previous, now_ms, rng));
    RespiratoryPattern::ALL[sample_index(&weights, rng.gen())]
}
