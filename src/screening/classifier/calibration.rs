//! 百分比校准：归一化 → 上下限 → 特例修正 → 区分度抑制 → 重新归一到 100。

use super::indicators::{ScaledScores, SetScore};

const INSOMNIA_BOUNDS: (f64, f64) = (45.0, 90.0);
const APNEA_BOUNDS: (f64, f64) = (55.0, 92.0);
const NORMAL_BOUNDS: (f64, f64) = (40.0, 85.0);

const CLEAR_GAP: f64 = 20.0;
const MIN_WINNER_GAP: f64 = 25.0;
const MAX_RUNNER_UP: f64 = 65.0;

/// 三类标签的下标顺序：失眠、呼吸暂停、正常
pub const INSOMNIA: usize = 0;
pub const APNEA: usize = 1;
pub const NORMAL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionBranch {
    Clear,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrated {
    pub percents: [u8; 3],
    pub branch: SuppressionBranch,
    pub gap: f64,
}

/// JS 风格四舍五入（.5 向上）
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// 平分差距不超过 20 时，非最高项的抑制系数，范围 [0.7, 0.9]
pub fn close_branch_factor(gap: f64) -> f64 {
    0.9 - (gap / CLEAR_GAP) * 0.2
}

fn first_max(values: &[f64; 3]) -> usize {
    let mut idx = 0;
    for i in 1..3 {
        if values[i] > values[idx] {
            idx = i;
        }
    }
    idx
}

/// 返回 None 表示三项原始分数之和不是正数（退化情形）。
pub fn calibrate(
    scores: [SetScore; 3],
    accuracy_multiplier: f64,
    scaled: &ScaledScores,
) -> Option<Calibrated> {
    let total: f64 = scores.iter().map(|s| s.raw).sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let bonus = [8.0, 10.0, 6.0];
    let bounds = [INSOMNIA_BOUNDS, APNEA_BOUNDS, NORMAL_BOUNDS];
    let mut pct = [0.0_f64; 3];
    for i in 0..3 {
        let raw = round_half_up(
            scores[i].raw / total * 100.0 * accuracy_multiplier
                + scores[i].significant as f64 * bonus[i],
        );
        pct[i] = raw.min(bounds[i].1).max(bounds[i].0);
    }

    if scaled.jaw > 0.6 && scaled.fold > 0.5 {
        pct[APNEA] += 10.0;
    }
    if scaled.jaw > 0.7 || scaled.fold > 0.6 {
        pct[INSOMNIA] = (pct[INSOMNIA] * 0.85).max(45.0);
    }

    let winner = first_max(&pct);
    let highest = pct[winner];
    let mut sorted = pct;
    sorted.sort_by(|a, b| b.total_cmp(a));
    let gap = highest - sorted[1];

    let branch = if gap > CLEAR_GAP {
        SuppressionBranch::Clear
    } else {
        SuppressionBranch::Close
    };

    for (i, v) in pct.iter_mut().enumerate() {
        if i == winner {
            continue;
        }
        *v = match branch {
            SuppressionBranch::Clear => v.min(highest - MIN_WINNER_GAP).max(*v * 0.8),
            SuppressionBranch::Close => *v * close_branch_factor(gap),
        };
        *v = v.min(MAX_RUNNER_UP);
    }

    Some(Calibrated {
        percents: renormalize(pct),
        branch,
        gap,
    })
}

/// 按比例缩放到和为 100，舍入误差归入当前最大项
fn renormalize(pct: [f64; 3]) -> [u8; 3] {
    let total: f64 = pct.iter().sum();
    let factor = 100.0 / total;
    let mut rounded = pct.map(|v| round_half_up(v * factor) as i32);
    let diff = 100 - rounded.iter().sum::<i32>();
    if diff != 0 {
        let mut idx = 0;
        for i in 1..3 {
            if rounded[i] > rounded[idx] {
                idx = i;
            }
        }
        rounded[idx] += diff;
    }
    rounded.map(|v| v.clamp(0, 100) as u8)
}
