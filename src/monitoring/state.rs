use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::posture::{sample_pattern, sample_position};
use super::signals::{eeg_sample, hrv_sample, HrvMetrics};
use crate::constants::{
    EEG_BUFFER_LEN, HRV_BUFFER_LEN, MILLIS_PER_SEC, POSITION_MIN_INTERVAL_MS, RESAMPLE_CHANCE,
    RESPIRATORY_MIN_INTERVAL_MS, WARMUP_EEG_SAMPLES,
};
use crate::screening::types::{clamp_unit, Probabilities};

/// 由标签文本推断的监测条件（子串匹配，大小写不敏感）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonitorCondition {
    #[default]
    Unlabeled,
    NormalSleep,
    Insomnia,
    SleepApnea,
    Rls,
    /// 有标签但无法识别，例如 "Inconclusive"
    Unrecognized,
}

impl MonitorCondition {
    pub fn from_label(label: &str) -> Self {
        let l = label.to_ascii_lowercase();
        if l.contains("insomnia") {
            Self::Insomnia
        } else if l.contains("sleep apnea") {
            Self::SleepApnea
        } else if l.contains("rls") || l.contains("restless") {
            Self::Rls
        } else if l.contains("no sleeping disorder") || l.contains("normal sleep") {
            Self::NormalSleep
        } else {
            Self::Unrecognized
        }
    }

    /// 有标签且不是正常睡眠时使用较大噪声
    pub fn is_disorder_noise(self) -> bool {
        !matches!(self, Self::Unlabeled | Self::NormalSleep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalProbabilities {
    pub insomnia: f64,
    pub apnea: f64,
    /// 分类器不产生 RLS，仅由外部预测填充
    pub rls: f64,
    pub normal: f64,
}

impl Default for SignalProbabilities {
    fn default() -> Self {
        Self {
            insomnia: 0.25,
            apnea: 0.25,
            rls: 0.0,
            normal: 0.5,
        }
    }
}

impl SignalProbabilities {
    pub fn clamped(&self) -> Self {
        Self {
            insomnia: clamp_unit(self.insomnia),
            apnea: clamp_unit(self.apnea),
            rls: clamp_unit(self.rls),
            normal: clamp_unit(self.normal),
        }
    }

    /// 显式给定的疾病概率，正常概率取余量；疾病之和超过 1 时按比例缩回 1。
    pub fn from_explicit(explicit: &ExplicitProbabilities, condition: MonitorCondition) -> Self {
        let mut p = Self {
            insomnia: clamp_unit(explicit.insomnia),
            apnea: clamp_unit(explicit.apnea),
            rls: clamp_unit(explicit.rls),
            normal: 0.0,
        };
        let disorders = p.insomnia + p.apnea + p.rls;
        if disorders > 1.0 {
            p.scale_disorders(1.0 / disorders);
        } else {
            p.normal = 1.0 - disorders;
        }
        if condition == MonitorCondition::NormalSleep {
            let disorders = p.insomnia + p.apnea + p.rls;
            if disorders > 0.15 {
                p.scale_disorders(0.15 / disorders);
                p.normal = 0.85;
            }
        }
        p.clamped()
    }

    fn scale_disorders(&mut self, scale: f64) {
        self.insomnia *= scale;
        self.apnea *= scale;
        self.rls *= scale;
    }

    /// 未给出概率时，按标签在原有随机区间内生成
    pub fn from_condition<R: Rng + ?Sized>(condition: MonitorCondition, rng: &mut R) -> Self {
        let mut r = || rng.gen::<f64>();
        let mut p = match condition {
            MonitorCondition::Insomnia => Self {
                insomnia: 0.7 + r() * 0.2,
                apnea: 0.05 + r() * 0.15,
                rls: 0.05 + r() * 0.1,
                normal: 0.0,
            },
            MonitorCondition::SleepApnea => Self {
                apnea: 0.7 + r() * 0.2,
                insomnia: 0.1 + r() * 0.15,
                rls: 0.05 + r() * 0.1,
                normal: 0.0,
            },
            MonitorCondition::Rls => Self {
                rls: 0.7 + r() * 0.2,
                insomnia: 0.1 + r() * 0.15,
                apnea: 0.05 + r() * 0.1,
                normal: 0.0,
            },
            MonitorCondition::NormalSleep => {
                let normal = 0.85 + r() * 0.1;
                let insomnia = 0.05 + r() * 0.05;
                let apnea = 0.03 + r() * 0.04;
                let rls = 0.02 + r() * 0.03;
                let total = normal + insomnia + apnea + rls;
                return Self {
                    insomnia: insomnia / total,
                    apnea: apnea / total,
                    rls: rls / total,
                    normal: normal / total,
                };
            }
            MonitorCondition::Unlabeled | MonitorCondition::Unrecognized => {
                let base = 0.05 + r() * 0.15;
                Self {
                    insomnia: base,
                    apnea: base * 0.8,
                    rls: base * 0.6,
                    normal: 0.0,
                }
            }
        };
        p.normal = 1.0 - (p.insomnia + p.apnea + p.rls);
        p.clamped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitProbabilities {
    pub insomnia: f64,
    pub apnea: f64,
    #[serde(default)]
    pub rls: f64,
}

/// 分类器概率转为监测输入；分类器不产出 rls。
impl From<Probabilities> for ExplicitProbabilities {
    fn from(p: Probabilities) -> Self {
        Self {
            insomnia: p.insomnia,
            apnea: p.apnea,
            rls: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepPosition {
    #[default]
    Supine,
    Prone,
    Left,
    Right,
}

impl SleepPosition {
    pub const ALL: [SleepPosition; 4] = [Self::Supine, Self::Prone, Self::Left, Self::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RespiratoryPattern {
    #[default]
    Normal,
    Periodic,
    CheyneStokes,
    Irregular,
    Shallow,
}

impl RespiratoryPattern {
    pub const ALL: [RespiratoryPattern; 5] = [
        Self::Normal,
        Self::Periodic,
        Self::CheyneStokes,
        Self::Irregular,
        Self::Shallow,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 监测会话状态：当前标签、概率、定长缓冲区、睡姿和呼吸模式。
#[derive(Debug, Clone, Default)]
pub struct MonitoringState {
    label: Option<String>,
    condition: MonitorCondition,
    probabilities: SignalProbabilities,
    eeg: VecDeque<f64>,
    hrv: VecDeque<f64>,
    position: SleepPosition,
    pattern: RespiratoryPattern,
    last_position_change_ms: Option<i64>,
    last_pattern_change_ms: Option<i64>,
    ticks: u64,
}

impl MonitoringState {
    pub fn new() -> Self {
        Self {
            eeg: VecDeque::with_capacity(EEG_BUFFER_LEN),
            hrv: VecDeque::with_capacity(HRV_BUFFER_LEN),
            ..Self::default()
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn condition(&self) -> MonitorCondition {
        self.condition
    }

    pub fn probabilities(&self) -> SignalProbabilities {
        self.probabilities
    }

    pub fn eeg(&self) -> &VecDeque<f64> {
        &self.eeg
    }

    pub fn hrv(&self) -> &VecDeque<f64> {
        &self.hrv
    }

    pub fn hrv_metrics(&self) -> Option<HrvMetrics> {
        HrvMetrics::from_intervals(&self.hrv, self.condition, &self.probabilities)
    }

    pub fn position(&self) -> SleepPosition {
        self.position
    }

    pub fn pattern(&self) -> RespiratoryPattern {
        self.pattern
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn push_eeg(&mut self, v: f64) {
        if self.eeg.len() == EEG_BUFFER_LEN {
            self.eeg.pop_front();
        }
        self.eeg.push_back(v);
    }

    fn push_hrv(&mut self, v: f64) {
        if self.hrv.len() == HRV_BUFFER_LEN {
            self.hrv.pop_front();
        }
        self.hrv.push_back(v);
    }

    fn maybe_resample_position<R: Rng + ?Sized>(&mut self, now_ms: i64, rng: &mut R) {
        let due = self
            .last_position_change_ms
            .map_or(true, |last| now_ms - last > POSITION_MIN_INTERVAL_MS);
        if due {
            self.last_position_change_ms = Some(now_ms);
            self.position = sample_position(self.condition, &self.probabilities, self.position, rng);
        }
    }

    fn maybe_resample_pattern<R: Rng + ?Sized>(&mut self, now_ms: i64, rng: &mut R) {
        let due = self
            .last_pattern_change_ms
            .map_or(true, |last| now_ms - last > RESPIRATORY_MIN_INTERVAL_MS);
        if due {
            self.last_pattern_change_ms = Some(now_ms);
            self.pattern =
                sample_pattern(self.condition, &self.probabilities, self.pattern, now_ms, rng);
        }
    }

    /// 定时器每次触发调用一次：EEG 每次、HRV 隔次，并有 10% 概率尝试重采样睡姿与呼吸模式。
    pub fn tick<R: Rng + ?Sized>(&mut self, now_ms: i64, rng: &mut R) {
        let t = now_ms as f64 / MILLIS_PER_SEC;
        self.push_eeg(eeg_sample(t, self.condition, rng));
        if self.ticks % 2 == 0 {
            self.push_hrv(hrv_sample(t, self.condition, &self.probabilities, rng));
        }
        if rng.gen::<f64>() < RESAMPLE_CHANCE {
            self.maybe_resample_position(now_ms, rng);
            self.maybe_resample_pattern(now_ms, rng);
        }
        self.ticks += 1;
    }

    /// 新预测到达：重置概率与缓冲区，立即重采样睡姿/呼吸模式并预热波形。
    pub fn apply_prediction<R: Rng + ?Sized>(
        &mut self,
        label: &str,
        explicit: Option<&ExplicitProbabilities>,
        now_ms: i64,
        rng: &mut R,
    ) {
        let condition = MonitorCondition::from_label(label);
        self.label = Some(label.to_string());
        self.condition = condition;
        self.probabilities = match explicit {
            Some(e) => SignalProbabilities::from_explicit(e, condition),
            None => SignalProbabilities::from_condition(condition, rng),
        };

        self.last_pattern_change_ms = None;
        self.last_position_change_ms = None;
        self.maybe_resample_pattern(now_ms, rng);
        self.maybe_resample_position(now_ms, rng);

        self.eeg.clear();
        self.hrv.clear();
        self.ticks = 0;
        let t = now_ms as f64 / MILLIS_PER_SEC;
        for i in 0..WARMUP_EEG_SAMPLES {
            self.push_eeg(eeg_sample(t, condition, rng));
            if i % 2 == 0 {
                self.push_hrv(hrv_sample(t, condition, &self.probabilities, rng));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::screening::types::Percentages;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn classifier_percents_convert_to_fractions() {
        let explicit = ExplicitProbabilities::from(Probabilities::from(Percentages {
            insomnia: 22,
            apnea: 48,
            normal: 30,
        }));
        assert!((explicit.insomnia - 0.22).abs() < 1e-9);
        assert!((explicit.apnea - 0.48).abs() < 1e-9);
        assert_eq!(explicit.rls, 0.0);
    }

    #[test]
    fn labels_map_to_conditions() {
        assert_eq!(MonitorCondition::from_label("Sleep Apnea"), MonitorCondition::SleepApnea);
        assert_eq!(MonitorCondition::from_label("Insomnia"), MonitorCondition::Insomnia);
        assert_eq!(MonitorCondition::from_label("Normal Sleep"), MonitorCondition::NormalSleep);
        assert_eq!(
            MonitorCondition::from_label("No sleeping disorder"),
            MonitorCondition::NormalSleep
        );
        assert_eq!(MonitorCondition::from_label("Restless legs"), MonitorCondition::Rls);
        assert_eq!(MonitorCondition::from_label("Inconclusive"), MonitorCondition::Unrecognized);
    }

    #[test]
    fn warmup_fills_buffers() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = MonitoringState::new();
        state.apply_prediction("Insomnia", None, NOW, &mut rng);
        assert_eq!(state.eeg().len(), 50);
        assert_eq!(state.hrv().len(), 25);
        assert_eq!(state.condition(), MonitorCondition::Insomnia);
        assert_eq!(state.label(), Some("Insomnia"));
    }

    #[test]
    fn buffers_are_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = MonitoringState::new();
        state.apply_prediction("Sleep Apnea", None, NOW, &mut rng);
        for i in 0..500 {
            state.tick(NOW + i * 100, &mut rng);
        }
        assert_eq!(state.eeg().len(), EEG_BUFFER_LEN);
        assert_eq!(state.hrv().len(), HRV_BUFFER_LEN);
        assert_eq!(state.ticks(), 500);
    }

    #[test]
    fn hrv_runs_at_half_rate() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = MonitoringState::new();
        for i in 0..20 {
            state.tick(NOW + i * 100, &mut rng);
        }
        assert_eq!(state.eeg().len(), 20);
        assert_eq!(state.hrv().len(), 10);
    }

    #[test]
    fn new_prediction_resets_buffers() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = MonitoringState::new();
        for i in 0..120 {
            state.tick(NOW + i * 100, &mut rng);
        }
        state.apply_prediction("Normal Sleep", None, NOW + 20_000, &mut rng);
        assert_eq!(state.eeg().len(), 50);
        assert_eq!(state.ticks(), 0);
    }

    #[test]
    fn position_respects_minimum_interval() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = MonitoringState::new();
        state.apply_prediction("Insomnia", None, NOW, &mut rng);
        let stamp = state.last_position_change_ms;
        state.maybe_resample_position(NOW + 10_000, &mut rng);
        assert_eq!(state.last_position_change_ms, stamp);
        state.maybe_resample_position(NOW + 15_001, &mut rng);
        assert_eq!(state.last_position_change_ms, Some(NOW + 15_001));
    }

    #[test]
    fn generated_probabilities_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(6);
        for label in ["Insomnia", "Sleep Apnea", "RLS", "No sleeping disorder", "Inconclusive"] {
            let p = SignalProbabilities::from_condition(MonitorCondition::from_label(label), &mut rng);
            let sum = p.insomnia + p.apnea + p.rls + p.normal;
            assert!((sum - 1.0).abs() < 1e-9, "{label}: {sum}");
        }
    }

    #[test]
    fn primary_disorder_dominates() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = SignalProbabilities::from_condition(MonitorCondition::SleepApnea, &mut rng);
        assert!(p.apnea >= 0.7 && p.apnea <= 0.9);
        assert!(p.apnea > p.insomnia && p.apnea > p.normal);
    }

    #[test]
    fn explicit_normal_caps_disorders() {
        let explicit = ExplicitProbabilities {
            insomnia: 0.3,
            apnea: 0.2,
            rls: 0.1,
        };
        let p = SignalProbabilities::from_explicit(&explicit, MonitorCondition::NormalSleep);
        assert_eq!(p.normal, 0.85);
        assert!((p.insomnia + p.apnea + p.rls - 0.15).abs() < 1e-12);
    }

    #[test]
    fn explicit_probabilities_derive_normal() {
        let explicit = ExplicitProbabilities {
            insomnia: 0.22,
            apnea: 0.48,
            rls: 0.0,
        };
        let p = SignalProbabilities::from_explicit(&explicit, MonitorCondition::SleepApnea);
        assert!((p.normal - 0.30).abs() < 1e-12);
        assert_eq!(p.rls, 0.0);
    }

    #[test]
    fn oversized_explicit_disorders_are_rescaled() {
        let explicit = ExplicitProbabilities {
            insomnia: 0.9,
            apnea: 0.9,
            rls: 0.9,
        };
        let p = SignalProbabilities::from_explicit(&explicit, MonitorCondition::SleepApnea);
        assert!((p.insomnia - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(p.normal, 0.0);
        assert!((p.insomnia + p.apnea + p.rls + p.normal - 1.0).abs() < 1e-9);

        let p = SignalProbabilities::from_explicit(&explicit, MonitorCondition::NormalSleep);
        assert_eq!(p.normal, 0.85);
        assert!((p.insomnia + p.apnea + p.rls + p.normal - 1.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_probabilities_always_sum_to_one() {
        for (i, a, r) in [(0.0, 0.0, 0.0), (0.5, 0.6, 0.0), (1.0, 0.0, 0.2), (0.05, 0.02, 0.01)] {
            let explicit = ExplicitProbabilities {
                insomnia: i,
                apnea: a,
                rls: r,
            };
            for condition in [MonitorCondition::Insomnia, MonitorCondition::NormalSleep] {
                let p = SignalProbabilities::from_explicit(&explicit, condition);
                let sum = p.insomnia + p.apnea + p.rls + p.normal;
                assert!((sum - 1.0).abs() < 1e-9, "{i} {a} {r} {condition:?}: {sum}");
            }
        }
    }

    #[test]
    fn pattern_serializes_kebab_case() {
        let json = serde_json::to_value(RespiratoryPattern::CheyneStokes).unwrap();
        assert_eq!(json, "cheyne-stokes");
        let json = serde_json::to_value(SleepPosition::Left).unwrap();
        assert_eq!(json, "left");
    }
}
