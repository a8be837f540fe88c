//! 最终标签判定：按顺序求值的规则表，第一条命中的规则决定标签。
//!
//! 顺序：呼吸暂停 → 失眠 → 正常 → 疾病兜底 → 不确定。

use super::indicators::{IndicatorSet, ScaledScores};
use crate::screening::types::{DecisionRule, DisorderLabel};

const APNEA_REASON: &str = "Drooping eyelids, relaxed lower jaw, and deepened nasolabial folds suggest frequent breathing interruptions during sleep.";
const INSOMNIA_REASON: &str = "Frequent blinking, partially open eyes, and increased facial muscle tension indicate difficulty maintaining sleep.";
const NORMAL_REASON: &str = "Relaxed facial muscles, closed eyes, and symmetrical expressions are consistent with typical sleep conditions.";
const FALLBACK_INSOMNIA_REASON: &str = "Facial features suggest potential insomnia. Some indicators of frequent blinking and increased facial muscle tension are present.";
const FALLBACK_APNEA_REASON: &str = "Facial features suggest potential sleep apnea. Some indicators of drooping eyelids and relaxed lower jaw are present.";
const SUBTLE_INSOMNIA: &str = "Subtle indicators of sleep disturbance detected";
const SUBTLE_APNEA: &str = "Subtle indicators of breathing interruptions detected";
const INCONCLUSIVE_FEATURES: &str =
    "Insufficient distinctive facial features detected or ambiguous feature patterns";

pub struct DecisionInput<'a> {
    pub insomnia: i32,
    pub apnea: i32,
    pub normal: i32,
    pub scaled: &'a ScaledScores,
    pub insomnia_set: &'a IndicatorSet,
    pub apnea_set: &'a IndicatorSet,
    pub normal_set: &'a IndicatorSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: DisorderLabel,
    pub confidence: i32,
    pub reason: String,
    pub features: Vec<String>,
}

pub struct Rule {
    pub id: DecisionRule,
    pub evaluate: fn(&DecisionInput<'_>) -> Option<Verdict>,
}

pub const RULES: [Rule; 5] = [
    Rule {
        id: DecisionRule::ApneaMargin,
        evaluate: apnea_margin,
    },
    Rule {
        id: DecisionRule::InsomniaMargin,
        evaluate: insomnia_margin,
    },
    Rule {
        id: DecisionRule::NormalMargin,
        evaluate: normal_margin,
    },
    Rule {
        id: DecisionRule::DisorderFallback,
        evaluate: disorder_fallback,
    },
    Rule {
        id: DecisionRule::Inconclusive,
        evaluate: inconclusive,
    },
];

pub fn decide(input: &DecisionInput<'_>) -> (DecisionRule, Verdict) {
    for rule in &RULES {
        if let Some(verdict) = (rule.evaluate)(input) {
            return (rule.id, verdict);
        }
    }
    // 最后一条规则总会命中
    (DecisionRule::Inconclusive, inconclusive_verdict(input))
}

fn apnea_margin(d: &DecisionInput<'_>) -> Option<Verdict> {
    let (i, a, n) = (d.insomnia, d.apnea, d.normal);
    if a > 40 && a - i >= 15 && a - n >= 15 {
        return Some(Verdict {
            label: DisorderLabel::SleepApnea,
            confidence: a.max(65),
            reason: APNEA_REASON.to_string(),
            features: d.apnea_set.significant_descriptions(),
        });
    }
    None
}

fn insomnia_margin(d: &DecisionInput<'_>) -> Option<Verdict> {
    let (i, a, n) = (d.insomnia, d.apnea, d.normal);
    let holds = |other: i32| i - other >= 5 || i >= 65;
    if i > a && i > n && i >= 60 && holds(a) && holds(n) {
        return Some(Verdict {
            label: DisorderLabel::Insomnia,
            confidence: i,
            reason: INSOMNIA_REASON.to_string(),
            features: d.insomnia_set.significant_descriptions(),
        });
    }
    None
}

fn normal_margin(d: &DecisionInput<'_>) -> Option<Verdict> {
    let (i, a, n) = (d.insomnia, d.apnea, d.normal);
    let holds = |other: i32| n - other >= 8 || n >= 85;
    let by_margin = n > i && n > a && n >= 65 && holds(i) && holds(a);
    let s = d.scaled;
    let by_profile = s.fold < 0.4 && s.tension < 0.5 && s.symmetry > 0.7;
    if by_margin || by_profile {
        return Some(Verdict {
            label: DisorderLabel::NormalSleep,
            confidence: n,
            reason: NORMAL_REASON.to_string(),
            features: d.normal_set.significant_descriptions(),
        });
    }
    None
}

fn with_default(mut features: Vec<String>, default: &str) -> Vec<String> {
    if features.is_empty() {
        features.push(default.to_string());
    }
    features
}

fn disorder_fallback(d: &DecisionInput<'_>) -> Option<Verdict> {
    let (i, a, n) = (d.insomnia, d.apnea, d.normal);
    if i.max(a) < n - 5 {
        return None;
    }
    let verdict = if i >= a {
        Verdict {
            label: DisorderLabel::Insomnia,
            confidence: i,
            reason: FALLBACK_INSOMNIA_REASON.to_string(),
            features: with_default(d.insomnia_set.relaxed_descriptions(), SUBTLE_INSOMNIA),
        }
    } else {
        Verdict {
            label: DisorderLabel::SleepApnea,
            confidence: a,
            reason: FALLBACK_APNEA_REASON.to_string(),
            features: with_default(d.apnea_set.relaxed_descriptions(), SUBTLE_APNEA),
        }
    };
    Some(verdict)
}

fn inconclusive(d: &DecisionInput<'_>) -> Option<Verdict> {
    Some(inconclusive_verdict(d))
}

fn inconclusive_verdict(d: &DecisionInput<'_>) -> Verdict {
    let (i, a, n) = (d.insomnia, d.apnea, d.normal);
    let highest = i.max(a).max(n);
    let likely = if highest == i {
        DisorderLabel::Insomnia
    } else if highest == a {
        DisorderLabel::SleepApnea
    } else {
        DisorderLabel::NormalSleep
    };
    Verdict {
        label: DisorderLabel::Inconclusive,
        confidence: highest,
        reason: format!(
            "Facial features analysis is inconclusive, but shows some characteristics of {} ({}% confidence). Consider using additional classification methods for more accurate results.",
            likely.display_name(),
            highest
        ),
        features: vec![INCONCLUSIVE_FEATURES.to_string()],
    }
}
