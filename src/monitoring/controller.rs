use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use super::signals::HrvMetrics;
use super::state::{
    ExplicitProbabilities, MonitorCondition, MonitoringState, RespiratoryPattern,
    SignalProbabilities, SleepPosition,
};
use crate::config::MonitorConfig;

struct MonitorInner {
    state: MonitoringState,
    rng: StdRng,
}

impl MonitorInner {
    fn tick(&mut self, now: DateTime<Utc>) {
        let Self { state, rng } = self;
        state.tick(now.timestamp_millis(), rng);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub running: bool,
    pub label: Option<String>,
    pub condition: MonitorCondition,
    pub probabilities: SignalProbabilities,
    pub eeg: Vec<f64>,
    pub hrv: Vec<f64>,
    pub hrv_metrics: Option<HrvMetrics>,
    pub sleep_position: SleepPosition,
    pub respiratory_pattern: RespiratoryPattern,
    pub ticks: u64,
    pub timestamp: DateTime<Utc>,
}

/// 监测会话的唯一拥有者：状态在一把锁内，定时任务至多一个。
#[derive(Clone)]
pub struct MonitorController {
    inner: Arc<Mutex<MonitorInner>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    auto_start: bool,
}

impl MonitorController {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorInner {
                state: MonitoringState::new(),
                rng: StdRng::from_entropy(),
            })),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_millis(config.tick_ms.max(1)),
            auto_start: config.auto_start,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub async fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// 已在运行时不做任何事，返回 false。
    pub async fn start(&self) -> bool {
        let mut ticker_guard = self.ticker.lock().await;
        if ticker_guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let inner = self.inner.clone();
        let tick_interval = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                inner.lock().await.tick(Utc::now());
            }
        });
        *ticker_guard = Some(handle);
        tracing::info!(tick_ms = tick_interval.as_millis() as u64, "Monitoring started");
        true
    }

    /// 未运行时不做任何事，返回 false。
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.ticker.lock().await.take() else {
            return false;
        };
        let was_running = !handle.is_finished();
        handle.abort();
        if was_running {
            tracing::info!("Monitoring stopped");
        }
        was_running
    }

    /// 先重置状态，再按配置决定是否启动定时器。
    pub async fn update_prediction(&self, label: &str, explicit: Option<ExplicitProbabilities>) {
        {
            let mut guard = self.inner.lock().await;
            let MonitorInner { state, rng } = &mut *guard;
            state.apply_prediction(label, explicit.as_ref(), Utc::now().timestamp_millis(), rng);
            tracing::info!(
                label,
                condition = ?state.condition(),
                position = ?state.position(),
                pattern = ?state.pattern(),
                "Monitoring prediction updated"
            );
        }
        if self.auto_start {
            self.start().await;
        }
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let running = self.is_running().await;
        let guard = self.inner.lock().await;
        let s = &guard.state;
        MonitorSnapshot {
            running,
            label: s.label().map(str::to_string),
            condition: s.condition(),
            probabilities: s.probabilities(),
            eeg: s.eeg().iter().copied().collect(),
            hrv: s.hrv().iter().copied().collect(),
            hrv_metrics: s.hrv_metrics(),
            sleep_position: s.position(),
            respiratory_pattern: s.pattern(),
            ticks: s.ticks(),
            timestamp: Utc::now(),
        }
    }
}
