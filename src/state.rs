use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::monitoring::MonitorController;
use crate::screening::ScreeningPipeline;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pipeline: Arc<ScreeningPipeline>,
    monitor: MonitorController,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let pipeline = Arc::new(ScreeningPipeline::new(
            &config.screening,
            &config.remote_landmarks,
        ));
        let monitor = MonitorController::new(&config.monitor);

        Self {
            config: Arc::new(config.clone()),
            pipeline,
            monitor,
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &ScreeningPipeline {
        &self.pipeline
    }

    /// 监测控制器本身是可克隆的句柄，所有克隆共享同一会话。
    pub fn monitor(&self) -> &MonitorController {
        &self.monitor
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
