pub mod controller;
pub mod posture;
pub mod signals;
pub mod state;

pub use controller::{MonitorController, MonitorSnapshot};
pub use signals::{HrvMetrics, HrvStatus};
pub use state::{
    ExplicitProbabilities, MonitorCondition, MonitoringState, RespiratoryPattern,
    SignalProbabilities, SleepPosition,
};
