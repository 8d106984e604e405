pub mod controller;
mod loop_worker;
pub mod sensor;
mod session;
mod stats;

pub use controller::{StartOutcome, StepTracker, StepTrackingStatus};
pub use sensor::{StepSensor, UnavailableSensor};
pub use session::StepSession;
pub use stats::WeeklyStepStats;
