pub mod day;
pub mod logging;

pub use day::{activity_day, local_midnight, trailing_days, Clock, ManualClock, SystemClock};
