mod bus;
mod record;
mod store;

pub use bus::{ActivityBus, ActivityHandler, Subscription};
pub use record::{
    ActivityField, ActivityPatch, DailyActivityRecord, MAX_HYDRATION_GLASSES, MAX_SLEEP_HOURS,
    MAX_WELLNESS_SCORE,
};
pub use store::{ActivityStore, HistoryOrder, ACTIVITY_STORAGE_KEY, MAX_HISTORY_DAYS};
