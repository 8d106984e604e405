pub mod content;
pub mod engine;
pub mod host;
mod kind;
pub mod ledger;

pub use content::{
    categorize_weather, fallback_content, meal_suggestions, ContentBuilder, MealSuggestion,
    NotificationContent, StaticWeather, WeatherCategory, WeatherProvider, WeatherReport,
};
pub use engine::{FireOutcome, NotificationEngine, NotificationState};
pub use host::{DailyTrigger, Notification, NotificationHost, TokioNotificationHost};
pub use kind::{MealSlot, NotificationKind, ReminderGroup};
pub use ledger::{DedupLedger, LEDGER_STORAGE_KEY};
