use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::warn;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::{DailyActivityRecord, MAX_HYDRATION_GLASSES};

use super::{MealSlot, NotificationKind, ReminderGroup};

use MealSlot::{Breakfast, Dinner, Lunch};
use WeatherCategory::{Cloudy, Cold, Hot, Humid, Rainy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    Hot,
    Cold,
    Rainy,
    Humid,
    Cloudy,
}

impl WeatherCategory {
    pub fn label(&self) -> &'static str {
        match self {
            WeatherCategory::Hot => "hot",
            WeatherCategory::Cold => "cold",
            WeatherCategory::Rainy => "rainy",
            WeatherCategory::Humid => "humid",
            WeatherCategory::Cloudy => "cloudy",
        }
    }
}

/// Precipitation wins over temperature, temperature over humidity.
pub fn categorize_weather(temperature_c: f64, humidity: f64, condition: &str) -> WeatherCategory {
    let condition = condition.to_lowercase();
    if ["rain", "drizzle", "thunderstorm"]
        .iter()
        .any(|word| condition.contains(word))
    {
        WeatherCategory::Rainy
    } else if temperature_c > 30.0 {
        WeatherCategory::Hot
    } else if temperature_c < 15.0 {
        WeatherCategory::Cold
    } else if humidity > 75.0 {
        WeatherCategory::Humid
    } else {
        WeatherCategory::Cloudy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub humidity: f64,
    pub condition: String,
    pub category: WeatherCategory,
    pub description: String,
}

impl WeatherReport {
    pub fn new(temperature_c: f64, humidity: f64, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        let category = categorize_weather(temperature_c, humidity, &condition);
        Self {
            description: format!("{condition}, {temperature_c:.0}°C"),
            temperature_c,
            humidity,
            condition,
            category,
        }
    }
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self::new(25.0, 60.0, "Cloudy")
    }
}

/// Source of current conditions for meal suggestions. Treated as unreliable.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self) -> Result<WeatherReport>;
}

/// Always reports the same conditions.
#[derive(Debug, Clone, Default)]
pub struct StaticWeather {
    report: WeatherReport,
}

impl StaticWeather {
    pub fn new(report: WeatherReport) -> Self {
        Self { report }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self) -> Result<WeatherReport> {
        Ok(self.report.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSuggestion {
    pub name: &'static str,
    pub calories: u32,
    pub protein_g: u32,
    pub benefits: &'static str,
}

struct CatalogEntry {
    category: WeatherCategory,
    slot: MealSlot,
    meal: MealSuggestion,
}

const fn entry(
    category: WeatherCategory,
    slot: MealSlot,
    name: &'static str,
    calories: u32,
    protein_g: u32,
    benefits: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        category,
        slot,
        meal: MealSuggestion {
            name,
            calories,
            protein_g,
            benefits,
        },
    }
}

const MEAL_CATALOG: &[CatalogEntry] = &[
    entry(Hot, Breakfast, "Greek Yogurt Berry Bowl", 320, 18, "Cooling and rich in probiotics"),
    entry(Hot, Lunch, "Quinoa Cucumber Salad", 410, 14, "Light, hydrating and high in fibre"),
    entry(Hot, Dinner, "Grilled Fish Tacos", 480, 32, "Lean protein without a heavy meal"),
    entry(Cold, Breakfast, "Cinnamon Oatmeal with Walnuts", 380, 12, "Slow-release energy to keep you warm"),
    entry(Cold, Lunch, "Lentil and Vegetable Soup", 420, 21, "Warming, iron-rich and filling"),
    entry(Cold, Dinner, "Chicken and Sweet Potato Stew", 540, 38, "Hearty protein and complex carbs"),
    entry(Rainy, Breakfast, "Masala Egg Scramble", 340, 22, "Warm spices and steady protein"),
    entry(Rainy, Lunch, "Ginger Chicken Noodle Soup", 450, 29, "Soothing and immune-friendly"),
    entry(Rainy, Dinner, "Chickpea Curry with Brown Rice", 520, 19, "Comforting fibre and plant protein"),
    entry(Humid, Breakfast, "Watermelon Mint Smoothie", 220, 6, "Replaces fluids and electrolytes"),
    entry(Humid, Lunch, "Cold Soba Noodle Bowl", 430, 17, "Light carbs that are easy to digest"),
    entry(Humid, Dinner, "Tofu Lettuce Wraps", 360, 24, "Crisp, low-fat and refreshing"),
    entry(Cloudy, Breakfast, "Avocado Toast with Poached Egg", 360, 15, "Healthy fats for steady focus"),
    entry(Cloudy, Lunch, "Turkey and Hummus Wrap", 470, 31, "Balanced macros for the afternoon"),
    entry(Cloudy, Dinner, "Salmon with Roasted Vegetables", 520, 36, "Omega-3s and a full plate of greens"),
];

pub fn meal_suggestions(category: WeatherCategory, slot: MealSlot) -> Vec<MealSuggestion> {
    MEAL_CATALOG
        .iter()
        .filter(|entry| entry.category == category && entry.slot == slot)
        .map(|entry| entry.meal)
        .collect()
}

const MOTIVATIONS: &[&str] = &[
    "Today is a new opportunity to become stronger!",
    "Rise and shine! Your fitness journey starts now!",
    "New day, new goals! Let's crush it today!",
    "You're capable of amazing things! Start your day strong!",
    "Wake up with determination, go to bed with satisfaction!",
];

pub fn motivation_lines() -> &'static [&'static str] {
    MOTIVATIONS
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl NotificationContent {
    fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: json!({ "type": kind.id() }),
        }
    }
}

/// Turns a notification kind plus today's state into displayable text.
#[derive(Clone)]
pub struct ContentBuilder {
    weather: Arc<dyn WeatherProvider>,
}

impl ContentBuilder {
    pub fn new(weather: Arc<dyn WeatherProvider>) -> Self {
        Self { weather }
    }

    /// Never fails: meal content falls back to static text when the weather
    /// provider or the catalogue lets it down.
    pub async fn build(
        &self,
        kind: NotificationKind,
        record: &DailyActivityRecord,
    ) -> NotificationContent {
        match kind.group() {
            ReminderGroup::Water => water_content(kind, record),
            ReminderGroup::Motivation => motivation_content(kind, record),
            ReminderGroup::Meal => match self.meal_content(kind).await {
                Ok(content) => content,
                Err(err) => {
                    warn!("Falling back to static {kind} content: {err:#}");
                    fallback_content(kind)
                }
            },
        }
    }

    async fn meal_content(&self, kind: NotificationKind) -> Result<NotificationContent> {
        let slot = kind
            .meal_slot()
            .ok_or_else(|| anyhow!("{kind} is not a meal notification"))?;
        let weather = self.weather.current().await?;
        let meal = meal_suggestions(weather.category, slot)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no {slot:?} suggestion for {} weather", weather.category.label()))?;

        let (title, body) = match slot {
            MealSlot::Breakfast => (
                "Breakfast Suggestion".to_string(),
                format!(
                    "{} - {} cal | {}g protein\n\n{}",
                    meal.name, meal.calories, meal.protein_g, meal.benefits
                ),
            ),
            MealSlot::Lunch => (
                "Lunch Time!".to_string(),
                format!(
                    "Try {} - {} cal | Perfect for today's {} weather!",
                    meal.name,
                    meal.calories,
                    weather.category.label()
                ),
            ),
            MealSlot::Dinner => (
                "Dinner Time!".to_string(),
                format!("{} - {} cal | {}", meal.name, meal.calories, meal.benefits),
            ),
        };

        Ok(NotificationContent {
            title,
            body,
            data: json!({ "type": kind.id(), "meal": meal, "weather": weather }),
        })
    }
}

fn water_content(kind: NotificationKind, record: &DailyActivityRecord) -> NotificationContent {
    let title = match kind {
        NotificationKind::WaterReminder => "Good Morning! Time to Hydrate",
        NotificationKind::MiddayWater => "Hydration Check!",
        _ => "Evening Hydration",
    };

    let progress = if record.hydration_glasses >= MAX_HYDRATION_GLASSES {
        format!("You've hit all {MAX_HYDRATION_GLASSES} glasses today. Nice work!")
    } else {
        format!(
            "You've had {} of {MAX_HYDRATION_GLASSES} glasses today.",
            record.hydration_glasses
        )
    };

    let nudge = match kind {
        NotificationKind::WaterReminder => "Start your day with a glass of water to boost energy!",
        NotificationKind::MiddayWater => "Time for a water break! Keep your energy levels up.",
        _ => "Drink some water before bed for better sleep.",
    };

    NotificationContent::new(kind, title, format!("{nudge} {progress}"))
}

fn motivation_content(kind: NotificationKind, record: &DailyActivityRecord) -> NotificationContent {
    let line = MOTIVATIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MOTIVATIONS[0]);

    let body = if record.steps > 0 {
        format!("{line} {} steps already on the board.", record.steps)
    } else {
        line.to_string()
    };

    NotificationContent::new(kind, "Good Morning, Champion!", body)
}

/// Static text used when nothing better can be built.
pub fn fallback_content(kind: NotificationKind) -> NotificationContent {
    let (title, body) = match kind.group() {
        ReminderGroup::Water => ("Water Reminder", "Time to hydrate! Drink a glass of water now."),
        ReminderGroup::Meal => ("Meal Reminder", "Time for a balanced, protein-rich meal."),
        ReminderGroup::Motivation => ("Good Morning!", MOTIVATIONS[0]),
    };
    NotificationContent::new(kind, title, body)
}
