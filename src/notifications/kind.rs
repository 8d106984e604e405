use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    WaterReminder,
    MealSuggestion,
    MorningMotivation,
    LunchReminder,
    DinnerReminder,
    MiddayWater,
    EveningWater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderGroup {
    Water,
    Meal,
    Motivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::MorningMotivation,
        NotificationKind::WaterReminder,
        NotificationKind::MealSuggestion,
        NotificationKind::LunchReminder,
        NotificationKind::MiddayWater,
        NotificationKind::DinnerReminder,
        NotificationKind::EveningWater,
    ];

    /// Identifier used for host triggers and ledger entries.
    pub fn id(&self) -> &'static str {
        match self {
            NotificationKind::WaterReminder => "water-reminder",
            NotificationKind::MealSuggestion => "meal-suggestion",
            NotificationKind::MorningMotivation => "morning-motivation",
            NotificationKind::LunchReminder => "lunch-reminder",
            NotificationKind::DinnerReminder => "dinner-reminder",
            NotificationKind::MiddayWater => "midday-water",
            NotificationKind::EveningWater => "evening-water",
        }
    }

    pub fn group(&self) -> ReminderGroup {
        match self {
            NotificationKind::WaterReminder
            | NotificationKind::MiddayWater
            | NotificationKind::EveningWater => ReminderGroup::Water,
            NotificationKind::MealSuggestion
            | NotificationKind::LunchReminder
            | NotificationKind::DinnerReminder => ReminderGroup::Meal,
            NotificationKind::MorningMotivation => ReminderGroup::Motivation,
        }
    }

    pub fn meal_slot(&self) -> Option<MealSlot> {
        match self {
            NotificationKind::MealSuggestion => Some(MealSlot::Breakfast),
            NotificationKind::LunchReminder => Some(MealSlot::Lunch),
            NotificationKind::DinnerReminder => Some(MealSlot::Dinner),
            _ => None,
        }
    }

    /// Local wall-clock `(hour, minute)` used when the user never picked one.
    pub fn default_time(&self) -> (u32, u32) {
        match self {
            NotificationKind::MorningMotivation => (6, 30),
            NotificationKind::WaterReminder => (7, 0),
            NotificationKind::MealSuggestion => (7, 30),
            NotificationKind::LunchReminder => (12, 30),
            NotificationKind::MiddayWater => (14, 0),
            NotificationKind::DinnerReminder => (19, 0),
            NotificationKind::EveningWater => (21, 0),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.id() == value)
            .ok_or_else(|| anyhow!("unknown notification kind '{value}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_back() {
        for kind in NotificationKind::ALL {
            assert_eq!(kind.id().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("breakfast".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn serde_uses_the_trigger_id() {
        let json = serde_json::to_string(&NotificationKind::EveningWater).unwrap();
        assert_eq!(json, "\"evening-water\"");
    }

    #[test]
    fn only_meal_kinds_have_a_slot() {
        let meals: Vec<_> = NotificationKind::ALL
            .into_iter()
            .filter(|kind| kind.meal_slot().is_some())
            .collect();
        assert!(meals.iter().all(|kind| kind.group() == ReminderGroup::Meal));
        assert_eq!(meals.len(), 3);
    }
}
