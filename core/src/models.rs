use anyhow::{Context, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Meal label used when the caller gives none, and for stored rows whose
/// meal is null or empty.
pub const UNSPECIFIED_MEAL: &str = "unspecified";

/// Daily calorie goal written on first initialization.
pub const DEFAULT_DAILY_CALORIES: i64 = 2000;

/// Fixed identity of the single row in `goals`.
pub const GOAL_ID: i64 = 1;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub name: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub food_id: i64,
    pub quantity: f64,
    pub log_date: String,
    pub meal: String,
}

#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub food_id: i64,
    pub quantity: f64,
    pub log_date: NaiveDate,
    pub meal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub daily_calories: i64,
}

/// One logged entry joined to its food's current per-serving values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealEntryView {
    pub log_id: i64,
    pub food: String,
    pub quantity: f64,
    pub calories_per_serving: i64,
    pub protein_per_serving: f64,
    pub carbs_per_serving: f64,
    pub fat_per_serving: f64,
    pub calories_total: f64,
}

/// Entries for a date grouped by meal, groups in order of first appearance.
#[derive(Debug, Clone, Serialize)]
pub struct MealsForDate {
    pub date: String,
    pub meals: IndexMap<String, Vec<MealEntryView>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    /// Add `quantity` servings of a food's per-serving values.
    #[allow(clippy::cast_precision_loss)]
    pub fn add_servings(
        &mut self,
        calories: i64,
        protein: f64,
        carbs: f64,
        fat: f64,
        quantity: f64,
    ) {
        self.calories += calories as f64 * quantity;
        self.protein += protein * quantity;
        self.carbs += carbs * quantity;
        self.fat += fat * quantity;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub totals: MacroTotals,
    pub goal: i64,
    pub remaining_calories: f64,
}

impl DailySummary {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(date: String, totals: MacroTotals, goal: i64) -> Self {
        Self {
            date,
            totals,
            goal,
            remaining_calories: goal as f64 - totals.calories,
        }
    }
}

/// Normalise a stored meal label for grouping.
#[must_use]
pub fn meal_or_unspecified(meal: Option<String>) -> String {
    match meal {
        Some(m) if !m.is_empty() => m,
        _ => UNSPECIFIED_MEAL.to_string(),
    }
}

// --- Operation responses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddFoodResponse {
    pub status: Status,
    pub food: Food,
    pub db_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LogFoodResponse {
    Ok {
        food: String,
        quantity: f64,
        meal: String,
        log_id: i64,
        log_date: String,
    },
    Error {
        message: String,
    },
}

impl LogFoodResponse {
    #[must_use]
    pub fn not_found() -> Self {
        Self::Error {
            message: "Food not found".to_string(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetGoalResponse {
    pub status: Status,
    pub daily_calories: i64,
}
