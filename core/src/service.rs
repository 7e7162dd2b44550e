use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::db::Database;
use crate::models::{
    AddFoodResponse, DailySummary, Food, Goal, LogFoodResponse, MealsForDate, NewFood,
    SetGoalResponse, Status, UNSPECIFIED_MEAL, parse_date,
};

/// The operations offered to a transport. Each call is a single unit of work
/// against the store.
pub struct NutritionService {
    db: Database,
    db_path: String,
}

/// The current local date, used wherever a date is left to default.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl NutritionService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self {
            db,
            db_path: db_path.display().to_string(),
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            db_path: ":memory:".to_string(),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    // --- Foods ---

    pub fn add_food(
        &self,
        name: &str,
        calories: i64,
        protein: f64,
        carbs: f64,
        fat: f64,
    ) -> Result<AddFoodResponse> {
        let food = self.db.upsert_food(&NewFood {
            name: name.to_string(),
            calories,
            protein,
            carbs,
            fat,
        })?;
        info!(food = %food.name, id = food.id, "food saved");
        Ok(AddFoodResponse {
            status: Status::Ok,
            food,
            db_path: self.db_path.clone(),
        })
    }

    pub fn list_foods(&self) -> Result<Vec<Food>> {
        self.db.list_foods()
    }

    // --- Logging ---

    pub fn log_food(
        &self,
        name: &str,
        quantity: f64,
        meal: Option<&str>,
    ) -> Result<LogFoodResponse> {
        self.log_food_on(name, quantity, meal, today())
    }

    pub fn log_food_on(
        &self,
        name: &str,
        quantity: f64,
        meal: Option<&str>,
        date: NaiveDate,
    ) -> Result<LogFoodResponse> {
        let meal = meal.unwrap_or(UNSPECIFIED_MEAL);
        let Some(entry) = self.db.log_food(name, quantity, meal, date)? else {
            return Ok(LogFoodResponse::not_found());
        };
        info!(food = name, quantity, meal = %entry.meal, date = %entry.log_date, "food logged");
        Ok(LogFoodResponse::Ok {
            food: name.to_string(),
            quantity: entry.quantity,
            meal: entry.meal,
            log_id: entry.id,
            log_date: entry.log_date,
        })
    }

    // --- Meals ---

    /// Meals for `date_str` (`YYYY-MM-DD`), or for today when absent.
    pub fn get_meals(&self, date_str: Option<&str>) -> Result<MealsForDate> {
        let date = match date_str {
            Some(s) => parse_date(s)?,
            None => today(),
        };
        self.meals_on(date)
    }

    pub fn meals_on(&self, date: NaiveDate) -> Result<MealsForDate> {
        self.db.build_meals_for_date(date)
    }

    // --- Goal ---

    pub fn set_daily_calorie_goal(&self, calories: i64) -> Result<SetGoalResponse> {
        let goal = self.db.set_goal(calories)?;
        info!(daily_calories = goal.daily_calories, "goal updated");
        Ok(SetGoalResponse {
            status: Status::Ok,
            daily_calories: goal.daily_calories,
        })
    }

    pub fn get_goal(&self) -> Result<Goal> {
        self.db.get_goal()
    }

    // --- Summary ---

    pub fn today_summary(&self) -> Result<DailySummary> {
        self.summary_on(today())
    }

    pub fn summary_on(&self, date: NaiveDate) -> Result<DailySummary> {
        self.db.build_daily_summary(date)
    }
}
