use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, info, warn};

use crate::models::{
    DATE_FORMAT, DEFAULT_DAILY_CALORIES, DailySummary, Food, GOAL_ID, Goal, LogEntry, MacroTotals,
    MealEntryView, MealsForDate, NewFood, NewLogEntry, UNSPECIFIED_MEAL, meal_or_unspecified,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.ensure_schema()
            .with_context(|| format!("Failed to initialize database: {}", path.display()))?;
        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Create missing tables, add the `logs.meal` column to older databases and
    /// seed the goal row. Safe to run on every startup.
    pub fn ensure_schema(&self) -> Result<()> {
        // Per-connection setting, and a no-op inside a transaction.
        self.conn.pragma_update(None, "foreign_keys", true)?;

        let tx = self.write_transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS foods (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                calories INTEGER NOT NULL,
                protein REAL NOT NULL,
                carbs REAL NOT NULL,
                fat REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                food_id INTEGER NOT NULL REFERENCES foods(id),
                quantity REAL NOT NULL,
                log_date TEXT NOT NULL,
                meal TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_logs_log_date ON logs(log_date);

            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                daily_calories INTEGER NOT NULL
            );",
        )?;

        if has_column(&tx, "logs", "meal")? {
            debug!("logs.meal present");
        } else {
            match tx.execute("ALTER TABLE logs ADD COLUMN meal TEXT", []) {
                Ok(_) => info!("added meal column to logs"),
                Err(e) => warn!(error = %e, "could not add meal column to logs; continuing"),
            }
        }

        let seeded = tx.execute(
            "INSERT OR IGNORE INTO goals (id, daily_calories) VALUES (?1, ?2)",
            params![GOAL_ID, DEFAULT_DAILY_CALORIES],
        )?;
        if seeded > 0 {
            debug!(daily_calories = DEFAULT_DAILY_CALORIES, "seeded default goal");
        }

        tx.commit()?;
        Ok(())
    }

    /// `BEGIN IMMEDIATE`, so a competing writer goes through the busy timeout.
    fn write_transaction(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin write transaction")
    }

    // --- Row mapping helpers ---

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: row.get(0)?,
            name: row.get(1)?,
            calories: row.get(2)?,
            protein: row.get(3)?,
            carbs: row.get(4)?,
            fat: row.get(5)?,
        })
    }

    // Expects columns:
    // 0: l.id, 1: f.name, 2: l.quantity, 3: l.meal,
    // 4: f.calories, 5: f.protein, 6: f.carbs, 7: f.fat
    #[allow(clippy::cast_precision_loss)]
    fn meal_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<(String, MealEntryView)> {
        let quantity: f64 = row.get(2)?;
        let calories: i64 = row.get(4)?;
        let meal = meal_or_unspecified(row.get(3)?);
        Ok((
            meal,
            MealEntryView {
                log_id: row.get(0)?,
                food: row.get(1)?,
                quantity,
                calories_per_serving: calories,
                protein_per_serving: row.get(5)?,
                carbs_per_serving: row.get(6)?,
                fat_per_serving: row.get(7)?,
                calories_total: calories as f64 * quantity,
            },
        ))
    }

    fn log_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<LogEntry> {
        Ok(LogEntry {
            id: row.get(0)?,
            food_id: row.get(1)?,
            quantity: row.get(2)?,
            log_date: row.get(3)?,
            meal: meal_or_unspecified(row.get(4)?),
        })
    }

    // --- Foods ---

    /// Insert a food, or replace every nutrient field of the food with the same
    /// name. The row keeps its id.
    pub fn upsert_food(&self, food: &NewFood) -> Result<Food> {
        self.conn.execute(
            "INSERT INTO foods (name, calories, protein, carbs, fat)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                calories = excluded.calories,
                protein = excluded.protein,
                carbs = excluded.carbs,
                fat = excluded.fat",
            params![food.name, food.calories, food.protein, food.carbs, food.fat],
        )?;
        self.get_food_by_name(&food.name)?
            .with_context(|| format!("Food '{}' missing after upsert", food.name))
    }

    pub fn get_food_by_name(&self, name: &str) -> Result<Option<Food>> {
        let food = self
            .conn
            .query_row(
                "SELECT id, name, calories, protein, carbs, fat FROM foods WHERE name = ?1",
                params![name],
                Self::food_from_row,
            )
            .optional()?;
        Ok(food)
    }

    pub fn list_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, calories, protein, carbs, fat FROM foods ORDER BY name")?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    // --- Logs ---

    pub fn insert_log_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        let date_str = entry.log_date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO logs (food_id, quantity, log_date, meal) VALUES (?1, ?2, ?3, ?4)",
            params![entry.food_id, entry.quantity, date_str, entry.meal],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_log_entry(id)
    }

    pub fn get_log_entry(&self, id: i64) -> Result<LogEntry> {
        self.conn
            .query_row(
                "SELECT id, food_id, quantity, log_date, meal FROM logs WHERE id = ?1",
                params![id],
                Self::log_entry_from_row,
            )
            .context("Log entry not found")
    }

    /// Resolve `food_name` and log it. Returns `None` without writing when no
    /// food has that exact name. An empty meal is stored as `unspecified`.
    pub fn log_food(
        &self,
        food_name: &str,
        quantity: f64,
        meal: &str,
        date: NaiveDate,
    ) -> Result<Option<LogEntry>> {
        let meal = if meal.is_empty() { UNSPECIFIED_MEAL } else { meal };
        let tx = self.write_transaction()?;
        let Some(food) = self.get_food_by_name(food_name)? else {
            debug!(food = food_name, "log rejected, unknown food");
            return Ok(None);
        };
        let entry = self.insert_log_entry(&NewLogEntry {
            food_id: food.id,
            quantity,
            log_date: date,
            meal: meal.to_string(),
        })?;
        tx.commit()?;
        Ok(Some(entry))
    }

    /// Logged entries for `date` joined to their foods, in log order, each paired
    /// with its normalised meal label.
    pub fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<(String, MealEntryView)>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT l.id, f.name, l.quantity, l.meal, f.calories, f.protein, f.carbs, f.fat
             FROM logs l
             JOIN foods f ON l.food_id = f.id
             WHERE l.log_date = ?1
             ORDER BY l.id",
        )?;
        let entries = stmt
            .query_map(params![date_str], Self::meal_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // --- Goal ---

    pub fn get_goal(&self) -> Result<Goal> {
        self.conn
            .query_row(
                "SELECT daily_calories FROM goals WHERE id = ?1",
                params![GOAL_ID],
                |row| {
                    Ok(Goal {
                        daily_calories: row.get(0)?,
                    })
                },
            )
            .context("Goal row missing")
    }

    pub fn set_goal(&self, daily_calories: i64) -> Result<Goal> {
        self.conn.execute(
            "INSERT INTO goals (id, daily_calories) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET daily_calories = excluded.daily_calories",
            params![GOAL_ID, daily_calories],
        )?;
        Ok(Goal { daily_calories })
    }

    // --- Aggregation ---

    pub fn build_meals_for_date(&self, date: NaiveDate) -> Result<MealsForDate> {
        let mut meals: IndexMap<String, Vec<MealEntryView>> = IndexMap::new();
        for (meal, entry) in self.get_entries_for_date(date)? {
            meals.entry(meal).or_default().push(entry);
        }
        Ok(MealsForDate {
            date: date.format(DATE_FORMAT).to_string(),
            meals,
        })
    }

    pub fn build_daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let tx = self.conn.unchecked_transaction()?;

        let mut totals = MacroTotals::default();
        {
            let mut stmt = tx.prepare(
                "SELECT f.calories, f.protein, f.carbs, f.fat, l.quantity
                 FROM logs l
                 JOIN foods f ON l.food_id = f.id
                 WHERE l.log_date = ?1
                 ORDER BY l.id",
            )?;
            let mut rows = stmt.query(params![date_str])?;
            while let Some(row) = rows.next()? {
                totals.add_servings(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?);
            }
        }

        let goal = self.get_goal()?;
        tx.commit()?;

        Ok(DailySummary::new(date_str, totals, goal.daily_calories))
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}
