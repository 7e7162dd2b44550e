use anyhow::Result;
use std::process;

use nutrilog_core::service::NutritionService;

use super::helpers::parse_date;

pub(crate) fn cmd_meals(service: &NutritionService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let result = service.meals_on(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.meals.is_empty() {
        let date = &result.date;
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    let date = &result.date;
    println!("=== {date} ===\n");

    for (meal, entries) in &result.meals {
        let meal_label = meal.to_uppercase();
        let sub_cal: f64 = entries.iter().map(|e| e.calories_total).sum();
        println!("  {meal_label} ({sub_cal:.0} kcal)");
        for e in entries {
            let id = e.log_id;
            let name = &e.food;
            let qty = e.quantity;
            let per = e.calories_per_serving;
            let total = e.calories_total;
            let (p, c, f) = (e.protein_per_serving, e.carbs_per_serving, e.fat_per_serving);
            println!(
                "    [{id}] {name} — {qty} x {per} kcal = {total:.0} kcal | per serving P:{p:.1}g C:{c:.1}g F:{f:.1}g"
            );
        }
        println!();
    }

    Ok(())
}
