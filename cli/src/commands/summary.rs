use anyhow::Result;

use nutrilog_core::service::NutritionService;

use super::helpers::{no_neg_zero, parse_date};

pub(crate) fn cmd_summary(service: &NutritionService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let summary = service.summary_on(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let date = &summary.date;
    println!("=== {date} ===\n");

    let t = &summary.totals;
    let cal = no_neg_zero(t.calories);
    let (p, c, f) = (no_neg_zero(t.protein), no_neg_zero(t.carbs), no_neg_zero(t.fat));
    println!("  TOTAL: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g");

    let goal = summary.goal;
    println!("  GOAL: {goal} kcal");

    let remaining = no_neg_zero(summary.remaining_calories);
    if remaining < 0.0 {
        let over = -remaining;
        println!("  OVER BY: {over:.0} kcal");
    } else {
        println!("  REMAINING: {remaining:.0} kcal");
    }

    Ok(())
}
