use anyhow::Result;

use nutrilog_core::service::NutritionService;

use super::helpers::print_food_table;

pub(crate) fn cmd_food_add(
    service: &NutritionService,
    name: &str,
    calories: i64,
    protein: f64,
    carbs: f64,
    fat: f64,
    json: bool,
) -> Result<()> {
    let resp = service.add_food(name, calories, protein, carbs, fat)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        let food = &resp.food;
        println!(
            "Saved: {} (ID {}) — {} kcal | P:{:.1}g C:{:.1}g F:{:.1}g per serving",
            food.name, food.id, food.calories, food.protein, food.carbs, food.fat
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_list(service: &NutritionService, json: bool) -> Result<()> {
    let foods = service.list_foods()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else if foods.is_empty() {
        eprintln!("No foods yet. Use `nutrilog food add <name> --calories .. --protein .. --carbs .. --fat ..`");
    } else {
        print_food_table(&foods);
    }
    Ok(())
}
