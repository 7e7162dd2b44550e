use anyhow::Result;
use std::process;

use nutrilog_core::models::LogFoodResponse;
use nutrilog_core::service::NutritionService;

use super::helpers::parse_date;

pub(crate) fn cmd_log(
    service: &NutritionService,
    food: &str,
    quantity: f64,
    meal: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let resp = service.log_food_on(food, quantity, meal, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        if !resp.is_ok() {
            process::exit(2);
        }
        return Ok(());
    }

    match resp {
        LogFoodResponse::Ok {
            food,
            quantity,
            meal,
            log_id,
            log_date,
        } => {
            println!("Logged [{log_id}]: {quantity} x {food} for {meal} on {log_date}");
        }
        LogFoodResponse::Error { message } => {
            eprintln!("{message}: '{food}'. Add it first with `nutrilog food add`.");
            process::exit(2);
        }
    }
    Ok(())
}
