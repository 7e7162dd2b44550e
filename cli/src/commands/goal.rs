use anyhow::Result;

use nutrilog_core::service::NutritionService;

pub(crate) fn cmd_goal_set(service: &NutritionService, calories: i64, json: bool) -> Result<()> {
    let resp = service.set_daily_calorie_goal(calories)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        let cal = resp.daily_calories;
        println!("Daily goal: {cal} kcal");
    }
    Ok(())
}

pub(crate) fn cmd_goal_show(service: &NutritionService, json: bool) -> Result<()> {
    let goal = service.get_goal()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
    } else {
        let cal = goal.daily_calories;
        println!("Daily goal: {cal} kcal");
    }
    Ok(())
}
