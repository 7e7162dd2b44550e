mod food;
mod goal;
mod helpers;
mod log;
mod meals;
mod summary;

pub(crate) use food::{cmd_food_add, cmd_food_list};
pub(crate) use goal::{cmd_goal_set, cmd_goal_show};
pub(crate) use log::cmd_log;
pub(crate) use meals::cmd_meals;
pub(crate) use summary::cmd_summary;
