mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_food_add, cmd_food_list, cmd_goal_set, cmd_goal_show, cmd_log, cmd_meals, cmd_summary,
};
use crate::config::Config;
use nutrilog_core::service::NutritionService;

#[derive(Parser)]
#[command(
    name = "nutrilog",
    version,
    about = "Track foods, meals and a daily calorie goal"
)]
struct Cli {
    /// Database file to use instead of probing the default locations
    #[arg(long, global = true, env = "NUTRILOG_DB", value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the food catalog
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Log servings of a food for today (or --date)
    Log {
        /// Exact food name, as added with `food add`
        food: String,
        /// Number of servings (may be fractional)
        #[arg(allow_negative_numbers = true)]
        quantity: f64,
        /// Meal label, e.g. breakfast (default: unspecified)
        #[arg(short, long)]
        meal: Option<String>,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show logged meals for a date (defaults to today)
    Meals {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the daily calorie goal
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Show calorie and macro totals against the goal (defaults to today)
    Summary {
        /// Date to summarise (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Address to bind to (use 0.0.0.0 to expose to the network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food, or replace the macros of an existing food with the same name
    Add {
        /// Food name (case-sensitive)
        name: String,
        /// Calories per serving
        #[arg(long, allow_negative_numbers = true)]
        calories: i64,
        /// Protein per serving (g)
        #[arg(long, allow_negative_numbers = true)]
        protein: f64,
        /// Carbs per serving (g)
        #[arg(long, allow_negative_numbers = true)]
        carbs: f64,
        /// Fat per serving (g)
        #[arg(long, allow_negative_numbers = true)]
        fat: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all foods
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Set the daily calorie goal
    Set {
        /// Daily calorie target
        #[arg(allow_negative_numbers = true)]
        calories: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily calorie goal
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(serving: bool) {
    let default_filter = if serving {
        "nutrilog=info,nutrilog_core=info,tower_http=info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.db)?;
    let service = NutritionService::new(&config.db_path)?;

    match cli.command {
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_food_add(&service, &name, calories, protein, carbs, fat, json),
            FoodCommands::List { json } => cmd_food_list(&service, json),
        },
        Commands::Log {
            food,
            quantity,
            meal,
            date,
            json,
        } => cmd_log(&service, &food, quantity, meal.as_deref(), date, json),
        Commands::Meals { date, json } => cmd_meals(&service, date, json),
        Commands::Goal { command } => match command {
            GoalCommands::Set { calories, json } => cmd_goal_set(&service, calories, json),
            GoalCommands::Show { json } => cmd_goal_show(&service, json),
        },
        Commands::Summary { date, json } => cmd_summary(&service, date, json),
        Commands::Serve { port, bind } => server::start_server(service, port, &bind).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_parses_fractional_and_negative_quantity() {
        let cli = Cli::try_parse_from(["nutrilog", "log", "Oats", "-0.5", "--meal", "breakfast"])
            .unwrap();
        let Commands::Log {
            food,
            quantity,
            meal,
            ..
        } = cli.command
        else {
            panic!("expected log command");
        };
        assert_eq!(food, "Oats");
        assert_eq!(quantity, -0.5);
        assert_eq!(meal.as_deref(), Some("breakfast"));
    }

    #[test]
    fn test_global_db_flag() {
        let cli = Cli::try_parse_from(["nutrilog", "goal", "show", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }
}
