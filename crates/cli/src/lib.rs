pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "salescope",
    about = "Salescope operator CLI",
    long_about = "Operate Salescope runtime readiness, fixture seeding, and direct warehouse queries.",
    after_help = "Examples:\n  salescope doctor --json\n  salescope seed\n  salescope query \"SELECT ProductName FROM monthly_retail_sales LIMIT 5\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config and warehouse connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create the warehouse schema and load the deterministic sales fixtures")]
    Seed,
    #[command(about = "Run one SQL statement through the query gateway and print the result")]
    Query {
        #[arg(help = "SQL SELECT statement to execute")]
        sql: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Seed => commands::seed::run(),
        Command::Query { sql } => commands::query::run(&sql),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
