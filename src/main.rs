//! Warden - a safety gate for LLM-generated SQL.

use db_warden::cli::Cli;
use db_warden::config::Config;
use db_warden::db::QueryResult;
use db_warden::error::{Result, WardenError};
use db_warden::gate::{Gate, GateOutcome};
use db_warden::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config);
    config.apply_env_defaults();

    let sql = read_sql(&cli)?;
    info!("candidate statement ({} bytes)", sql.len());

    let gate = Gate::open(&config).await?;

    let code = if cli.check {
        let decision = gate.validator().validate(&sql);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&decision).unwrap_or_default());
        } else if decision.is_accepted() {
            println!("ok");
        } else {
            println!("rejected: {}", decision.reason);
        }
        if decision.is_accepted() {
            0
        } else {
            2
        }
    } else {
        match gate.run(&sql).await {
            Ok(GateOutcome::Executed(result)) => {
                print_result(&result, cli.json);
                0
            }
            Ok(GateOutcome::Rejected(decision)) => {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&decision).unwrap_or_default()
                    );
                } else {
                    println!("rejected: {}", decision.reason);
                }
                2
            }
            Err(e) => {
                gate.close().await.ok();
                return Err(e);
            }
        }
    };

    gate.close().await?;
    Ok(code)
}

/// Takes the statement from the positional argument or from stdin.
fn read_sql(cli: &Cli) -> Result<String> {
    let sql = match &cli.sql {
        Some(sql) => sql.clone(),
        None => std::io::read_to_string(std::io::stdin())
            .map_err(|e| WardenError::internal(format!("could not read stdin: {e}")))?,
    };

    let sql = sql.trim().to_string();
    if sql.is_empty() {
        return Err(WardenError::config("no SQL statement given"));
    }
    Ok(sql)
}

/// Prints a result as a plain table or as JSON.
fn print_result(result: &QueryResult, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).unwrap_or_default()
        );
        return;
    }

    println!("{}", result.column_names().join(" | "));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
        println!("{}", cells.join(" | "));
    }

    if let Some(warning) = result.truncation_warning() {
        eprintln!("{warning}");
    }
    eprintln!(
        "{} row(s) in {}ms",
        result.row_count,
        result.execution_time.as_millis()
    );
}
