//! clinicbot-migrate: drop, recreate and seed the dashboard tables.
//!
//! Usage: clinicbot-migrate --yes-destroy-data [--only <name>] [--database-url <url>]
//!        clinicbot-migrate --list

use clinicbot_db::migrations::{self, MIGRATIONS};
use std::env;
use tracing::{error, info};

const USAGE: &str = "Usage: clinicbot-migrate --yes-destroy-data [--only <name>] [--database-url <url>]\n       clinicbot-migrate --list";

#[derive(Debug, Default, PartialEq)]
struct Args {
    confirmed: bool,
    list: bool,
    only: Option<String>,
    database_url: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--yes-destroy-data" => parsed.confirmed = true,
            "--list" => parsed.list = true,
            "--only" => {
                parsed.only = Some(iter.next().ok_or("--only needs a migration name")?.clone())
            }
            "--database-url" => {
                parsed.database_url =
                    Some(iter.next().ok_or("--database-url needs a value")?.clone())
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(parsed)
}

fn database_url(args: &Args) -> Result<String, String> {
    if let Some(url) = &args.database_url {
        return Ok(url.clone());
    }
    let config = clinicbot_config::load_config().map_err(|e| format!("Config error: {}", e))?;
    config
        .database
        .and_then(|db| db.postgres_url)
        .filter(|url| !url.is_empty() && url != "secret_from_env")
        .ok_or_else(|| {
            "No Postgres URL: pass --database-url or set database.postgres_url".to_string()
        })
}

#[tokio::main]
async fn main() {
    clinicbot_config::ensure_dotenv_loaded();
    clinicbot_common::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if args.list {
        for migration in MIGRATIONS {
            println!("{}", migration.name);
        }
        return;
    }

    if !args.confirmed {
        eprintln!("These scripts DROP and recreate the dashboard tables. All data in them is lost.");
        eprintln!("Re-run with --yes-destroy-data to continue.");
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    if let Err(e) = run(&args).await {
        error!("Migration aborted: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let selected = migrations::select(args.only.as_deref())?;
    let url = database_url(args)?;
    let pool = migrations::connect(&url).await?;
    let applied = migrations::run(&pool, &selected).await?;
    info!("Done: {} of {} script(s) applied", applied, selected.len());
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_destroy_flag_is_opt_in() {
        let args = parse_args(&strings(&["--only", "appointments"])).unwrap();
        assert!(!args.confirmed);
        assert_eq!(args.only.as_deref(), Some("appointments"));
    }

    #[test]
    fn test_full_invocation() {
        let args = parse_args(&strings(&[
            "--yes-destroy-data",
            "--database-url",
            "postgres://localhost/clinic",
        ]))
        .unwrap();
        assert!(args.confirmed);
        assert_eq!(database_url(&args).unwrap(), "postgres://localhost/clinic");
    }

    #[test]
    fn test_rejects_unknown_and_incomplete_arguments() {
        assert!(parse_args(&strings(&["--force"])).is_err());
        assert!(parse_args(&strings(&["--only"])).is_err());
    }
}
