//! Embedded schema scripts for the remote database.
//!
//! The scripts drop and recreate the dashboard tables and replace the RPC
//! functions. They destroy existing data.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// In execution order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_control_tables",
        sql: include_str!("../migrations/001_control_tables.sql"),
    },
    Migration {
        name: "002_message_logs",
        sql: include_str!("../migrations/002_message_logs.sql"),
    },
    Migration {
        name: "003_appointments",
        sql: include_str!("../migrations/003_appointments.sql"),
    },
    Migration {
        name: "004_dashboard_functions",
        sql: include_str!("../migrations/004_dashboard_functions.sql"),
    },
];

/// The scripts to run: all of them, or the one named by `only`.
pub fn select(only: Option<&str>) -> Result<Vec<&'static Migration>, DbError> {
    match only {
        None => Ok(MIGRATIONS.iter().collect()),
        Some(name) => MIGRATIONS
            .iter()
            .find(|m| m.name == name || m.name.split_once('_').map(|(_, n)| n) == Some(name))
            .map(|m| vec![m])
            .ok_or_else(|| DbError::ConfigError(format!("Unknown migration: {}", name))),
    }
}

pub async fn connect(postgres_url: &str) -> Result<PgPool, DbError> {
    if postgres_url.is_empty() {
        return Err(DbError::ConfigError("Postgres URL is empty".to_string()));
    }
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(postgres_url)
        .await?;
    info!("Connected to Postgres for migrations");
    Ok(pool)
}

/// Run each script in its own transaction. Stops at the first failure; scripts
/// before it stay committed.
pub async fn run(pool: &PgPool, migrations: &[&Migration]) -> Result<usize, DbError> {
    let mut applied = 0;
    for migration in migrations {
        info!("Applying {}", migration.name);
        let mut tx = pool.begin().await?;
        if let Err(e) = (&mut *tx).execute(migration.sql).await {
            warn!("{} failed, rolling back: {}", migration.name, e);
            tx.rollback().await?;
            return Err(DbError::Migration {
                name: migration.name.to_string(),
                message: e.to_string(),
            });
        }
        tx.commit().await?;
        applied += 1;
    }
    info!("{} migration(s) applied", applied);
    Ok(applied)
}
