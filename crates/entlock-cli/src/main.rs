//! Entity lock maintenance CLI.
//!
//! Provides the `entlock` binary for inspecting and cleaning up a SQLite lock
//! database, e.g. the one the server writes when `ENTLOCK_DB_PATH` is set.
//! Output is JSON on stdout; tokens are never printed.

use std::process;

use chrono::Utc;
use clap::{Parser, Subcommand};

use entlock_core::{EntityId, EntityType, LockKey, LockToken};
use entlock_storage::{LockStore, SqliteStore};

/// Entity lock maintenance tools.
#[derive(Parser)]
#[command(name = "entlock", about = "Entity lock maintenance tools")]
struct Cli {
    /// Path to the lock database file.
    #[arg(short, long, global = true, default_value = "entlock.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List locks (only valid ones unless --all).
    List {
        /// Include expired rows.
        #[arg(long)]
        all: bool,
    },
    /// Show the lock on one entity.
    Show { entity_type: String, entity_id: i64 },
    /// Release a lock with its token.
    Release {
        entity_type: String,
        entity_id: i64,
        #[arg(short, long)]
        token: String,
    },
    /// Delete all expired rows.
    PurgeExpired,
}

/// Failure of a subcommand, carrying its exit code.
#[derive(Debug)]
enum CliError {
    /// Invalid input or a rejected lock operation (exit 1).
    Rejected(String),
    /// Database or I/O failure (exit 3).
    Storage(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Rejected(_) => 1,
            CliError::Storage(_) => 3,
        }
    }

    fn message(&self) -> &str {
        match self {
            CliError::Rejected(msg) | CliError::Storage(msg) => msg,
        }
    }
}

impl From<entlock_core::CoreError> for CliError {
    fn from(err: entlock_core::CoreError) -> Self {
        CliError::Rejected(err.to_string())
    }
}

impl From<entlock_storage::StorageError> for CliError {
    fn from(err: entlock_storage::StorageError) -> Self {
        CliError::Storage(err.to_string())
    }
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize result: {}\"}}", e)
            });
            println!("{}", json);
        }
        Err(err) => {
            eprintln!("Error: {}", err.message());
            process::exit(err.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<serde_json::Value, CliError> {
    let store = SqliteStore::open_existing(&cli.db).map_err(|e| {
        CliError::Storage(format!("failed to open database '{}': {}", cli.db, e))
    })?;
    let now = Utc::now();

    match &cli.command {
        Commands::List { all } => {
            let locks: Vec<_> = store
                .list()?
                .into_iter()
                .filter(|record| *all || record.is_valid_at(now))
                .map(|record| {
                    serde_json::json!({
                        "lock": record.info(),
                        "expired": record.is_expired_at(now),
                    })
                })
                .collect();
            Ok(serde_json::json!({ "locks": locks }))
        }
        Commands::Show {
            entity_type,
            entity_id,
        } => {
            let key = LockKey::new(EntityType::new(entity_type.as_str())?, EntityId(*entity_id));
            let lock = store.get(&key)?.map(|record| {
                serde_json::json!({
                    "lock": record.info(),
                    "expired": record.is_expired_at(now),
                })
            });
            Ok(serde_json::json!({ "entity": key.to_string(), "lock": lock }))
        }
        Commands::Release {
            entity_type,
            entity_id,
            token,
        } => {
            let key = LockKey::new(EntityType::new(entity_type.as_str())?, EntityId(*entity_id));
            let token = LockToken::parse(token.as_str())?;
            match store.remove_if_token(&key, &token)? {
                Some(_) => Ok(serde_json::json!({ "released": key.to_string() })),
                None => Err(CliError::Rejected(format!(
                    "lock token does not match the holder of {}",
                    key
                ))),
            }
        }
        Commands::PurgeExpired => {
            let purged: Vec<String> = store
                .purge_expired(now)?
                .into_iter()
                .map(|key| key.to_string())
                .collect();
            Ok(serde_json::json!({ "purged": purged }))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use entlock_core::{lock_ttl, LockRecord, UserId};

    use super::*;

    fn key(id: i64) -> LockKey {
        LockKey::new(EntityType::new("Report").unwrap(), EntityId(id))
    }

    /// A database with a live lock on `Report#1` and an expired one on `Report#2`.
    fn seeded_db() -> (tempfile::TempDir, String, LockRecord) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.db").to_str().unwrap().to_string();
        let store = SqliteStore::new(&path).unwrap();

        let now = Utc::now();
        let live = LockRecord::new(key(1), UserId::new_v4(), "editing", now, lock_ttl());
        let stale = LockRecord::new(
            key(2),
            UserId::new_v4(),
            "abandoned",
            now - lock_ttl() - Duration::minutes(1),
            lock_ttl(),
        );
        store.try_insert(&live, now).unwrap();
        store.try_insert(&stale, now).unwrap();
        (dir, path, live)
    }

    fn run_with(db: &str, args: &[&str]) -> Result<serde_json::Value, CliError> {
        let mut argv = vec!["entlock", "--db", db];
        argv.extend_from_slice(args);
        run(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn list_shows_valid_locks_unless_all() {
        let (_dir, db, live) = seeded_db();

        let out = run_with(&db, &["list"]).unwrap();
        let locks = out["locks"].as_array().unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0]["lock"]["entity_id"], 1);
        assert_eq!(locks[0]["expired"], false);
        assert!(!out.to_string().contains(live.token.as_str()));

        let out = run_with(&db, &["list", "--all"]).unwrap();
        let locks = out["locks"].as_array().unwrap();
        assert_eq!(locks.len(), 2);
        assert_eq!(locks[1]["lock"]["entity_id"], 2);
        assert_eq!(locks[1]["expired"], true);
    }

    #[test]
    fn show_reports_expired_rows() {
        let (_dir, db, _live) = seeded_db();

        let out = run_with(&db, &["show", "Report", "2"]).unwrap();
        assert_eq!(out["entity"], "Report#2");
        assert_eq!(out["lock"]["expired"], true);
        assert_eq!(out["lock"]["lock"]["info"], "abandoned");

        let out = run_with(&db, &["show", "Report", "3"]).unwrap();
        assert!(out["lock"].is_null());
    }

    #[test]
    fn release_requires_the_holder_token() {
        let (_dir, db, live) = seeded_db();

        let err = run_with(&db, &["release", "Report", "1", "--token", "wrong"]).unwrap_err();
        assert!(matches!(err, CliError::Rejected(_)));
        assert_eq!(err.exit_code(), 1);

        let err = run_with(&db, &["show", "no tag", "1"]).unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let out = run_with(&db, &["release", "Report", "1", "--token", live.token.as_str()])
            .unwrap();
        assert_eq!(out["released"], "Report#1");
        let out = run_with(&db, &["list"]).unwrap();
        assert!(out["locks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn purge_expired_keeps_live_locks() {
        let (_dir, db, _live) = seeded_db();

        let out = run_with(&db, &["purge-expired"]).unwrap();
        assert_eq!(out["purged"], serde_json::json!(["Report#2"]));

        let out = run_with(&db, &["list", "--all"]).unwrap();
        assert_eq!(out["locks"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_database_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.db");

        let err = run_with(path.to_str().unwrap(), &["list"]).unwrap_err();
        assert!(matches!(err, CliError::Storage(_)));
        assert_eq!(err.exit_code(), 3);
        assert!(!path.exists());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_release_subcommand() {
        let cli = Cli::try_parse_from([
            "entlock", "--db", "locks.db", "release", "Report", "42", "--token", "abc",
        ])
        .unwrap();
        assert_eq!(cli.db, "locks.db");
        assert!(matches!(
            cli.command,
            Commands::Release { ref entity_type, entity_id: 42, ref token }
                if entity_type == "Report" && token == "abc"
        ));
    }
}
