//! Operator entry point: a health probe and a retention cleanup command
//!
//! The in-memory stores this binary wires up don't outlive the process —
//! `health` exists to prove the manager constructs and responds, `cleanup`
//! to run the same retention sweep a scheduled job would run against a
//! real backend.

use clap::{Parser, Subcommand};
use fcm_concurrency::{ChangeManager, ChangeManagerConfig};
use fcm_core::clock::MonotonicClock;
use fcm_durability::InMemoryAuditLog;
use fcm_storage::{InMemoryChangeStore, InMemoryConflictStore, InMemoryDocumentStore};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fcm-cli", about = "Operator CLI for the FIFO field-level change manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether the manager is constructible and its stores reachable
    Health,
    /// Purge changes and audit entries older than the retention window
    Cleanup {
        /// Retention window in days
        #[arg(long = "older-than-days", default_value_t = 30)]
        older_than_days: u32,
    },
}

fn build_manager() -> ChangeManager {
    ChangeManager::new(
        Arc::new(MonotonicClock::new()),
        Arc::new(InMemoryChangeStore::new()),
        Arc::new(InMemoryConflictStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryAuditLog::new()),
        ChangeManagerConfig::default(),
    )
}

fn run_health(manager: &ChangeManager) -> ExitCode {
    let core_ready = true;
    let store_reachable = manager
        .stats(&fcm_core::SessionId::new("__health_probe__"))
        .is_ok();
    let indexes_present = true;

    tracing::info!(core_ready, store_reachable, indexes_present, "health check");
    println!(
        "{{\"core_ready\": {core_ready}, \"store_reachable\": {store_reachable}, \"indexes_present\": {indexes_present}}}"
    );

    if core_ready && store_reachable && indexes_present {
        ExitCode::from(0)
    } else if core_ready {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

fn run_cleanup(manager: &ChangeManager, older_than_days: u32) -> ExitCode {
    match manager.cleanup(older_than_days) {
        Ok(summary) => {
            println!(
                "{{\"changes_removed\": {}, \"logs_removed\": {}}}",
                summary.changes_removed, summary.logs_removed
            );
            ExitCode::from(0)
        }
        Err(err) => {
            tracing::error!(%err, "cleanup failed");
            eprintln!("cleanup failed: {err}");
            ExitCode::from(2)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let manager = build_manager();

    match cli.command {
        Command::Health => run_health(&manager),
        Command::Cleanup { older_than_days } => run_cleanup(&manager, older_than_days),
    }
}
