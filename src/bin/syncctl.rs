//! Operator CLI for inspecting the Mapping Store.
//!
//! Talks to the same SQLite database the running sync engine writes to, via
//! `SYNC_DB_PATH`, so it can be run alongside a live process without going
//! through the HTTP dispatcher.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use ticket_bridge::db::{create_pool, MappingStore};
use ticket_bridge::error::SyncError;
use ticket_bridge::models::{IssueSyncRecord, SyncStatus};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db_path = env::var("SYNC_DB_PATH").unwrap_or_else(|_| "ticket-bridge.db".to_string());

    let Some(command) = args.get(1) else {
        print_usage(&db_path);
        return ExitCode::FAILURE;
    };

    let pool = match create_pool(Path::new(&db_path)).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("error: failed to open {db_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store = MappingStore::new(pool);

    let result = match command.to_lowercase().as_str() {
        "summary" => run_summary(&store).await,
        "failed" => run_failed(&store).await,
        "conflicts" => run_conflicts(&store).await,
        "record" => match args.get(2) {
            Some(sync_id) => run_record(&store, sync_id).await,
            None => {
                eprintln!("error: sync_id required for 'record' command");
                return ExitCode::FAILURE;
            }
        },
        "all" => run_all(&store).await,
        other => {
            eprintln!("error: unknown command: {other}");
            print_usage(&db_path);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage(db_path: &str) {
    eprintln!("Usage: syncctl <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  summary          Show sync status summary");
    eprintln!("  failed           Show failed sync records");
    eprintln!("  conflicts        Show records requiring manual resolution");
    eprintln!("  record <sync_id> Show one record's details");
    eprintln!("  all              Show the summary and every record");
    eprintln!();
    eprintln!("Environment variables:");
    eprintln!("  SYNC_DB_PATH={db_path}");
}

async fn run_summary(store: &MappingStore) -> Result<(), SyncError> {
    let records = store.scan(None).await?;
    print_summary(&records);
    Ok(())
}

async fn run_failed(store: &MappingStore) -> Result<(), SyncError> {
    let records = store.list_issue_records_by_status(SyncStatus::Failed).await?;
    println!("Found {} failed sync records:\n", records.len());
    for record in &records {
        print_detailed(record);
    }
    Ok(())
}

async fn run_conflicts(store: &MappingStore) -> Result<(), SyncError> {
    let records = store.scan(None).await?;
    let conflicted: Vec<_> = records.into_iter().filter(|r| r.requires_manual_resolution).collect();
    println!("Found {} records with conflicts:\n", conflicted.len());
    for record in &conflicted {
        print_detailed(record);
    }
    Ok(())
}

async fn run_record(store: &MappingStore, sync_id: &str) -> Result<(), SyncError> {
    match store.get_issue_record(sync_id).await? {
        Some(record) => print_detailed(&record),
        None => println!("sync record '{sync_id}' not found"),
    }
    Ok(())
}

async fn run_all(store: &MappingStore) -> Result<(), SyncError> {
    let records = store.scan(None).await?;
    print_summary(&records);
    println!("All sync records:\n");
    for record in &records {
        print_detailed(record);
    }
    Ok(())
}

fn print_summary(records: &[IssueSyncRecord]) {
    let mut status_counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    let mut conflict_count = 0;
    let mut error_count = 0;

    for record in records {
        *status_counts.entry(record.status.clone()).or_insert(0) += 1;
        if record.requires_manual_resolution {
            conflict_count += 1;
        }
        if record.error_count > 0 {
            error_count += 1;
        }
    }

    println!("Sync Status Summary");
    println!("{}", "=".repeat(40));
    println!("Total records: {}", records.len());
    println!("Records with conflicts: {conflict_count}");
    println!("Records with errors: {error_count}");
    println!();
    println!("Status breakdown:");
    for (status, count) in &status_counts {
        println!("  {status}: {count}");
    }
    println!();
}

fn print_detailed(record: &IssueSyncRecord) {
    println!("Sync Record: {}", record.sync_id);
    println!("{}", "-".repeat(50));
    println!("Left Key: {}", record.left_key.as_deref().unwrap_or("N/A"));
    println!("Right Key: {}", record.right_key.as_deref().unwrap_or("N/A"));
    println!("Status: {}", record.status);
    println!("Last Sync: {}", record.last_sync_timestamp);
    println!("Direction: {}", record.last_sync_direction.as_deref().unwrap_or("N/A"));
    println!("Error Count: {}", record.error_count);

    if let Some(err) = &record.last_error {
        println!("Last Error: {err}");
    }
    if record.requires_manual_resolution {
        println!("REQUIRES MANUAL RESOLUTION");
        if let Some(details) = &record.conflict_details {
            println!("Conflict Details: {details}");
        }
    }
    println!();
}
