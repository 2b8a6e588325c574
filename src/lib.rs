//! formwarden: integrity and authorization model for a forms-and-responses store.
//!
//! Scopes own privileges; privileges are granted to users directly or through
//! groups; forms are composed of fields; responses record one user's answer to
//! one field. Everything lives in a single SQLite store.
//!
//! # Guarantees
//!
//! - Identifying values (slug, or email for users) are unique per entity type.
//!   The guard reports a clean `UniquenessViolation` before the write, and a
//!   `UNIQUE` constraint catches whatever races past it.
//! - Passwords are hashed with Argon2id before they reach the store and never
//!   appear in a summary.
//! - Deleting an entity cascades to its dependents and join rows; a write that
//!   references a missing row fails with `ReferentialIntegrityViolation`.
//!
//! # The Thin Waist
//!
//! All store access goes through `DbBroker`, which opens a connection per
//! operation, wraps writes in IMMEDIATE transactions, and appends every
//! operation to `broker.events.jsonl`.
//!
//! # Examples
//!
//! ```bash
//! formwarden init
//! formwarden create scope --json '{"slug":"forms"}'
//! formwarden create user --json '{"email":"ana@example.com","name":"Ana","password":"s3cret"}'
//! formwarden link user <user-id> privileges <privilege-id>
//! formwarden privileges <user-id>
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store, broker, schema, registry, guard, hooks, repository, graph
//! - [`entities`]: the seven entity types and the `Entity` seam

pub mod core;
pub mod entities;

use crate::core::{
    access, broker, config, db, error::WardenError, graph, registry, registry::EntityKind, repo,
    schemas, store::Store,
};
use crate::entities::Record;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "formwarden",
    version = env!("CARGO_PKG_VERSION"),
    about = "Integrity and authorization store for forms, responses and privileges"
)]
struct Cli {
    /// Path to formwarden.toml (defaults to ./formwarden.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct BrokerCli {
    #[clap(subcommand)]
    command: BrokerCommand,
}

#[derive(Subcommand, Debug)]
enum BrokerCommand {
    /// Show the audit log of brokered operations.
    Audit,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store and its tables (idempotent).
    Init,

    /// Print the relational schema and entity relations as JSON.
    Schema,

    /// Audit log access
    Broker(BrokerCli),

    /// Create an entity from a JSON payload.
    Create {
        kind: EntityKind,
        #[clap(long)]
        json: String,
    },

    /// Replace the mutable fields of an existing entity.
    Update {
        kind: EntityKind,
        id: String,
        #[clap(long)]
        json: String,
    },

    /// Show one entity, optionally with named relations loaded.
    Get {
        kind: EntityKind,
        id: String,
        /// Relation to load alongside (repeatable).
        #[clap(long = "with")]
        with: Vec<String>,
    },

    /// List every entity of a kind, ordered by identifying value.
    List { kind: EntityKind },

    /// Delete an entity and everything that cascades from it.
    Delete { kind: EntityKind, id: String },

    /// Add a many-to-many pair.
    Link {
        kind: EntityKind,
        id: String,
        relation: String,
        target: String,
    },

    /// Remove a many-to-many pair.
    Unlink {
        kind: EntityKind,
        id: String,
        relation: String,
        target: String,
    },

    /// Effective privileges of a user (direct and through groups).
    Privileges { user_id: String },
}

fn print_json(value: &serde_json::Value) -> Result<(), WardenError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_payload(kind: EntityKind, raw: &str) -> Result<serde_json::Value, WardenError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| WardenError::Validation(format!("Invalid {} JSON: {}", kind, e)))?;
    if !value.is_object() {
        return Err(WardenError::Validation(format!(
            "{} payload must be a JSON object",
            kind
        )));
    }
    Ok(value)
}

pub fn run() -> Result<(), WardenError> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    let store = config.to_store();
    registry::registry().check()?;

    match cli.command {
        Command::Init => {
            db::initialize_store_db(&store)?;
            println!(
                "{} {}",
                "initialized".bright_green().bold(),
                store.db_path().display()
            );
        }
        Command::Schema => print_json(&schemas::schema())?,
        Command::Broker(broker_cli) => match broker_cli.command {
            BrokerCommand::Audit => {
                let events = broker::read_audit_log(&store)?;
                if events.is_empty() {
                    println!("No audit log found.");
                }
                for ev in events {
                    println!("{}", serde_json::to_string(&ev)?);
                }
            }
        },
        Command::Create { kind, json } => {
            ensure_initialized(&store)?;
            let record = Record::from_json(kind, parse_payload(kind, &json)?)?;
            let created = repo::create_record(&store, record)?;
            print_json(&created.summary())?;
        }
        Command::Update { kind, id, json } => {
            ensure_initialized(&store)?;
            let mut payload = parse_payload(kind, &json)?;
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("id".to_string(), serde_json::Value::String(id));
            }
            let updated = repo::update_record(&store, Record::from_json(kind, payload)?)?;
            print_json(&updated.summary())?;
        }
        Command::Get { kind, id, with } => {
            ensure_initialized(&store)?;
            if with.is_empty() {
                print_json(&repo::get_record(&store, kind, &id)?.summary())?;
            } else {
                let names: Vec<&str> = with.iter().map(String::as_str).collect();
                print_json(&graph::fetch_with(&store, kind, &id, &names)?.summary())?;
            }
        }
        Command::List { kind } => {
            ensure_initialized(&store)?;
            let summaries: Vec<_> = repo::list_records(&store, kind)?
                .iter()
                .map(Record::summary)
                .collect();
            print_json(&serde_json::Value::Array(summaries))?;
        }
        Command::Delete { kind, id } => {
            ensure_initialized(&store)?;
            let report = repo::delete(&store, kind, &id)?;
            print_json(&serde_json::to_value(&report)?)?;
        }
        Command::Link {
            kind,
            id,
            relation,
            target,
        } => {
            ensure_initialized(&store)?;
            if graph::link(&store, kind, &id, &relation, &target)? {
                println!("{} {} {} -> {}", "linked".bright_green(), relation, id, target);
            } else {
                println!("{} {} {} -> {}", "already linked".yellow(), relation, id, target);
            }
        }
        Command::Unlink {
            kind,
            id,
            relation,
            target,
        } => {
            ensure_initialized(&store)?;
            if graph::unlink(&store, kind, &id, &relation, &target)? {
                println!("{} {} {} -> {}", "unlinked".bright_green(), relation, id, target);
            } else {
                println!("{} {} {} -> {}", "not linked".yellow(), relation, id, target);
            }
        }
        Command::Privileges { user_id } => {
            ensure_initialized(&store)?;
            let summaries: Vec<_> = access::effective_privileges(&store, &user_id)?
                .iter()
                .map(entities::Entity::summary)
                .collect();
            print_json(&serde_json::Value::Array(summaries))?;
        }
    }
    Ok(())
}

fn ensure_initialized(store: &Store) -> Result<(), WardenError> {
    if !store.db_path().exists() {
        return Err(WardenError::StoreUnavailable(format!(
            "{} does not exist. Run `formwarden init` first.",
            store.db_path().display()
        )));
    }
    Ok(())
}
