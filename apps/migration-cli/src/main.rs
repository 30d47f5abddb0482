mod telemetry;

use boot_migrate::infra::db::{acquire_validated, release, ConnectionHandle, SeaOrmConnectionFactory};
use boot_migrate::{run_migrations_from_env, BootConfig, ConnectionResolver, MigrationError};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use migration::{MigrationInfo, ScriptMigrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Apply pending migrations (honours BOOTMIGRATE_ENABLED)
    Migrate,
    /// Show the state of every known migration
    Info {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check applied migrations against the scripts on disk
    Validate,
    /// Drop everything in the schema (requires BOOTMIGRATE_CLEAN_DISABLED=false)
    Clean,
}

#[derive(Debug, Parser)]
#[command(name = "migration")]
#[command(about = "Database migrations driven by BOOTMIGRATE_* / R2DBC_* environment variables")]
struct Args {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    telemetry::init_tracing(args.json_logs);

    if args.command == Command::Migrate {
        match run_migrations_from_env().await {
            Ok(Some(outcome)) => println!(
                "Applied {} migration(s) in {}ms{}",
                outcome.migrations_applied,
                outcome.elapsed_ms,
                outcome
                    .target_version
                    .map(|v| format!(", schema now at version {v}"))
                    .unwrap_or_default()
            ),
            Ok(None) => println!("Migrations disabled (set BOOTMIGRATE_ENABLED=true to run them)"),
            Err(e) => {
                eprintln!("Migration failed: {e}: {}", e.cause());
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match BootConfig::parse_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = maintenance(&config, args.command).await {
        eprintln!("{} failed: {e}", command_name(args.command));
        std::process::exit(1);
    }
}

fn command_name(command: Command) -> &'static str {
    match command {
        Command::Migrate => "migrate",
        Command::Info { .. } => "info",
        Command::Validate => "validate",
        Command::Clean => "clean",
    }
}

/// Commands that run one engine operation over a single temporary pool.
async fn maintenance(config: &BootConfig, command: Command) -> Result<(), MigrationError> {
    let descriptor = ConnectionResolver::default().resolve(&config.connection)?;
    let factory = SeaOrmConnectionFactory::default();
    let handle = acquire_validated(&factory, &descriptor).await?;

    let engine_config = config.settings.engine_config();
    let db = handle.connection();
    let result = match command {
        Command::Info { json } => ScriptMigrator
            .info(db, &engine_config)
            .await
            .map(|rows| print_info(&rows, json)),
        Command::Validate => ScriptMigrator
            .validate(db, &engine_config)
            .await
            .map(|()| println!("Validation succeeded")),
        Command::Clean => ScriptMigrator
            .clean(db, &engine_config)
            .await
            .map(|dropped| println!("Cleaned: {}", dropped.join(", "))),
        Command::Migrate => Ok(()),
    };

    release(handle).await;
    result.map_err(MigrationError::from)
}

fn print_info(rows: &[MigrationInfo], json: bool) {
    if json {
        match serde_json::to_string_pretty(rows) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("failed to encode migration info: {e}"),
        }
        return;
    }

    println!(
        "{:<10} {:<36} {:<14} Installed on",
        "Version", "Description", "State"
    );
    for row in rows {
        println!(
            "{:<10} {:<36} {:<14} {}",
            row.version,
            row.description,
            format!("{:?}", row.state),
            row.installed_on.as_deref().unwrap_or("")
        );
    }
}
