use anyhow::Context;
use clap::{Parser, Subcommand};
use provision_app::Layout;
use provision_db::{MemoryStore, MongoStore};
use provision_kernel::settings::Settings;
use provision_kernel::BootstrapReport;

/// Operator entrypoint for the provisioning procedure.
#[derive(Debug, Parser)]
#[command(name = "provision-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Provision the configured MongoDB deployment
    Run {
        /// Insert seed documents even into collections that already hold data
        #[arg(long)]
        reseed: bool,
    },
    /// Run the procedure against an in-memory store and print the resulting layout
    Plan,
    /// Print the declared layout without touching any store
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load provision settings")?;
    provision_telemetry::init(&settings.telemetry)?;

    tracing::debug!(command = ?cli.command, "provision-cli starting");
    let catalog = provision_app::catalog::fixed()?;

    match cli.command {
        Command::Run { reseed } => {
            settings.bootstrap.reseed |= reseed;
            let store = MongoStore::connect(&settings.database, &settings.admin)
                .await
                .with_context(|| "failed to configure database client")?;
            let report = provision_app::bootstrap(&store, &catalog, &settings.bootstrap)
                .await
                .with_context(|| "database bootstrap failed")?;
            print_report(&report);
        }
        Command::Plan => {
            let store = MemoryStore::new();
            let report = provision_app::bootstrap(&store, &catalog, &settings.bootstrap)
                .await
                .with_context(|| "dry run failed")?;
            let layout = Layout::observe(&store, &catalog)
                .await
                .with_context(|| "failed to read back in-memory layout")?;
            print_report(&report);
            println!();
            print!("{layout}");
        }
        Command::Catalog => {
            print!("{}", Layout::declared(&catalog));
        }
    }

    Ok(())
}

fn print_report(report: &BootstrapReport) {
    let tally = &report.tally;
    println!("phase reached:        {}", report.phase);
    println!(
        "collections:          {} created, {} existing",
        tally.collections_created, tally.collections_existing
    );
    println!(
        "documents inserted:   {} ({} collections already seeded)",
        tally.documents_inserted, tally.collections_already_seeded
    );
    println!(
        "indexes:              {} created, {} existing",
        tally.indexes_created, tally.indexes_existing
    );
    println!(
        "principals:           {} created, {} existing",
        tally.principals_created, tally.principals_existing
    );
}
