mod app;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hoenn_core::{CacheBackend, Config};
use hoenn_weather::{Catalog, LocationCategory, ResolutionReport};
use std::path::PathBuf;

use app::App;

#[derive(Debug, Parser)]
#[command(name = "hoenn-map", version)]
#[command(about = "Daily weather for the Hoenn region map")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Draw conditions at random instead of fetching observations
    #[arg(long)]
    offline: bool,

    /// Keep the daily cache in memory only
    #[arg(long)]
    memory_cache: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print today's weather for every location
    Show,
    /// Re-roll the weather at one location
    Reroll {
        /// Location name, e.g. mt-pyre
        name: String,
    },
    /// List the location catalog
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    hoenn_core::init()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if cli.offline {
        config.weather.offline = true;
    }
    if cli.memory_cache {
        config.cache.backend = CacheBackend::Memory;
    }

    let app = App::new(config)?;
    tracing::info!(
        "Hoenn map started (config directory {})",
        app.config().config_dir.display()
    );

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {
            let report = app.initialize().await;
            print_report(app.session().catalog(), &report);
        }
        Command::Reroll { name } => {
            let report = app.initialize().await;
            let before = report.get(&name).map(|r| r.condition);
            let after = app.reroll(&name)?;
            match before {
                Some(before) => println!("{}: {} -> {}", name, before, after),
                None => println!("{}: {}", name, after),
            }
        }
        Command::Catalog => print_catalog(app.session().catalog()),
    }

    app.shutdown();
    Ok(())
}

fn print_report(catalog: &Catalog, report: &ResolutionReport) {
    println!("Hoenn weather for {}", report.day);
    for resolution in &report.resolutions {
        let display = catalog
            .get(&resolution.location)
            .map(|l| l.display_name())
            .unwrap_or_else(|| resolution.location.clone());
        println!(
            "  {:<20} {:<16} {}",
            display,
            resolution.condition.status_label(),
            resolution.source.label()
        );
    }
    if report.fallback_count() > 0 {
        println!("{} locations fell back to their default", report.fallback_count());
    }
}

fn print_catalog(catalog: &Catalog) {
    for category in [
        LocationCategory::MajorCity,
        LocationCategory::Town,
        LocationCategory::Landmark,
    ] {
        println!("{}", category.label());
        for location in catalog.iter().filter(|l| l.category == category) {
            let possible: Vec<&str> = location
                .possible_conditions
                .iter()
                .map(|c| c.as_str())
                .collect();
            println!(
                "  {:<20} default {:<15} allows {}",
                location.display_name(),
                location.default_condition.as_str(),
                possible.join(", ")
            );
        }
    }
}
