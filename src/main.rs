use choropleth::config::AppConfig;
use choropleth::tooltip::{Pointer, RegionIndex, Tooltip};
use choropleth::{data, render, scene, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the choropleth page and SVG
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Show the tooltip for a pointer at map coordinates (x, y)
    Probe {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Serve the generated map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!(config = ?config, "Generating map");
            let app_config = AppConfig::load_from_file(config)?;

            // 1. Load both datasets
            let datasets = data::load_datasets(&app_config.input).await?;

            // 2. Join, scale, boundaries
            let scene = scene::build_scene(&datasets, &app_config)?;

            // 3. Draw
            let files = render::write_outputs(&scene, &app_config)?;
            for file in &files {
                println!("{}", file.display());
            }
            info!(
                regions = scene.regions.len(),
                unmatched = scene.summary.unmatched,
                "Generation complete"
            );
        }
        Commands::Probe { config, x, y } => {
            let app_config = AppConfig::load_from_file(config)?;
            let datasets = data::load_datasets(&app_config.input).await?;
            let scene = scene::build_scene(&datasets, &app_config)?;

            let pointer = Pointer { x: *x, y: *y };
            let index = RegionIndex::new(&scene.regions);
            let mut tooltip = Tooltip::default();
            match index.hit(pointer) {
                Some(region) => {
                    tooltip.enter(region, pointer);
                    let id = region.id.as_ref().map(ToString::to_string).unwrap_or_default();
                    println!("region: {}", id);
                }
                None => println!("region: none"),
            }
            match &tooltip {
                Tooltip::Shown { content, left, top } => {
                    println!("tooltip at ({}, {}): {}", left, top, content.html());
                }
                Tooltip::Hidden => println!("tooltip: hidden"),
            }
        }
        Commands::Serve { config } => {
            info!(config = ?config, "Serving map");
            let app_config = AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
