mod catalog;
mod config;
mod crawler;
mod models;
mod pipeline;
mod storage;
mod utils;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::crawler::registry;
use crate::models::{AnnotationField, AnnotationUpdate, ListingFilters, ReadOptions, Tag};
use crate::pipeline::Pipeline;
use crate::storage::{AnnotationStore, SnapshotStore};

#[derive(Parser)]
#[command(name = "rental-catalog", about = "Florianópolis rental listing aggregator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl every registered provider (or the named ones) and replace their snapshots
    Crawl {
        /// Provider name; repeat to run several
        #[arg(short, long = "provider")]
        provider: Vec<String>,
    },

    /// Merged, annotated listings sorted by total cost
    List(ListArgs),

    /// Set or clear the note, tag or rating of a listing
    Annotate {
        #[arg(long)]
        id: String,
        #[arg(long)]
        note: Option<String>,
        /// Não | Entrar em contato | Agendado | Visitado
        #[arg(long)]
        tag: Option<Tag>,
        /// 1 to 5
        #[arg(long)]
        rating: Option<u8>,
        /// Field to remove; repeatable
        #[arg(long, value_enum)]
        clear: Vec<AnnotationField>,
    },

    /// Distinct filter values over the whole catalog
    Facets,

    /// Show registered providers in registry order
    Providers,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
    /// Ignore filters and paging
    #[arg(long)]
    all: bool,
    #[arg(long)]
    neighborhood: Option<String>,
    #[arg(long)]
    bedrooms: Option<u32>,
    #[arg(long)]
    bathrooms: Option<u32>,
    #[arg(long)]
    parking_spots: Option<u32>,
    /// Minimum area in m²
    #[arg(long)]
    area_sqm: Option<f64>,
    #[arg(long)]
    tag: Option<Tag>,
    #[arg(long)]
    rating: Option<u8>,
    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    fn read_options(&self) -> ReadOptions {
        let filters = ListingFilters {
            neighborhood: self.neighborhood.clone(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            parking_spots: self.parking_spots,
            area_sqm: self.area_sqm,
            tag: self.tag,
            rating: self.rating,
        };
        ReadOptions {
            page: self.page,
            limit: self.limit,
            filters: (filters != ListingFilters::default()).then_some(filters),
            all: self.all,
        }
    }
}

fn open_catalog(config: &AppConfig) -> Catalog {
    Catalog::new(
        SnapshotStore::new(&config.storage.data_dir),
        AnnotationStore::new(config.storage.annotations_path()),
        registry::provider_names(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "rental_catalog=info,warn",
        1 => "rental_catalog=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { provider } => {
            let _t = utils::Timer::start("Crawl");
            if !provider.is_empty() {
                config.pipeline.providers = provider;
            }
            let registrations = registry::build(&config)?;
            let summary = Pipeline::new(&config, registrations).run().await?;

            for report in &summary.reports {
                println!("{}", serde_json::to_string(report)?);
            }
            if summary.has_failures() {
                let failed: Vec<&str> = summary.failures().map(|r| r.name.as_str()).collect();
                bail!("{} provider(s) failed: {}", failed.len(), failed.join(", "));
            }
        }

        Command::List(args) => {
            let page = open_catalog(&config).read_annotated(&args.read_options()).await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!("{} listings", page.total);
                for l in &page.items {
                    println!(
                        "  {:>14}  {:<28} {:<20} {}q {}m²  {}{}",
                        utils::fmt_brl(l.total_value),
                        l.id,
                        l.neighborhood.as_deref().unwrap_or("—"),
                        l.bedrooms.map(|n| n.to_string()).unwrap_or("?".into()),
                        l.area_sqm.map(|a| format!("{a:.0}")).unwrap_or("?".into()),
                        l.listing_url,
                        l.tag.map(|t| format!("  [{t}]")).unwrap_or_default(),
                    );
                }
            }
        }

        Command::Annotate { id, note, tag, rating, clear } => {
            let update = AnnotationUpdate { id, note, tag, rating, clear };
            let stored = open_catalog(&config).write_annotation(&update).await?;
            info!("Annotation for {} saved", update.id);
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }

        Command::Facets => {
            let facets = open_catalog(&config).facets().await;
            println!("{}", serde_json::to_string_pretty(&facets)?);
        }

        Command::Providers => {
            config.pipeline.providers.clear();
            for r in registry::build(&config)? {
                println!("  {:<14} {:<8} {}", r.name(), r.crawler.variant().to_string(), r.policy);
            }
        }
    }

    Ok(())
}
