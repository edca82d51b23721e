//! Command-line entry points: the API server and the one-shot data tools.

use crate::application::use_cases::ods_export::{OdsExportRequest, DEFAULT_PAGE_SIZE};
use crate::application::use_cases::sitemap_scraper::ScrapeOptions;
use crate::domain::error::{AppError, Result};
use crate::domain::lead::Lead;
use crate::domain::scraped::{PageType, ScrapedLead, ScrapedLeadFilter};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::LeadCsvWriter;
use crate::interfaces::http::{add_log, start_server};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "medleads")]
#[command(version)]
#[command(about = "UK healthcare lead dashboard API and Doctify scraper", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./medleads.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Scrape a Doctify UK sitemap into scraped_leads
    Scrape {
        /// Listing family: practices, specialists, hospitals, pharmacies or carehomes
        #[arg(long = "type", value_name = "TYPE", default_value = "practices")]
        page_type: PageType,
        /// Stop after this many pages
        #[arg(long)]
        limit: Option<usize>,
        /// Only URLs containing this keyword
        #[arg(long, value_name = "KEYWORD")]
        category: Option<String>,
        /// List the URLs without fetching pages or touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Export every active ODS organisation of one role to CSV
    ExportOds {
        /// ODS primary role code, e.g. RO182 (pharmacy) or RO172 (clinic)
        #[arg(long, default_value = "RO182")]
        role: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
        /// Output file (defaults to leads_<role>.csv)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print stored scraped leads and the total count
    Scraped {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

pub async fn execute(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Serve => serve(config).await,
        Commands::Scrape {
            page_type,
            limit,
            category,
            dry_run,
        } => {
            scrape(
                config,
                ScrapeOptions {
                    page_type,
                    limit,
                    category,
                    dry_run,
                },
            )
            .await
        }
        Commands::ExportOds {
            role,
            page_size,
            output,
        } => {
            let output = output.unwrap_or_else(|| default_export_path(&role));
            export_ods(config, OdsExportRequest { role, page_size }, &output).await
        }
        Commands::Scraped { limit } => list_scraped(config, limit).await,
    }
}

async fn serve(config: &AppConfig) -> Result<()> {
    let logs = Arc::new(Mutex::new(Vec::new()));
    let state = bootstrap::build_state(config, &logs).await?;
    let (host, port) = config.bind_address();

    info!(host = %host, port, "Starting HTTP API");
    add_log(&logs, "INFO", "HttpApi", &format!("Listening on {}:{}", host, port));

    start_server(Arc::new(state), logs, (host, port))?
        .await
        .map_err(AppError::from)
}

async fn scrape(config: &AppConfig, options: ScrapeOptions) -> Result<()> {
    println!("Doctify scraper");
    println!("  Type: {}", options.page_type);
    println!(
        "  Limit: {}",
        options
            .limit
            .map(|l| l.to_string())
            .unwrap_or_else(|| "ALL".to_string())
    );
    println!("  Category: {}", options.category.as_deref().unwrap_or("ALL"));
    println!("  Dry run: {}\n", options.dry_run);

    if options.dry_run {
        let scraper = bootstrap::sitemap_scraper(config, None)?;
        let urls = scraper.plan(&options).await?;
        println!("URLs to scrape:");
        for (i, url) in urls.iter().enumerate() {
            println!("  {}. {}", i + 1, url);
        }
        println!("\nTotal: {}", urls.len());
        return Ok(());
    }

    let pool = bootstrap::connect_database(config).await?;
    let scraper = bootstrap::sitemap_scraper(config, bootstrap::scraped_store(pool.as_ref()))?;
    let summary = scraper.run(&options).await?;
    println!(
        "\nDone. Scraped: {}, Failed: {}, Total: {}",
        summary.scraped, summary.failed, summary.total
    );
    Ok(())
}

fn default_export_path(role: &str) -> PathBuf {
    PathBuf::from(format!("leads_{}.csv", role.trim().to_lowercase()))
}

fn write_ods_csv(path: &Path, leads: &[Lead]) -> Result<()> {
    let file = File::create(path)?;
    LeadCsvWriter::new().write_ods(BufWriter::new(file), leads)
}

async fn export_ods(config: &AppConfig, request: OdsExportRequest, output: &Path) -> Result<()> {
    println!("Fetching ODS organisations for role {}...", request.role);
    let leads = bootstrap::ods_export(config)?.execute(&request).await?;

    if leads.is_empty() {
        println!("No data to save for {}.", output.display());
        return Ok(());
    }

    write_ods_csv(output, &leads)?;
    println!("Saved {} records to {}", leads.len(), output.display());
    Ok(())
}

fn describe(row: &ScrapedLead) -> String {
    let dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    [
        format!("  Name:        {}", row.name),
        format!("  Source:      {}", row.source),
        format!("  URL:         {}", row.url),
        format!("  Address:     {}", dash(&row.address)),
        format!("  Postcode:    {}", dash(&row.postcode)),
        format!("  Phone:       {}", dash(&row.phone)),
        format!("  Website:     {}", dash(&row.website)),
        format!("  Categories:  {}", row.categories.join(", ")),
        format!(
            "  Rating:      {}",
            row.rating.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
        ),
    ]
    .join("\n")
}

async fn list_scraped(config: &AppConfig, limit: u32) -> Result<()> {
    let pool = bootstrap::connect_database(config).await?;
    let store = bootstrap::scraped_store(pool.as_ref()).ok_or_else(|| {
        AppError::ConfigError("DATABASE_URL is required to list scraped leads".to_string())
    })?;

    let (rows, total) = store
        .list(&ScrapedLeadFilter {
            limit,
            ..Default::default()
        })
        .await?;

    println!("\n=== SCRAPED LEADS ({} total) ===\n", total);
    for row in &rows {
        println!("{}", "-".repeat(60));
        println!("{}", describe(row));
    }
    Ok(())
}
