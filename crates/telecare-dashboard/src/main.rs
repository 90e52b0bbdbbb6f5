//! Telecare admin command line client
//!
//! Mounts the dashboard orchestrator or one of the list tables against the
//! configured API and prints the settled state as JSON.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use telecare_client::{
    AdminApi, ConsultationFilters, DoctorFilters, NotificationFilters, OrderFilters,
    ProductFilters, Searchable, UserFilters, VideoFilters,
};
use telecare_core::{Config, FilterSet};
use telecare_dashboard::resources::{
    Consultations, Doctors, Notifications, Orders, Products, Users, Videos,
};
use telecare_dashboard::{
    CollectingReporter, ListResource, PaginatedList, TrendFilters, TrendsDashboard,
};
use tracing::{info, warn};

/// Command line interface for the Telecare admin API
#[derive(Parser)]
#[command(
    name = "telecare-admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Admin dashboard client for the Telecare platform"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Load the analytics dashboard
    Trends {
        /// Pin every chart to the current month; explicit flags still win
        #[arg(long)]
        current: bool,
        /// Registration chart month (1-12)
        #[arg(long, default_value = "")]
        user_month: String,
        /// Registration chart year
        #[arg(long, default_value = "")]
        user_year: String,
        /// Consultation chart month (1-12)
        #[arg(long, default_value = "")]
        consultation_month: String,
        /// Consultation chart year
        #[arg(long, default_value = "")]
        consultation_year: String,
        /// Product chart month (1-12)
        #[arg(long, default_value = "")]
        product_month: String,
        /// Product chart year
        #[arg(long, default_value = "")]
        product_year: String,
    },

    /// Print one page of an admin table
    List {
        /// Table to list
        #[arg(value_enum)]
        resource: ListKind,
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Rows per page (defaults to the configured page size)
        #[arg(short = 'n', long)]
        limit: Option<u32>,
        /// Free text search, where the table supports it
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a user with their orders, consultations and reports
    User {
        /// User id
        id: String,
    },

    /// Inspect configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Tables reachable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListKind {
    Users,
    Doctors,
    Orders,
    Products,
    Consultations,
    Videos,
    Notifications,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    telecare_core::init_logging(&config.logging)?;

    match cli.command {
        Commands::Trends {
            current,
            user_month,
            user_year,
            consultation_month,
            consultation_year,
            product_month,
            product_year,
        } => {
            let base = if current {
                FilterSet::current()
            } else {
                FilterSet::default()
            };
            let filters = TrendFilters {
                user_registrations: period(&base, user_month, user_year),
                consultations: period(&base, consultation_month, consultation_year),
                product_purchases: period(&base, product_month, product_year),
            };
            show_trends(&config, filters).await
        }
        Commands::List {
            resource,
            page,
            limit,
            search,
        } => show_list(&config, resource, page, limit, search).await,
        Commands::User { id } => show_user(&config, &id).await,
        Commands::Config { show } => {
            if show {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Configuration is valid");
            }
            Ok(())
        }
    }
}

fn period(base: &FilterSet, month: String, year: String) -> FilterSet {
    FilterSet::new(
        if month.is_empty() { base.month.clone() } else { month },
        if year.is_empty() { base.year.clone() } else { year },
    )
}

async fn show_trends(config: &Config, filters: TrendFilters) -> anyhow::Result<()> {
    for filter in [
        &filters.user_registrations,
        &filters.consultations,
        &filters.product_purchases,
    ] {
        filter.validate()?;
    }

    let api = AdminApi::from_config(&config.api)?;
    let reporter = Arc::new(CollectingReporter::new());
    let dashboard = TrendsDashboard::mount(api, reporter.clone(), filters);

    let state = dashboard.wait_idle().await;
    info!("dashboard loaded");
    print_json(&state)?;
    warn_notices(&reporter);
    Ok(())
}

async fn show_list(
    config: &Config,
    kind: ListKind,
    page: u32,
    limit: Option<u32>,
    search: Option<String>,
) -> anyhow::Result<()> {
    let api = AdminApi::from_config(&config.api)?;
    let reporter = Arc::new(CollectingReporter::new());
    let dashboard = &config.dashboard;
    let page_size = limit.unwrap_or(dashboard.default_page_size);

    match kind {
        ListKind::Users => {
            let filters = searched(UserFilters::default(), search);
            print_page::<Users>(api, &reporter, page, page_size, filters).await?;
        }
        ListKind::Doctors => {
            let filters = searched(DoctorFilters::default(), search);
            print_page::<Doctors>(api, &reporter, page, page_size, filters).await?;
        }
        ListKind::Orders => {
            ignore_search(kind, search.as_deref());
            print_page::<Orders>(api, &reporter, page, page_size, OrderFilters::default()).await?;
        }
        ListKind::Products => {
            let filters = searched(ProductFilters::default(), search);
            print_page::<Products>(api, &reporter, page, page_size, filters).await?;
        }
        ListKind::Consultations => {
            let filters = searched(ConsultationFilters::default(), search);
            print_page::<Consultations>(api, &reporter, page, page_size, filters).await?;
        }
        ListKind::Videos => {
            let filters = searched(VideoFilters::default(), search);
            let page_size = limit.unwrap_or(dashboard.video_page_size);
            print_page::<Videos>(api, &reporter, page, page_size, filters).await?;
        }
        ListKind::Notifications => {
            ignore_search(kind, search.as_deref());
            print_page::<Notifications>(api, &reporter, page, page_size, NotificationFilters)
                .await?;
        }
    }

    warn_notices(&reporter);
    Ok(())
}

async fn show_user(config: &Config, id: &str) -> anyhow::Result<()> {
    let api = AdminApi::from_config(&config.api)?;
    let reporter = Arc::new(CollectingReporter::new());
    let users = PaginatedList::<Users>::mount(
        api,
        reporter.clone(),
        config.dashboard.default_page_size,
        UserFilters::default(),
    );
    users.wait_idle().await;

    let detail = users.user_detail(id, &config.dashboard).await;
    warn_notices(&reporter);
    let detail = detail.with_context(|| format!("loading user {id}"))?;
    print_json(&detail)
}

fn searched<F: Searchable>(mut filters: F, search: Option<String>) -> F {
    if let Some(search) = search {
        filters.set_search(search);
    }
    filters
}

fn ignore_search(kind: ListKind, search: Option<&str>) {
    if search.is_some() {
        warn!(resource = ?kind, "this table has no search; --search ignored");
    }
}

async fn print_page<R: ListResource>(
    api: AdminApi,
    reporter: &Arc<CollectingReporter>,
    page: u32,
    page_size: u32,
    filters: R::Filters,
) -> anyhow::Result<()> {
    let list = PaginatedList::<R>::mount_at(api, reporter.clone(), page, page_size, filters);
    let state = list.wait_idle().await;
    print_json(&state)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn_notices(reporter: &CollectingReporter) {
    for notice in reporter.notices() {
        warn!(resource = %notice.resource, "{}", notice.message);
    }
}
