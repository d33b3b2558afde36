use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rundash::aggregate;
use rundash::app::{App, FetchTunables, LoadReport, load_cached};
use rundash::auth::StravaTokenClient;
use rundash::cache;
use rundash::config::ConfigLoader;
use rundash::credentials::Credentials;
use rundash::error::DashError;
use rundash::output::{JsonOutput, format_duration, format_pace};
use rundash::strava::StravaActivityClient;

#[derive(Parser)]
#[command(name = "rundash")]
#[command(about = "Strava activity ETL and reporting (fetch, normalize, cache, aggregate)")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch activities from Strava and rebuild the local cache")]
    Fetch(FetchArgs),
    #[command(about = "Show summary KPIs for the cached table")]
    Stats(ViewArgs),
    #[command(about = "Emit all chart aggregations as JSON")]
    Report(ViewArgs),
    #[command(about = "Export the (filtered) cached table as CSV")]
    Export(ExportArgs),
    #[command(about = "Delete the local activity cache")]
    Clear(CacheArg),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=200))]
    per_page: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=50))]
    max_pages: Option<u32>,

    #[arg(long)]
    cache: Option<String>,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct CacheArg {
    #[arg(long)]
    cache: Option<String>,
}

#[derive(Args)]
struct PeriodArgs {
    #[arg(long)]
    year: Option<i32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
    day: Option<u32>,
}

#[derive(Args)]
struct ViewArgs {
    #[command(flatten)]
    cache: CacheArg,

    #[command(flatten)]
    period: PeriodArgs,
}

#[derive(Args)]
struct ExportArgs {
    output: String,

    #[command(flatten)]
    cache: CacheArg,

    #[command(flatten)]
    period: PeriodArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(dash) = report.downcast_ref::<DashError>() {
            return ExitCode::from(map_exit_code(dash));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DashError) -> u8 {
    match error {
        DashError::MissingCredential(_) | DashError::ConfigRead(_) | DashError::ConfigParse(_) => {
            2
        }
        DashError::TokenHttp(_)
        | DashError::TokenStatus { .. }
        | DashError::TokenMalformed(_)
        | DashError::ActivitiesHttp(_)
        | DashError::ActivitiesStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Stats(args) => run_stats(args),
        Commands::Report(args) => run_report(args),
        Commands::Export(args) => run_export(args),
        Commands::Clear(args) => run_clear(args),
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let settings = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;
    let tunables = FetchTunables {
        per_page: args.per_page.unwrap_or(settings.per_page),
        max_pages: args.max_pages.unwrap_or(settings.max_pages),
    };
    let cache_path =
        Utf8PathBuf::from(args.cache.unwrap_or_else(|| settings.cache_path.clone()));

    let credentials = Credentials::from_env().into_diagnostic()?;
    let token_client = StravaTokenClient::new().into_diagnostic()?;
    let activity_client = StravaActivityClient::new().into_diagnostic()?;
    let mut app = App::new(credentials, token_client, activity_client);

    let report = app.refresh_data(tunables).into_diagnostic()?;
    if !args.no_cache {
        cache::save(&report.rows, &cache_path).into_diagnostic()?;
    }
    JsonOutput::print(&report).into_diagnostic()?;
    Ok(())
}

#[derive(Serialize)]
struct StatsView {
    #[serde(flatten)]
    summary: aggregate::Summary,
    avg_pace: String,
    total_duration: String,
}

fn run_stats(args: ViewArgs) -> miette::Result<()> {
    let rows = load_view(&args)?;
    let summary = aggregate::summary(&rows);
    let view = StatsView {
        avg_pace: format_pace(summary.avg_pace_min_km),
        total_duration: format_duration(summary.total_duration_hours * 60.0),
        summary,
    };
    JsonOutput::print(&view).into_diagnostic()?;
    Ok(())
}

#[derive(Serialize)]
struct ReportView {
    summary: aggregate::Summary,
    cumulative_distance: Vec<aggregate::CumulativePoint>,
    type_distribution: Vec<aggregate::TypeCount>,
    pace_trend: aggregate::PaceTrend,
    monthly_stats: Vec<aggregate::MonthlyStats>,
    category_pace: Vec<aggregate::CategoryPace>,
}

fn run_report(args: ViewArgs) -> miette::Result<()> {
    let rows = load_view(&args)?;
    let view = ReportView {
        summary: aggregate::summary(&rows),
        cumulative_distance: aggregate::cumulative_distance(&rows),
        type_distribution: aggregate::type_distribution(&rows),
        pace_trend: aggregate::pace_trend(&rows),
        monthly_stats: aggregate::monthly_stats(&rows),
        category_pace: aggregate::category_pace(&rows),
    };
    JsonOutput::print(&view).into_diagnostic()?;
    Ok(())
}

fn run_export(args: ExportArgs) -> miette::Result<()> {
    let report = load_report(&args.cache);
    let rows = aggregate::filter_by_period(
        &report.rows,
        args.period.year,
        args.period.month,
        args.period.day,
    );
    let output = Utf8PathBuf::from(args.output);
    cache::save(&rows, &output).into_diagnostic()?;
    eprintln!("exported {} activities to {output}", rows.len());
    Ok(())
}

fn run_clear(args: CacheArg) -> miette::Result<()> {
    let path = cache_path(&args)?;
    if path.as_std_path().exists() {
        std::fs::remove_file(path.as_std_path())
            .map_err(|err| DashError::Filesystem(err.to_string()))
            .into_diagnostic()?;
    }
    Ok(())
}

fn cache_path(args: &CacheArg) -> miette::Result<Utf8PathBuf> {
    match &args.cache {
        Some(path) => Ok(Utf8PathBuf::from(path)),
        None => {
            let settings = ConfigLoader::resolve(None).into_diagnostic()?;
            Ok(Utf8PathBuf::from(settings.cache_path))
        }
    }
}

fn load_report(args: &CacheArg) -> LoadReport {
    let path = match &args.cache {
        Some(path) => Utf8PathBuf::from(path),
        None => ConfigLoader::resolve(None)
            .map(|settings| Utf8PathBuf::from(settings.cache_path))
            .unwrap_or_else(|_| Utf8PathBuf::from(cache::DEFAULT_CACHE_PATH)),
    };
    load_cached(&path)
}

fn load_view(args: &ViewArgs) -> miette::Result<Vec<rundash::model::Activity>> {
    let report = load_report(&args.cache);
    if report.rows.is_empty() {
        eprintln!("no cached data; run `rundash fetch` first");
    }
    Ok(aggregate::filter_by_period(
        &report.rows,
        args.period.year,
        args.period.month,
        args.period.day,
    ))
}
