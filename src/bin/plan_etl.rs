use clap::Parser;
use sam_etl::config::plan_config::PlanConfig;
use sam_etl::core::plan::{PlanReport, PlanRunner};
use sam_etl::domain::model::notice_type_label;
use sam_etl::utils::error::ErrorSeverity;
use sam_etl::utils::{logger, validation::Validate};
use sam_etl::LocalStorage;

#[derive(Parser)]
#[command(name = "plan-etl")]
#[command(about = "Run a TOML plan of SAM.gov opportunity searches")]
struct Args {
    /// Path to the plan file
    #[arg(short, long, default_value = "sam-plan.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the monitoring setting from the plan
    #[arg(long)]
    monitor: Option<bool>,

    /// Show what would be searched without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting plan-etl");
    tracing::info!("📁 Loading plan from: {}", args.config);

    let config = match PlanConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load plan file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Plan validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    tracing::info!("✅ Plan loaded and validated successfully");
    display_plan_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no API calls will be made");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output.path.clone());
    let runner = PlanRunner::new_with_monitoring(storage, config, monitor_enabled);

    match runner.execute_all().await {
        Ok(report) => {
            display_report(&report);
        }
        Err(e) => {
            tracing::error!(
                "❌ Plan run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_plan_summary(config: &PlanConfig, args: &Args) {
    println!("📋 Plan Summary:");
    println!("  Plan: {} v{}", config.plan.name, config.plan.version);
    println!("  Endpoint: {}", config.endpoint());
    println!(
        "  Searches: {} ({} enabled)",
        config.searches.len(),
        config.searches.iter().filter(|s| s.is_enabled()).count()
    );
    println!("  Output: {}", config.output.path);
    println!("  Formats: {}", config.output_formats().join(", "));

    if config.compression_enabled() {
        println!("  Compression: enabled");
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &PlanConfig) {
    println!("🔍 Dry Run Analysis:");

    for (index, search) in config.searches.iter().enumerate() {
        let query = search.query();
        let status = if search.is_enabled() { "" } else { " (disabled)" };

        println!();
        println!("  [{}] {}{}", index + 1, search.label, status);
        if let Some(keyword) = &query.keyword {
            println!("      Keyword: {}", keyword);
        }
        if let Some(naics) = &query.naics_code {
            println!("      NAICS: {}", naics);
        }
        if let Some(set_aside) = &query.set_aside {
            println!("      Set-aside: {}", set_aside);
        }
        if let Some(notice_type) = &query.notice_type {
            println!(
                "      Notice type: {} ({})",
                notice_type,
                notice_type_label(notice_type).unwrap_or("unknown")
            );
        }
        println!("      Posted: {} - {}", query.posted_from, query.posted_to);
        println!("      Max results: {}", search.record_limit());
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output.path);
    println!("  Formats: {}", config.output_formats().join(", "));
    println!("  Combined export: {}_<timestamp>.csv", config.combined_stem());

    if let Some(compression) = &config.output.compression {
        if compression.enabled {
            println!("  Bundle: {} (ZIP)", compression.filename);
        }
    }

    println!();
    println!("✅ Dry run analysis complete. No API calls were made.");
}

fn display_report(report: &PlanReport) {
    println!();
    println!("{}", "=".repeat(60));
    println!("📋 Plan Results:");

    for outcome in &report.outcomes {
        match &outcome.error {
            Some(error) => {
                println!("  ❌ {} - failed: {}", outcome.label, error);
            }
            None => {
                println!(
                    "  ✅ {} - {} fetched, {} rows -> {}",
                    outcome.label,
                    outcome.fetched,
                    outcome.rows_written,
                    outcome.files.join(", ")
                );
            }
        }
    }

    println!("{}", "=".repeat(60));
    match &report.combined_file {
        Some(file) => {
            println!(
                "✅ TOTAL: {} unique opportunities saved to {} ({} cross-search duplicates dropped)",
                report.combined_rows, file, report.combined_duplicates_dropped
            );
        }
        None => {
            println!("No opportunities found.");
        }
    }

    if let Some(archive) = &report.archive_file {
        println!("📦 Bundle: {}", archive);
    }
}
