use clap::{Parser, Subcommand};
use sku_waterfall::core::waterfall::{FIXED_SCENARIO_COHORTS, FIXED_SCENARIO_SKU};
use sku_waterfall::domain::model::{ScenarioRequest, WaterfallReport};
use sku_waterfall::domain::ports::{ConfigProvider, SkuCatalog};
use sku_waterfall::utils::currency::format_currency;
use sku_waterfall::utils::error::{ErrorSeverity, Result};
use sku_waterfall::utils::{logger, validation::Validate};
use sku_waterfall::{CliConfig, LocalStorage, ReportExporter, TomlConfig, WaterfallEngine};
use std::path::Path;

const SUMMARY_MONTHS: usize = 12;

#[derive(Parser)]
#[command(name = "sku-waterfall")]
#[command(about = "Monthly revenue, COGS and gross profit waterfall for SKU cohorts")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "waterfall.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show the plan without querying the catalog
    #[arg(long, global = true)]
    dry_run: bool,

    /// Emit JSON logs regardless of the config file
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    overrides: CliConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the built-in R10 scenario
    Fixed,
    /// Run a scenario described by a JSON request file
    Dynamic {
        #[arg(short, long)]
        request: String,
    },
    /// List revenue and COGS SKUs
    Skus,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置；檔案不存在時只用命令列參數
    let config_exists = Path::new(&args.config).exists();
    let mut config = if config_exists {
        match TomlConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        }
    } else {
        TomlConfig::default()
    };

    // 初始化日誌
    if args.json_logs || config.json_logging() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting sku-waterfall");
    if config_exists {
        tracing::info!("📁 Loaded configuration from: {}", args.config);
    } else {
        tracing::info!("📁 No config file at {}, using command-line settings", args.config);
    }

    // 應用命令列覆蓋設定
    config.apply_overrides(&args.overrides);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    match run(&args, config).await {
        Ok(Some(output_path)) => {
            tracing::info!("✅ Waterfall completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ Waterfall failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 上游錯誤，可重試
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

/// Returns the exported report path, or `None` when nothing was written.
async fn run(args: &Args, config: TomlConfig) -> Result<Option<String>> {
    let request = match &args.command {
        Command::Dynamic { request } => Some(load_request(request, &config)?),
        _ => None,
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No catalog queries will be made");
        perform_dry_run(&args.command, request.as_ref(), &config);
        return Ok(None);
    }

    let catalog = config.build_catalog()?;
    tracing::info!("📡 Using {} catalog", catalog.kind());
    let engine = WaterfallEngine::new(catalog).with_concurrency(config.concurrent_requests());

    let report = match (&args.command, request) {
        (Command::Skus, _) => {
            list_skus(engine.catalog()).await?;
            return Ok(None);
        }
        (Command::Dynamic { .. }, Some(request)) => engine.run_dynamic_scenario(&request).await?,
        _ => engine.run_fixed_scenario().await?,
    };

    print_summary(&report);

    let storage = LocalStorage::new(config.output_path().to_string());
    let exporter = ReportExporter::new(storage, config);
    let output_path = exporter.export(&report).await?;

    Ok(Some(output_path))
}

fn load_request(path: &str, config: &TomlConfig) -> Result<ScenarioRequest> {
    tracing::info!("📄 Loading scenario request from: {}", path);
    let content = std::fs::read_to_string(path)?;
    let mut request: ScenarioRequest = serde_json::from_str(&content)?;

    if request.horizon.is_none() {
        request.horizon = config.scenario.as_ref().and_then(|s| s.horizon);
    }
    if let Some(name) = config.scenario_name().filter(|_| request.name.is_empty()) {
        request.name = name.to_string();
    }

    request.validate()?;
    Ok(request)
}

async fn list_skus<C: SkuCatalog>(catalog: &C) -> Result<()> {
    let revenue_skus = catalog.list_revenue_skus().await?;
    let cogs_skus = catalog.list_cogs_skus().await?;

    println!("📦 Revenue SKUs ({}):", revenue_skus.len());
    for sku in &revenue_skus {
        if let Err(e) = sku.validate() {
            tracing::warn!("⚠️ {}", e);
        }
        println!(
            "  {:<8} {:<40} deposit {:>14} monthly {:>12} COGS {}",
            sku.sku_id,
            sku.sku_name,
            format_currency(sku.upfront_deposit),
            format_currency(sku.monthly_revenue),
            sku.cogs_sku_id.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!("🧾 COGS SKUs ({}):", cogs_skus.len());
    for sku in &cogs_skus {
        println!("  {:<8} {}", sku.sku_id, sku.sku_name);
    }

    Ok(())
}

fn print_summary(report: &WaterfallReport) {
    println!();
    println!("📊 {} ({} months)", report.scenario_name, report.horizon);
    println!(
        "  {:>5} {:>16} {:>16} {:>16} {:>9} {:>18}",
        "Month", "Revenue", "COGS", "Gross income", "Margin", "Cumulative"
    );

    let rows = report
        .monthly_details
        .iter()
        .zip(&report.monthly_cogs_details)
        .zip(&report.monthly_gross_income_details)
        .zip(&report.monthly_profit_margin_details)
        .zip(&report.monthly_cumulative_gross_profit_details)
        .take(SUMMARY_MONTHS);

    for ((((revenue, cogs), gross), margin), cumulative) in rows {
        println!(
            "  {:>5} {:>16} {:>16} {:>16} {:>9} {:>18}",
            revenue.month,
            revenue.formatted_total,
            cogs.formatted_total,
            gross.formatted_total,
            margin.formatted_margin,
            cumulative.formatted_total
        );
    }

    if report.monthly_details.len() > SUMMARY_MONTHS {
        println!("  ... {} more months in the exported report", report.monthly_details.len() - SUMMARY_MONTHS);
    }
    println!();
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Catalog: {} ({})", config.catalog.r#type, config.catalog_endpoint());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));

    if let Some(archive) = config.archive_name() {
        println!("  Archive: {}", archive);
    }

    println!("  Concurrent Requests: {}", config.concurrent_requests());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(command: &Command, request: Option<&ScenarioRequest>, config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    match (command, request) {
        (Command::Fixed, _) => {
            println!("⚙️ Fixed scenario for {} over 36 months", FIXED_SCENARIO_SKU);
            for (start_month, quantity) in FIXED_SCENARIO_COHORTS {
                println!("  cohort: month {:>2}, quantity {}", start_month, quantity);
            }
        }
        (Command::Dynamic { .. }, Some(request)) => {
            println!("⚙️ Scenario '{}' over {} months", request.name, request.horizon());
            for item in &request.skus {
                println!(
                    "  {} from month {}: quantity {} ({:?} growth {})",
                    item.sku_id,
                    item.start_month,
                    item.quantity,
                    item.growth_type,
                    item.growth_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        _ => println!("⚙️ List revenue and COGS SKUs"),
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(archive) = config.archive_name() {
        println!("  Compression: {} (ZIP)", archive);
    }

    println!();
    println!("✅ Dry run analysis complete.");
}
