use anyhow::Context;
use clap::Parser;
use flowmap_etl::api::{build_router, AppState};
use flowmap_etl::config::cli::{AnalyzeArgs, Command, ExportArgs, ServeArgs};
use flowmap_etl::core::analyze::{suggest_scenarios, top_destinations, top_origins};
use flowmap_etl::core::{ConfigProvider, FlowSource};
use flowmap_etl::utils::error::ErrorSeverity;
use flowmap_etl::utils::{logger, validation::Validate};
use flowmap_etl::{
    load_store, CliConfig, CsvFlowSource, ExportEngine, ExportSummary, FlowError, LocalStorage,
    ScenarioSpec, TomlConfig,
};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting flowmap");
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let source = CsvFlowSource::new(config.flows_path(), config.lookup_path())
        .with_columns(config.columns.clone());

    match cli.command {
        Command::Export(args) => export(config, source, args).await,
        Command::Serve(args) => serve(config, source, args).await,
        Command::Analyze(args) => analyze(source, args).await,
    }
}

async fn export(config: TomlConfig, source: CsvFlowSource, args: ExportArgs) -> anyhow::Result<()> {
    let scenarios = config
        .select_scenarios(&args.only)
        .unwrap_or_else(|e| fail(&e));
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.processed_dir().to_string());

    display_export_summary(&config, &scenarios, &output_dir, &args);
    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(&output_dir);
    let engine = ExportEngine::new_with_monitoring(source, storage, scenarios, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            print_final_summary(&summary, &output_dir);
            if !summary.is_complete() {
                // 部分場景失敗：其他檔案已寫出，但以非零退出碼提醒
                std::process::exit(exit_code(ErrorSeverity::Medium));
            }
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

async fn serve(config: TomlConfig, source: CsvFlowSource, args: ServeArgs) -> anyhow::Result<()> {
    // 啟動前必須完成合併；失敗就直接結束，不提供部分資料
    let store = load_store(&source).await.unwrap_or_else(|e| fail(&e));
    let state = AppState::new(Arc::new(store)).with_default_limit(config.default_limit());

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let address = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    tracing::info!("🚀 Serving {} flows on http://{}", state.store.len(), address);
    tracing::info!("📡 GET /flows/<area_code>?direction=incoming&limit={}", state.default_limit);
    tracing::info!("📡 GET /health");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;
    Ok(())
}

#[derive(Serialize)]
struct SuggestedConfig<'a> {
    export: SuggestedExport<'a>,
}

#[derive(Serialize)]
struct SuggestedExport<'a> {
    scenarios: &'a [ScenarioSpec],
}

async fn analyze(source: CsvFlowSource, args: AnalyzeArgs) -> anyhow::Result<()> {
    let flows = source.load_flows().await.unwrap_or_else(|e| fail(&e));
    tracing::info!("🔍 Analyzing {} flow records", flows.len());

    let origins = top_origins(&flows, args.top);
    let destinations = top_destinations(&flows, args.top);

    println!("📊 Top {} origins by total flow:", args.top);
    for area in &origins {
        println!("   {} - {}: {} people", area.code, area.name, area.total);
    }
    println!();
    println!("📊 Top {} destinations by total flow:", args.top);
    for area in &destinations {
        println!("   {} - {}: {} people", area.code, area.name, area.total);
    }

    let scenarios = suggest_scenarios(&origins, &destinations);
    let snippet = toml::to_string(&SuggestedConfig {
        export: SuggestedExport {
            scenarios: &scenarios,
        },
    })
    .context("failed to render suggested scenarios")?;

    println!();
    println!("💡 Suggested scenarios:");
    println!("{}", snippet);
    Ok(())
}

fn display_export_summary(
    config: &TomlConfig,
    scenarios: &[ScenarioSpec],
    output_dir: &str,
    args: &ExportArgs,
) {
    println!("📋 Configuration Summary:");
    println!("  Flows: {}", config.flows_path());
    println!("  Lookup: {}", config.lookup_path());
    println!("  Output: {}", output_dir);
    println!("  Scenarios: {}", scenarios.len());
    for scenario in scenarios {
        let filter = if scenario.filter.is_empty() {
            "none".to_string()
        } else {
            scenario
                .filter
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let region = match &scenario.dest_region {
            Some(region) => format!(", dest_region: {:?}", region),
            None => String::new(),
        };
        println!(
            "    - {} (top {}, filter: {}{})",
            scenario.name, scenario.top_n, filter, region
        );
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn print_final_summary(summary: &ExportSummary, output_dir: &str) {
    println!("✅ FINAL SUMMARY");
    println!(
        "  Joined flows: {} ({} without centroid, {} self-loops)",
        summary.join.joined_flows, summary.join.missing_centroid, summary.join.self_loops
    );
    for artifact in &summary.artifacts {
        println!();
        println!("📁 {}", artifact.name);
        println!("   File: {}/{}", output_dir, artifact.file);
        println!("   Lines: {}", artifact.feature_count);
        println!("   Size: {:.2} MB", artifact.size_bytes as f64 / (1024.0 * 1024.0));
    }
    for failure in &summary.failures {
        println!();
        println!("❌ {}: {}", failure.name, failure.error);
    }
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 部分失敗
        ErrorSeverity::High => 1,     // 輸入或配置錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn fail(e: &FlowError) -> ! {
    tracing::error!(
        "❌ flowmap failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    std::process::exit(exit_code(e.severity()).max(1))
}
