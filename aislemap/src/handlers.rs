use aislemap_core::classify::{CAPTURE_HINT_KEYWORDS, DomainFilter, KeywordMatcher, classify};
use aislemap_core::download::{
    ApiConfig, Coordinates, HttpFetcher, MapDocument, MapFetcher, MapRequest, PlaceholderFetcher,
    default_headers, download_map, load_api_config, parse_header, resolve_store, save_map,
};
use aislemap_core::ingest::{CaptureFormat, load_capture};
use aislemap_core::layout::{DataLayout, ensure_dir};
use aislemap_core::report::{
    AnalysisReport, generate_domain_breakdown, generate_endpoint_table, generate_example_detail,
    save_report,
};
use aislemap_core::session::{CaptureSession, FlowClient, default_session_name};
use aislemap_probe::{CheckStatus, SetupConfig, SetupReport, SystemRunner, is_port_open};
use aislemap_probe::port::DEFAULT_PROBE_TIMEOUT;
use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

// Helper functions shared by the handlers

/// Expand `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn data_layout(args: &ArgMatches) -> DataLayout {
    let raw = args
        .get_one::<String>("data-dir")
        .map(String::as_str)
        .unwrap_or(aislemap_core::layout::DEFAULT_DATA_DIR);
    DataLayout::new(expand_path(raw))
}

/// Custom keyword list when given, otherwise the default set
pub fn keyword_matcher(keywords: Option<Vec<String>>) -> KeywordMatcher {
    match keywords {
        Some(keywords) if !keywords.is_empty() => KeywordMatcher::new(keywords),
        _ => KeywordMatcher::default(),
    }
}

/// Default headers with `Name: Value` overrides applied on top
pub fn request_headers(overrides: &[String]) -> aislemap_core::Result<BTreeMap<String, String>> {
    let mut headers = default_headers();
    for raw in overrides {
        let (name, value) = parse_header(raw)?;
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        headers.insert(name, value);
    }
    Ok(headers)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_title(title: &str) {
    print_divider();
    println!("{}", format!("  {}", title).bright_white().bold());
    print_divider();
    println!();
}

fn print_step(msg: &str) {
    println!("{}", msg.cyan());
}

fn print_ok(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

fn print_fail(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg.red());
}

fn print_warn(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg.yellow());
}

fn print_next_steps(steps: &[&str]) {
    println!("\n{}", "Next steps:".yellow());
    for (idx, step) in steps.iter().enumerate() {
        println!("{}. {}", idx + 1, step);
    }
    println!();
}

fn setup_config(args: &ArgMatches) -> SetupConfig {
    let defaults = SetupConfig::default();
    SetupConfig {
        proxy_host: args
            .get_one::<String>("proxy-host")
            .cloned()
            .unwrap_or(defaults.proxy_host),
        proxy_port: args
            .get_one::<u16>("proxy-port")
            .copied()
            .unwrap_or(defaults.proxy_port),
        web_port: args
            .get_one::<u16>("web-port")
            .copied()
            .unwrap_or(defaults.web_port),
        package: args
            .try_get_one::<String>("package")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or(defaults.package),
        port_timeout: DEFAULT_PROBE_TIMEOUT,
    }
}

// ============================================================================
// verify
// ============================================================================

pub fn render_setup_report(report: &SetupReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Setup Status".bold()));
    out.push_str(&format!(
        "{:<26}{:<18}{}\n",
        "Component", "Status", "Details"
    ));
    out.push_str(&format!("{}\n", "─".repeat(80)));

    for check in &report.checks {
        let status = format!("{:<18}", format!("{} {}", check.status.symbol(), check.label));
        let status = match check.status {
            CheckStatus::Pass => status.green(),
            CheckStatus::Fail => status.red(),
            CheckStatus::Warn | CheckStatus::Unknown => status.yellow(),
        };
        out.push_str(&format!(
            "{}{}{}\n",
            format!("{:<26}", check.component).cyan(),
            status,
            check.details
        ));
    }
    out
}

pub fn handle_verify(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    print_title("SETUP VERIFICATION");

    let config = setup_config(args);
    debug!("Setup config: {:?}", config);
    let report = aislemap_probe::run_setup_checks(&config, &SystemRunner);

    print!("{}", render_setup_report(&report));
    println!();

    if report.all_passed() {
        println!(
            "{}",
            "✓ All checks passed! Ready to capture API traffic."
                .green()
                .bold()
        );
        print_next_steps(&[
            "Open the app in the emulator",
            "Spoof GPS to a store location",
            "Trigger the app's store mode",
            "Run: aislemap capture",
        ]);
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            format!("⚠ {}/{} checks passed", report.passed(), report.total())
                .yellow()
                .bold()
        );
        println!("\n{}", "Action required:".cyan());
        println!("Review the ✗ items above and complete setup.\n");
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// capture
// ============================================================================

/// Options for a capture session
pub struct CaptureOptions {
    pub output_name: String,
    pub captured_dir: PathBuf,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub web_port: u16,
    pub poll: bool,
    pub interval: Duration,
    pub web_token: Option<String>,
}

fn print_capture_instructions(options: &CaptureOptions) {
    println!("{}\n", "📋 Manual Capture Instructions:".cyan());
    println!(
        "1. Open mitmweb UI: {}",
        format!("http://{}:{}", options.proxy_host, options.web_port).bright_white()
    );
    println!("2. In the app on the emulator:");
    println!("   - Navigate to a store location (GPS spoofed)");
    println!("   - Trigger the store mode feature");
    println!("   - Browse products and aisles");
    println!("   - Use navigation features");
    println!("\n3. In mitmweb UI, look for API calls containing:");
    for pattern in CAPTURE_HINT_KEYWORDS {
        println!("   • {}", pattern.yellow());
    }
    println!("\n4. In mitmweb, you can:");
    println!("   • Click on requests to see details");
    println!("   • Use 'f' to filter (e.g., '~u store' for URLs with 'store')");
    println!("\n5. Export captured traffic:");
    println!("   • File → Export → HAR format");

    println!("\n{}\n", "💡 What to look for:".cyan());
    println!("API endpoints that might contain store map data:");
    println!("  • {} /api/stores/{{id}}/layout", "GET".green());
    println!("  • {} /api/stores/{{id}}/map", "GET".green());
    println!("  • {} /api/navigation/...", "GET".green());
    println!("  • {} /api/stores/nearby", "POST".green());
    println!("  • Any endpoints with 'floor', 'aisle', 'section', 'zone'");
}

pub async fn handle_capture(args: &ArgMatches, layout: &DataLayout) -> anyhow::Result<ExitCode> {
    let config = setup_config(args);
    let options = CaptureOptions {
        output_name: args
            .get_one::<String>("output")
            .cloned()
            .unwrap_or_else(|| default_session_name(chrono::Local::now())),
        captured_dir: layout.captured(),
        proxy_host: config.proxy_host,
        proxy_port: config.proxy_port,
        web_port: config.web_port,
        poll: args.get_flag("poll"),
        interval: Duration::from_secs(*args.get_one::<u64>("interval").unwrap_or(&2)),
        web_token: args.get_one::<String>("web-token").cloned(),
    };

    print_title("TRAFFIC CAPTURE");

    if !is_port_open(&options.proxy_host, options.proxy_port, DEFAULT_PROBE_TIMEOUT) {
        print_fail(&format!(
            "mitmproxy is not running on port {}",
            options.proxy_port
        ));
        println!("\nStart mitmproxy first:");
        println!(
            "{}\n",
            format!(
                "  mitmweb --listen-port {} --web-port {}",
                options.proxy_port, options.web_port
            )
            .yellow()
        );
        return Ok(ExitCode::FAILURE);
    }
    print_ok(&format!("mitmproxy detected on port {}\n", options.proxy_port));

    print_capture_instructions(&options);

    ensure_dir(&options.captured_dir)
        .with_context(|| format!("creating {}", options.captured_dir.display()))?;
    let output_path = options.captured_dir.join(&options.output_name);
    let display_path = std::path::absolute(&output_path).unwrap_or_else(|_| output_path.clone());
    println!("\n{}", "📁 Recommended export location:".cyan());
    println!("  {}", display_path.display().to_string().bright_white());
    println!("\n{}", "Once you've captured traffic, analyze it with:".yellow());
    println!("  aislemap analyze {}", output_path.display());
    println!("\n{}\n", "Press Ctrl+C when done capturing".dimmed());

    let session = run_capture_loop(&options).await?;

    println!("\n{}", "Capture session ended.".cyan());
    if !session.is_empty() {
        let saved = session
            .save(&options.captured_dir, &options.output_name)
            .context("saving captured requests")?;
        print_ok(&format!(
            "Saved {} requests ({} interesting) to {}",
            session.total(),
            session.interesting(),
            saved.display()
        ));
    }

    print_next_steps(&[
        "Export captured traffic from mitmweb to data/captured/ (unless saved above)",
        "Run `aislemap analyze <capture>` to find store map endpoints",
        "Run `aislemap download --store-id <ID>` to fetch the map",
    ]);
    Ok(ExitCode::SUCCESS)
}

/// Wait for Ctrl+C, polling mitmweb in the meantime when asked to
async fn run_capture_loop(options: &CaptureOptions) -> anyhow::Result<CaptureSession> {
    let mut session = CaptureSession::new(KeywordMatcher::new(CAPTURE_HINT_KEYWORDS));
    let pb = spinner("🎯 Monitoring... press Ctrl+C to stop");

    let client = if options.poll {
        Some(
            FlowClient::new(&options.proxy_host, options.web_port)?
                .with_token(options.web_token.clone()),
        )
    } else {
        None
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(options.interval);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("listening for Ctrl+C")?;
                break;
            }
            _ = ticker.tick(), if client.is_some() => {
                let Some(ref client) = client else { break };
                match client.fetch_flows().await {
                    Ok(flows) => {
                        let added = session.ingest_flows(&flows);
                        debug!("Buffered {} new flows", added);
                        pb.set_message(format!(
                            "🎯 Monitoring... {} requests, {} interesting (Ctrl+C to stop)",
                            session.total(),
                            session.interesting()
                        ));
                    }
                    Err(e) => {
                        warn!("Polling mitmweb failed: {}", e);
                        pb.set_message(format!("⚠ Polling mitmweb failed: {} (Ctrl+C to stop)", e));
                    }
                }
            }
        }
    }

    pb.finish_and_clear();
    Ok(session)
}

// ============================================================================
// analyze
// ============================================================================

/// Options for analyzing one capture file
pub struct AnalyzeOptions {
    pub capture_file: PathBuf,
    pub output_dir: PathBuf,
    pub matcher: KeywordMatcher,
    pub domain_filter: Option<DomainFilter>,
}

pub struct AnalysisOutcome {
    pub format: CaptureFormat,
    pub report: AnalysisReport,
    pub report_path: PathBuf,
}

/// Ingest, classify and write the report. Nothing is written when ingestion fails.
pub fn run_analysis(options: &AnalyzeOptions) -> aislemap_core::Result<AnalysisOutcome> {
    let capture = load_capture(&options.capture_file)?;
    let endpoints = classify(
        &capture.requests,
        &options.matcher,
        options.domain_filter.as_ref(),
    );
    let report = AnalysisReport::new(&capture.path, &capture.requests, endpoints);
    let report_path = save_report(&report, &capture.path, &options.output_dir)?;

    Ok(AnalysisOutcome {
        format: capture.format,
        report,
        report_path,
    })
}

pub fn handle_analyze(args: &ArgMatches, layout: &DataLayout) -> anyhow::Result<ExitCode> {
    let capture_file = args
        .get_one::<PathBuf>("CAPTURE_FILE")
        .context("missing capture file argument")?;
    let keywords = args
        .get_many::<String>("keyword")
        .map(|values| values.cloned().collect::<Vec<_>>());

    let options = AnalyzeOptions {
        capture_file: expand_path(&capture_file.to_string_lossy()),
        output_dir: layout.analyzed(),
        matcher: keyword_matcher(keywords),
        domain_filter: args.get_one::<String>("domain").map(|d| DomainFilter::new(d)),
    };

    print_title("TRAFFIC ANALYZER");

    let outcome = run_analysis(&options)?;
    let report = &outcome.report;

    print_ok(&format!(
        "Loaded {} requests ({})",
        report.total_requests,
        outcome.format.as_str()
    ));
    println!("\n{}\n", "🔍 Analyzing traffic...".cyan());
    print!("{}", generate_domain_breakdown(report));
    println!();

    if report.interesting_endpoints.is_empty() {
        print_warn("No store map-related endpoints found\n");
        println!("This could mean:");
        println!("  • Store mode was not triggered in the app");
        println!("  • Map data is loaded differently than expected");
        println!("  • Need to capture more interactions");
        if options.domain_filter.is_some() {
            println!("  • The --domain filter excluded the relevant hosts");
        }
        println!();
    } else {
        print_ok(&format!(
            "Found {} interesting endpoints\n",
            report.interesting_count
        ));
        print!("{}", generate_endpoint_table(&report.interesting_endpoints));
        println!();
        print!("{}", generate_example_detail(&report.interesting_endpoints[0]));
        println!();
    }

    print_ok(&format!(
        "Detailed findings saved to: {}",
        outcome.report_path.display()
    ));

    let review = format!("Review identified endpoints in {}", options.output_dir.display());
    print_next_steps(&[
        review.as_str(),
        "Test endpoints with authentication",
        "Run `aislemap download --store-id <ID>` to extract map data",
    ]);
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// download
// ============================================================================

/// Options for a map download
pub struct DownloadOptions {
    pub store_id: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub analysis_dir: PathBuf,
    pub output_dir: PathBuf,
    pub endpoint: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub show_progress: bool,
}

async fn fetch_and_save<F: MapFetcher>(
    fetcher: &F,
    store_id: &str,
    api: &ApiConfig,
    options: &DownloadOptions,
) -> aislemap_core::Result<PathBuf> {
    let request = MapRequest {
        store_id: store_id.to_string(),
        headers: options.headers.clone(),
    };

    print_step(&format!("\n📍 Downloading map for store: {}", store_id));
    let payload = download_map(fetcher, &request, options.show_progress).await?;
    let document = MapDocument::new(store_id, api, fetcher.describe(), payload);

    print_step("\nStep 4: Saving map data...");
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    save_map(&document, &options.output_dir, &timestamp)
}

/// Steps 1-4 of a download; returns the saved map path
pub async fn run_download(options: &DownloadOptions) -> aislemap_core::Result<PathBuf> {
    if options.store_id.is_none() && options.coordinates.is_none() {
        return Err(aislemap_core::Error::NoTarget(
            "must provide either --store-id or --coordinates".to_string(),
        ));
    }

    print_step("Step 1: Loading API configuration...");
    let api = load_api_config(&options.analysis_dir)?;
    print_ok(&format!("Found API base: {}", api.api_base));
    println!(
        "  {} from {}",
        api.example_endpoint.url.bright_white(),
        api.analysis_file.display()
    );

    print_step("\nStep 2: Configuring request headers...");
    print_ok(&format!("{} headers configured", options.headers.len()));

    let store_id = resolve_store(options.store_id.as_deref(), options.coordinates)?;

    print_step("\nStep 3: Downloading store map...");
    match options.endpoint {
        Some(ref template) => {
            let fetcher = HttpFetcher::new(template)?;
            fetch_and_save(&fetcher, &store_id, &api, options).await
        }
        None => {
            print_warn("No --endpoint given; writing placeholder map data");
            fetch_and_save(&PlaceholderFetcher, &store_id, &api, options).await
        }
    }
}

/// Coordinates only matter without a store ID, so they are not parsed otherwise
pub fn coordinates_arg(
    store_id: Option<&str>,
    raw: Option<&str>,
) -> aislemap_core::Result<Option<Coordinates>> {
    if store_id.is_some_and(|id| !id.trim().is_empty()) {
        return Ok(None);
    }
    raw.map(str::parse::<Coordinates>).transpose()
}

pub async fn handle_download(args: &ArgMatches, layout: &DataLayout) -> anyhow::Result<ExitCode> {
    print_title("STORE MAP DOWNLOADER");

    let store_id = args.get_one::<String>("store-id").cloned();
    let coordinates = coordinates_arg(
        store_id.as_deref(),
        args.get_one::<String>("coordinates").map(String::as_str),
    )?;
    let header_args: Vec<String> = args
        .get_many::<String>("header")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let options = DownloadOptions {
        store_id,
        coordinates,
        analysis_dir: layout.analyzed(),
        output_dir: args
            .get_one::<String>("output-dir")
            .map(|dir| expand_path(dir))
            .unwrap_or_else(|| layout.maps()),
        endpoint: args.get_one::<String>("endpoint").cloned(),
        headers: request_headers(&header_args)?,
        show_progress: true,
    };

    let saved = run_download(&options).await?;

    println!();
    print_ok(&format!("Map saved to: {}", saved.display()));
    println!("\n{}\n", "✓ Store map download complete!".green().bold());
    Ok(ExitCode::SUCCESS)
}

/// Print an error with its remediation hint
pub fn report_error(error: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), format!("{:#}", error).red());
    if let Some(core) = error.downcast_ref::<aislemap_core::Error>()
        && let Some(hint) = core.hint()
    {
        eprintln!("{} {}", "→".blue(), hint);
    }
}
