// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Vainu - Web Reconnaissance & Vulnerability Discovery
 * Standalone CLI: passive fingerprint pass, optional active pass,
 * template-driven vulnerability checking
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use vainu_scanner::config::WebscanOptions;
use vainu_scanner::nuclei::{self, NucleiCli, NucleiOption};
use vainu_scanner::observer::{EventSink, LogSink, ProgressKind};
use vainu_scanner::types::{CancelFlag, InfoResult, VulnerabilityInfo};
use vainu_scanner::webscan::FingerScanner;

/// Vainu - Web Reconnaissance & Vulnerability Discovery
#[derive(Parser)]
#[command(name = "vainu")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "1.2.0")]
#[command(about = "Fingerprint web stacks, then hit them with the right templates.", long_about = None)]
struct Cli {
    /// Target URL(s) or host:port pair(s)
    #[arg(required_unless_present = "target_file")]
    targets: Vec<String>,

    /// File with one target per line
    #[arg(short = 'f', long)]
    target_file: Option<PathBuf>,

    /// Worker pool width for both fingerprint passes
    #[arg(short = 'n', long, default_value = "50")]
    threads: usize,

    /// Run the active fingerprint pass after the passive pass
    #[arg(long)]
    deep_scan: bool,

    /// Anchor active probes at scheme://host instead of the full URL
    #[arg(long)]
    root_path: bool,

    /// Extra request header, "Key: Value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Outbound HTTP proxy URL
    #[arg(long, default_value = "")]
    proxy: String,

    /// Tag every alive target for log4j2 template checks
    #[arg(long)]
    generate_log4j2: bool,

    /// Template directory (repeatable)
    #[arg(short = 't', long = "template-dir")]
    template_dirs: Vec<PathBuf>,

    /// Explicit template file, bypasses tag filtering (repeatable)
    #[arg(long = "template-file")]
    template_files: Vec<PathBuf>,

    /// Custom tag overriding detected fingerprints (repeatable)
    #[arg(long = "tag")]
    custom_tags: Vec<String>,

    /// Skip targets that matched no fingerprint
    #[arg(long, default_value = "true")]
    skip_without_tags: bool,

    /// Vulnerability driver execution mode
    #[arg(long, value_enum, default_value = "thread-safe")]
    driver: DriverMode,

    /// Path to the nuclei binary
    #[arg(long)]
    nuclei_binary: Option<String>,

    /// Custom passive fingerprint database (JSON)
    #[arg(long)]
    fingerprint_db: Option<PathBuf>,

    /// Custom active fingerprint database (JSON)
    #[arg(long)]
    active_db: Option<PathBuf>,

    /// Append results and findings as JSON lines to this file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DriverMode {
    Sequential,
    ThreadSafe,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    print!("\x1b[92m");
    println!("             _             ");
    println!(" __   ____ _(_)_ __  _   _ ");
    println!(" \\ \\ / / _` | | '_ \\| | | |");
    println!("  \\ V / (_| | | | | | |_| |");
    println!("   \\_/ \\__,_|_|_| |_|\\__,_|");
    print!("\x1b[0m");
    println!();
    print!("\x1b[1m\x1b[97m");
    println!("   Web Recon & Vulnerability Discovery");
    print!("\x1b[0m\x1b[92m");
    println!("   v1.2 - (c) 2026 Bountyy Oy");
    print!("\x1b[0m");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("vainu-worker")
        .enable_all()
        .build()?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut targets = cli.targets.clone();
    if let Some(path) = &cli.target_file {
        let raw = std::fs::read_to_string(path)?;
        targets.extend(
            raw.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }

    let options = WebscanOptions {
        target: targets,
        tcp_target: HashMap::new(),
        thread: cli.threads,
        screenshot: false,
        deep_scan: cli.deep_scan,
        root_path: cli.root_path,
        custom_headers: cli.headers.join("\n"),
        generate_log4j2: cli.generate_log4j2,
        proxy_url: cli.proxy.clone(),
    };

    let sink: Arc<dyn EventSink> = match &cli.output {
        Some(path) => Arc::new(JsonlSink::create(path)?),
        None => Arc::new(LogSink),
    };

    let task_id = format!("vainu-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
    let mut scanner = FingerScanner::new(&task_id, options, sink.clone()).await?;
    if let Some(path) = &cli.fingerprint_db {
        scanner = scanner.with_web_db(vainu_scanner::fingerprint::load_web_db(path)?);
    }
    if let Some(path) = &cli.active_db {
        scanner = scanner.with_active_db(vainu_scanner::fingerprint::load_active_db(path)?);
    }
    let scanner = Arc::new(scanner);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, draining in-flight work");
                cancel.cancel();
            }
        });
    }

    scanner.finger_scan(&cancel).await;
    if scanner.deep_scan() && !cancel.is_cancelled() {
        scanner.active_finger_scan(&cancel).await;
    }

    if cli.template_dirs.is_empty() && cli.template_files.is_empty() {
        info!("no template sources configured, skipping vulnerability scan");
        return Ok(());
    }

    let fingerprint_map = scanner.url_fingerprint_map();
    let mut nuclei_options = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for url in scanner.alive_urls() {
        let url = url.to_string();
        seen.insert(url.clone());
        nuclei_options.push(target_option(&cli, &url, &fingerprint_map));
    }
    // tcp_target seeds live only in the fingerprint map.
    for url in fingerprint_map.keys() {
        if !seen.contains(url) {
            nuclei_options.push(target_option(&cli, url, &fingerprint_map));
        }
    }

    if nuclei_options.is_empty() {
        info!("no alive targets, skipping vulnerability scan");
        return Ok(());
    }

    let provider = NucleiCli::new(cli.nuclei_binary.clone());
    if !provider.check_available().await {
        sink.error("[nuclei] binary not found, vulnerability scan skipped".to_string());
        return Ok(());
    }

    match cli.driver {
        DriverMode::Sequential => {
            nuclei::run_sequential(&provider, &task_id, nuclei_options, sink, &cancel).await;
        }
        DriverMode::ThreadSafe => {
            nuclei::run_thread_safe(&provider, &task_id, nuclei_options, sink, &cancel).await;
        }
    }

    Ok(())
}

fn target_option(
    cli: &Cli,
    url: &str,
    fingerprint_map: &HashMap<String, Vec<String>>,
) -> NucleiOption {
    NucleiOption {
        url: url.to_string(),
        tags: fingerprint_map.get(url).cloned().unwrap_or_default(),
        custom_tags: cli.custom_tags.clone(),
        template_files: cli.template_files.clone(),
        template_dirs: cli.template_dirs.clone(),
        custom_headers: cli.headers.join("\n"),
        proxy: cli.proxy.clone(),
        skip_without_tags: cli.skip_without_tags,
    }
}

/// Sink that logs like [`LogSink`] and appends every event as one JSON
/// line to the output file.
struct JsonlSink {
    file: Mutex<File>,
    log: LogSink,
}

impl JsonlSink {
    fn create(path: &PathBuf) -> Result<Self> {
        Ok(Self {
            file: Mutex::new(File::create(path)?),
            log: LogSink,
        })
    }

    fn write_line(&self, value: serde_json::Value) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", value);
        }
    }
}

impl EventSink for JsonlSink {
    fn passive_result(&self, result: InfoResult) {
        if let Ok(value) = serde_json::to_value(&result) {
            self.write_line(serde_json::json!({"event": "passive_result", "data": value}));
        }
        self.log.passive_result(result);
    }

    fn active_result(&self, result: InfoResult) {
        if let Ok(value) = serde_json::to_value(&result) {
            self.write_line(serde_json::json!({"event": "active_result", "data": value}));
        }
        self.log.active_result(result);
    }

    fn finding(&self, finding: VulnerabilityInfo) {
        if let Ok(value) = serde_json::to_value(&finding) {
            self.write_line(serde_json::json!({"event": "finding", "data": value}));
        }
        self.log.finding(finding);
    }

    fn progress(&self, kind: ProgressKind, current: usize, total: usize) {
        self.log.progress(kind, current, total);
    }

    fn error(&self, message: String) {
        self.write_line(serde_json::json!({"event": "error", "message": message}));
        self.log.error(message);
    }
}
