//! Scan session subcommand.
//!
//! Wires capture feeds to a shared [`DeviceLedger`]: replay feeds stream
//! previously captured JSONL detections, the synthetic feed fabricates
//! rotating private addresses for demo and key verification runs. Each feed
//! is an independent producer task; the session ends when every feed is
//! drained, then the per-device table, summary and any exports are written.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

use blescout_core::resolve::ah;
use blescout_core::{
    DeviceLedger, DeviceRecord, Environment, ExportRow, FixSource, GpsFix, IdentityResolvingKey,
    NoFixSource, RawDetection, RecordOutcome, ScanError, ScanReport, SessionConfig,
    StaticFixSource,
};

use crate::keys::load_keys;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Replay detections from a JSONL capture (repeatable; one feed per file)
    #[arg(long, value_name = "PATH")]
    pub replay: Vec<PathBuf>,

    /// Run a synthetic feed fabricating this many devices
    #[arg(long, value_name = "DEVICES")]
    pub synthetic: Option<usize>,

    /// Detections each synthetic device emits
    #[arg(long, default_value = "40", value_name = "N")]
    pub synthetic_events: usize,

    /// Identity resolving key as hex (repeatable; enables resolve mode)
    #[arg(long = "irk", value_name = "HEX")]
    pub irks: Vec<String>,

    /// File with one identity resolving key per line
    #[arg(long, value_name = "PATH")]
    pub irk_file: Option<PathBuf>,

    /// Track only addresses containing this substring
    #[arg(long, value_name = "SUBSTR")]
    pub target: Option<String>,

    /// Drop detections whose smoothed RSSI falls below this (dBm)
    #[arg(long, value_name = "DBM")]
    pub min_rssi: Option<i32>,

    /// Track only devices whose advertised name contains this
    #[arg(long, value_name = "SUBSTR")]
    pub name_filter: Option<String>,

    /// RSSI smoothing window size (1 = no averaging)
    #[arg(long, default_value = "1", value_name = "N")]
    pub window: usize,

    /// Propagation environment for distance estimation
    #[arg(long, value_enum, default_value = "free-space")]
    pub environment: EnvironmentArg,

    /// Expected RSSI at one meter, overriding tx-power derivation (dBm)
    #[arg(long, value_name = "DBM")]
    pub ref_rssi: Option<i32>,

    /// Flag devices estimated closer than this many meters
    #[arg(long, value_name = "METERS")]
    pub alert_within: Option<f64>,

    /// In resolve mode, also track unmatched devices under their raw address
    #[arg(long)]
    pub verbose_unresolved: bool,

    /// Scanner latitude, stamped onto detections that carry no fix
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Scanner longitude
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Scanner altitude in meters
    #[arg(long, requires = "lat")]
    pub alt: Option<f64>,

    /// Write per-device CSV to this path
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Write a JSON session report to this path
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write one JSON device row per line to this path
    #[arg(long, value_name = "PATH")]
    pub jsonl: Option<PathBuf>,
}

/// Propagation environment for CLI
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EnvironmentArg {
    FreeSpace,
    Outdoor,
    Indoor,
}

impl From<EnvironmentArg> for Environment {
    fn from(val: EnvironmentArg) -> Self {
        match val {
            EnvironmentArg::FreeSpace => Environment::FreeSpace,
            EnvironmentArg::Outdoor => Environment::Outdoor,
            EnvironmentArg::Indoor => Environment::Indoor,
        }
    }
}

/// Per-feed outcome counters, summed into the session summary.
#[derive(Debug, Default, Clone, Copy)]
struct FeedStats {
    recorded: u64,
    filtered: u64,
    unresolved: u64,
    invalid: u64,
    alerts: u64,
}

impl FeedStats {
    fn absorb(&mut self, other: FeedStats) {
        self.recorded += other.recorded;
        self.filtered += other.filtered;
        self.unresolved += other.unresolved;
        self.invalid += other.invalid;
        self.alerts += other.alerts;
    }

    fn apply(&mut self, outcome: &Result<RecordOutcome, ScanError>) {
        match outcome {
            Ok(RecordOutcome::Recorded(record)) => {
                self.recorded += 1;
                if record.proximity_alert {
                    self.alerts += 1;
                }
            }
            Ok(RecordOutcome::Unresolved) => self.unresolved += 1,
            Ok(RecordOutcome::Filtered(_)) => self.filtered += 1,
            Err(_) => self.invalid += 1,
        }
    }
}

// ============================================================================
// Display Structs for Tables
// ============================================================================

/// Device display row for the end-of-session table
#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "RSSI")]
    rssi: String,
    #[tabled(rename = "Avg")]
    avg_rssi: String,
    #[tabled(rename = "Dist (m)")]
    distance: String,
    #[tabled(rename = "Count")]
    detections: u64,
    #[tabled(rename = "IRK")]
    irk: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(record: &DeviceRecord) -> Self {
        let address = if record.proximity_alert {
            record.address.to_string().red().bold().to_string()
        } else {
            record.address.to_string()
        };
        Self {
            address,
            name: record.name.clone().unwrap_or_else(|| "-".to_string()),
            rssi: format!("{}", record.rssi),
            avg_rssi: format!("{}", record.avg_rssi),
            distance: record
                .distance_m
                .map(|d| format!("{d:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            detections: record.detections,
            irk: record
                .matched_irk
                .map(|i| format!("#{i}"))
                .unwrap_or_else(|| "-".to_string()),
            last_seen: record.last_seen.format("%H:%M:%S").to_string(),
        }
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute the scan command
pub async fn execute(args: ScanArgs) -> Result<()> {
    let keys = load_keys(&args.irks, args.irk_file.as_deref())?;
    let config = build_config(&args, keys.clone())?;
    if args.replay.is_empty() && args.synthetic.is_none() {
        bail!("no feed configured; pass --replay and/or --synthetic");
    }

    let fix_source: Arc<dyn FixSource> = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let fix = match args.alt {
                Some(alt) => GpsFix::with_altitude(lat, lon, alt),
                None => GpsFix::new(lat, lon),
            };
            Arc::new(StaticFixSource::new(fix))
        }
        _ => Arc::new(NoFixSource),
    };

    let ledger = DeviceLedger::new(config);
    println!("{} Starting scan session...", "[blescout]".bright_cyan().bold());
    if !keys.is_empty() {
        println!(
            "  {} {} key(s) loaded",
            "Resolve mode:".dimmed(),
            keys.len()
        );
    }
    println!();

    let mut tasks = Vec::new();
    for path in &args.replay {
        let ledger = ledger.clone();
        let fix_source = Arc::clone(&fix_source);
        let path = path.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            replay_feed(&ledger, &path, fix_source.as_ref())
        }));
    }
    if let Some(devices) = args.synthetic {
        let ledger = ledger.clone();
        let fix_source = Arc::clone(&fix_source);
        let events = args.synthetic_events;
        let keys = keys.clone();
        tasks.push(tokio::spawn(async move {
            synthetic_feed(&ledger, &keys, devices, events, fix_source.as_ref()).await
        }));
    }

    let mut stats = FeedStats::default();
    for task in tasks {
        stats.absorb(task.await.context("feed task panicked")??);
    }

    let records = ledger.all_records();
    render_table(&records);
    print_summary(&ledger, &stats);
    write_exports(&args, &ledger, &records)?;

    Ok(())
}

fn build_config(args: &ScanArgs, keys: Vec<IdentityResolvingKey>) -> Result<SessionConfig> {
    if !keys.is_empty() && args.target.is_some() {
        bail!("--target cannot be combined with resolve mode (--irk/--irk-file)");
    }
    let mut builder = SessionConfig::builder()
        .window_capacity(args.window)
        .environment(args.environment.into())
        .verbose_unresolved(args.verbose_unresolved);
    if !keys.is_empty() {
        builder = builder.resolve_keys(keys);
    } else if let Some(needle) = &args.target {
        builder = builder.targeted(needle.clone());
    }
    if let Some(dbm) = args.min_rssi {
        builder = builder.min_rssi(dbm);
    }
    if let Some(pattern) = &args.name_filter {
        builder = builder.name_filter(pattern.clone());
    }
    if let Some(dbm) = args.ref_rssi {
        builder = builder.ref_rssi(dbm);
    }
    if let Some(meters) = args.alert_within {
        builder = builder.alert_within_m(meters);
    }
    builder.build().context("invalid session configuration")
}

// ============================================================================
// Feeds
// ============================================================================

/// Streams a JSONL capture into the ledger, one detection per line.
fn replay_feed(ledger: &DeviceLedger, path: &std::path::Path, fix: &dyn FixSource) -> Result<FeedStats> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading replay file {}", path.display()))?;

    let mut stats = FeedStats::default();
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut det: RawDetection = match serde_json::from_str(line) {
            Ok(det) => det,
            Err(err) => {
                warn!("{}:{}: unparseable detection: {err}", path.display(), index + 1);
                stats.invalid += 1;
                continue;
            }
        };
        if det.fix.is_none() {
            det.fix = fix.current_fix();
        }
        let outcome = ledger.record(&det);
        if let Err(err) = &outcome {
            warn!("{}:{}: {err}", path.display(), index + 1);
        }
        stats.apply(&outcome);
    }
    info!(
        "replay {} done: {} recorded, {} filtered, {} unresolved, {} invalid",
        path.display(),
        stats.recorded,
        stats.filtered,
        stats.unresolved,
        stats.invalid
    );
    Ok(stats)
}

/// Fabricates a population of advertising devices.
///
/// With keys loaded every device owns one key and rotates a fresh private
/// address each event, exercising identity collapse end to end. Without
/// keys, devices keep fixed static-random addresses.
async fn synthetic_feed(
    ledger: &DeviceLedger,
    keys: &[IdentityResolvingKey],
    devices: usize,
    events: usize,
    fix: &dyn FixSource,
) -> Result<FeedStats> {
    let pb = ProgressBar::new((devices * events) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut stats = FeedStats::default();
    for round in 0..events {
        for device in 0..devices {
            let det = synthesize_detection(keys, device, round, fix);
            stats.apply(&ledger.record(&det));
            pb.inc(1);
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    pb.finish_with_message("synthetic feed drained");
    Ok(stats)
}

fn synthesize_detection(
    keys: &[IdentityResolvingKey],
    device: usize,
    round: usize,
    fix: &dyn FixSource,
) -> RawDetection {
    let mut rng = rand::thread_rng();
    let address = match keys.get(device % keys.len().max(1)) {
        Some(key) => rotated_rpa(key, &mut rng),
        None => format!("C2:00:00:00:00:{device:02X}"),
    };

    let mut det = RawDetection::new(address, -45 - rng.gen_range(0..40), Utc::now());
    det.adapter = Some("synthetic".to_string());
    det.tx_power = (device % 2 == 0).then_some(-4);
    if device % 3 == 0 {
        det.name = Some(format!("beacon-{device}"));
    }
    if round == 0 {
        det.service_uuids.push("180f".to_string());
    }
    det.fix = fix.current_fix();
    det
}

/// A fresh resolvable private address for one advertising interval.
fn rotated_rpa(key: &IdentityResolvingKey, rng: &mut impl Rng) -> String {
    let mut prand = [0u8; 3];
    rng.fill(&mut prand[..]);
    prand[0] = (prand[0] & 0x3F) | 0x40;
    let hash = ah(key, prand);
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        prand[0], prand[1], prand[2], hash[0], hash[1], hash[2]
    )
}

// ============================================================================
// Output
// ============================================================================

fn render_table(records: &[DeviceRecord]) {
    println!("{}", "Tracked Devices".bold().cyan());
    println!("{}", "=".repeat(80));
    if records.is_empty() {
        println!("No devices tracked.");
        return;
    }
    let rows: Vec<DeviceRow> = records.iter().map(DeviceRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
}

fn print_summary(ledger: &DeviceLedger, stats: &FeedStats) {
    let tally = ledger.tally();
    println!();
    println!(
        "{} {} detection(s), {} device(s), {} IRK match(es)",
        "[summary]".bright_cyan().bold(),
        tally.detections.to_string().bold(),
        tally.unique_devices.to_string().bold(),
        tally.irk_matches.to_string().bold()
    );
    println!(
        "  {} {}  {} {}  {} {}",
        "filtered:".dimmed(),
        stats.filtered,
        "unresolved:".dimmed(),
        stats.unresolved,
        "invalid:".dimmed(),
        stats.invalid
    );
    if stats.alerts > 0 {
        println!(
            "{} {} proximity alert(s) during this session",
            "[ALERT]".red().bold(),
            stats.alerts
        );
    }
}

fn write_exports(args: &ScanArgs, ledger: &DeviceLedger, records: &[DeviceRecord]) -> Result<()> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();

    if let Some(path) = &args.csv {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        println!("{} CSV written to {}", "[OK]".green().bold(), path.display());
    }
    if let Some(path) = &args.json {
        let report = ScanReport::new(ledger.tally(), records);
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{} JSON written to {}", "[OK]".green().bold(), path.display());
    }
    if let Some(path) = &args.jsonl {
        let mut body = String::new();
        for row in &rows {
            body.push_str(&serde_json::to_string(row)?);
            body.push('\n');
        }
        std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
        println!("{} JSONL written to {}", "[OK]".green().bold(), path.display());
    }
    Ok(())
}
