//! Region Siege - operator console
//!
//! Drives one engine instance on a manual clock so escalation timelines can be
//! stepped through by hand. Policies come from a JSON seed file (test runtime)
//! or from the HTTP document store named by REGION_POLICY_URL.

use clap::Parser;
use region_siege::core::clock::{Clock, ManualClock};
use region_siege::core::config::EngineConfig;
use region_siege::core::error::Result;
use region_siege::engine::{GateDecision, RegionEngine};
use region_siege::events::journal::JournalQuery;
use region_siege::events::types::PressureEvent;
use region_siege::policy::http::HttpPolicyProvider;
use region_siege::policy::provider::{PolicyProvider, RuntimeMode, StaticPolicyProvider};

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Region Siege console - inspect policies and step siege timelines
#[derive(Parser, Debug)]
#[command(name = "region-siege")]
#[command(about = "Interactive console for the region policy and siege escalation engine")]
struct Args {
    /// TOML file with engine timings (REGION_SIEGE_* env vars otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file of `"shard::region": {policy}` seeds; runs in test mode
    #[arg(long)]
    policies: Option<PathBuf>,

    /// Shard the console operates on
    #[arg(long, default_value = "prime_shard")]
    shard: String,

    /// Initial value of the manual clock in milliseconds
    #[arg(long, default_value_t = 0)]
    start_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("region_siege=debug")
        .init();

    tracing::info!("Region Siege console starting...");

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };

    let (runtime, provider): (RuntimeMode, Option<Arc<dyn PolicyProvider>>) = match &args.policies {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let seeds = StaticPolicyProvider::from_json_str(&content)?;
            tracing::info!(regions = seeds.len(), "Loaded policy seeds");
            let seeds: Arc<dyn PolicyProvider> = Arc::new(seeds);
            (RuntimeMode::Test, Some(seeds))
        }
        None => match HttpPolicyProvider::from_env() {
            Ok(http) => {
                let http: Arc<dyn PolicyProvider> = Arc::new(http);
                (RuntimeMode::Production, Some(http))
            }
            Err(e) => {
                tracing::warn!(error = %e, "No policy source - every region reads as empty");
                (RuntimeMode::Production, None)
            }
        },
    };

    let clock = Arc::new(ManualClock::new(args.start_ms));
    let engine = RegionEngine::new(config, runtime, clock.clone());
    engine.set_provider(provider)?;

    let rt = Runtime::new()?;
    let shard = args.shard.as_str();

    println!("\n=== REGION SIEGE ===");
    println!("Shard: {}  Clock: {} ms", shard, clock.now_ms());
    print_help();

    loop {
        print!("[{} ms]> ", clock.now_ms());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, rest)) = parts.split_first() else {
            continue;
        };

        match (command, rest) {
            ("quit" | "q", _) => break,
            ("help" | "h", _) => print_help(),

            ("pressure", [room, tail @ ..]) => {
                let count = tail.first().and_then(|s| s.parse::<i64>().ok()).unwrap_or(1);
                let window_ms = tail.get(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(10_000);
                engine.report_pressure(PressureEvent::new(shard, room, count, window_ms));
                println!("{} is now {}", room, engine.tier(room).as_str());
            }

            ("deny", [room, ..]) => {
                rt.block_on(engine.warm(shard, &[*room]));
                match engine.deny_hostile_entry(shard, room, 1, 10_000) {
                    GateDecision::Allowed => println!("{} is not a sanctuary; entry allowed", room),
                    GateDecision::Denied(reason) => println!("{}", reason),
                }
            }

            ("advance", [ms, ..]) => match ms.parse::<u64>() {
                Ok(ms) => {
                    clock.advance(ms);
                    println!("Clock now at {} ms", clock.now_ms());
                }
                Err(_) => println!("Usage: advance <ms>"),
            },

            ("tier", [room, ..]) => println!("{}: {}", room, engine.tier(room).as_str()),

            ("debug", [room, ..]) => {
                match serde_json::to_string_pretty(&engine.debug_state(room)) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("Could not render debug state: {}", e),
                }
            }

            ("rooms", _) => {
                let rooms = engine.siege().active_rooms(clock.now_ms());
                if rooms.is_empty() {
                    println!("No rooms under pressure");
                }
                for (room, tier) in rooms {
                    println!("  {:<16} {}", room, tier.as_str());
                }
            }

            ("gates", [room, ..]) => {
                rt.block_on(engine.warm(shard, &[*room]));
                print_gate("economy", engine.check_economy(shard, room));
                print_gate("travel", engine.check_travel(shard, room));
            }

            ("policy", [region, ..]) => {
                let policy = rt.block_on(engine.get_policy(shard, region));
                match serde_json::to_string_pretty(&policy) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("Could not render policy: {}", e),
                }
            }

            ("journal", tail) => {
                let limit = tail.first().and_then(|s| s.parse::<usize>().ok()).unwrap_or(0);
                let records = engine.recent_events(&JournalQuery::new().limit(limit));
                if records.is_empty() {
                    println!("Journal is empty");
                }
                for record in records {
                    println!("  #{:<5} {:>10} ms  {:<16} {}", record.id, record.ts, record.event, record.payload);
                }
            }

            ("reset", _) => {
                engine.reset();
                println!("Siege state, cooldowns, journal and policy cache cleared");
            }

            _ => println!("Unknown command or missing argument. Type 'help' for the command list."),
        }
    }

    println!("\nGoodbye! Clock stopped at {} ms.", clock.now_ms());
    Ok(())
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  pressure <room> [count] [window_ms] - Report sanctuary pressure");
    println!("  deny <room>                         - Hostile pursuit tries to enter a room");
    println!("  advance <ms>                        - Move the clock forward");
    println!("  tier <room>                         - Current siege tier");
    println!("  debug <room>                        - Full debug state as JSON");
    println!("  rooms                               - Rooms with live siege state");
    println!("  gates <room>                        - Economy and travel gate decisions");
    println!("  policy <region>                     - Normalized policy for a region");
    println!("  journal [n]                         - Most recent engine events");
    println!("  reset                               - Clear all engine state");
    println!("  quit / q                            - Exit");
    println!();
}

fn print_gate(name: &str, decision: GateDecision) {
    match decision {
        GateDecision::Allowed => println!("  {:<8} allowed", name),
        GateDecision::Denied(reason) => println!("  {:<8} denied: {}", name, reason),
    }
}
