//! # CLI - RiptideKV Interactive Shell
//!
//! A REPL-style command-line interface for the RiptideKV storage engine.
//! Reads commands from stdin, executes them against the engine, and prints
//! results to stdout. Designed for both interactive use and scripted testing
//! (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! FLUSH              Force flush memtable to SSTable
//! COMPACT            Trigger manual compaction (L0 + L1 -> L1)
//! STATS              Print engine debug info
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! Settings are controlled via environment variables, layered over compiled
//! defaults by [`config::StoreConfig::from_env`]:
//!
//! ```text
//! RIPTIDE_DATA_DIR                 store root directory      (default: "data")
//! RIPTIDE_MEMTABLE_THRESHOLD_KB    memtable flush threshold  (default: 4096 KiB)
//! RIPTIDE_L0_TRIGGER               L0 compaction trigger     (default: 4)
//! RIPTIDE_BLOCK_CACHE_CAPACITY     block cache weight budget (default: 1_000_000)
//! RIPTIDE_WAL_SYNC                 fsync every WAL append    (default: true)
//! RIPTIDE_COMPACTION_INTERVAL_SECS background compactor tick (default: 5)
//! ```
use anyhow::Result;
use config::StoreConfig;
use engine::Engine;
use std::io::{self, BufRead, Write};
use tracing::info;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = env_or("RIPTIDE_DATA_DIR", "data");
    let config = StoreConfig::from_env(&data_dir);

    let engine = Engine::new(config.clone())?;

    info!(?config, "riptidekv cli started");
    println!(
        "RiptideKV started (data_dir={}, l0={}, l1={})",
        config.data_dir.display(),
        engine.l0_count(),
        engine.l1_count(),
    );
    println!("Commands: PUT key value | GET key | DEL key");
    println!("          COMPACT | FLUSH | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" | "SET" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: PUT key value");
                        } else {
                            match engine.put(k.as_bytes().to_vec(), v.as_bytes().to_vec()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR put failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: PUT key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match engine.get(k.as_bytes()) {
                            Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.delete(k.as_bytes().to_vec()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "COMPACT" => match engine.compact() {
                    Ok(ran) => println!(
                        "OK ran={} (L0={}, L1={})",
                        ran,
                        engine.l0_count(),
                        engine.l1_count()
                    ),
                    Err(e) => println!("ERR compact failed: {}", e),
                },
                "FLUSH" => match engine.force_flush() {
                    Ok(()) => println!("OK (L0={}, L1={})", engine.l0_count(), engine.l1_count()),
                    Err(e) => println!("ERR flush failed: {}", e),
                },
                "STATS" => {
                    println!("{:?}", engine);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    engine.close()?;
    Ok(())
}
