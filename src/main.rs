//! portmanager - see which process holds a local port, and kill it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use portmanager::config::{get_config_path, load_config};
use portmanager::{CoreEvent, KillOutcome, PortManager, PortViewRecord, filter};

#[derive(Parser)]
#[command(name = "portmanager")]
#[command(author, version, about = "See which process holds a local port, and kill it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.portmanager.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan once and print every registered port
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on port, label or process name
        #[arg(short, long)]
        filter: Option<String>,

        /// Register an extra port for this run, as PORT or PORT:LABEL
        #[arg(short, long = "add", value_name = "PORT[:LABEL]")]
        add: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rescan periodically and print each new result
    Watch {
        #[arg(short, long)]
        filter: Option<String>,

        /// Override the configured refresh interval
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Kill a process (and its children) by PID
    Kill {
        pid: u32,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = cli.config.clone().unwrap_or_else(get_config_path);
    let mut config = load_config(&path).context("failed to load configuration")?;

    match cli.command {
        Commands::List { filter, add, json } => {
            let manager = PortManager::with_system(config)?;
            run_list(&manager, filter.as_deref(), &add, json)
        }
        Commands::Watch {
            filter,
            interval_ms,
        } => {
            if let Some(ms) = interval_ms {
                config.refresh.interval_ms = ms;
                config.validate()?;
            }
            let mut manager = PortManager::with_system(config)?;
            run_watch(&mut manager, filter.as_deref())
        }
        Commands::Kill { pid, yes } => {
            let manager = PortManager::with_system(config)?;
            run_kill(&manager, pid, yes)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_list(manager: &PortManager, query: Option<&str>, add: &[String], json: bool) -> Result<()> {
    for spec in add {
        let (port, label) = parse_port_spec(spec)?;
        manager
            .add_port(port, label)
            .with_context(|| format!("cannot add port {}", spec))?;
    }

    let snapshot = manager.refresh_blocking();
    let records = filter(&snapshot.records, query.unwrap_or(""));

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    print_table(&records);
    Ok(())
}

fn run_watch(manager: &mut PortManager, query: Option<&str>) -> Result<()> {
    manager.start_auto_refresh();
    let query = query.unwrap_or("");
    for event in manager.events().iter() {
        match event {
            CoreEvent::SnapshotUpdated(snapshot) => {
                println!("\n#{} ({} in use)", snapshot.generation, snapshot.in_use().count());
                print_table(&filter(&snapshot.records, query));
            }
            CoreEvent::KillFinished(report) => {
                println!("PID {}: {}", report.pid, report.outcome);
            }
        }
    }
    Ok(())
}

fn run_kill(manager: &PortManager, pid: u32, yes: bool) -> Result<()> {
    let before = manager.refresh_blocking();
    let held: Vec<&PortViewRecord> = before.in_use().filter(|r| r.pid == pid).collect();
    let name = held
        .first()
        .map(|r| r.process_name.clone())
        .unwrap_or_else(|| "process".to_string());
    let ports: Vec<String> = held.iter().map(|r| r.port.to_string()).collect();

    if !yes {
        let target = if ports.is_empty() {
            format!("Kill {} (PID {})?", name, pid)
        } else {
            format!("Kill {} (PID {}) on port {}?", name, pid, ports.join(", "))
        };
        if !confirm(&target)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = manager.kill(pid);
    if outcome != KillOutcome::Success {
        bail!("Failed to kill process {}: {}", pid, outcome);
    }
    println!("Terminated {} (PID {}).", name, pid);

    // Give the OS time to release the sockets before rescanning
    thread::sleep(manager.config().refresh.kill_refresh_delay());
    manager.wait_idle();
    let after = manager.refresh_blocking();
    for record in &held {
        let still = after
            .records
            .iter()
            .any(|r| r.port == record.port && r.in_use && r.pid == pid);
        if still {
            println!("Port {} is still held by PID {}.", record.port, pid);
        } else {
            println!("Port {} is free.", record.port);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn parse_port_spec(spec: &str) -> Result<(u32, &str)> {
    let (port, label) = spec.split_once(':').unwrap_or((spec, ""));
    let port = port
        .trim()
        .parse::<u32>()
        .map_err(|_| anyhow!("invalid port number '{}'", port))?;
    Ok((port, label))
}

fn print_table(records: &[PortViewRecord]) {
    if records.is_empty() {
        println!("No matching ports.");
        return;
    }
    println!(
        "{:<6} {:<5} {:<28} {:<8} {:<8} PROCESS",
        "PORT", "PROTO", "LABEL", "STATUS", "PID"
    );
    println!("{}", "-".repeat(72));
    for r in records {
        let proto = r.protocol.map(|p| p.to_string()).unwrap_or_default();
        let status = if r.in_use { "in use" } else { "free" };
        let pid = if r.in_use && r.pid != 0 { r.pid.to_string() } else { String::new() };
        let label = if r.is_custom {
            format!("{} *", r.label)
        } else {
            r.label.clone()
        };
        println!(
            "{:<6} {:<5} {:<28} {:<8} {:<8} {}",
            r.port,
            proto,
            truncate(&label, 28),
            status,
            pid,
            r.process_name
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}
