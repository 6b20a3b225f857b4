//! vty-ctl: Run commands against FRR daemons over their VTY sockets.
//!
//! Talks to bgpd, bfdd, mgmtd and zebra directly, without going through vtysh.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vty_core::config::parse_mode;
use vty_core::{Connection, Daemon, Sockets, VtyConfig, VtyError};

#[derive(Parser, Debug)]
#[command(name = "vty-ctl")]
#[command(about = "Talk to FRR daemons over their VTY sockets")]
struct Args {
    /// Directory containing the daemons' *.vty sockets
    #[arg(long, env = "FRR_RUN_DIR")]
    run_dir: Option<PathBuf>,

    /// FRR configuration file (default destination for `dump`)
    #[arg(long, env = "FRR_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Per-command timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single command on one daemon
    Exec {
        /// bgp, bfd, mgmt or zebra
        daemon: Daemon,
        /// Command words, joined with spaces
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },
    /// Apply a file of configuration commands to one daemon
    Apply {
        daemon: Daemon,
        file: PathBuf,
    },
    /// Print one daemon's running configuration
    Show { daemon: Daemon },
    /// Merge all daemons' running configuration into one file
    Dump {
        /// Destination file (defaults to the FRR config path)
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Octal permission bits for the written file
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,
    },
}

/// Result printed with `--json`.
#[derive(Serialize, Debug)]
struct Report<'a> {
    daemon: Option<&'a str>,
    command: &'a str,
    ok: bool,
    output: String,
    error: Option<String>,
}

impl Args {
    fn config(&self) -> Result<VtyConfig> {
        let mut config = VtyConfig::from_env()?;
        if let Some(dir) = &self.run_dir {
            config.run_dir = dir.clone();
        }
        if let Some(path) = &self.config_path {
            config.config_path = path.clone();
        }
        if let Some(ms) = self.timeout_ms {
            anyhow::ensure!(ms > 0, "--timeout-ms must be positive");
            config.timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,vty_core=debug,vty_ctl=debug"
    } else {
        "info,vty_core=info,vty_ctl=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.config()?;
    debug!("Using {:?}", config);

    match &args.command {
        Command::Exec { daemon, words } => {
            let cmd = words.join(" ");
            let mut conn = connect_one(&config, *daemon).await?;
            let result = conn.execute(&cmd, None).await;
            close_quietly(&mut conn).await;
            report(&args, Some(*daemon), &cmd, result)
        }
        Command::Apply { daemon, file } => {
            let contents = tokio::fs::read(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut conn = connect_one(&config, *daemon).await?;
            let result = conn.apply_config(&contents, None).await.map(|()| Vec::new());
            close_quietly(&mut conn).await;
            report(&args, Some(*daemon), "apply", result)
        }
        Command::Show { daemon } => {
            let mut conn = connect_one(&config, *daemon).await?;
            let result = conn.show_running_config(None).await;
            close_quietly(&mut conn).await;
            report(&args, Some(*daemon), "do write terminal", result)
        }
        Command::Dump { dest, mode } => {
            let dest = dest.clone().unwrap_or_else(|| config.config_path.clone());
            let mode = mode.unwrap_or(config.config_mode);

            let mut sockets = Sockets::from_config(&config);
            sockets.connect(None).await.context("Failed to connect to FRR sockets")?;
            let result = sockets.dump_running_config(&dest, mode, None).await;
            if let Err(e) = sockets.close().await {
                debug!("Close after dump: {}", e);
            }
            if result.is_ok() {
                info!("Running config written to {}", dest.display());
            }
            report(&args, None, "dump", result.map(|()| Vec::new()))
        }
    }
}

async fn connect_one(config: &VtyConfig, daemon: Daemon) -> Result<Connection> {
    let mut conn = Connection::with_timeout(config.run_dir.join(daemon.socket_name()), config.timeout);
    conn.connect(None)
        .await
        .with_context(|| format!("Failed to connect to {}", daemon))?;
    Ok(conn)
}

async fn close_quietly(conn: &mut Connection) {
    if let Err(e) = conn.close().await {
        debug!("{}", e);
    }
}

/// Print daemon output (also on rejection) and turn the result into the exit status.
fn report(args: &Args, daemon: Option<Daemon>, command: &str, result: Result<Vec<u8>, VtyError>) -> Result<()> {
    let output = match &result {
        Ok(out) => out.as_slice(),
        Err(e) => e.output().unwrap_or_default(),
    };

    let mut stdout = std::io::stdout().lock();
    if args.json {
        let report = Report {
            daemon: daemon.as_ref().map(Daemon::name),
            command,
            ok: result.is_ok(),
            output: String::from_utf8_lossy(output).into_owned(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        stdout.write_all(output)?;
    }
    stdout.flush()?;

    result.map(|_| ()).map_err(anyhow::Error::from)
}
