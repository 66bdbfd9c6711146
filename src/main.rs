mod config;
mod error;
mod wifi;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{
    error::WifiResult,
    wifi::{
        ConnectTiming, ConnectionMode, InterfaceStatus, NetshExecutor, WifiNetworkList,
        WifiProfile, WifiService, create_profile_xml,
    },
};

/// Manage saved Wi-Fi profiles on Windows through netsh
#[derive(Parser, Debug)]
#[command(
    name = "netshui",
    about = "Manage saved Wi-Fi profiles on Windows through netsh.",
    long_about = None,
    version = env!("CARGO_PKG_VERSION"),
    disable_version_flag = true
)]
struct Args {
    /// Print version information
    #[arg(short = 'V', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Seconds to wait for a connection to come up
    #[arg(long, default_value_t = config::CONNECT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Milliseconds between connection status polls
    #[arg(long = "poll-ms", default_value_t = config::CONNECT_POLL_MS, global = true)]
    poll_ms: u64,

    /// Folder exported profiles are written to (defaults to the desktop)
    #[arg(long = "export-dir", global = true)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved profiles
    List,
    /// Show the wireless interface state
    Status,
    /// Add a WPA2-Personal profile; the password is read from stdin when omitted
    Add {
        name: String,
        password: Option<String>,
        /// Only connect when asked to
        #[arg(long)]
        manual: bool,
    },
    /// Add a profile from an exported XML file
    Import { file: PathBuf },
    /// Delete a saved profile
    Delete { name: String },
    /// Delete every saved profile
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Export a profile to the desktop
    Export {
        name: String,
        /// Include the passphrase in plain text
        #[arg(long = "clear-key")]
        clear_key: bool,
    },
    /// Disconnect, then connect to a saved profile
    Connect { name: String },
    /// Disconnect from the current network
    Disconnect,
    /// Print the profile XML that `add` would register
    ShowXml {
        name: String,
        password: Option<String>,
        #[arg(long)]
        manual: bool,
    },
}

impl Command {
    /// Name as typed on the command line
    fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Status => "status",
            Command::Add { .. } => "add",
            Command::Import { .. } => "import",
            Command::Delete { .. } => "delete",
            Command::DeleteAll { .. } => "delete-all",
            Command::Export { .. } => "export",
            Command::Connect { .. } => "connect",
            Command::Disconnect => "disconnect",
            Command::ShowXml { .. } => "show-xml",
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn format_networks(networks: &WifiNetworkList) -> String {
    if networks.is_empty() {
        return "No saved networks".to_string();
    }
    let mut lines = vec![format!("{} saved networks:", networks.len())];
    lines.extend(networks.iter().map(|name| format!("  {name}")));
    lines.join("\n")
}

fn format_status(status: &InterfaceStatus) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "Interface : {}\nState     : {} ({})\nSSID      : {}\nProfile   : {}",
        field(&status.interface_name),
        field(&status.state),
        status.connection_state(),
        field(&status.ssid),
        field(&status.profile),
    )
}

fn connection_mode(manual: bool) -> ConnectionMode {
    if manual {
        ConnectionMode::Manual
    } else {
        ConnectionMode::Auto
    }
}

/// Blocking part of every subcommand that touches netsh
fn run_command(service: &WifiService, command: Command) -> WifiResult<String> {
    match command {
        Command::List => service.get_saved_networks().map(|n| format_networks(&n)),
        Command::Status => Ok(format_status(&service.interface_status())),
        Command::Add {
            name,
            password,
            manual,
        } => service.add_wifi_network(&name, &password.unwrap_or_default(), !manual),
        Command::Import { file } => service.import_wifi_network(&file),
        Command::Delete { name } => {
            if service
                .get_saved_networks()
                .is_ok_and(|networks| !networks.contains(&name))
            {
                warn!("{name} is not among the saved profiles");
            }
            service.delete_wifi_network(&name)
        }
        Command::DeleteAll { .. } => service.delete_all_networks(),
        Command::Export { name, clear_key } => service.export_wifi_network(&name, clear_key),
        Command::Connect { name } => service.connect_wifi(&name),
        Command::Disconnect => service.disconnect(),
        Command::ShowXml {
            name,
            password,
            manual,
        } => {
            let profile = WifiProfile::new(name, password.unwrap_or_default())?
                .with_connection_mode(connection_mode(manual));
            Ok(create_profile_xml(&profile))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    let command = match args.command {
        Command::DeleteAll { yes: false } => {
            bail!("Refusing to delete every saved profile without --yes");
        }
        Command::Add {
            name,
            password,
            manual,
        } => Command::Add {
            name,
            password: Some(read_password(password)?),
            manual,
        },
        Command::ShowXml {
            name,
            password,
            manual,
        } => Command::ShowXml {
            name,
            password: Some(read_password(password)?),
            manual,
        },
        other => other,
    };

    let timing = ConnectTiming {
        poll_interval: Duration::from_millis(args.poll_ms),
        timeout: Duration::from_secs(args.timeout),
        ..ConnectTiming::default()
    };
    let mut service = WifiService::new(NetshExecutor::default().with_timing(timing))?
        .on_status(Box::new(|line| eprintln!("{line}...")));
    if let Some(dir) = args.export_dir {
        service = service.with_export_dir(dir);
    }
    let cancel = service.cancel_handle();

    let command_name = command.name();
    let mut task = tokio::task::spawn_blocking(move || run_command(&service, command));
    let result = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Cancelling...");
            cancel.store(true, Ordering::SeqCst);
            task.await?
        }
    };

    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(e) if e.is_validation() => bail!("{e}\nSee `netshui {command_name} --help`."),
        Err(e) => Err(e.into()),
    }
}
