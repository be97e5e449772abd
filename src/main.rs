//! Conceal Drive - hide and restore volume filesystems.
//!
//! Lists the drives, partitions and dynamic volumes of the host and applies a
//! reversible mask to the boot area of a selected volume.

use anyhow::Context;
use clap::{Parser, Subcommand};
use conceal_drive::config::{EXCL_ACCESS_MAX_AUTO_RETRIES, MAX_HOST_DRIVE_NUMBER};
use conceal_drive::{Device, Error, RetryPolicy, ScanConfig};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "conceal-drive")]
#[command(author, version)]
#[command(
    about = "Conceal or restore the filesystem of a volume",
    long_about = "Masks the boot area of a partition so the operating system and applications no longer recognize its filesystem. Running the command again restores it."
)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG is used otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List drives, partitions and dynamic volumes
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Include entries of unknown size
        #[arg(long)]
        all: bool,

        /// Number of physical drive slots to probe
        #[arg(long, default_value_t = MAX_HOST_DRIVE_NUMBER)]
        max_drives: u32,

        /// Skip the dynamic volume scan
        #[arg(long)]
        no_dynamic: bool,
    },

    /// Conceal a filesystem, or restore a concealed one
    Conceal {
        /// Raw partition path, e.g. \Device\Harddisk1\Partition1 (a block
        /// device or image file on Unix)
        device: String,

        /// Exclusive open attempts
        #[arg(long, default_value_t = EXCL_ACCESS_MAX_AUTO_RETRIES)]
        retries: u32,

        /// Delay between open attempts in milliseconds
        #[arg(long, default_value_t = 10)]
        retry_delay_ms: u64,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        report(&e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Print the error with its platform code and the access hint.
fn report(e: &anyhow::Error) {
    eprintln!("Error: {}", e);
    if let Some(err) = e.downcast_ref::<Error>() {
        if let Some(code) = err.os_error_code() {
            eprintln!("Error 0x{:08X}", code);
        }
        if let Some(hint) = err.hint() {
            eprintln!();
            eprintln!("{}", hint);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::List {
            json,
            all,
            max_drives,
            no_dynamic,
        } => {
            let config = ScanConfig {
                max_drive_number: max_drives,
                scan_dynamic_volumes: !no_dynamic,
                ..Default::default()
            };
            cmd_list(config, json, all)
        }

        Commands::Conceal {
            device,
            retries,
            retry_delay_ms,
            yes,
        } => {
            let policy = RetryPolicy::new(retries, Duration::from_millis(retry_delay_ms));
            cmd_conceal(&device, &policy, yes)
        }
    }
}

#[cfg(windows)]
fn cmd_list(config: ScanConfig, json: bool, all: bool) -> anyhow::Result<()> {
    use conceal_drive::host::WindowsHost;
    use conceal_drive::TopologyBuilder;

    let host = WindowsHost::new();
    let devices = TopologyBuilder::new(&host).with_config(config)?.enumerate();
    print_devices(devices, json, all)
}

#[cfg(not(windows))]
fn cmd_list(config: ScanConfig, _json: bool, _all: bool) -> anyhow::Result<()> {
    config.validate().map_err(Error::InvalidConfig)?;
    Err(Error::Unsupported("device enumeration requires a Windows host".to_string()).into())
}

#[cfg_attr(not(windows), allow(dead_code))]
fn print_devices(devices: Vec<Device>, json: bool, all: bool) -> anyhow::Result<()> {
    let devices: Vec<Device> = devices
        .into_iter()
        .filter(|d| all || d.is_listed())
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&devices).context("Cannot serialize devices")?;
        println!("{}", text);
        return Ok(());
    }

    if devices.is_empty() {
        println!("(no devices found)");
        return Ok(());
    }

    println!("{:<36} {:<5} {:>12}  {}", "Device", "Mount", "Size", "Label");
    let mut first = true;
    for device in &devices {
        let name = if device.is_partition() && !device.is_dynamic_volume() {
            format!("  {}", device.path)
        } else {
            if !first {
                println!();
            }
            device.group_label()
        };
        first = false;

        let mount = device
            .mount_point
            .map(|m| m.to_string())
            .unwrap_or_default();
        let size = if device.size != 0 {
            format_size(device.size)
        } else {
            String::new()
        };
        let mut label = device.label.clone().unwrap_or_default();
        if device.contains_system {
            label.push_str(" [system]");
        }

        println!("{:<36} {:<5} {:>12}  {}", name, mount, size, label.trim_start());
    }

    Ok(())
}

fn cmd_conceal(device: &str, policy: &RetryPolicy, yes: bool) -> anyhow::Result<()> {
    policy.validate().map_err(Error::InvalidConfig)?;

    if !yes && !confirm(device)? {
        println!("Aborted");
        return Ok(());
    }

    let outcome = conceal_device(device, policy)?;
    println!("{}", outcome.message());

    Ok(())
}

fn confirm(device: &str) -> io::Result<bool> {
    eprint!(
        "This will modify the first {} bytes of {}. Continue? [y/N] ",
        conceal_drive::config::CONCEAL_WINDOW_SIZE,
        device
    );
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(windows)]
fn conceal_device(
    device: &str,
    policy: &RetryPolicy,
) -> conceal_drive::Result<conceal_drive::ConcealOutcome> {
    let host = conceal_drive::host::WindowsHost::new();
    conceal_drive::conceal_partition(&host, device, policy)
}

#[cfg(unix)]
fn conceal_device(
    device: &str,
    policy: &RetryPolicy,
) -> conceal_drive::Result<conceal_drive::ConcealOutcome> {
    conceal_drive::conceal::conceal_file(std::path::Path::new(device), policy)
}

#[cfg(not(any(windows, unix)))]
fn conceal_device(
    _device: &str,
    _policy: &RetryPolicy,
) -> conceal_drive::Result<conceal_drive::ConcealOutcome> {
    Err(Error::Unsupported("no raw device access on this platform".to_string()))
}

/// Human-readable size with two decimals, binary units.
fn format_size(size: u64) -> String {
    const KIB: u64 = 1024;
    const UNITS: [(u64, &str); 5] = [
        (KIB * KIB * KIB * KIB * KIB, "PiB"),
        (KIB * KIB * KIB * KIB, "TiB"),
        (KIB * KIB * KIB, "GiB"),
        (KIB * KIB, "MiB"),
        (KIB, "KiB"),
    ];

    for (scale, unit) in UNITS {
        // KiB starts at exactly 1024, the larger units only above their scale
        if size > scale || (scale == KIB && size == KIB) {
            return format!("{:.2} {}", size as f64 / scale as f64, unit);
        }
    }
    format!("{} Bytes", size)
}
