use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, Context};
use flow_core::stdio::{stdout_writer, StdinReader};
use flow_core::timed_writer::TimedWriter;
use tracing_subscriber::EnvFilter;

/// `flow`: the multiplex-and-forward engine's command-line surface.
/// Subcommands, not a single mode, since `config-apply` and `serial` serve
/// different audiences (a declared topology vs. a one-off wire tap) and
/// `serialls` is a pure diagnostic.
#[derive(Parser, Debug)]
#[command(name = "flow")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, validate and run a config document until shutdown.
    ConfigApply {
        #[arg(short = 'f', long)]
        file: PathBuf,
    },
    /// List serial ports visible to the OS, one per line.
    Serialls,
    /// Open a serial port directly and bridge it to stdin/stdout.
    Serial {
        #[arg(long = "com")]
        com: String,
        #[arg(long)]
        baud: u32,
        #[arg(long, default_value = "")]
        parity: String,
        #[arg(long = "data-size", default_value_t = 8)]
        data_size: u8,
        #[arg(long = "two-stop-bits", default_value_t = false)]
        two_stop_bits: bool,
    },
    /// Print usage information.
    Help,
}

fn main() -> eyre::Result<()> {
    color_eyre::install().context("installing color_eyre")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // An unrecognised subcommand or flag falls back to `help` rather than
    // clap's own usage error, matching every other no-argument path below.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            print_help();
            return Ok(());
        }
    };
    match args.command {
        Some(Command::ConfigApply { file }) => config_apply(file),
        Some(Command::Serialls) => {
            serialls();
            Ok(())
        }
        Some(Command::Serial {
            com,
            baud,
            parity,
            data_size,
            two_stop_bits,
        }) => serial(com, baud, parity, data_size, two_stop_bits),
        Some(Command::Help) | None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("flow: a configurable byte-stream forwarder");
    println!();
    println!("USAGE:");
    println!("    flow config-apply -f <path>");
    println!("    flow serialls");
    println!("    flow serial --com <dev> --baud <n> [--parity even|odd] [--data-size <n>] [--two-stop-bits]");
    println!("    flow help");
}

/// Loads and validates `path`, then runs the forwarder loop to completion.
/// Validation or endpoint-open failures are fatal and printed via
/// `eyre`'s chain; once the loop is running, only a shutdown signal or the
/// configured idle timeout end it.
fn config_apply(path: PathBuf) -> eyre::Result<()> {
    let config = flow_config::load_from_path(&path)
        .wrap_err_with(|| format!("loading configuration from {}", path.display()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("installing SIGINT/SIGTERM handler")?;
    }

    flow_config::run(
        &config,
        Box::new(StdinReader::new()),
        Box::new(stdout_writer()),
        shutdown,
    )
    .context("running forwarder")?;

    println!("Closed cleanly...");
    Ok(())
}

fn serialls() {
    for port in flow_core::serial::list_ports() {
        println!("{port}");
    }
}

/// Opens a serial port directly, bypassing the config schema entirely:
/// stdin is echoed to the port on the current thread while a background
/// thread streams the port's reads to stdout through the same
/// `TimedWriter` the forwarder uses elsewhere, so interactive output
/// appears promptly rather than sitting in a buffer.
fn serial(
    com: String,
    baud: u32,
    parity: String,
    data_size: u8,
    two_stop_bits: bool,
) -> eyre::Result<()> {
    let settings = flow_core::serial::SerialSettings::parse(baud, &parity, data_size, two_stop_bits, 100)
        .context("parsing serial port settings")?;
    let (mut reader, mut writer) =
        flow_core::serial::SerialReader::open(&com, &settings).context("opening serial port")?;

    let read_thread = std::thread::spawn(move || -> std::io::Result<()> {
        let mut out = TimedWriter::stdout(flow_core::stdio::StdoutSink::new());
        let mut buf = [0u8; 4096];
        loop {
            let n = std::io::Read::read(&mut reader, &mut buf)?;
            if n > 0 {
                out.write_all(&buf[..n])?;
            }
        }
    });

    let mut stdin = std::io::stdin();
    let mut buf = [0u8; 4096];
    loop {
        let n = std::io::Read::read(&mut stdin, &mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).context("writing to serial port")?;
    }

    let _ = read_thread;
    Ok(())
}
