//! # uartlink
//!
//! Serial console built on the uartlink byte pipeline.
//!
//! Binds a serial port, copies everything received to stdout and sends each
//! stdin line to the port. The inspector logs a preview of buffered bytes
//! once per period. With `--loopback` an in-memory link replaces the port
//! and stdin lines are treated as received bytes, which is handy for trying
//! out echo and inspector settings without hardware.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use uartlink_core::LinkConfig;
use uartlink_core::constants::MAX_TRANSFER_CHUNK;
use uartlink_echo::{EchoError, LinkBinding, ReadMode, Session};
use uartlink_hardware::{AnyLink, MockLink, MockLinkHandle, SerialPortLink};

/// uartlink: buffer, echo and log a UART byte stream
#[derive(Parser, Debug)]
#[command(name = "uartlink")]
#[command(version)]
#[command(about = "Buffer, echo and log a UART byte stream")]
struct Args {
    /// Serial device path, e.g. /dev/ttyUSB0.
    #[arg(required_unless_present = "loopback")]
    port: Option<String>,

    /// JSON property file. Flags given on the command line override it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Line speed in bits per second.
    #[arg(long)]
    speed: Option<u32>,

    /// Send every received chunk straight back to the port.
    #[arg(long)]
    echo: bool,

    /// Inspector period in milliseconds.
    #[arg(long, value_name = "MS")]
    period_ms: Option<u32>,

    /// Receive FIFO capacity in bytes.
    #[arg(long, value_name = "BYTES")]
    capacity: Option<usize>,

    /// Name to publish the stream endpoint under.
    #[arg(long)]
    endpoint_name: Option<String>,

    /// Text written to the port once it is open.
    #[arg(long)]
    greeting: Option<String>,

    /// Use an in-memory link; stdin lines arrive as received bytes.
    #[arg(long)]
    loopback: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("uartlink v{} starting...", uartlink_core::VERSION);

    if let Err(e) = run(args).await {
        error!("FATAL: {e:#}");
        process::exit(1);
    }

    info!("uartlink shutdown complete");
    // tokio's stdin reader is a blocking thread that would keep the runtime alive.
    process::exit(0);
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    let (link, loopback) = if args.loopback {
        let (link, handle) = MockLink::with_name("loopback".to_string());
        (AnyLink::Mock(link), Some(handle))
    } else {
        let path = args.port.clone().context("no serial port given")?;
        (AnyLink::Serial(SerialPortLink::new(path, config.speed)), None)
    };

    let binding = LinkBinding::bind(link, config)
        .await
        .context("failed to bind serial link")?;
    let session = Arc::new(binding.open()?);
    info!("endpoint {} ready", binding.endpoint().name());

    let pump = tokio::spawn(pump_to_stdout(Arc::clone(&session)));
    let result = forward_stdin(&session, loopback.as_ref()).await;

    binding.unbind().await;
    match pump.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("stdout pump stopped: {e:#}"),
        Err(e) => warn!("stdout pump panicked: {e}"),
    }

    result
}

/// Build the binding configuration from the property file and flags.
fn load_config(args: &Args) -> Result<LinkConfig> {
    let mut config = match &args.config {
        Some(path) => LinkConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LinkConfig::default(),
    };

    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if args.echo {
        config.echo = true;
    }
    if let Some(period_ms) = args.period_ms {
        config.period_ms = period_ms;
    }
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(name) = &args.endpoint_name {
        config.endpoint_name = name.clone();
    }
    if let Some(greeting) = &args.greeting {
        config.greeting = Some(greeting.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Copy session reads to stdout until the binding is torn down.
async fn pump_to_stdout(session: Arc<Session<AnyLink>>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    loop {
        match session.read(MAX_TRANSFER_CHUNK, ReadMode::Blocking).await {
            Ok(data) => {
                stdout.write_all(&data).await?;
                stdout.flush().await?;
            }
            Err(EchoError::Cancelled) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Send stdin lines to the link until Ctrl-C.
///
/// A closed stdin stops forwarding but keeps the link bound, so the tool
/// can run detached as a pure logger.
async fn forward_stdin(session: &Session<AnyLink>, loopback: Option<&MockLinkHandle>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("failed to listen for Ctrl-C")?;
                info!("interrupted, unbinding");
                return Ok(());
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(mut line) => {
                        line.push_str("\r\n");
                        send_line(session, loopback, line.as_bytes())?;
                    }
                    None => {
                        info!("stdin closed, press Ctrl-C to exit");
                        stdin_open = false;
                    }
                }
            }
        }
    }
}

fn send_line(
    session: &Session<AnyLink>,
    loopback: Option<&MockLinkHandle>,
    data: &[u8],
) -> Result<()> {
    if let Some(handle) = loopback {
        handle.inject(data)?;
        return Ok(());
    }

    let mut rest = data;
    while !rest.is_empty() {
        let written = session.write(rest)?;
        if written == 0 {
            warn!("link accepted no bytes, dropping {} bytes", rest.len());
            break;
        }
        rest = &rest[written..];
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr; stdout carries the received byte stream.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_require_port_or_loopback() {
        assert!(Args::try_parse_from(["uartlink"]).is_err());
        assert!(Args::try_parse_from(["uartlink", "--loopback"]).is_ok());
        assert!(Args::try_parse_from(["uartlink", "/dev/ttyUSB0"]).is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "uartlink",
            "--loopback",
            "--speed",
            "9600",
            "--echo",
            "--period-ms",
            "250",
            "--capacity",
            "128",
            "--endpoint-name",
            "uart4_echo",
            "--greeting",
            "hello",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.speed, 9600);
        assert!(config.echo);
        assert_eq!(config.period_ms, 250);
        assert_eq!(config.capacity, 128);
        assert_eq!(config.endpoint_name, "uart4_echo");
        assert_eq!(config.greeting.as_deref(), Some("hello"));
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let args = Args::try_parse_from(["uartlink", "--loopback", "--period-ms", "0"]).unwrap();
        assert!(load_config(&args).is_err());
    }

    #[tokio::test]
    async fn test_loopback_line_reaches_session() {
        let (link, handle) = MockLink::new();
        let binding = LinkBinding::bind(AnyLink::Mock(link), LinkConfig::default())
            .await
            .unwrap();
        let session = binding.open().unwrap();

        send_line(&session, Some(&handle), b"ping\r\n").unwrap();
        let data = session.read(16, ReadMode::NonBlocking).await.unwrap();
        assert_eq!(&data[..], b"ping\r\n");

        send_line(&session, None, b"AT\r\n").unwrap();
        assert_eq!(handle.written(), b"AT\r\n");

        binding.unbind().await;
    }
}
