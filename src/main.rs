use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use udpscript::udp::{DEFAULT_CLIENT_HOST, DEFAULT_CLIENT_PORT, DEFAULT_SERVER_PORT};
use udpscript::{
    LineEnding, ScriptExecutor, Transport, UdpConfig, UdpMode, UdpTransport, report,
};

#[derive(Parser, Debug)]
#[command(
    name = "udpscript",
    about = "Replay udpscript scripts against a UDP peer",
    version
)]
struct Args {
    /// Script file to run; repeat to run several in order
    #[arg(short = 'c', long = "script-file", required = true)]
    script_files: Vec<PathBuf>,

    /// Host to send datagrams to
    #[arg(short = 'n', long, default_value = DEFAULT_CLIENT_HOST)]
    client_host_name: String,

    /// Port to send datagrams to
    #[arg(short = 'p', long, default_value_t = DEFAULT_CLIENT_PORT)]
    client_port_number: u16,

    /// Local port to receive datagrams on
    #[arg(short = 'd', long, default_value_t = DEFAULT_SERVER_PORT)]
    server_port_number: u16,

    /// Local port to send datagrams from (random if omitted)
    #[arg(short = 'g', long)]
    client_return_address_port_number: Option<u16>,

    /// Line ending appended to every write: none, cr, lf or crlf
    #[arg(short = 'e', long, default_value = "none")]
    line_ending: LineEnding,

    /// Milliseconds a READ waits for a datagram
    #[arg(short = 't', long, default_value_t = 25)]
    read_timeout_ms: u64,

    /// Only open the sending socket
    #[arg(short = 's', long, conflicts_with = "receive_only")]
    send_only: bool,

    /// Only open the receiving socket
    #[arg(long)]
    receive_only: bool,
}

impl Args {
    fn udp_config(&self) -> UdpConfig {
        let mode = if self.send_only {
            UdpMode::SendOnly
        } else if self.receive_only {
            UdpMode::ReceiveOnly
        } else {
            UdpMode::Duplex
        };
        UdpConfig {
            client_host: self.client_host_name.clone(),
            client_port: self.client_port_number,
            server_port: self.server_port_number,
            return_port: self
                .client_return_address_port_number
                .unwrap_or_else(udpscript::udp::random_return_port),
            line_ending: self.line_ending,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            mode,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.udp_config();

    // Load everything up front so a bad script fails before any traffic.
    let mut executors = Vec::with_capacity(args.script_files.len());
    for path in &args.script_files {
        if executors.iter().any(|e: &ScriptExecutor| e.script_path() == Some(path.as_path())) {
            continue;
        }
        let executor = ScriptExecutor::from_file(path)
            .with_context(|| format!("Failed to load script file: {}", path.display()))?;
        executors.push(executor);
    }

    println!("Using ClientHostName={}", config.client_host);
    println!("Using ClientPortNumber={}", config.client_port);
    println!("Using ServerPortNumber={}", config.server_port);
    println!("Using ClientReturnAddressPortNumber={}", config.return_port);
    println!("Using LineEnding={}", config.line_ending);

    let mut transport = UdpTransport::new(config);
    transport
        .open()
        .await
        .with_context(|| format!("Failed to open UDP transport to {}", transport.port_name()))?;
    println!("Successfully opened UDP port {}\n", transport.port_name());

    // Give the peer a moment before the first datagram.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let observers = report::stdout_observers();
    let total = executors.len();
    for (i, executor) in executors.iter().enumerate() {
        let name = executor
            .script_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if !executor.has_commands() {
            println!("ScriptFile {name} ({}/{total}) has no commands, skipping script", i + 1);
            continue;
        }
        println!("Executing ScriptFile {name} ({}/{total})", i + 1);
        executor
            .execute(Some(&mut transport), &observers)
            .await
            .with_context(|| format!("Failed to execute script file: {name}"))?;
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    transport
        .flush_both()
        .await
        .context("Failed to flush UDP transport")?;
    transport.close().await.context("Failed to close UDP transport")?;

    Ok(())
}
