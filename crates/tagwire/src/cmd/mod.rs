use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use crossbeam_channel::Receiver;
use tagwire_codec::Codec;
use tagwire_router::{Router, RouterConfig};
use tagwire_transport::UdsTransporter;

use crate::exit::{router_error, CliError, CliResult, INTERNAL, USAGE};
use crate::message::{self, CliMessage};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

/// Start-up window for UDS routers. Binding is local, so failures show fast.
const PREPARE_PERIOD: Duration = Duration::from_millis(200);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Echo every received message back to a peer.
    Echo(EchoArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Listen and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Socket path to echo to. Defaults to each message's reply address.
    #[arg(long, env = "TAGWIRE_PEER")]
    pub peer: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["text", "ping"])))]
pub struct SendArgs {
    /// Socket path of the receiving router.
    pub destination: PathBuf,
    /// Local socket path to bind for replies. Defaults to a temporary path.
    #[arg(long, env = "TAGWIRE_FROM")]
    pub from: Option<PathBuf>,
    /// Send a text message.
    #[arg(long, conflicts_with = "ping")]
    pub text: Option<String>,
    /// Send a ping with this sequence number.
    #[arg(long, value_name = "SEQ", conflicts_with = "text")]
    pub ping: Option<u64>,
    /// Wait for one reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for delivery and, with --wait, the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Router on a UDS transporter at `path` with the CLI message set registered.
pub fn uds_router(
    path: &Path,
    enable_recv: bool,
    enable_handler: bool,
) -> CliResult<Router<CliMessage>> {
    let config = RouterConfig {
        prepare_period: PREPARE_PERIOD,
        ..RouterConfig::new(enable_recv, enable_handler)
    };
    let transporter = Arc::new(UdsTransporter::new(path));
    let mut router = Router::with_config(Codec::json(), transporter, config)
        .map_err(|err| router_error("router setup failed", err))?;
    message::register(&mut router).map_err(|err| router_error("registration failed", err))?;
    Ok(router)
}

/// Channel that becomes readable on Ctrl-C.
pub fn install_ctrlc_handler() -> CliResult<Receiver<()>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(rx)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
