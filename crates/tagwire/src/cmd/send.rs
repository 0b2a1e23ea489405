use std::path::{Path, PathBuf};

use crate::cmd::{parse_duration, uds_router, SendArgs};
use crate::exit::{router_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::message::CliMessage;
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    if !args.destination.exists() {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!("send failed: {} does not exist", args.destination.display()),
        ));
    }

    let (from, temporary) = match &args.from {
        Some(path) => (path.clone(), false),
        None => (default_reply_path(), true),
    };
    let msg = build_message(&args, &from)?;

    let result = exchange(&args, &from, msg, wait_timeout, format);
    if temporary {
        let _ = std::fs::remove_file(&from);
    }
    result
}

fn exchange(
    args: &SendArgs,
    from: &Path,
    msg: CliMessage,
    wait_timeout: std::time::Duration,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut router = uds_router(from, true, false)?;
    router
        .start()
        .map_err(|err| router_error("start failed", err))?;

    let destination = args.destination.to_string_lossy();
    router
        .send(&destination, msg)
        .map_err(|err| router_error("send failed", err))?;
    router
        .flush(wait_timeout)
        .map_err(|err| router_error("send failed", err))?;

    if args.wait {
        let reply = router
            .recv_timeout(wait_timeout)
            .map_err(|err| router_error("no reply", err))?;
        print_message(&reply, format);
    }

    router
        .destroy()
        .map_err(|err| router_error("shutdown failed", err))?;
    Ok(SUCCESS)
}

fn build_message(args: &SendArgs, from: &Path) -> CliResult<CliMessage> {
    let reply_to = Some(from.to_string_lossy().into_owned());
    match (&args.text, args.ping) {
        (Some(text), None) => Ok(CliMessage::Text {
            text: text.clone(),
            reply_to,
        }),
        (None, Some(seq)) => Ok(CliMessage::Ping { seq, reply_to }),
        _ => Err(CliError::new(USAGE, "exactly one of --text or --ping is required")),
    }
}

fn default_reply_path() -> PathBuf {
    std::env::temp_dir().join(format!("tagwire-send-{}.sock", std::process::id()))
}
