use std::time::Duration;

use tagwire_router::RouterError;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, uds_router, ListenArgs};
use crate::exit::{router_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// How often the receive loop checks for Ctrl-C.
const POLL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let interrupted = install_ctrlc_handler()?;
    let mut router = uds_router(&args.path, true, false)?;
    router
        .start()
        .map_err(|err| router_error("listen failed", err))?;
    info!(path = %args.path.display(), "listening");

    let mut printed = 0usize;
    while interrupted.is_empty() {
        let msg = match router.recv_timeout(POLL) {
            Ok(msg) => msg,
            Err(RouterError::Timeout(_)) => continue,
            Err(err) => return Err(router_error("receive failed", err)),
        };
        print_message(&msg, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    router
        .destroy()
        .map_err(|err| router_error("shutdown failed", err))?;
    Ok(SUCCESS)
}
