use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, uds_router, EchoArgs};
use crate::exit::{router_error, CliResult, SUCCESS};
use crate::message::{CliKind, CliMessage};

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let interrupted = install_ctrlc_handler()?;
    let mut router = uds_router(&args.path, false, true)?;
    let peer = args
        .peer
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned());

    for kind in CliKind::ALL {
        let outbox = router.outbox();
        let peer = peer.clone();
        router
            .register_handler(kind, move |msg: &CliMessage| {
                let Some(destination) = peer.as_deref().or(msg.reply_to()) else {
                    warn!(kind = kind.as_str(), "no peer or reply address, dropping message");
                    return;
                };
                info!(kind = kind.as_str(), destination, "echoing message");
                if let Err(err) = outbox.send(destination, msg.clone()) {
                    warn!(error = %err, destination, "failed queueing echo");
                }
            })
            .map_err(|err| router_error("handler setup failed", err))?;
    }

    router
        .start()
        .map_err(|err| router_error("echo failed", err))?;
    info!(path = %args.path.display(), "echo router running");

    let _ = interrupted.recv();
    router
        .destroy()
        .map_err(|err| router_error("shutdown failed", err))?;
    Ok(SUCCESS)
}
