//! Two routers on one in-memory network: `client` asks, `server` answers.
//!
//! Run with `cargo run -p tagwire --example echo-router`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagwire::codec::{Codec, Message};
use tagwire::router::{Router, RouterError};
use tagwire::transport::MemoryNetwork;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Rpc {
    Ask { id: u32, question: String },
    Answer { id: u32, answer: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RpcKind {
    Ask,
    Answer,
}

impl Message for Rpc {
    type Kind = RpcKind;

    fn kind(&self) -> RpcKind {
        match self {
            Rpc::Ask { .. } => RpcKind::Ask,
            Rpc::Answer { .. } => RpcKind::Answer,
        }
    }
}

fn register(router: &mut Router<Rpc>) -> Result<(), RouterError> {
    router.register_message(&Rpc::Ask {
        id: 0,
        question: String::new(),
    })?;
    router.register_message(&Rpc::Answer {
        id: 0,
        answer: String::new(),
    })?;
    Ok(())
}

fn main() -> Result<(), RouterError> {
    let network = MemoryNetwork::new();

    let mut server: Router<Rpc> =
        Router::new(Codec::json(), Arc::new(network.bind("server")), false, true)?;
    register(&mut server)?;
    let outbox = server.outbox();
    server.register_handler(RpcKind::Ask, move |msg| {
        if let Rpc::Ask { id, question } = msg {
            let answer = Rpc::Answer {
                id: *id,
                answer: question.to_uppercase(),
            };
            if let Err(err) = outbox.send("client", answer) {
                eprintln!("server: reply failed: {err}");
            }
        }
    })?;
    server.start()?;

    let mut client: Router<Rpc> =
        Router::new(Codec::json(), Arc::new(network.bind("client")), true, false)?;
    register(&mut client)?;
    client.start()?;

    for (id, question) in ["is this thing on", "what is the tag of ask"]
        .into_iter()
        .enumerate()
    {
        client.send(
            "server",
            Rpc::Ask {
                id: id as u32,
                question: question.to_string(),
            },
        )?;
    }
    for _ in 0..2 {
        match client.recv_timeout(Duration::from_secs(2))? {
            Rpc::Answer { id, answer } => println!("answer {id}: {answer}"),
            other => println!("unexpected: {other:?}"),
        }
    }

    client.destroy()?;
    server.destroy()?;
    Ok(())
}
