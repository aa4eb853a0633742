//! Client for the external node: a line-delimited JSON RPC over TCP.
//!
//! One actor task owns the socket. [`NodeHandle`]s talk to it through a
//! command channel and get answers back on oneshot channels; records from
//! the live read stream are forwarded on their own channel.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::message::MESSAGE_TYPE;
use crate::wire::{Content, Envelope};

const PRIVATE_PUBLISH: &str = "private.publish";

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("could not connect to node at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("node I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed node frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("node error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("node does not offer {0}")]
    Unsupported(&'static str),

    #[error("node connection closed")]
    Closed,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Set on the last frame of a stream.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

type Reply = oneshot::Sender<Result<Value, NodeError>>;

enum NodeCommand {
    Call {
        method: String,
        params: Value,
        reply: Reply,
    },
    Stream {
        method: String,
        params: Value,
        sink: mpsc::Sender<Envelope>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap, cloneable access to a connected node.
#[derive(Clone)]
pub struct NodeHandle {
    tx: mpsc::Sender<NodeCommand>,
    /// The node's own feed identifier.
    pub id: String,
    /// Whether `private.publish` is in the node's manifest.
    pub private_capable: bool,
}

/// Connect, learn who we are and what the node can do, and open the live
/// read stream of chat records sent at or after `since` (epoch ms).
pub async fn connect(
    addr: &str,
    since: i64,
) -> Result<(NodeHandle, mpsc::Receiver<Envelope>), NodeError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| NodeError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    info!(%addr, "connected to node");

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run_actor(stream, rx));

    let mut handle = NodeHandle {
        tx,
        id: String::new(),
        private_capable: false,
    };

    let whoami = handle.call("whoami", Value::Null).await?;
    handle.id = whoami
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::Remote {
            code: "BAD_WHOAMI".to_string(),
            message: format!("unexpected whoami reply: {whoami}"),
        })?
        .to_string();

    let manifest = handle.call("manifest", Value::Null).await?;
    handle.private_capable = manifest
        .as_array()
        .is_some_and(|methods| methods.iter().any(|m| m.as_str() == Some(PRIVATE_PUBLISH)));
    debug!(id = %handle.id, private = handle.private_capable, "node identity");

    let (sink, records) = mpsc::channel(256);
    handle
        .tx
        .send(NodeCommand::Stream {
            method: "read".to_string(),
            params: json!({ "type": MESSAGE_TYPE, "since": since, "live": true, "reverse": true }),
            sink,
        })
        .await
        .map_err(|_| NodeError::Closed)?;

    Ok((handle, records))
}

impl NodeHandle {
    pub async fn publish(&self, content: &Content) -> Result<(), NodeError> {
        self.call("publish", serde_json::to_value(content)?).await?;
        Ok(())
    }

    pub async fn publish_private(
        &self,
        content: &Content,
        recipients: &[String],
    ) -> Result<(), NodeError> {
        if !self.private_capable {
            return Err(NodeError::Unsupported(PRIVATE_PUBLISH));
        }
        let params = json!({ "content": content, "recps": recipients });
        self.call(PRIVATE_PUBLISH, params).await?;
        Ok(())
    }

    /// The name `id` has given itself, if any.
    pub async fn display_name(&self, id: &str) -> Result<Option<String>, NodeError> {
        let name = self.call("about.name", json!({ "dest": id })).await?;
        Ok(name.as_str().filter(|n| !n.is_empty()).map(str::to_string))
    }

    /// Tell the node goodbye and stop the actor; the read stream ends too.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(NodeCommand::Close { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, NodeError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(NodeCommand::Call {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| NodeError::Closed)?;
        answer.await.map_err(|_| NodeError::Closed)?
    }
}

async fn run_actor(stream: TcpStream, mut commands: mpsc::Receiver<NodeCommand>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut next_id: u64 = 1;
    let mut pending: HashMap<u64, Reply> = HashMap::new();
    let mut streams: HashMap<u64, mpsc::Sender<Envelope>> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let id = next_id;
                next_id += 1;
                match command {
                    NodeCommand::Call { method, params, reply } => {
                        match send_request(&mut write, id, method, params).await {
                            Ok(()) => { pending.insert(id, reply); }
                            Err(e) => { let _ = reply.send(Err(e)); }
                        }
                    }
                    NodeCommand::Stream { method, params, sink } => {
                        match send_request(&mut write, id, method, params).await {
                            Ok(()) => { streams.insert(id, sink); }
                            Err(e) => warn!("could not open stream: {e}"),
                        }
                    }
                    NodeCommand::Close { reply } => {
                        if let Err(e) = send_request(&mut write, id, "close".to_string(), Value::Null).await {
                            debug!("close request not delivered: {e}");
                        }
                        let _ = write.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => route_frame(&line, &mut pending, &mut streams).await,
                    Ok(None) => {
                        info!("node closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("node read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(NodeError::Closed));
    }
}

async fn send_request(
    write: &mut OwnedWriteHalf,
    id: u64,
    method: String,
    params: Value,
) -> Result<(), NodeError> {
    let mut frame = serde_json::to_string(&Request { id, method, params })?;
    frame.push('\n');
    write.write_all(frame.as_bytes()).await?;
    write.flush().await?;
    Ok(())
}

async fn route_frame(
    line: &str,
    pending: &mut HashMap<u64, Reply>,
    streams: &mut HashMap<u64, mpsc::Sender<Envelope>>,
) {
    let response: Response = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!("unparseable node frame: {e}");
            return;
        }
    };

    if let Some(sink) = streams.get(&response.id).cloned() {
        if let Some(error) = &response.error {
            warn!(code = %error.code, "stream error: {}", error.message);
        }
        if response.end || response.error.is_some() {
            streams.remove(&response.id);
            return;
        }
        let Some(result) = response.result else { return };
        match serde_json::from_value::<Envelope>(result) {
            Ok(record) => {
                if sink.send(record).await.is_err() {
                    debug!("record receiver dropped");
                    streams.remove(&response.id);
                }
            }
            Err(e) => debug!("dropping malformed record: {e}"),
        }
        return;
    }

    let Some(reply) = pending.remove(&response.id) else {
        debug!(id = response.id, "reply for unknown request");
        return;
    };
    let outcome = match response.error {
        Some(ErrorInfo { code, message }) => Err(NodeError::Remote { code, message }),
        None => Ok(response.result.unwrap_or(Value::Null)),
    };
    let _ = reply.send(outcome);
}
