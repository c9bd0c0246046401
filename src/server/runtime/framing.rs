//! Line-level screening in front of the rmcp stdio transport.
//!
//! rmcp treats an undecodable line as end of stream. The relay here decodes
//! every inbound line first, answers the ones the service could never handle
//! with a JSON-RPC error, and forwards the rest unchanged.
use std::{io, sync::Arc};

use rmcp::model::{ClientJsonRpcMessage, ErrorCode, ErrorData};
use serde_json::{json, Value};
use tokio::{
    io::{
        AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, WriteHalf,
    },
    sync::Mutex,
    task::JoinHandle,
};

const RELAY_BUFFER_BYTES: usize = 64 * 1024;

/// Client-to-server methods the rmcp model can decode.
const CLIENT_METHODS: &[&str] = &[
    "initialize",
    "ping",
    "completion/complete",
    "logging/setLevel",
    "prompts/get",
    "prompts/list",
    "resources/list",
    "resources/templates/list",
    "resources/read",
    "resources/subscribe",
    "resources/unsubscribe",
    "tools/call",
    "tools/list",
    "notifications/cancelled",
    "notifications/progress",
    "notifications/initialized",
    "notifications/roots/list_changed",
];

/// Outcome of screening one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    /// A decodable message, normalized, to hand to the service.
    Forward(String),
    /// An error response to write back instead.
    Reject(Value),
    /// Nothing to forward and nothing to answer.
    Skip,
}

/// Background tasks moving lines between the real stdio and the service.
pub struct LineRelay {
    inbound: JoinHandle<()>,
    outbound: JoinHandle<io::Result<()>>,
}

impl LineRelay {
    /// Wait until every service response has reached the output, then stop
    /// reading input.
    pub async fn finish(self) -> io::Result<()> {
        let flushed = match self.outbound.await {
            Ok(result) => result,
            Err(err) => Err(io::Error::other(err)),
        };
        self.inbound.abort();
        flushed
    }
}

/// Start relaying `input` and `output` through an in-memory pipe. The
/// returned stream is the service side of that pipe.
pub fn relay_lines<R, W>(input: R, output: W) -> (DuplexStream, LineRelay)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (service_end, relay_end) = tokio::io::duplex(RELAY_BUFFER_BYTES);
    let (from_service, to_service) = tokio::io::split(relay_end);
    let output = Arc::new(Mutex::new(output));

    let inbound = tokio::spawn(screen_inbound(input, to_service, output.clone()));
    let outbound = tokio::spawn(async move {
        let mut lines = BufReader::new(from_service).lines();
        while let Some(line) = lines.next_line().await? {
            write_line(&output, &line).await?;
        }
        Ok(())
    });

    (service_end, LineRelay { inbound, outbound })
}

/// Decide what to do with one line of client input.
pub fn screen_line(line: &str) -> Screened {
    let line = line.trim();
    if line.is_empty() {
        return Screened::Skip;
    }

    let mut value = match serde_json::from_str::<Value>(line) {
        Ok(value) => value,
        Err(err) => {
            return Screened::Reject(error_response(
                Value::Null,
                ErrorData::parse_error(format!("Parse error: {err}"), None),
            ))
        }
    };
    if let Some(object) = value.as_object_mut() {
        object
            .entry("jsonrpc")
            .or_insert_with(|| Value::String("2.0".into()));
    }

    let decode_error = match serde_json::from_value::<ClientJsonRpcMessage>(value.clone()) {
        Ok(_) => return Screened::Forward(value.to_string()),
        Err(err) => err,
    };

    let id = value
        .get("id")
        .filter(|id| id.is_string() || id.is_number())
        .cloned();
    let method = value.get("method").and_then(Value::as_str);
    match (method, id) {
        (Some(method), None) => {
            tracing::debug!(
                target: "mcp_chat::runtime",
                method,
                reason = %decode_error,
                "Dropping undecodable notification"
            );
            Screened::Skip
        }
        (Some(method), Some(id)) if CLIENT_METHODS.contains(&method) => Screened::Reject(
            error_response(
                id,
                ErrorData::invalid_params(format!("Invalid params for {method}: {decode_error}"), None),
            ),
        ),
        (Some(method), Some(id)) => Screened::Reject(error_response(
            id,
            ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
                None,
            ),
        )),
        (None, id) => Screened::Reject(error_response(
            id.unwrap_or(Value::Null),
            ErrorData::invalid_request(format!("Invalid request: {decode_error}"), None),
        )),
    }
}

fn error_response(id: Value, error: ErrorData) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error,
    })
}

async fn screen_inbound<R, W>(input: R, mut to_service: WriteHalf<DuplexStream>, output: Arc<Mutex<W>>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(input);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(target: "mcp_chat::runtime", reason = %err, "Failed to read stdin");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buffer);
        let delivered = match screen_line(&line) {
            Screened::Forward(message) => {
                let mut framed = message.into_bytes();
                framed.push(b'\n');
                to_service.write_all(&framed).await
            }
            Screened::Reject(response) => {
                tracing::warn!(
                    target: "mcp_chat::runtime",
                    code = response["error"]["code"].as_i64(),
                    "Rejected client message"
                );
                write_line(&output, &response.to_string()).await
            }
            Screened::Skip => Ok(()),
        };
        if let Err(err) = delivered {
            tracing::debug!(target: "mcp_chat::runtime", reason = %err, "Relay stopped");
            break;
        }
    }
    // EOF on the service side ends the session the same way a closed stdin would.
    let _ = to_service.shutdown().await;
}

async fn write_line<W: AsyncWrite + Unpin>(output: &Mutex<W>, line: &str) -> io::Result<()> {
    let mut output = output.lock().await;
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
