use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{instrument, warn};

/// Longest reply line accepted from the oracle.
const MAX_REPLY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionOutcome {
    Recognized,
    NotRecognized,
    /// Transport failure, timeout or a reply we could not read.
    Unavailable,
}

/// Face verification boundary. Implementations never error: every failure
/// folds into `Unavailable`.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    async fn verify(&self, reference_image_path: &str, live_image_base64: &str) -> RecognitionOutcome;
}

#[derive(Serialize)]
struct OracleRequest<'a> {
    client_image_data: &'a str,
    db_image_path: &'a str,
}

#[derive(Deserialize)]
struct OracleReply {
    status: String,
    #[serde(default)]
    message: String,
}

/// Client for the face oracle: one newline-delimited JSON request and
/// reply per TCP connection.
pub struct TcpFaceOracle {
    addr: String,
    timeout: Duration,
}

impl TcpFaceOracle {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    async fn round_trip(&self, request: &OracleRequest<'_>) -> std::io::Result<String> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');

        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(&payload).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream.take(MAX_REPLY_BYTES));
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "oracle closed the connection without replying",
            ));
        }
        if !line.ends_with('\n') && read as u64 >= MAX_REPLY_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "oracle reply exceeds the size limit",
            ));
        }
        Ok(line)
    }
}

#[async_trait]
impl IdentityGate for TcpFaceOracle {
    #[instrument(name = "face_oracle_verify", skip(self, live_image_base64), fields(addr = %self.addr))]
    async fn verify(&self, reference_image_path: &str, live_image_base64: &str) -> RecognitionOutcome {
        let request = OracleRequest {
            client_image_data: live_image_base64,
            db_image_path: reference_image_path,
        };

        let line = match tokio::time::timeout(self.timeout, self.round_trip(&request)).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                warn!(error = %e, "Face oracle unreachable");
                return RecognitionOutcome::Unavailable;
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Face oracle timed out");
                return RecognitionOutcome::Unavailable;
            }
        };

        let reply: OracleReply = match serde_json::from_str(line.trim_end()) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Malformed face oracle reply");
                return RecognitionOutcome::Unavailable;
            }
        };

        match reply.status.as_str() {
            "recognized" => RecognitionOutcome::Recognized,
            other => {
                warn!(status = other, message = %reply.message, "Face not recognized");
                RecognitionOutcome::NotRecognized
            }
        }
    }
}
