//! TCP protocol for frame-sender ↔ angle-server communication.
//!
//! Length-delimited frames over one persistent connection. Client payloads
//! are raw encoded image bytes; server payloads are JSON messages.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::pipeline::FrameResult;
use crate::pose::Point2D;

/// Error text for a frame payload that could not be decoded.
pub const DECODE_ERROR: &str = "Image cannot be decoded";
/// Error text for a frame that decoded but failed inference.
pub const INFERENCE_ERROR: &str = "Inference failed";

/// Server → client, exactly one message per received frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ServerMessage {
    Frame {
        /// Part name → pixel coordinates, null when not detected
        keypoints: BTreeMap<String, Option<Point2D>>,
        /// Triplet label → degrees
        angles: BTreeMap<String, f32>,
    },
    Error {
        error: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

impl From<&FrameResult> for ServerMessage {
    fn from(result: &FrameResult) -> Self {
        let keypoints = result
            .keypoints
            .iter()
            .map(|(part, point)| (part.name().to_string(), point))
            .collect();
        Self::Frame {
            keypoints,
            angles: result.angles.clone(),
        }
    }
}

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(16 * 1024 * 1024) // 16MB
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a server message (JSON + length prefix).
pub async fn send_message(stream: &mut MessageStream, msg: &ServerMessage) -> anyhow::Result<()> {
    let data = serde_json::to_vec(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Send one raw frame payload (client side).
pub async fn send_frame(stream: &mut MessageStream, image_bytes: Vec<u8>) -> anyhow::Result<()> {
    stream.send(Bytes::from(image_bytes)).await?;
    Ok(())
}

/// Receive and parse the next server message (client side).
/// Returns None when the server closed the connection.
pub async fn recv_message(stream: &mut MessageStream) -> anyhow::Result<Option<ServerMessage>> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}
