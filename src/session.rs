//! Per-connection control loop.
//!
//! One session owns one client connection end-to-end: receive an encoded
//! frame payload, decode it, hand it to the inference worker, emit the
//! result or a structured error, repeat until the peer disconnects or the
//! server shuts down.

use anyhow::Result;
use futures::StreamExt;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};

use crate::protocol::{self, ServerMessage};
use crate::worker::InferenceJob;

/// Decode one encoded image payload. None for malformed input.
fn decode_image(payload: &[u8]) -> Option<Mat> {
    let buf = Vector::<u8>::from_slice(payload);
    match imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR) {
        Ok(mat) if !mat.empty() => Some(mat),
        _ => None,
    }
}

/// Run one client session to completion.
///
/// Frames are processed strictly one at a time: the next frame is not read
/// from the connection until the current frame's response has been sent.
/// Returns Ok(()) on clean disconnect or shutdown; Err on transport faults.
pub async fn run_session(
    stream: TcpStream,
    jobs: mpsc::Sender<InferenceJob>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut framed = protocol::message_stream(stream);

    loop {
        let payload = tokio::select! {
            _ = shutdown.changed() => break,
            next = framed.next() => match next {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => return Err(e.into()),
                None => break, // client disconnected
            },
        };

        let image = match decode_image(&payload) {
            Some(mat) => mat,
            None => {
                protocol::send_message(&mut framed, &ServerMessage::error(protocol::DECODE_ERROR))
                    .await?;
                continue;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if jobs
            .send(InferenceJob {
                image,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            break; // worker gone, server is shutting down
        }

        let message = tokio::select! {
            _ = shutdown.changed() => break,
            reply = reply_rx => match reply {
                Ok(Ok(result)) => ServerMessage::from(&result),
                Ok(Err(e)) => {
                    eprintln!("[session] inference error: {e:#}");
                    ServerMessage::error(protocol::INFERENCE_ERROR)
                }
                Err(_) => break, // worker dropped the job
            },
        };
        protocol::send_message(&mut framed, &message).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::AngleResult;
    use crate::pipeline::FrameResult;
    use crate::pose::{BodyPart, KeypointFrame, Point2D};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    fn sample_result() -> FrameResult {
        let mut keypoints = KeypointFrame::default();
        keypoints.set(BodyPart::Nose, Some(Point2D::new(10, 20)));
        let mut angles = AngleResult::new();
        angles.insert("RShoulder_RElbow_RWrist".to_string(), 90.0);
        FrameResult { keypoints, angles }
    }

    fn encoded_test_image() -> Vec<u8> {
        let mat = Mat::new_rows_cols_with_default(
            8,
            8,
            opencv::core::CV_8UC3,
            opencv::core::Scalar::all(128.0),
        )
        .unwrap();
        let mut buf = Vector::<u8>::new();
        imgcodecs::imencode(".png", &mat, &mut buf, &Vector::new()).unwrap();
        buf.to_vec()
    }

    struct TestServer {
        addr: std::net::SocketAddr,
        session: JoinHandle<Result<()>>,
        shutdown: watch::Sender<bool>,
    }

    /// Accepts one connection and runs a session against a stub worker that
    /// replies with `sample_result()` after `delay`.
    async fn start_session(delay: Duration) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (job_tx, mut job_rx) = mpsc::channel::<InferenceJob>(4);
        tokio::spawn(async move {
            while let Some(job) = job_rx.recv().await {
                tokio::time::sleep(delay).await;
                let _ = job.reply.send(Ok(sample_result()));
            }
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            run_session(stream, job_tx, shutdown_rx).await
        });

        TestServer {
            addr,
            session,
            shutdown: shutdown_tx,
        }
    }

    #[tokio::test]
    async fn test_decode_failure_then_success_keeps_session_open() {
        let server = start_session(Duration::ZERO).await;

        let stream = TcpStream::connect(server.addr).await.unwrap();
        let mut framed = protocol::message_stream(stream);

        protocol::send_frame(&mut framed, b"not an image".to_vec())
            .await
            .unwrap();
        let first = protocol::recv_message(&mut framed).await.unwrap().unwrap();
        assert_eq!(first, ServerMessage::error(protocol::DECODE_ERROR));

        protocol::send_frame(&mut framed, encoded_test_image())
            .await
            .unwrap();
        let second = protocol::recv_message(&mut framed).await.unwrap().unwrap();
        match second {
            ServerMessage::Frame { keypoints, angles } => {
                assert_eq!(keypoints.len(), BodyPart::COUNT);
                assert_eq!(keypoints["Nose"], Some(Point2D::new(10, 20)));
                assert_eq!(angles["RShoulder_RElbow_RWrist"], 90.0);
            }
            other => panic!("expected frame message, got {:?}", other),
        }

        // The connection is still usable after the error
        protocol::send_frame(&mut framed, encoded_test_image())
            .await
            .unwrap();
        assert!(protocol::recv_message(&mut framed)
            .await
            .unwrap()
            .is_some());

        drop(framed);
        let result = timeout(Duration::from_secs(5), server.session)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let server = start_session(Duration::ZERO).await;

        let stream = TcpStream::connect(server.addr).await.unwrap();
        drop(stream);

        let result = timeout(Duration::from_secs(5), server.session)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_while_frame_in_flight() {
        let server = start_session(Duration::from_millis(200)).await;

        let stream = TcpStream::connect(server.addr).await.unwrap();
        let mut framed = protocol::message_stream(stream);
        protocol::send_frame(&mut framed, encoded_test_image())
            .await
            .unwrap();
        drop(framed);

        // The session must terminate regardless of where the reply lands
        let _ = timeout(Duration::from_secs(5), server.session)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_signal_ends_session() {
        let server = start_session(Duration::ZERO).await;

        let stream = TcpStream::connect(server.addr).await.unwrap();
        let mut framed = protocol::message_stream(stream);

        server.shutdown.send(true).unwrap();
        let result = timeout(Duration::from_secs(5), server.session)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());

        // No message was emitted before the connection closed
        assert!(protocol::recv_message(&mut framed)
            .await
            .unwrap()
            .is_none());
    }
}
