//! Single-worker inference queue.
//!
//! The ONNX session takes `&mut self` and is not assumed safe for concurrent
//! invocation, so every session funnels its decoded frames through one
//! dedicated OS thread. Sessions keep receiving concurrently; each awaits its
//! own reply before reading the next frame, which bounds in-flight work to
//! one frame per connection.

use anyhow::Result;
use opencv::core::Mat;
use tokio::sync::{mpsc, oneshot};

use crate::pipeline::{FrameProcessor, FrameResult};

/// One decoded frame awaiting inference.
pub struct InferenceJob {
    pub image: Mat,
    pub reply: oneshot::Sender<Result<FrameResult>>,
}

/// Queue depth shared by all sessions.
pub const JOB_QUEUE_DEPTH: usize = 16;

/// Spawn the inference worker thread.
///
/// The thread drains jobs until every sender handle has been dropped, then
/// exits; join the handle after closing the channel for a clean shutdown.
pub fn spawn_inference_worker(
    mut processor: FrameProcessor,
) -> (mpsc::Sender<InferenceJob>, std::thread::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<InferenceJob>(JOB_QUEUE_DEPTH);

    let handle = std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            let result = processor.process(&job.image);
            let _ = job.reply.send(result);
        }
    });

    (tx, handle)
}
