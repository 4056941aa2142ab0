use std::time::Instant;

use anyhow::{bail, Context, Result};
use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;

use jointstream::angles::default_catalog;
use jointstream::pipeline::FrameProcessor;
use jointstream::pose::{PoseDetector, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().context("usage: bench_pipeline IMAGE [MODEL]")?;
    let model_path = args
        .next()
        .unwrap_or_else(|| "models/pose_body25.onnx".to_string());

    let bytes = std::fs::read(&image_path)?;
    let buf = Vector::<u8>::from_slice(&bytes);
    let frame = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)?;
    if frame.empty() {
        bail!("cannot decode {}", image_path);
    }

    let mut detector = PoseDetector::new(&model_path)?;
    detector.warmup(DEFAULT_INPUT_SIZE)?;
    let mut processor = FrameProcessor::new(
        detector,
        default_catalog(),
        DEFAULT_CONFIDENCE_THRESHOLD,
        DEFAULT_INPUT_SIZE,
        false,
    );

    // 前処理＋推論＋抽出の全パイプラインを30フレーム計測
    let start = Instant::now();
    let iterations = 30;
    for _ in 0..iterations {
        let _ = processor.process(&frame)?;
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_millis() as f64 / iterations as f64;
    println!("Pipeline: {:.2}ms/frame = {:.1} FPS", avg_ms, 1000.0 / avg_ms);

    Ok(())
}
