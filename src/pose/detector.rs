use anyhow::{bail, Context, Result};
use ndarray::{Array3, Array4, Axis, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::keypoint::BodyPart;

/// ONNX 化した BODY_25 モデルの入出力名
const INPUT_NAME: &str = "input";
const OUTPUT_NAME: &str = "net_output";

fn build_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        eprintln!("[ort] Attempting CUDA execution provider...");
        builder.with_execution_providers([
            ort::execution_providers::CUDAExecutionProvider::default().build(),
        ])?
    };

    builder
        .commit_from_file(model_path)
        .context("Failed to load ONNX model")
}

/// BODY_25 ヒートマップモデルの推論器
pub struct PoseDetector {
    session: Session,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Ok(Self {
            session: build_session(model_path.as_ref())?,
        })
    }

    /// 前処理済みブロブ [1, 3, S, S] からヒートマップ (26, h, w) を得る
    pub fn infer(&mut self, input: Array4<f32>) -> Result<Array3<f32>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_tensor])
            .context("Inference failed")?;
        let output: ndarray::ArrayViewD<f32> = outputs[OUTPUT_NAME]
            .try_extract_array()
            .context("Failed to extract heatmap tensor")?;

        let output = output
            .into_dimensionality::<Ix4>()
            .context("Heatmap tensor is not 4-dimensional")?;
        let parts = output.shape()[1];
        if parts != BodyPart::COUNT {
            bail!(
                "model produced {} part maps, expected {}",
                parts,
                BodyPart::COUNT
            );
        }
        Ok(output.index_axis(Axis(0), 0).to_owned())
    }

    /// 起動時の検証。ゼロ入力で1回推論し、パート数の不一致を即座に検出する
    pub fn warmup(&mut self, input_size: i32) -> Result<()> {
        let size = input_size as usize;
        let blob = Array4::<f32>::zeros((1, 3, size, size));
        let heatmaps = self.infer(blob).context("Model warmup failed")?;
        let (_, map_h, map_w) = heatmaps.dim();
        eprintln!("[model] heatmap resolution: {}x{}", map_w, map_h);
        Ok(())
    }
}
