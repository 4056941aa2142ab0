use anyhow::Result;
use opencv::core::Mat;
use opencv::prelude::*;

use crate::angles::{derive_angles, AngleResult, JointAngleSpec};
use crate::pose::{extract_keypoints, preprocess_frame, KeypointFrame, PoseDetector};

/// One processed frame: the keypoints plus the joint angles derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub keypoints: KeypointFrame,
    pub angles: AngleResult,
}

/// Per-frame pipeline: preprocess -> infer -> extract -> derive.
///
/// Holds the model session and the read-only angle catalog; everything else
/// is created fresh per frame.
pub struct FrameProcessor {
    detector: PoseDetector,
    catalog: Vec<JointAngleSpec>,
    confidence_threshold: f32,
    input_size: i32,
    verbose: bool,
}

impl FrameProcessor {
    pub fn new(
        detector: PoseDetector,
        catalog: Vec<JointAngleSpec>,
        confidence_threshold: f32,
        input_size: i32,
        verbose: bool,
    ) -> Self {
        Self {
            detector,
            catalog,
            confidence_threshold,
            input_size,
            verbose,
        }
    }

    pub fn process(&mut self, frame: &Mat) -> Result<FrameResult> {
        let source_width = frame.cols();
        let source_height = frame.rows();

        let blob = preprocess_frame(frame, self.input_size)?;
        let heatmaps = self.detector.infer(blob)?;
        let keypoints = extract_keypoints(
            heatmaps.view(),
            source_width,
            source_height,
            self.confidence_threshold,
        )?;
        let angles = derive_angles(&keypoints, &self.catalog);

        if self.verbose {
            let present: Vec<String> = keypoints
                .iter()
                .filter_map(|(part, point)| {
                    point.map(|p| format!("{}({},{})", part.name(), p.x, p.y))
                })
                .collect();
            eprintln!(
                "[frame] {}x{}: keypoints=[{}]",
                source_width,
                source_height,
                present.join(" ")
            );
            for (label, degrees) in &angles {
                eprintln!("[frame]   {} = {:.1}", label, degrees);
            }
        }

        Ok(FrameResult { keypoints, angles })
    }
}
