use anyhow::{bail, Result};
use ndarray::{ArrayView3, Axis};

use super::keypoint::{BodyPart, KeypointFrame, Point2D};

/// 検出とみなす信頼度の閾値。これを超えた場合のみ present
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;

/// ヒートマップテンソル (26, h, w) から全パートの座標を抽出する
///
/// 各パートのスライスで信頼度最大の位置を探し、閾値を超える場合のみ
/// ソース画像のピクセル座標へ変換する。変換は軸ごとに独立な比率
/// （ソース寸法 / スライス寸法）で、整数へ切り捨てる。
pub fn extract_keypoints(
    heatmaps: ArrayView3<'_, f32>,
    source_width: i32,
    source_height: i32,
    threshold: f32,
) -> Result<KeypointFrame> {
    let (parts, map_h, map_w) = heatmaps.dim();
    if parts != BodyPart::COUNT {
        bail!(
            "model produced {} part maps, expected {}",
            parts,
            BodyPart::COUNT
        );
    }

    let mut frame = KeypointFrame::default();
    for part in BodyPart::ALL {
        let slice = heatmaps.index_axis(Axis(0), part as usize);

        let mut max_conf = f32::NEG_INFINITY;
        let mut max_row = 0usize;
        let mut max_col = 0usize;
        for row in 0..map_h {
            for col in 0..map_w {
                let conf = slice[[row, col]];
                if conf > max_conf {
                    max_conf = conf;
                    max_row = row;
                    max_col = col;
                }
            }
        }

        if max_conf > threshold {
            let x = (source_width as f32 * max_col as f32 / map_w as f32) as i32;
            let y = (source_height as f32 * max_row as f32 / map_h as f32) as i32;
            frame.set(part, Some(Point2D::new(x, y)));
        }
    }
    Ok(frame)
}
