use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};

/// モデル入力の一辺（正方形、クロップなし）
pub const DEFAULT_INPUT_SIZE: i32 = 368;

/// OpenCV Mat を BODY_25 用の入力ブロブに変換
///
/// - BGR -> RGB
/// - input_size x input_size にリサイズ（アスペクト比は保持しない）
/// - 1/255 スケールで [1, 3, S, S] の f32 テンソルに変換
pub fn preprocess_frame(frame: &Mat, input_size: i32) -> Result<Array4<f32>> {
    // BGR -> RGB
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(input_size, input_size),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    // f32 に変換 (0.0-1.0)
    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    // ndarray に変換 [1, 3, S, S]
    let size = input_size as usize;
    let mut blob = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            for channel in 0..3usize {
                blob[[0, channel, y as usize, x as usize]] = pixel[channel];
            }
        }
    }

    Ok(blob)
}
