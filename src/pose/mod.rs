pub mod detector;
pub mod heatmap;
pub mod keypoint;
pub mod preprocess;

pub use detector::PoseDetector;
pub use heatmap::{extract_keypoints, DEFAULT_CONFIDENCE_THRESHOLD};
pub use keypoint::{BodyPart, KeypointFrame, Point2D};
pub use preprocess::{preprocess_frame, DEFAULT_INPUT_SIZE};
