//! キーポイント3点からなす関節角度の計算

use std::collections::BTreeMap;

use crate::pose::{BodyPart, KeypointFrame, Point2D};

/// ラベル → 角度（度、[0, 180]）
pub type AngleResult = BTreeMap<String, f32>;

/// 計測対象の関節。近位・頂点・遠位のパート3つ組
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointAngleSpec {
    pub proximal: BodyPart,
    pub vertex: BodyPart,
    pub distal: BodyPart,
}

impl JointAngleSpec {
    pub fn new(proximal: BodyPart, vertex: BodyPart, distal: BodyPart) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    /// "RShoulder_RElbow_RWrist" 形式のラベル
    pub fn label(&self) -> String {
        format!(
            "{}_{}_{}",
            self.proximal.name(),
            self.vertex.name(),
            self.distal.name()
        )
    }
}

/// デフォルトの計測対象: 左右の肘と膝
pub fn default_catalog() -> Vec<JointAngleSpec> {
    vec![
        JointAngleSpec::new(BodyPart::RShoulder, BodyPart::RElbow, BodyPart::RWrist),
        JointAngleSpec::new(BodyPart::LShoulder, BodyPart::LElbow, BodyPart::LWrist),
        JointAngleSpec::new(BodyPart::RHip, BodyPart::RKnee, BodyPart::RAnkle),
        JointAngleSpec::new(BodyPart::LHip, BodyPart::LKnee, BodyPart::LAnkle),
    ]
}

/// vertex を頂点とする内角を度で返す
///
/// 2本の半直線の atan2 の差を度に変換し、180度を超える場合は
/// 反射角 (360 - angle) に畳む。戻り値は常に [0, 180]。
/// 縮退入力（同一点など）も検証せずそのまま計算する。
pub fn angle_at(proximal: Point2D, vertex: Point2D, distal: Point2D) -> f32 {
    let to_distal = f32::atan2(
        (distal.y - vertex.y) as f32,
        (distal.x - vertex.x) as f32,
    );
    let to_proximal = f32::atan2(
        (proximal.y - vertex.y) as f32,
        (proximal.x - vertex.x) as f32,
    );
    let mut angle = (to_distal - to_proximal).to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}

/// カタログ順に各3つ組を評価し、3点すべて検出済みの関節のみ角度を出す
pub fn derive_angles(frame: &KeypointFrame, catalog: &[JointAngleSpec]) -> AngleResult {
    let mut angles = AngleResult::new();
    for spec in catalog {
        let (Some(proximal), Some(vertex), Some(distal)) = (
            frame.get(spec.proximal),
            frame.get(spec.vertex),
            frame.get(spec.distal),
        ) else {
            continue;
        };
        angles.insert(spec.label(), angle_at(proximal, vertex, distal));
    }
    angles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame() -> KeypointFrame {
        let mut frame = KeypointFrame::default();
        for (i, part) in BodyPart::ALL.iter().enumerate() {
            frame.set(*part, Some(Point2D::new(10 * i as i32, 7 * i as i32 + 3)));
        }
        frame
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at(
            Point2D::new(1, 0),
            Point2D::new(0, 0),
            Point2D::new(0, 1),
        );
        assert!((angle - 90.0).abs() < 1e-3, "expected 90, got {}", angle);
    }

    #[test]
    fn test_degenerate_coincident_rays() {
        let angle = angle_at(
            Point2D::new(1, 0),
            Point2D::new(0, 0),
            Point2D::new(1, 0),
        );
        assert!(angle.abs() < 1e-6, "expected 0, got {}", angle);
    }

    #[test]
    fn test_reflex_angle_folded() {
        // -90度と135度の半直線: 生の差は225度 → 内角135度
        let angle = angle_at(
            Point2D::new(0, -1),
            Point2D::new(0, 0),
            Point2D::new(-1, 1),
        );
        assert!((angle - 135.0).abs() < 1e-3, "expected 135, got {}", angle);
    }

    #[test]
    fn test_symmetry_and_range() {
        let points = [
            (Point2D::new(3, 7), Point2D::new(-2, 1), Point2D::new(9, -4)),
            (Point2D::new(0, 0), Point2D::new(5, 5), Point2D::new(10, 0)),
            (Point2D::new(-1, -1), Point2D::new(0, 0), Point2D::new(1, 1)),
            (Point2D::new(100, 3), Point2D::new(100, 4), Point2D::new(100, 5)),
        ];
        for (a, b, c) in points {
            let forward = angle_at(a, b, c);
            let backward = angle_at(c, b, a);
            assert!(
                (forward - backward).abs() < 1e-4,
                "asymmetric: {} vs {}",
                forward,
                backward
            );
            assert!((0.0..=180.0).contains(&forward), "out of range: {}", forward);
        }
    }

    #[test]
    fn test_derive_skips_incomplete_triplet() {
        let mut frame = full_frame();
        frame.set(BodyPart::RElbow, None);

        let angles = derive_angles(&frame, &default_catalog());
        assert!(!angles.contains_key("RShoulder_RElbow_RWrist"));
        assert_eq!(angles.len(), default_catalog().len() - 1);
    }

    #[test]
    fn test_derive_full_frame_emits_every_label() {
        let catalog = default_catalog();
        let angles = derive_angles(&full_frame(), &catalog);

        assert_eq!(angles.len(), catalog.len());
        for spec in &catalog {
            let label = spec.label();
            let expected = format!(
                "{}_{}_{}",
                spec.proximal.name(),
                spec.vertex.name(),
                spec.distal.name()
            );
            assert_eq!(label, expected);
            assert!(angles.contains_key(&label), "missing {}", label);
        }
    }

    #[test]
    fn test_derive_empty_frame_emits_nothing() {
        let angles = derive_angles(&KeypointFrame::default(), &default_catalog());
        assert!(angles.is_empty());
    }
}
