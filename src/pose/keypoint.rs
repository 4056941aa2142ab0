use serde::{Deserialize, Serialize};

/// BODY_25 の 26 パートインデックス（Background 含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    Neck = 1,
    RShoulder = 2,
    RElbow = 3,
    RWrist = 4,
    LShoulder = 5,
    LElbow = 6,
    LWrist = 7,
    MidHip = 8,
    RHip = 9,
    RKnee = 10,
    RAnkle = 11,
    LHip = 12,
    LKnee = 13,
    LAnkle = 14,
    REye = 15,
    LEye = 16,
    REar = 17,
    LEar = 18,
    LBigToe = 19,
    LSmallToe = 20,
    LHeel = 21,
    RBigToe = 22,
    RSmallToe = 23,
    RHeel = 24,
    /// ヒートマップ末尾の番兵。角度計算には使わない
    Background = 25,
}

impl BodyPart {
    pub const COUNT: usize = 26;

    /// ヒートマップのチャネル順
    pub const ALL: [BodyPart; Self::COUNT] = [
        Self::Nose,
        Self::Neck,
        Self::RShoulder,
        Self::RElbow,
        Self::RWrist,
        Self::LShoulder,
        Self::LElbow,
        Self::LWrist,
        Self::MidHip,
        Self::RHip,
        Self::RKnee,
        Self::RAnkle,
        Self::LHip,
        Self::LKnee,
        Self::LAnkle,
        Self::REye,
        Self::LEye,
        Self::REar,
        Self::LEar,
        Self::LBigToe,
        Self::LSmallToe,
        Self::LHeel,
        Self::RBigToe,
        Self::RSmallToe,
        Self::RHeel,
        Self::Background,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|part| part.name() == name)
    }

    /// ワイヤ・設定ファイル上のパート名
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "Nose",
            Self::Neck => "Neck",
            Self::RShoulder => "RShoulder",
            Self::RElbow => "RElbow",
            Self::RWrist => "RWrist",
            Self::LShoulder => "LShoulder",
            Self::LElbow => "LElbow",
            Self::LWrist => "LWrist",
            Self::MidHip => "MidHip",
            Self::RHip => "RHip",
            Self::RKnee => "RKnee",
            Self::RAnkle => "RAnkle",
            Self::LHip => "LHip",
            Self::LKnee => "LKnee",
            Self::LAnkle => "LAnkle",
            Self::REye => "REye",
            Self::LEye => "LEye",
            Self::REar => "REar",
            Self::LEar => "LEar",
            Self::LBigToe => "LBigToe",
            Self::LSmallToe => "LSmallToe",
            Self::LHeel => "LHeel",
            Self::RBigToe => "RBigToe",
            Self::RSmallToe => "RSmallToe",
            Self::RHeel => "RHeel",
            Self::Background => "Background",
        }
    }
}

/// ソース画像のピクセル座標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: i32,
    pub y: i32,
}

impl Point2D {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 1フレーム分の検出結果。全パートが必ず present か absent のどちらか
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypointFrame {
    points: [Option<Point2D>; BodyPart::COUNT],
}

impl KeypointFrame {
    pub fn get(&self, part: BodyPart) -> Option<Point2D> {
        self.points[part as usize]
    }

    pub fn set(&mut self, part: BodyPart, point: Option<Point2D>) {
        self.points[part as usize] = point;
    }

    /// 全パートをチャネル順に列挙する
    pub fn iter(&self) -> impl Iterator<Item = (BodyPart, Option<Point2D>)> + '_ {
        BodyPart::ALL
            .iter()
            .map(move |&part| (part, self.points[part as usize]))
    }

    /// 検出済みパート数
    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|point| point.is_some()).count()
    }
}

impl Default for KeypointFrame {
    fn default() -> Self {
        Self {
            points: [None; BodyPart::COUNT],
        }
    }
}
