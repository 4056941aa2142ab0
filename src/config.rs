use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::angles::JointAngleSpec;
use crate::pose::{BodyPart, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// 待ち受けアドレス
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// BODY_25 ONNXモデルのパス
    #[serde(default = "default_model")]
    pub model: String,
    /// キーポイント検出の信頼度閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// モデル入力の一辺（ピクセル）
    #[serde(default = "default_input_size")]
    pub input_size: i32,
    /// 計測する関節の3つ組（パート名: 近位, 頂点, 遠位）
    #[serde(default = "default_angles")]
    pub angles: Vec<[String; 3]>,
    #[serde(default)]
    pub verbose: bool,
}

fn default_listen_addr() -> String {
    "0.0.0.0:9000".to_string()
}
fn default_model() -> String {
    "models/pose_body25.onnx".to_string()
}
fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_input_size() -> i32 {
    DEFAULT_INPUT_SIZE
}
fn default_angles() -> Vec<[String; 3]> {
    [
        ["RShoulder", "RElbow", "RWrist"],
        ["LShoulder", "LElbow", "LWrist"],
        ["RHip", "RKnee", "RAnkle"],
        ["LHip", "LKnee", "LAnkle"],
    ]
    .iter()
    .map(|triplet| triplet.map(str::to_string))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            model: default_model(),
            confidence_threshold: default_confidence_threshold(),
            input_size: default_input_size(),
            angles: default_angles(),
            verbose: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config not loaded ({e:#}), using defaults");
                Self::default()
            }
        }
    }

    /// angles 設定を検証してカタログへ変換する
    pub fn angle_catalog(&self) -> Result<Vec<JointAngleSpec>> {
        let resolve = |name: &str| -> Result<BodyPart> {
            let part = BodyPart::from_name(name)
                .with_context(|| format!("unknown body part in angles: {name}"))?;
            if part == BodyPart::Background {
                bail!("Background cannot be used in an angle triplet");
            }
            Ok(part)
        };

        let mut catalog = Vec::with_capacity(self.angles.len());
        for [proximal, vertex, distal] in &self.angles {
            catalog.push(JointAngleSpec::new(
                resolve(proximal)?,
                resolve(vertex)?,
                resolve(distal)?,
            ));
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.confidence_threshold, 0.1);
        assert_eq!(config.input_size, 368);
        assert_eq!(config.angles.len(), 4);
        assert!(!config.verbose);
    }

    #[test]
    fn test_default_catalog_resolves() {
        let config = Config::default();
        let catalog = config.angle_catalog().unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[0].label(), "RShoulder_RElbow_RWrist");
        assert_eq!(catalog[3].label(), "LHip_LKnee_LAnkle");
    }

    #[test]
    fn test_angle_override() {
        let config: Config = toml::from_str(
            r#"
confidence_threshold = 0.25
angles = [["RShoulder", "RElbow", "RWrist"]]
"#,
        )
        .unwrap();
        assert_eq!(config.confidence_threshold, 0.25);
        let catalog = config.angle_catalog().unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_unknown_part_rejected() {
        let config: Config = toml::from_str(
            r#"
angles = [["Pelvis", "RKnee", "RAnkle"]]
"#,
        )
        .unwrap();
        assert!(config.angle_catalog().is_err());
    }

    #[test]
    fn test_background_rejected() {
        let config: Config = toml::from_str(
            r#"
angles = [["RHip", "Background", "RAnkle"]]
"#,
        )
        .unwrap();
        assert!(config.angle_catalog().is_err());
    }
}
