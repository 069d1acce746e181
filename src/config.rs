//! Cropper settings, loadable from a `cropper.toml` file.
//!
//! ```toml
//! aspect-ratio = 1.5
//! lock-aspect-ratio = true
//! width = 300
//! x = 20
//!
//! [constraints]
//! min-width = 32
//!
//! [[previews]]
//! width = 160
//! height = 160
//! wrapper = true
//! ```

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::crop_box::InitialGeometry;
use crate::error::{Error, Result};
use crate::resize::SizeConstraints;

pub const CONFIG_ENV_VAR: &str = "IMAGE_CROPPER_CONFIG";
pub const DEFAULT_ASPECT_RATIO: f64 = 1.0;

/// One preview pane the host should create.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewPane {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub wrapper: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CropperConfig {
    pub aspect_ratio: f64,
    /// When false the crop box resizes freely.
    pub lock_aspect_ratio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    pub constraints: SizeConstraints,
    pub previews: Vec<PreviewPane>,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            lock_aspect_ratio: true,
            width: None,
            height: None,
            x: None,
            y: None,
            constraints: SizeConstraints::default(),
            previews: vec![
                PreviewPane {
                    width: 160.0,
                    height: 160.0,
                    wrapper: true,
                },
                PreviewPane {
                    width: 240.0,
                    height: 135.0,
                    wrapper: false,
                },
            ],
        }
    }
}

impl CropperConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| Error::ConfigWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The ratio the crop box is locked to, if any. A ratio that isn't a
    /// positive finite number falls back to 1.
    pub fn effective_aspect_ratio(&self) -> Option<f64> {
        if !self.lock_aspect_ratio {
            return None;
        }
        Some(sanitize_aspect_ratio(self.aspect_ratio))
    }

    pub fn initial_geometry(&self) -> InitialGeometry {
        InitialGeometry {
            width: self.width,
            height: self.height,
            x: self.x,
            y: self.y,
        }
    }
}

pub fn sanitize_aspect_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        warn!("aspect ratio {ratio} is not usable, falling back to {DEFAULT_ASPECT_RATIO}");
        DEFAULT_ASPECT_RATIO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = CropperConfig::from_toml_str("").expect("parse");
        assert_eq!(config, CropperConfig::default());
        assert_eq!(config.effective_aspect_ratio(), Some(1.0));
        assert_eq!(config.constraints.min_width, 50.0);
        assert_eq!(config.constraints.max_height, 10000.0);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = CropperConfig::from_toml_str(
            r#"
            aspect-ratio = 1.5
            width = 300
            x = 20.5

            [constraints]
            min-width = 32

            [[previews]]
            width = 90
            height = 60
            "#,
        )
        .expect("parse");
        assert_eq!(config.effective_aspect_ratio(), Some(1.5));
        assert_eq!(config.width, Some(300.0));
        assert_eq!(config.x, Some(20.5));
        assert_eq!(config.y, None);
        assert_eq!(config.constraints.min_width, 32.0);
        assert_eq!(config.constraints.min_height, 50.0);
        assert_eq!(config.previews.len(), 1);
        assert!(!config.previews[0].wrapper);
    }

    #[test]
    fn unlocked_ratio_is_free() {
        let config = CropperConfig::from_toml_str("lock-aspect-ratio = false").expect("parse");
        assert_eq!(config.effective_aspect_ratio(), None);
    }

    #[test]
    fn unusable_ratio_falls_back_to_one() {
        let config = CropperConfig::from_toml_str("aspect-ratio = -2.0").expect("parse");
        assert_eq!(config.effective_aspect_ratio(), Some(1.0));
        assert_eq!(sanitize_aspect_ratio(f64::NAN), 1.0);
        assert_eq!(sanitize_aspect_ratio(0.0), 1.0);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = CropperConfig::from_toml_str("aspect-ratio = \"wide\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
