//! Target dimensions and crop-to-fill planning.
//!
//! Exports never letterbox: when the target aspect ratio differs from the
//! source, the source is center-cropped along one axis and then scaled.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};

/// Requested output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDimension {
    pub width: u32,
    pub height: u32,
    /// Aspect ratio label such as "9:16"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TargetDimension {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::Config(format!("invalid target dimension {width}x{height}")));
        }
        Ok(Self {
            width,
            height,
            label: None,
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 1080×1920, "9:16"
    #[must_use]
    pub fn vertical() -> Self {
        Self {
            width: 1080,
            height: 1920,
            label: Some("9:16".to_string()),
        }
    }

    /// 1080×1080, "1:1"
    #[must_use]
    pub fn square() -> Self {
        Self {
            width: 1080,
            height: 1080,
            label: Some("1:1".to_string()),
        }
    }

    /// 1920×1080, "16:9"
    #[must_use]
    pub fn landscape() -> Self {
        Self {
            width: 1920,
            height: 1080,
            label: Some("16:9".to_string()),
        }
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl FromStr for TargetDimension {
    type Err = MediaError;

    /// Accepts `WIDTHxHEIGHT` or one of `9:16`, `1:1`, `16:9`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "9:16" | "vertical" => return Ok(Self::vertical()),
            "1:1" | "square" => return Ok(Self::square()),
            "16:9" | "landscape" => return Ok(Self::landscape()),
            _ => {}
        }
        let invalid = || MediaError::Config(format!("invalid dimension '{s}', expected WIDTHxHEIGHT"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.parse().map_err(|_| invalid())?;
        let height = h.parse().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}

/// Which source dimension gets cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CropAxis {
    /// Aspect ratios match; scale only.
    None,
    /// Source is relatively wider: trim left and right.
    Horizontal,
    /// Source is relatively taller: trim top and bottom.
    Vertical,
}

/// Select the crop axis by comparing source and target aspect ratios.
#[must_use]
pub fn crop_axis(source_width: u32, source_height: u32, target: &TargetDimension) -> CropAxis {
    // source_w / source_h vs target_w / target_h, without float equality
    let source = u64::from(source_width) * u64::from(target.height);
    let wanted = u64::from(target.width) * u64::from(source_height);
    match source.cmp(&wanted) {
        std::cmp::Ordering::Greater => CropAxis::Horizontal,
        std::cmp::Ordering::Less => CropAxis::Vertical,
        std::cmp::Ordering::Equal => CropAxis::None,
    }
}

/// Center crop followed by a scale to the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropPlan {
    pub axis: CropAxis,
    pub crop_width: u32,
    pub crop_height: u32,
    pub x: u32,
    pub y: u32,
    pub out_width: u32,
    pub out_height: u32,
}

impl CropPlan {
    /// ffmpeg `crop,scale` filter chain for this plan.
    #[must_use]
    pub fn to_filter(&self) -> String {
        let scale = format!("scale={}:{}", self.out_width, self.out_height);
        match self.axis {
            CropAxis::None => scale,
            _ => format!(
                "crop={}:{}:{}:{},{scale}",
                self.crop_width, self.crop_height, self.x, self.y
            ),
        }
    }
}

/// Plan a crop-to-fill of a `source_width` × `source_height` frame into `target`.
///
/// Crop sizes are rounded down to even values for chroma-subsampled codecs.
pub fn plan_crop(source_width: u32, source_height: u32, target: &TargetDimension) -> Result<CropPlan> {
    if source_width == 0 || source_height == 0 {
        return Err(MediaError::Decode(format!(
            "source has invalid dimensions {source_width}x{source_height}"
        )));
    }

    let axis = crop_axis(source_width, source_height, target);
    let (crop_width, crop_height) = match axis {
        CropAxis::None => (source_width, source_height),
        CropAxis::Horizontal => {
            let w = u64::from(source_height) * u64::from(target.width) / u64::from(target.height);
            (even(w as u32), source_height)
        }
        CropAxis::Vertical => {
            let h = u64::from(source_width) * u64::from(target.height) / u64::from(target.width);
            (source_width, even(h as u32))
        }
    };

    Ok(CropPlan {
        axis,
        crop_width,
        crop_height,
        x: source_width.saturating_sub(crop_width) / 2,
        y: source_height.saturating_sub(crop_height) / 2,
        out_width: target.width,
        out_height: target.height,
    })
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}
