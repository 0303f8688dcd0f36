//! Percent-positioned branding elements (logo, text, watermark).
//!
//! Position is a percentage of the frame, size is in pixels. The two units
//! are independent: [`BrandingElement::pixel_rect`] maps the position onto a
//! concrete frame and keeps the pixel size as authored.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{MediaError, Result};

/// Element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandingKind {
    Logo,
    Text,
    Watermark,
}

/// What an element draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandingContent {
    Text(String),
    /// Path to an image file
    Image(PathBuf),
}

/// Top-left origin as percentages of frame width/height, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    /// Clamp both coordinates into `[0, 100]`; NaN becomes 0.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x, 100.0),
            y: clamp_unit(y, 100.0),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(5.0, 5.0)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            x: f64,
            y: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::new(raw.x, raw.y))
    }
}

fn clamp_unit(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn deserialize_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    f64::deserialize(deserializer).map(|o| clamp_unit(o, 1.0))
}

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

/// Pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 200,
            height: 80,
        }
    }
}

/// Text rendering options for text and watermark elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_size: u32,
    /// Text color (hex: RRGGBB)
    pub color: String,
    /// Box color behind the text (hex: RRGGBB)
    pub background: Option<String>,
    /// Border color (hex: RRGGBB)
    pub border_color: Option<String>,
    pub border_width: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 32,
            color: "FFFFFF".to_string(),
            background: None,
            border_color: None,
            border_width: 0,
        }
    }
}

/// An element's placement on a concrete frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A single branding overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandingElement {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub kind: BrandingKind,
    pub content: BrandingContent,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_opacity", deserialize_with = "deserialize_opacity")]
    opacity: f64,
    /// Degrees, clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

impl BrandingElement {
    /// Create a visible element with default placement.
    #[must_use]
    pub fn new(kind: BrandingKind, content: BrandingContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content,
            position: Position::default(),
            size: Size::default(),
            opacity: 1.0,
            rotation: 0.0,
            visible: true,
            style: None,
        }
    }

    /// Image logo
    #[must_use]
    pub fn logo(path: impl Into<PathBuf>) -> Self {
        Self::new(BrandingKind::Logo, BrandingContent::Image(path.into()))
    }

    /// Text element with the default text style
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(BrandingKind::Text, BrandingContent::Text(text.into()))
            .with_style(TextStyle::default())
    }

    /// Semi-transparent text watermark
    #[must_use]
    pub fn watermark(text: impl Into<String>) -> Self {
        Self::new(BrandingKind::Watermark, BrandingContent::Text(text.into()))
            .with_style(TextStyle::default())
            .with_opacity(0.4)
    }

    #[must_use]
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Size { width, height };
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.set_opacity(opacity);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = Some(style);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Set opacity, clamped into `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp_unit(opacity, 1.0);
    }

    /// Text content, if this element draws text.
    pub fn text_content(&self) -> Option<&str> {
        match self.content {
            BrandingContent::Text(ref t) => Some(t),
            BrandingContent::Image(_) => None,
        }
    }

    /// Map onto a `frame_width` × `frame_height` frame.
    #[must_use]
    pub fn pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        PixelRect {
            x: (self.position.x / 100.0 * f64::from(frame_width)).round() as u32,
            y: (self.position.y / 100.0 * f64::from(frame_height)).round() as u32,
            width: self.size.width,
            height: self.size.height,
        }
    }
}

/// Partial update for [`BrandingLayer::update`].
#[derive(Debug, Clone, Default)]
pub struct BrandingPatch {
    pub content: Option<BrandingContent>,
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub opacity: Option<f64>,
    pub rotation: Option<f64>,
    pub visible: Option<bool>,
    /// `Some(None)` clears the style.
    pub style: Option<Option<TextStyle>>,
}

/// Branding elements in creation order; list order is the only z-order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandingLayer {
    elements: Vec<BrandingElement>,
}

impl BrandingLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element and return its id.
    pub fn add(&mut self, element: BrandingElement) -> Uuid {
        let id = element.id;
        self.elements.push(element);
        id
    }

    pub fn update(&mut self, id: Uuid, patch: BrandingPatch) -> Result<&BrandingElement> {
        let element = self.get_mut(id)?;
        if let Some(content) = patch.content {
            element.content = content;
        }
        if let Some(position) = patch.position {
            element.position = position;
        }
        if let Some(size) = patch.size {
            element.size = size;
        }
        if let Some(opacity) = patch.opacity {
            element.set_opacity(opacity);
        }
        if let Some(rotation) = patch.rotation {
            element.rotation = rotation;
        }
        if let Some(visible) = patch.visible {
            element.visible = visible;
        }
        if let Some(style) = patch.style {
            element.style = style;
        }
        Ok(element)
    }

    /// Show or hide an element. Hidden elements stay in the layer.
    pub fn set_visible(&mut self, id: Uuid, visible: bool) -> Result<()> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Option<BrandingElement> {
        let idx = self.elements.iter().position(|e| e.id == id)?;
        Some(self.elements.remove(idx))
    }

    pub fn get(&self, id: Uuid) -> Option<&BrandingElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn elements(&self) -> &[BrandingElement] {
        &self.elements
    }

    /// Elements that take part in composition, in list order.
    pub fn visible(&self) -> impl Iterator<Item = &BrandingElement> {
        self.elements.iter().filter(|e| e.visible)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut BrandingElement> {
        self.elements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| MediaError::Overlay(format!("no branding element with id {id}")))
    }
}
