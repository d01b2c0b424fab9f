use serde::{Deserialize, Serialize};

/// Anchor rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardPosition {
    pub top: f64,
    pub left: f64,
}

impl CardPosition {
    /// Parked outside the viewport so the first frame never flashes at the origin.
    pub const OFFSCREEN: CardPosition = CardPosition {
        top: -9999.0,
        left: -9999.0,
    };
}

impl Default for CardPosition {
    fn default() -> Self {
        Self::OFFSCREEN
    }
}

/// Which kind of element triggered the preview. Each kind has its own offsets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnchorKind {
    Post,
    Comment,
    Reply,
    UserList,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub offset_top: f64,
    pub offset_left: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            offset_top: 8.0,
            offset_left: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardMetrics {
    pub card_width: f64,
    pub margin: f64,
}

/// Card goes below the anchor, left-aligned, then clamped into the viewport.
/// The left clamp runs last so it wins when the viewport is narrower than the card.
pub fn place_card(
    anchor: &BoundingBox,
    placement: Placement,
    metrics: CardMetrics,
    viewport_width: f64,
) -> CardPosition {
    let top = anchor.bottom + placement.offset_top;
    let mut left = anchor.left + placement.offset_left;
    if left + metrics.card_width > viewport_width - metrics.margin {
        left = viewport_width - metrics.card_width - metrics.margin;
    }
    if left < metrics.margin {
        left = metrics.margin;
    }
    CardPosition { top, left }
}
