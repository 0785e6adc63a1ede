//! Container geometry as a pure function of presentation state and corner.
//!
//! All declarations carry `!important` so host page CSS cannot move or
//! resize the widget.

use crate::config::Position;

pub const CLOSED_SIZE: Size = Size::px(100, 80);
pub const OPEN_SIZE: Size = Size::px(400, 600);
pub const MAXIMIZED_SIZE: Size = Size {
    width: Length::Px(800),
    height: Length::Vh(90),
};
pub const MINIMIZED_SIZE: Size = Size::px(64, 64);

const CORNER_INSET_PX: u32 = 24;
const Z_INDEX_TOP: u32 = 2_147_483_647;

/// Acknowledged presentation state of the widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenState {
    #[default]
    Closed,
    Open,
    Maximized,
}

impl OpenState {
    pub fn size(self) -> Size {
        match self {
            OpenState::Closed => CLOSED_SIZE,
            OpenState::Open => OPEN_SIZE,
            OpenState::Maximized => MAXIMIZED_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Px(u32),
    Vh(u32),
}

impl std::fmt::Display for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{v}px"),
            Length::Vh(v) => write!(f, "{v}vh"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: Length,
    pub height: Length,
}

impl Size {
    pub const fn px(width: u32, height: u32) -> Self {
        Self {
            width: Length::Px(width),
            height: Length::Px(height),
        }
    }

    /// Pixel dimensions, when both sides are in px.
    pub fn as_px(self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Length::Px(w), Length::Px(h)) => Some((w, h)),
            _ => None,
        }
    }
}

/// Inline `cssText` for the container element.
pub fn container_styles(state: OpenState, position: Position) -> String {
    let size = state.size();
    let (vertical, horizontal) = position.anchors();
    format!(
        "position: fixed !important; \
         z-index: {Z_INDEX_TOP} !important; \
         {vertical}: {CORNER_INSET_PX}px !important; \
         {horizontal}: {CORNER_INSET_PX}px !important; \
         width: {} !important; \
         height: {} !important; \
         border: none !important; \
         margin: 0 !important; \
         padding: 0 !important; \
         background: transparent !important; \
         overflow: visible !important; \
         pointer-events: none !important;",
        size.width, size.height
    )
}

/// The iframe fills the container and is the only element taking clicks.
pub fn iframe_styles() -> &'static str {
    "width: 100% !important; \
     height: 100% !important; \
     border: none !important; \
     background: transparent !important; \
     pointer-events: auto !important; \
     border-radius: 12px !important; \
     margin: 0 !important; \
     padding: 0 !important; \
     overflow: hidden !important;"
}
