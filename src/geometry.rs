//! Placement of the bar on a monitor and the fill arithmetic.
//!
//! Everything here is pure: the surface turns these numbers into draw calls.

use crate::config::{ColorSpec, Colors, Dim, Orientation, Style};

/// A pixel rectangle. Used for monitors, the window placement and the
/// window-relative rectangles handed to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= i64::from(self.x)
            && x < i64::from(self.x) + i64::from(self.width)
            && y >= i64::from(self.y)
            && y < i64::from(self.y) + i64::from(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowMode {
    Normal,
    Alternative,
}

/// Resolved sizes of the bar, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub outline: u32,
    pub border: u32,
    pub padding: u32,
    pub thickness: u32,
    pub length: u32,
    pub orientation: Orientation,
}

impl Geometry {
    pub fn fat_layer(&self) -> u32 {
        self.outline + self.border + self.padding
    }

    /// Window size as (width, height).
    pub fn window_size(&self) -> (u32, u32) {
        let fat = 2 * self.fat_layer();
        match self.orientation {
            Orientation::Horizontal => (self.length + fat, self.thickness + fat),
            Orientation::Vertical => (self.thickness + fat, self.length + fat),
        }
    }

    /// Rectangle inset by `inset` pixels on every side of the window.
    pub fn layer_rect(&self, inset: u32) -> Rect {
        let (width, height) = self.window_size();
        Rect::new(
            inset as i32,
            inset as i32,
            width.saturating_sub(2 * inset),
            height.saturating_sub(2 * inset),
        )
    }

    /// Rectangle covering `extent` pixels of the content area starting
    /// `start` pixels from the origin of the bar. Horizontal bars grow from
    /// the left edge, vertical bars from the bottom edge.
    pub fn content_rect(&self, start: u32, extent: u32) -> Rect {
        let fat = self.fat_layer();
        let start = start.min(self.length);
        let extent = extent.min(self.length - start);
        match self.orientation {
            Orientation::Horizontal => {
                Rect::new((fat + start) as i32, fat as i32, extent, self.thickness)
            }
            Orientation::Vertical => Rect::new(
                fat as i32,
                (fat + self.length - start - extent) as i32,
                self.thickness,
                extent,
            ),
        }
    }

    /// Padding-wide gap centered on `position` along the bar.
    pub fn separator_rect(&self, position: u32) -> Rect {
        let start = position.saturating_sub(self.padding - self.padding / 2);
        self.content_rect(start, self.padding)
    }
}

/// Keeps `value` in `[min, max]`; an empty range collapses to `min`.
pub fn fit_in(value: i64, min: i64, max: i64) -> i64 {
    if max < min { min } else { value.clamp(min, max) }
}

/// Computes the bar geometry and the absolute window placement of `style`
/// on `monitor`.
pub fn layout(style: &Style, monitor: Rect) -> (Geometry, Rect) {
    let fat = i64::from(style.outline + style.border + style.padding);
    let available = i64::from(match style.orientation {
        Orientation::Horizontal => monitor.width,
        Orientation::Vertical => monitor.height,
    });
    let length = fit_in(scale(available, style.length), 0, available - 2 * fat);

    let geometry = Geometry {
        outline: style.outline,
        border: style.border,
        padding: style.padding,
        thickness: style.thickness,
        length: length as u32,
        orientation: style.orientation,
    };

    let (width, height) = geometry.window_size();
    let x = position(monitor.x, monitor.width, width, style.x);
    let y = position(monitor.y, monitor.height, height, style.y);

    (geometry, Rect::new(x, y, width, height))
}

fn scale(extent: i64, dim: Dim) -> i64 {
    (extent as f64 * dim.rel + f64::from(dim.abs)) as i64
}

fn position(origin: i32, extent: u32, size: u32, dim: Dim) -> i32 {
    let extent = i64::from(extent);
    let size = i64::from(size);
    let centered = (extent as f64 * dim.rel - (size / 2) as f64) as i64;
    let topleft = fit_in(centered, 0, extent - size) + i64::from(dim.abs) + i64::from(origin);
    topleft.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Pixels of the content filled by `value`: `clamp(value, 0, cap) * length / cap`.
pub fn fill_length(value: i32, cap: u32, length: u32) -> u32 {
    if cap == 0 {
        return 0;
    }
    let cap = i64::from(cap);
    (fit_in(i64::from(value), 0, cap) * i64::from(length) / cap) as u32
}

/// Position of the cap boundary when `value` overflows it, rescaled so the
/// whole value fits the bar. `None` when there is no overflow or the marker
/// would not be wider than the padding.
pub fn overflow_marker(value: i32, cap: u32, length: u32, padding: u32) -> Option<u32> {
    if cap == 0 || i64::from(value) <= i64::from(cap) {
        return None;
    }
    let marker = i64::from(cap) * i64::from(length) / i64::from(value);
    (marker > i64::from(padding)).then_some(marker as u32)
}

/// Color set for the bar and color set for the proportional overflow marker.
pub fn select_colors(
    colors: &Colors,
    mode: ShowMode,
    value: i32,
    cap: u32,
) -> (ColorSpec, ColorSpec) {
    let within = i64::from(value) <= i64::from(cap);
    match mode {
        ShowMode::Normal => (
            if within { colors.normal } else { colors.overflow },
            colors.normal,
        ),
        ShowMode::Alternative => (
            if within { colors.alt } else { colors.altoverflow },
            colors.alt,
        ),
    }
}
