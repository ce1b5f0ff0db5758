//! The bar itself, drawn through a small canvas capability so the drawing
//! logic does not depend on a live display.

use crate::config::{Color, OverflowMode, Style};
use crate::geometry::{self, Geometry, Rect, ShowMode};

/// Windowing operations the bar needs from a platform.
pub trait Canvas {
    type Error;

    /// Moves and resizes the window to `placement` (root coordinates).
    fn configure(&mut self, placement: Rect) -> Result<(), Self::Error>;

    /// Makes the window visible and raises it.
    fn map(&mut self) -> Result<(), Self::Error>;

    fn unmap(&mut self) -> Result<(), Self::Error>;

    /// Fills `rect` (window coordinates) with `color`.
    fn fill_rect(&mut self, color: Color, rect: Rect) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub struct Bar<C: Canvas> {
    canvas: C,
    style: Style,
    geometry: Geometry,
    placement: Rect,
    mapped: bool,
}

impl<C: Canvas> Bar<C> {
    /// Sizes and positions `canvas` for `style` on `monitor`. The bar starts
    /// hidden.
    pub fn open(mut canvas: C, style: Style, monitor: Rect) -> Result<Self, C::Error> {
        let (geometry, placement) = geometry::layout(&style, monitor);
        canvas.configure(placement)?;
        canvas.flush()?;
        Ok(Self {
            canvas,
            style,
            geometry,
            placement,
            mapped: false,
        })
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Recomputes the geometry for `monitor`, moving the window if needed.
    pub fn reposition(&mut self, monitor: Rect) -> Result<(), C::Error> {
        let (geometry, placement) = geometry::layout(&self.style, monitor);
        self.geometry = geometry;
        if placement != self.placement {
            self.canvas.configure(placement)?;
            self.placement = placement;
        }
        Ok(())
    }

    /// Shows the bar filled at `value / cap`.
    pub fn show(
        &mut self,
        value: i32,
        cap: u32,
        overflow: OverflowMode,
        mode: ShowMode,
    ) -> Result<(), C::Error> {
        if !self.mapped {
            self.canvas.map()?;
            self.mapped = true;
        }

        let (colors, marker_colors) = geometry::select_colors(&self.style.colors, mode, value, cap);
        let g = self.geometry;

        self.canvas.fill_rect(colors.bg, g.layer_rect(0))?;
        self.canvas.fill_rect(colors.border, g.layer_rect(g.outline))?;
        self.canvas
            .fill_rect(colors.bg, g.layer_rect(g.outline + g.border))?;

        let filled = geometry::fill_length(value, cap, g.length);
        self.canvas.fill_rect(colors.fg, g.content_rect(0, filled))?;

        if overflow == OverflowMode::Proportional {
            if let Some(marker) = geometry::overflow_marker(value, cap, g.length, g.padding) {
                self.canvas
                    .fill_rect(marker_colors.fg, g.content_rect(0, marker))?;
                self.canvas.fill_rect(colors.bg, g.separator_rect(marker))?;
            }
        }

        self.canvas.flush()
    }

    pub fn hide(&mut self) -> Result<(), C::Error> {
        if self.mapped {
            self.canvas.unmap()?;
            self.canvas.flush()?;
            self.mapped = false;
        }
        Ok(())
    }

    /// Releases the underlying window.
    pub fn close(self) {
        drop(self.canvas);
    }
}
