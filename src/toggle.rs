//! On-screen on/off control
//!
//! A small atom glyph in the corner of the window. It is drawn over the
//! presented frame, never into the chamber surface, so it doesn't smear into
//! the trail fade. Enabled: full opacity. Disabled: half.

use crate::display::{alpha_from_opacity, PixelBuffer};
use crate::theme::Theme;
use std::f32::consts::PI;

const SIZE: i32 = 36;
const MARGIN: i32 = 16;
const DIMMED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleButton {
    x: i32,
    y: i32,
    size: i32,
    enabled: bool,
}

impl ToggleButton {
    /// Button anchored to the bottom-right corner of a `width` x `height` frame
    pub fn new(width: u32, height: u32, enabled: bool) -> Self {
        let mut button = Self {
            x: 0,
            y: 0,
            size: SIZE,
            enabled,
        };
        button.anchor(width, height);
        button
    }

    /// Re-anchor after a resize
    pub fn anchor(&mut self, width: u32, height: u32) {
        self.x = (width as i32 - self.size - MARGIN).max(0);
        self.y = (height as i32 - self.size - MARGIN).max(0);
    }

    /// Reflect the chamber state
    pub fn sync(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn opacity(&self) -> f32 {
        if self.enabled {
            1.0
        } else {
            DIMMED
        }
    }

    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.size, self.size)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.size && y >= self.y && y < self.y + self.size
    }

    /// Draw the atom: three orbits 60 degrees apart around a nucleus
    pub fn render(&self, buffer: &mut PixelBuffer, theme: Theme) {
        let (r, g, b) = theme.head_tone();
        let alpha = alpha_from_opacity(self.opacity());

        let half = self.size as f32 / 2.0;
        let cx = self.x as f32 + half;
        let cy = self.y as f32 + half;
        let rx = half * 0.9;
        let ry = half * 0.35;

        for i in 0..3 {
            let angle = i as f32 * PI / 3.0;
            buffer.ellipse_blend(cx, cy, rx, ry, angle, 1.5, r, g, b, alpha);
        }
        buffer.fill_disc_blend(cx, cy, half * 0.18, r, g, b, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_bottom_right() {
        let button = ToggleButton::new(640, 480, true);
        assert!(button.contains(640 - MARGIN - 1, 480 - MARGIN - 1));
        assert!(!button.contains(10, 10));
        assert!(!button.contains(640 - MARGIN, 480 - MARGIN));
    }

    #[test]
    fn test_opacity_follows_state() {
        let mut button = ToggleButton::new(100, 100, true);
        assert_eq!(button.opacity(), 1.0);
        button.sync(false);
        assert_eq!(button.opacity(), 0.5);
    }

    #[test]
    fn test_dimmed_glyph_is_fainter() {
        let mut lit = PixelBuffer::with_size(100, 100);
        let mut dim = PixelBuffer::with_size(100, 100);
        lit.clear(0, 0, 0);
        dim.clear(0, 0, 0);

        let mut button = ToggleButton::new(100, 100, true);
        button.render(&mut lit, Theme::Dark);
        button.sync(false);
        button.render(&mut dim, Theme::Dark);

        let (x, y, size, _) = button.bounds();
        let center = (x + size / 2, y + size / 2);
        let lit_px = lit.get_pixel(center.0, center.1).unwrap();
        let dim_px = dim.get_pixel(center.0, center.1).unwrap();
        assert_eq!(lit_px, Theme::Dark.head_tone());
        assert!(dim_px.0 < lit_px.0);
        assert!(dim_px.0 > 0);
    }

    #[test]
    fn test_tiny_window_keeps_button_on_screen() {
        let button = ToggleButton::new(10, 10, true);
        let (x, y, _, _) = button.bounds();
        assert_eq!((x, y), (0, 0));
    }
}
