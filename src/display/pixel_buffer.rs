// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Convert a 0..1 opacity into an 8-bit alpha (clamped, rounded)
#[inline]
pub fn alpha_from_opacity(opacity: f32) -> u8 {
    if opacity.is_nan() {
        return 0;
    }
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Bytes needed for a `width` x `height` RGBA buffer
#[inline]
fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Squared distance from point p to segment a-b
#[inline]
fn segment_distance_sq(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let abx = bx - ax;
    let aby = by - ay;
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = px - (ax + abx * t);
    let dy = py - (ay + aby * t);
    dx * dx + dy * dy
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 pixel buffer for software rendering
/// This is the chamber's drawing surface
#[derive(Clone)]
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a new pixel buffer with custom resolution (at least 1x1)
    pub fn with_size(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            pixels: vec![0; byte_len(width, height)],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Clear to a solid color
    /// Optimized: uses u32 fill for maximum speed
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        // Create ABGR u32 pattern
        let pixel = u32::from_ne_bytes([255, b, g, r]);

        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;

        for i in 0..len {
            // Safety: pixels.len() is width * height * 4, so i < len stays in
            // bounds; write_unaligned makes no alignment assumption on Vec<u8>.
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Wash the whole buffer with a translucent color (the trail fade)
    pub fn wash(&mut self, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 {
            return;
        }
        let alpha = a as u16;
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk[0] = 255;
            chunk[1] = blend_channel(b, chunk[1], alpha);
            chunk[2] = blend_channel(g, chunk[2], alpha);
            chunk[3] = blend_channel(r, chunk[3], alpha);
        }
    }

    /// Set pixel with alpha blending
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 || !self.in_bounds(x, y) {
            return;
        }
        let idx = self.pixel_index(x as u32, y as u32);
        let alpha = a as u16;
        self.pixels[idx] = 255; // A - always opaque
        self.pixels[idx + 1] = blend_channel(b, self.pixels[idx + 1], alpha);
        self.pixels[idx + 2] = blend_channel(g, self.pixels[idx + 2], alpha);
        self.pixels[idx + 3] = blend_channel(r, self.pixels[idx + 3], alpha);
    }

    /// Read a pixel from the buffer (bounds checked)
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some((
                self.pixels[idx + 3], // R
                self.pixels[idx + 2], // G
                self.pixels[idx + 1], // B
            ))
        } else {
            None
        }
    }

    /// True when every pixel is exactly the given color
    pub fn is_filled_with(&self, r: u8, g: u8, b: u8) -> bool {
        self.pixels
            .chunks_exact(4)
            .all(|c| c[3] == r && c[2] == g && c[1] == b)
    }

    /// Bresenham line with alpha blending (1px, per-pixel bounds checks)
    pub fn line_blend(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 {
            return;
        }
        let dx = (x1 - x0).abs();
        let dy = -((y1 - y0).abs());
        let sx = if x0 < x1 { 1i32 } else { -1i32 };
        let sy = if y0 < y1 { 1i32 } else { -1i32 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.blend_pixel(x, y, r, g, b, a);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Stroke a segment with round caps (a capsule), blended
    ///
    /// Pixels whose centers lie within `width / 2` of the segment are painted.
    /// Widths under one pixel still cover the centerline.
    pub fn stroke_segment_blend(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        if a == 0 || !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        let half = (width * 0.5).max(0.5);
        let half_sq = half * half;

        let min_x = ((x0.min(x1) - half).floor() as i32).max(0);
        let max_x = ((x0.max(x1) + half).ceil() as i32).min(self.width as i32 - 1);
        let min_y = ((y0.min(y1) - half).floor() as i32).max(0);
        let max_y = ((y0.max(y1) + half).ceil() as i32).min(self.height as i32 - 1);

        for py in min_y..=max_y {
            let cy = py as f32 + 0.5;
            for px in min_x..=max_x {
                let cx = px as f32 + 0.5;
                if segment_distance_sq(cx, cy, x0, y0, x1, y1) <= half_sq {
                    self.blend_pixel(px, py, r, g, b, a);
                }
            }
        }
    }

    /// Filled disc at a sub-pixel center, blended
    pub fn fill_disc_blend(&mut self, cx: f32, cy: f32, radius: f32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 || !(cx.is_finite() && cy.is_finite()) {
            return;
        }
        let radius = radius.max(0.5);
        let r_sq = radius * radius;

        let y_start = ((cy - radius).floor() as i32).max(0);
        let y_end = ((cy + radius).ceil() as i32).min(self.height as i32 - 1);
        let x_start = ((cx - radius).floor() as i32).max(0);
        let x_end = ((cx + radius).ceil() as i32).min(self.width as i32 - 1);

        for y in y_start..=y_end {
            let dy = y as f32 + 0.5 - cy;
            for x in x_start..=x_end {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r_sq {
                    self.blend_pixel(x, y, r, g, b, a);
                }
            }
        }
    }

    /// Soft halo ring around a disc: full `a` at the rim, quadratic falloff
    /// to zero `blur` pixels out. The disc interior is left untouched.
    pub fn glow_ring_blend(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        blur: f32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        if a == 0 || blur <= 0.0 || !(cx.is_finite() && cy.is_finite()) {
            return;
        }
        let outer = radius + blur;

        let y_start = ((cy - outer).floor() as i32).max(0);
        let y_end = ((cy + outer).ceil() as i32).min(self.height as i32 - 1);
        let x_start = ((cx - outer).floor() as i32).max(0);
        let x_end = ((cx + outer).ceil() as i32).min(self.width as i32 - 1);

        for y in y_start..=y_end {
            let dy = y as f32 + 0.5 - cy;
            for x in x_start..=x_end {
                let dx = x as f32 + 0.5 - cx;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist <= radius || dist > outer {
                    continue;
                }
                let t = 1.0 - (dist - radius) / blur;
                let alpha = (a as f32 * t * t) as u8;
                self.blend_pixel(x, y, r, g, b, alpha);
            }
        }
    }

    /// Outline of an ellipse rotated by `angle`, sampled as a closed polyline
    pub fn ellipse_blend(
        &mut self,
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
        angle: f32,
        thickness: f32,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    ) {
        use std::f32::consts::TAU;
        const SEGMENTS: usize = 32;

        let (sin, cos) = angle.sin_cos();
        let point = |i: usize| {
            let t = i as f32 / SEGMENTS as f32 * TAU;
            let (ex, ey) = (t.cos() * rx, t.sin() * ry);
            (cx + ex * cos - ey * sin, cy + ex * sin + ey * cos)
        };

        let mut prev = point(0);
        for i in 1..=SEGMENTS {
            let next = point(i);
            self.stroke_segment_blend(prev.0, prev.1, next.0, next.1, thickness, r, g, b, a);
            prev = next;
        }
    }

    /// Copy contents from another buffer (must be same size)
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        if self.pixels.len() == src.pixels.len() {
            self.pixels.copy_from_slice(&src.pixels);
        }
    }

    /// Get raw pixel data for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}
