#![forbid(unsafe_code)]

//! Geometric primitives in CSS pixels.

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether the viewport is at or below a mobile breakpoint.
    #[inline]
    pub fn is_narrow(&self, breakpoint: f64) -> bool {
        self.width <= breakpoint
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Vertical extent of an element in document coordinates.
///
/// The extent is half-open: `[top, top + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether `y` lies inside `[top, bottom)`.
    #[inline]
    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.top && y < self.bottom()
    }

    /// Whether this extent overlaps the band `[start, end)`.
    #[inline]
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        self.top < end && self.bottom() > start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let b = Bounds::new(100.0, 50.0);
        assert!(b.contains_y(100.0));
        assert!(b.contains_y(149.9));
        assert!(!b.contains_y(150.0));
        assert!(!b.contains_y(99.9));
    }

    #[test]
    fn band_intersection() {
        let b = Bounds::new(100.0, 50.0);
        assert!(b.intersects(0.0, 101.0));
        assert!(!b.intersects(0.0, 100.0));
        assert!(b.intersects(149.0, 300.0));
        assert!(!b.intersects(150.0, 300.0));
    }

    #[test]
    fn narrow_viewport_includes_breakpoint() {
        assert!(Viewport::new(768.0, 1000.0).is_narrow(768.0));
        assert!(!Viewport::new(769.0, 1000.0).is_narrow(768.0));
    }
}
