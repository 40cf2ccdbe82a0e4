//! Screen-space geometry

use serde::{Deserialize, Serialize};

/// A point in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Point at `(x, y)`
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// This point relative to `origin`
    pub fn relative_to(&self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Rectangle from its top-left corner and size
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Positive, finite width and height
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Inclusive on all four edges
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Shifted so that `origin` becomes (0, 0)
    pub fn relative_to(&self, origin: Point) -> Rect {
        Rect::new(self.left - origin.x, self.top - origin.y, self.width, self.height)
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        assert!(rect.contains(Point::new(10.0, 20.0)));
        assert!(rect.contains(Point::new(40.0, 60.0)));
        assert!(rect.contains(Point::new(25.0, 30.0)));
        assert!(!rect.contains(Point::new(9.9, 30.0)));
        assert!(!rect.contains(Point::new(25.0, 60.1)));
    }

    #[test]
    fn test_has_area() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).has_area());
        assert!(!Rect::new(0.0, 0.0, 0.0, 10.0).has_area());
        assert!(!Rect::new(0.0, 0.0, -4.0, 10.0).has_area());
        assert!(!Rect::new(0.0, 0.0, f32::NAN, 10.0).has_area());
    }

    #[test]
    fn test_relative_to() {
        let rect = Rect::new(110.0, 220.0, 5.0, 6.0);
        let shifted = rect.relative_to(Point::new(100.0, 200.0));
        assert_eq!(shifted, Rect::new(10.0, 20.0, 5.0, 6.0));
        assert_eq!(Point::new(3.0, 4.0).relative_to(Point::new(1.0, 1.0)), Point::new(2.0, 3.0));
    }
}
