//! Axis-aligned bounding-box math underpinning the spatial index.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A degenerate box at a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// The identity element for `union`: intersects nothing, contains
    /// nothing, and unions to the other operand.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Check if this box intersects another (standard axis-aligned overlap).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if this box fully contains another.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Area of the box (zero for degenerate boxes).
    pub fn area(&self) -> f64 {
        let width = self.max_x - self.min_x;
        let height = self.max_y - self.min_y;
        if width < 0.0 || height < 0.0 {
            0.0
        } else {
            width * height
        }
    }

    /// The minimal box covering both operands.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Area growth needed for this box to cover `other`.
    pub fn enlargement(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_overlap_and_touch() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(10.0, 10.0, 20.0, 20.0); // touches at a corner
        let d = BoundingBox::new(11.0, 11.0, 20.0, 20.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(a.intersects(&c));
        assert!(!a.intersects(&d));
        assert!(a.intersects(&a));
    }

    #[test]
    fn test_union_and_enlargement() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(3.0, 3.0, 4.0, 4.0);

        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(0.0, 0.0, 4.0, 4.0));

        // union area 16, own area 4 -> enlargement 12
        assert!((a.enlargement(&b) - 12.0).abs() < 1e-9);
        // Covering a contained box costs nothing
        let inner = BoundingBox::new(0.5, 0.5, 1.0, 1.0);
        assert_eq!(a.enlargement(&inner), 0.0);
    }

    #[test]
    fn test_empty_identity() {
        let empty = BoundingBox::empty();
        let a = BoundingBox::new(1.0, 1.0, 2.0, 2.0);

        assert!(!empty.intersects(&a));
        assert!(!a.intersects(&empty));
        assert_eq!(empty.union(&a), a);
        assert_eq!(empty.area(), 0.0);
    }

    #[test]
    fn test_contains() {
        let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let inner = BoundingBox::new(2.0, 2.0, 5.0, 5.0);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }
}
