use super::Point;

/// Four-corner quadrilateral of one detected code in unified image space
///
/// The corners approximate the four physical corners of the code as reported
/// by whichever backend found it. Beyond the corner names there is no
/// ordering or winding guarantee: under rotation, backends may disagree on
/// which physical corner is "top-left", which is why duplicate matching
/// checks both diagonal pairings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CodePosition {
    /// Top-left corner
    pub top_left: Point,
    /// Top-right corner
    pub top_right: Point,
    /// Bottom-left corner
    pub bottom_left: Point,
    /// Bottom-right corner
    pub bottom_right: Point,
}

impl CodePosition {
    /// Create a position from its four named corners
    pub fn new(top_left: Point, top_right: Point, bottom_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// The four corners in name order: top-left, top-right, bottom-left,
    /// bottom-right
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Map a position found in a 180°-rotated copy of a `width`x`height`
    /// image back into the original image's coordinates.
    ///
    /// Each corner is point-reflected: `x' = width-1-x`, `y' = height-1-y`.
    /// Corner names are kept as reported; engines name corners in the
    /// symbol's own frame, so the names already line up after reflection.
    pub fn point_reflected(&self, width: usize, height: usize) -> CodePosition {
        let reflect = |p: Point| {
            Point::new(
                (width as u32).saturating_sub(1).saturating_sub(p.x),
                (height as u32).saturating_sub(1).saturating_sub(p.y),
            )
        };
        CodePosition {
            top_left: reflect(self.top_left),
            top_right: reflect(self.top_right),
            bottom_left: reflect(self.bottom_left),
            bottom_right: reflect(self.bottom_right),
        }
    }

    /// Whether all four corners lie inside a `width`x`height` image
    pub fn is_within(&self, width: usize, height: usize) -> bool {
        self.corners()
            .iter()
            .all(|p| (p.x as usize) < width && (p.y as usize) < height)
    }

    /// Whether any two corners coincide
    pub fn is_degenerate(&self) -> bool {
        let c = self.corners();
        for i in 0..4 {
            for j in i + 1..4 {
                if c[i] == c[j] {
                    return true;
                }
            }
        }
        false
    }
}
