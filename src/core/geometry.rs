//! Geometry kernel for floating connectors
//!
//! Pure functions over node snapshots: where the line between two node centers
//! leaves a node's bounding box, and which side of the box a point sits on.

use serde::{Deserialize, Serialize};

/// Smallest width/height a node is treated as having
pub const MIN_NODE_SIZE: f64 = 1.0;

/// 2D point in canvas coordinates (y grows downwards)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Snapshot of a rendered node: absolute top-left position and measured size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeRect {
    /// Width and height are floored at [`MIN_NODE_SIZE`].
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(MIN_NODE_SIZE),
            height: height.max(MIN_NODE_SIZE),
        }
    }

    pub fn at(position: Point, width: f64, height: f64) -> Self {
        Self::new(position.x, position.y, width, height)
    }

    /// Same rectangle with the size floor applied, however it was built
    fn floored(&self) -> Self {
        Self::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Side of a node's bounding box
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Side::Top),
            "right" => Ok(Side::Right),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

/// Anchor points and boundary sides for a connector between two nodes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeParams {
    pub source: Point,
    pub target: Point,
    pub source_side: Side,
    pub target_side: Side,
}

/// Point where the line from `node`'s center toward `other`'s center crosses
/// `node`'s boundary.
///
/// The direction is normalized by half-width/half-height and solved on the
/// L1 unit diamond, which maps back onto the rectangle's perimeter. When both
/// centers coincide there is no direction; the top edge midpoint is returned.
pub fn intersect_boundary(node: &NodeRect, other: &NodeRect) -> Point {
    let node = node.floored();
    let half_w = node.width / 2.0;
    let half_h = node.height / 2.0;
    let center = node.center();
    let toward = other.floored().center();

    let dx = (toward.x - center.x) / (2.0 * half_w);
    let dy = (toward.y - center.y) / (2.0 * half_h);
    let xx1 = dx - dy;
    let yy1 = dx + dy;

    let l1 = xx1.abs() + yy1.abs();
    if !l1.is_finite() || l1 <= f64::EPSILON {
        return Point::new(center.x, node.top());
    }

    let a = 1.0 / l1;
    let xx3 = a * xx1;
    let yy3 = a * yy1;

    Point::new(
        half_w * (xx3 + yy3) + center.x,
        half_h * (-xx3 + yy3) + center.y,
    )
}

/// Which side of `node` the point lies on, compared in whole pixels.
///
/// Precedence is left, right, top, bottom. Interior points match none of the
/// comparisons and resolve to [`Side::Top`].
pub fn classify_side(node: &NodeRect, point: Point) -> Side {
    let node = node.floored();
    let nx = node.x.round();
    let ny = node.y.round();
    let width = node.width.round();
    let height = node.height.round();
    let px = point.x.round();
    let py = point.y.round();

    if px <= nx + 1.0 {
        Side::Left
    } else if px >= nx + width - 1.0 {
        Side::Right
    } else if py <= ny + 1.0 {
        Side::Top
    } else if py >= ny + height - 1.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// Floating anchors for a connector from `source` to `target`.
pub fn edge_params(source: &NodeRect, target: &NodeRect) -> EdgeParams {
    let source_point = intersect_boundary(source, target);
    let target_point = intersect_boundary(target, source);

    EdgeParams {
        source: source_point,
        target: target_point,
        source_side: classify_side(source, source_point),
        target_side: classify_side(target, target_point),
    }
}

/// Row handles for an attribute-to-attribute connector: the source leaves on
/// the side facing the target, the target is entered on the side facing the
/// source. Ties on the horizontal center go left-to-right.
pub fn handle_sides(source: &NodeRect, target: &NodeRect) -> (Side, Side) {
    if source.floored().center().x <= target.floored().center().x {
        (Side::Right, Side::Left)
    } else {
        (Side::Left, Side::Right)
    }
}
