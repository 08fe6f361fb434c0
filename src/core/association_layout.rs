//! Association layout engine
//!
//! Turns a relationship plus the current node snapshots into a renderable
//! connector: orthogonal stepped paths between floating anchors for binary
//! associations (fanned out when several join the same pair of entities) and
//! a rounded rectangular loop for reflexive ones.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::geometry::{NodeRect, Point, Side, edge_params, intersect_boundary};
use super::ids::EntityId;
use super::relationship_index::ParallelSlot;
use super::schema::{Relationship, SchemaModel};
use super::views::View;

/// Geometric constants for connector layout
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Distance between neighbouring parallel connectors
    pub parallel_spacing: f64,
    /// Fraction of the parallel offset applied to the bend position
    pub step_shift_factor: f64,
    /// Upper bound for a self-loop leg
    pub self_loop_max_leg: f64,
    /// Radius of the rounded self-loop corners
    pub corner_radius: f64,
    /// Gap between a self-loop and its name label
    pub label_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            parallel_spacing: 16.0,
            step_shift_factor: 0.5,
            self_loop_max_leg: 40.0,
            corner_radius: 8.0,
            label_gap: 12.0,
        }
    }
}

/// Renderable connector
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectorPath {
    /// Polyline corners from source to target
    pub points: Vec<Point>,
    /// SVG path data
    pub path: String,
    /// Anchor for the name and multiplicity labels
    pub label: Point,
    pub source_side: Side,
    pub target_side: Side,
}

// ============================================================================
// Canvas
// ============================================================================

/// Source of node snapshots (absolute position and measured size).
///
/// `None` means the node cannot be placed right now, e.g. it has not been
/// measured yet or is hidden in the current view.
pub trait Canvas {
    fn node(&self, id: &EntityId) -> Option<NodeRect>;
}

impl Canvas for HashMap<EntityId, NodeRect> {
    fn node(&self, id: &EntityId) -> Option<NodeRect> {
        self.get(id).copied()
    }
}

/// Canvas over a model's positions in one view, with sizes measured elsewhere.
/// Entities hidden in the view are unresolvable.
pub struct ViewCanvas<'a> {
    model: &'a SchemaModel,
    view: View,
    sizes: &'a HashMap<EntityId, (f64, f64)>,
    default_size: Option<(f64, f64)>,
}

impl<'a> ViewCanvas<'a> {
    pub fn new(model: &'a SchemaModel, view: View, sizes: &'a HashMap<EntityId, (f64, f64)>) -> Self {
        Self {
            model,
            view,
            sizes,
            default_size: None,
        }
    }

    /// Size used for entities missing from the measurement map
    pub fn with_default_size(mut self, width: f64, height: f64) -> Self {
        self.default_size = Some((width, height));
        self
    }
}

impl Canvas for ViewCanvas<'_> {
    fn node(&self, id: &EntityId) -> Option<NodeRect> {
        let entity = self.model.entity(id)?;
        if !entity.is_visible_in(self.view) {
            return None;
        }
        let (width, height) = self.sizes.get(id).copied().or(self.default_size)?;
        Some(NodeRect::at(entity.view_positions[self.view], width, height))
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Lay out one relationship against the canvas; `None` while either end is
/// unresolvable.
pub fn layout_relationship(
    canvas: &impl Canvas,
    relationship: &Relationship,
    config: &LayoutConfig,
) -> Option<ConnectorPath> {
    let source = canvas.node(&relationship.source)?;
    if relationship.is_self_loop() {
        return Some(layout_self_loop(&source, config));
    }
    let target = canvas.node(&relationship.target)?;
    Some(layout_association(
        &source,
        &target,
        relationship.parallel.unwrap_or(ParallelSlot::SINGLE),
        config,
    ))
}

/// Signed perpendicular offset of a slot, symmetric around the group center
pub fn parallel_offset(slot: ParallelSlot, spacing: f64) -> f64 {
    (slot.index as f64 - (slot.count as f64 - 1.0) / 2.0) * spacing
}

/// Stepped connector between two distinct nodes.
///
/// The offset is applied across the dominant axis of the center-to-center
/// line. The bend is shifted in proportion to the offset, signed by how the
/// centers are ordered on the secondary axis, so a group fans out
/// symmetrically instead of every member bending the same way.
pub fn layout_association(
    source: &NodeRect,
    target: &NodeRect,
    slot: ParallelSlot,
    config: &LayoutConfig,
) -> ConnectorPath {
    let params = edge_params(source, target);
    let offset = parallel_offset(slot, config.parallel_spacing);

    let source_center = source.center();
    let target_center = target.center();
    let horizontal =
        (target_center.x - source_center.x).abs() >= (target_center.y - source_center.y).abs();

    let points = if horizontal {
        let start = Point::new(params.source.x, params.source.y + offset);
        let end = Point::new(params.target.x, params.target.y + offset);
        let sign = if target_center.y >= source_center.y { 1.0 } else { -1.0 };
        let bend_x = (start.x + end.x) / 2.0 + offset * config.step_shift_factor * sign;
        vec![
            start,
            Point::new(bend_x, start.y),
            Point::new(bend_x, end.y),
            end,
        ]
    } else {
        let start = Point::new(params.source.x + offset, params.source.y);
        let end = Point::new(params.target.x + offset, params.target.y);
        let sign = if target_center.x >= source_center.x { 1.0 } else { -1.0 };
        let bend_y = (start.y + end.y) / 2.0 + offset * config.step_shift_factor * sign;
        vec![
            start,
            Point::new(start.x, bend_y),
            Point::new(end.x, bend_y),
            end,
        ]
    };

    ConnectorPath {
        path: polyline_path(&points),
        label: polyline_midpoint(&points),
        points,
        source_side: params.source_side,
        target_side: params.target_side,
    }
}

/// Rounded rectangular loop for a reflexive association.
///
/// The loop is a rectangle centered on the node's top-right corner with
/// sides `min(max_leg, width / 4)` by `min(max_leg, height / 4)`; it leaves
/// through the top edge and comes back through the right edge.
pub fn layout_self_loop(node: &NodeRect, config: &LayoutConfig) -> ConnectorPath {
    let leg_x = config.self_loop_max_leg.min(node.width / 4.0);
    let leg_y = config.self_loop_max_leg.min(node.height / 4.0);
    let half_x = leg_x / 2.0;
    let half_y = leg_y / 2.0;
    let right = node.right();
    let top = node.top();

    let points = vec![
        Point::new(right - half_x, top),
        Point::new(right - half_x, top - half_y),
        Point::new(right + half_x, top - half_y),
        Point::new(right + half_x, top + half_y),
        Point::new(right, top + half_y),
    ];

    ConnectorPath {
        path: rounded_path(&points, config.corner_radius),
        label: Point::new(right, top - half_y - config.label_gap),
        points,
        source_side: Side::Top,
        target_side: Side::Right,
    }
}

/// Dashed link from an associative relationship's label anchor to its
/// association class: `(label, point on the class boundary)`.
pub fn association_class_anchor(label: Point, class_node: &NodeRect) -> (Point, Point) {
    let probe = NodeRect::new(label.x - 0.5, label.y - 0.5, 1.0, 1.0);
    (label, intersect_boundary(class_node, &probe))
}

// ============================================================================
// Path helpers
// ============================================================================

/// `M x y L x y ...`
pub fn polyline_path(points: &[Point]) -> String {
    let mut path = String::new();
    for (i, p) in points.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            path.push(' ');
        }
        let _ = write!(path, "{} {} {}", command, p.x, p.y);
    }
    path
}

/// Point halfway along the polyline by arc length
pub fn polyline_midpoint(points: &[Point]) -> Point {
    let Some(first) = points.first() else {
        return Point::default();
    };
    let total: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    if total <= f64::EPSILON {
        return *first;
    }

    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let length = w[0].distance(w[1]);
        if length >= remaining && length > 0.0 {
            let t = remaining / length;
            return Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            );
        }
        remaining -= length;
    }
    *points.last().unwrap_or(first)
}

/// Polyline with each interior corner replaced by a quarter-circle arc. The
/// radius at a corner is capped at half the shorter adjacent segment.
pub fn rounded_path(points: &[Point], radius: f64) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut path = format!("M {} {}", first.x, first.y);

    for i in 1..points.len().saturating_sub(1) {
        let (prev, corner, next) = (points[i - 1], points[i], points[i + 1]);
        let len_in = prev.distance(corner);
        let len_out = corner.distance(next);
        let r = radius.min(len_in / 2.0).min(len_out / 2.0);

        if r <= f64::EPSILON {
            let _ = write!(path, " L {} {}", corner.x, corner.y);
            continue;
        }

        let before = Point::new(
            corner.x - (corner.x - prev.x) / len_in * r,
            corner.y - (corner.y - prev.y) / len_in * r,
        );
        let after = Point::new(
            corner.x + (next.x - corner.x) / len_out * r,
            corner.y + (next.y - corner.y) / len_out * r,
        );
        let cross = (corner.x - prev.x) * (next.y - corner.y) - (corner.y - prev.y) * (next.x - corner.x);
        let sweep = if cross > 0.0 { 1 } else { 0 };

        let _ = write!(
            path,
            " L {} {} A {} {} 0 0 {} {} {}",
            before.x, before.y, r, r, sweep, after.x, after.y
        );
    }

    if points.len() > 1 {
        let last = points[points.len() - 1];
        let _ = write!(path, " L {} {}", last.x, last.y);
    }
    path
}
