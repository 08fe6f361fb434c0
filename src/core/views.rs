//! Multi-view position and visibility model
//!
//! Every entity keeps an independent position and visibility flag for each of
//! the conceptual, logical and physical views. The normalizers here accept any
//! JSON shape (imports, older documents, hand-edited files) and always return a
//! fully populated value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::geometry::Point;

/// Canvas position of an entity in one view
pub type Position = Point;

/// One of the three synchronized diagram views
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Conceptual,
    Logical,
    Physical,
}

impl View {
    pub const ALL: [View; 3] = [View::Conceptual, View::Logical, View::Physical];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Conceptual => "conceptual",
            View::Logical => "logical",
            View::Physical => "physical",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conceptual" => Ok(View::Conceptual),
            "logical" => Ok(View::Logical),
            "physical" => Ok(View::Physical),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

/// A value held once per view
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerView<T> {
    pub conceptual: T,
    pub logical: T,
    pub physical: T,
}

impl<T> PerView<T> {
    pub fn new(conceptual: T, logical: T, physical: T) -> Self {
        Self {
            conceptual,
            logical,
            physical,
        }
    }

    pub fn get(&self, view: View) -> &T {
        match view {
            View::Conceptual => &self.conceptual,
            View::Logical => &self.logical,
            View::Physical => &self.physical,
        }
    }

    pub fn get_mut(&mut self, view: View) -> &mut T {
        match view {
            View::Conceptual => &mut self.conceptual,
            View::Logical => &mut self.logical,
            View::Physical => &mut self.physical,
        }
    }

    pub fn set(&mut self, view: View, value: T) {
        *self.get_mut(view) = value;
    }
}

impl<T: Clone> PerView<T> {
    pub fn splat(value: T) -> Self {
        Self::new(value.clone(), value.clone(), value)
    }
}

impl<T> std::ops::Index<View> for PerView<T> {
    type Output = T;

    fn index(&self, view: View) -> &T {
        self.get(view)
    }
}

/// Per-view visibility; defaults to visible everywhere
pub type Visibility = PerView<bool>;

/// Per-view entity positions
pub type ViewPositions = PerView<Position>;

impl Visibility {
    pub fn all_visible() -> Self {
        Self::splat(true)
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::all_visible()
    }
}

impl Default for ViewPositions {
    /// Every view at the origin
    fn default() -> Self {
        Self::splat(Position::default())
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// `raw` as a position if it is an object with finite numeric `x` and `y`,
/// otherwise `fallback`.
pub fn normalize_position(raw: &Value, fallback: Position) -> Position {
    match raw {
        Value::Object(map) => {
            let x = map.get("x").and_then(Value::as_f64);
            let y = map.get("y").and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Position::new(x, y),
                _ => fallback,
            }
        }
        _ => fallback,
    }
}

/// Fill all three views independently, each falling back to `fallback`.
pub fn normalize_view_positions(raw: &Value, fallback: Position) -> ViewPositions {
    let field = |view: View| normalize_position(raw.get(view.as_str()).unwrap_or(&Value::Null), fallback);
    PerView::new(
        field(View::Conceptual),
        field(View::Logical),
        field(View::Physical),
    )
}

/// Positions of a raw entity object.
///
/// Reads the per-view map from `viewPositions`; the shared fallback is the
/// entity's non-view-specific `position` when that is valid, the origin
/// otherwise.
pub fn normalize_entity_positions(raw_entity: &Value) -> ViewPositions {
    let fallback = normalize_position(
        raw_entity.get("position").unwrap_or(&Value::Null),
        Position::default(),
    );
    normalize_view_positions(
        raw_entity.get("viewPositions").unwrap_or(&Value::Null),
        fallback,
    )
}

/// Booleans per view; a missing or non-boolean field is visible.
pub fn normalize_visibility(raw: &Value) -> Visibility {
    let field = |view: View| {
        raw.get(view.as_str())
            .and_then(Value::as_bool)
            .unwrap_or(true)
    };
    PerView::new(
        field(View::Conceptual),
        field(View::Logical),
        field(View::Physical),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_position_valid() {
        let pos = normalize_position(&json!({"x": 10.5, "y": -3}), Position::new(1.0, 1.0));
        assert_eq!(pos, Position::new(10.5, -3.0));
    }

    #[test]
    fn test_normalize_position_falls_back() {
        let fallback = Position::new(7.0, 8.0);
        assert_eq!(normalize_position(&json!(null), fallback), fallback);
        assert_eq!(normalize_position(&json!({"x": 1}), fallback), fallback);
        assert_eq!(normalize_position(&json!({"x": "1", "y": 2}), fallback), fallback);
        assert_eq!(normalize_position(&json!([1, 2]), fallback), fallback);
    }

    #[test]
    fn test_normalize_view_positions_independent() {
        let fallback = Position::new(5.0, 5.0);
        let positions = normalize_view_positions(
            &json!({"conceptual": {"x": 1, "y": 2}, "physical": "bad"}),
            fallback,
        );
        assert_eq!(positions.conceptual, Position::new(1.0, 2.0));
        assert_eq!(positions.logical, fallback);
        assert_eq!(positions.physical, fallback);
    }

    #[test]
    fn test_normalize_entity_positions_uses_base_position() {
        let positions = normalize_entity_positions(&json!({
            "position": {"x": 100, "y": 200},
            "viewPositions": {"logical": {"x": 3, "y": 4}}
        }));
        assert_eq!(positions.conceptual, Position::new(100.0, 200.0));
        assert_eq!(positions.logical, Position::new(3.0, 4.0));
        assert_eq!(positions.physical, Position::new(100.0, 200.0));

        let positions = normalize_entity_positions(&json!(42));
        assert_eq!(positions, ViewPositions::splat(Position::default()));
    }

    #[test]
    fn test_normalize_visibility() {
        let vis = normalize_visibility(&json!({"conceptual": false, "logical": "no"}));
        assert!(!vis.conceptual);
        assert!(vis.logical);
        assert!(vis.physical);

        assert_eq!(normalize_visibility(&json!(null)), Visibility::all_visible());
    }

    #[test]
    fn test_per_view_access() {
        let mut vis = Visibility::all_visible();
        vis.set(View::Logical, false);
        assert!(!vis[View::Logical]);
        assert!(vis[View::Physical]);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Visibility::default(), Visibility::all_visible());
        assert_eq!(
            ViewPositions::default(),
            ViewPositions::splat(Position::new(0.0, 0.0))
        );
    }

    #[test]
    fn test_view_parse() {
        assert_eq!("Physical".parse::<View>(), Ok(View::Physical));
        assert!("table".parse::<View>().is_err());
    }
}
