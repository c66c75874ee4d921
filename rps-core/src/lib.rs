use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds an individual can be, locked in cyclic dominance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Rock,
    Paper,
    Scissor,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Rock, Kind::Paper, Kind::Scissor];

    /// The kind this kind hunts and converts on contact.
    pub fn prey(self) -> Kind {
        match self {
            Kind::Rock => Kind::Scissor,
            Kind::Paper => Kind::Rock,
            Kind::Scissor => Kind::Paper,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Rock => "rock",
            Kind::Paper => "paper",
            Kind::Scissor => "scissor",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-left corner of an individual's bounding square.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Euclidean distance to another position.
    pub fn distance(self, other: Position) -> f32 {
        (other.to_vec2() - self.to_vec2()).length()
    }
}

/// One square in the arena. Position and kind mutate in place; individuals
/// are never created or destroyed after spawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub position: Position,
    pub kind: Kind,
    pub speed: f32,
}

impl Individual {
    pub fn new(position: Position, kind: Kind, speed: f32) -> Self {
        Individual {
            position,
            kind,
            speed,
        }
    }

    /// Advances `speed` units along the atan2 heading toward `target`.
    pub fn step_toward(&mut self, target: Position) {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let angle = dy.atan2(dx);
        self.position.x += angle.cos() * self.speed;
        self.position.y += angle.sin() * self.speed;
    }

    pub fn convert(&mut self, kind: Kind) {
        self.kind = kind;
    }
}

/// Strict overlap test for two axis-aligned squares of side `size` anchored
/// at top-left corners `a` and `b`. Squares that only share an edge or a
/// corner do not overlap.
pub fn squares_overlap(a: Position, b: Position, size: f32) -> bool {
    a.x < b.x + size && a.x + size > b.x && a.y < b.y + size && a.y + size > b.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prey_relation_is_cyclic() {
        assert_eq!(Kind::Rock.prey(), Kind::Scissor);
        assert_eq!(Kind::Paper.prey(), Kind::Rock);
        assert_eq!(Kind::Scissor.prey(), Kind::Paper);
        for kind in Kind::ALL {
            assert_eq!(kind.prey().prey().prey(), kind);
            assert_ne!(kind.prey(), kind);
        }
    }

    #[test]
    fn step_toward_advances_along_heading() {
        // 3-4-5 triangle: heading components are 0.6 and 0.8.
        let mut ind = Individual::new(Position::new(0.0, 0.0), Kind::Rock, 0.5);
        ind.step_toward(Position::new(3.0, 4.0));
        assert!((ind.position.x - 0.3).abs() < 1e-5);
        assert!((ind.position.y - 0.4).abs() < 1e-5);
    }

    #[test]
    fn step_toward_coincident_target_is_finite() {
        // atan2(0, 0) is 0, so the step degenerates to +x rather than NaN.
        let mut ind = Individual::new(Position::new(5.0, 5.0), Kind::Paper, 0.4);
        ind.step_toward(Position::new(5.0, 5.0));
        assert!(ind.position.x.is_finite() && ind.position.y.is_finite());
    }

    #[test]
    fn overlap_is_strict() {
        let size = 16.0;
        let origin = Position::new(0.0, 0.0);
        assert!(squares_overlap(origin, Position::new(15.9, 0.0), size));
        assert!(squares_overlap(origin, origin, size));
        // Shared edge and shared corner are not overlap.
        assert!(!squares_overlap(origin, Position::new(16.0, 0.0), size));
        assert!(!squares_overlap(origin, Position::new(0.0, 16.0), size));
        assert!(!squares_overlap(origin, Position::new(16.0, 16.0), size));
        assert!(!squares_overlap(origin, Position::new(17.0, 0.0), size));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(10.0, -3.0);
        assert_eq!(squares_overlap(a, b, 16.0), squares_overlap(b, a, 16.0));
    }

    #[test]
    fn distance_matches_euclidean() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(4.0, 6.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert_eq!(a.distance(a), 0.0);
    }
}
