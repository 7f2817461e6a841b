use serde::{Deserialize, Serialize};

/// Map coordinate. Rows grow southwards, columns eastwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev distance; adjacent tiles (diagonals included) are at distance 1.
    pub fn distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .find(|dir| self.step(*dir) == other)
    }

    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        Direction::ALL.into_iter().map(move |dir| self.step(dir))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::Ne,
        Direction::E,
        Direction::Se,
        Direction::S,
        Direction::Sw,
        Direction::W,
        Direction::Nw,
    ];

    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::Ne => (1, -1),
            Direction::E => (1, 0),
            Direction::Se => (1, 1),
            Direction::S => (0, 1),
            Direction::Sw => (-1, 1),
            Direction::W => (-1, 0),
            Direction::Nw => (-1, -1),
        }
    }

    pub const fn reverse(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::Ne => Direction::Sw,
            Direction::E => Direction::W,
            Direction::Se => Direction::Nw,
            Direction::S => Direction::N,
            Direction::Sw => Direction::Ne,
            Direction::W => Direction::E,
            Direction::Nw => Direction::Se,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_step_returns_to_origin() {
        let origin = Position::new(4, 4);
        for dir in Direction::ALL {
            assert_eq!(origin.step(dir).step(dir.reverse()), origin);
            assert_eq!(origin.direction_to(origin.step(dir)), Some(dir));
        }
    }

    #[test]
    fn neighbors_are_all_at_distance_one() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.neighbors().count(), 8);
        assert!(origin.neighbors().all(|p| p.distance(origin) == 1));
        assert_eq!(origin.direction_to(Position::new(2, 0)), None);
    }
}
