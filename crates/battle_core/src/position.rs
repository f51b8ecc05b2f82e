//! Squad grid positions.
//!
//! A squad is a 2×3 grid: two lines (front, back) by three flanks (top,
//! center, bottom). Small units take one cell. Big units take both lines of
//! their flank.

use serde::{Deserialize, Serialize};

/// Line of a squad cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Line {
    /// Line facing the enemy.
    Front,
    /// Line behind the front line.
    Back,
}

impl Line {
    /// Both lines, front first.
    pub const ALL: [Line; 2] = [Line::Front, Line::Back];
}

/// Flank of a squad cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flank {
    /// Upper flank.
    Top,
    /// Middle flank.
    Center,
    /// Lower flank.
    Bottom,
}

impl Flank {
    /// All flanks, top to bottom.
    pub const ALL: [Flank; 3] = [Flank::Top, Flank::Center, Flank::Bottom];

    const fn index(self) -> u8 {
        match self {
            Flank::Top => 0,
            Flank::Center => 1,
            Flank::Bottom => 2,
        }
    }

    /// Number of flank steps between two flanks (0, 1 or 2).
    #[must_use]
    pub const fn distance(self, other: Flank) -> u8 {
        self.index().abs_diff(other.index())
    }
}

/// How many cells a unit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSize {
    /// One cell.
    #[default]
    Small,
    /// Both lines of one flank.
    Big,
}

/// Placement of a unit inside its squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitPosition {
    /// Line of the unit. Always [`Line::Front`] for big units.
    pub line: Line,
    /// Flank of the unit.
    pub flank: Flank,
    /// Cells covered by the unit.
    pub size: UnitSize,
}

impl UnitPosition {
    /// Position of a small unit.
    #[must_use]
    pub const fn small(line: Line, flank: Flank) -> Self {
        Self {
            line,
            flank,
            size: UnitSize::Small,
        }
    }

    /// Position of a big unit covering both lines of `flank`.
    #[must_use]
    pub const fn big(flank: Flank) -> Self {
        Self {
            line: Line::Front,
            flank,
            size: UnitSize::Big,
        }
    }

    /// Position of a unit of the given size, normalising big units to the front line.
    #[must_use]
    pub const fn new(line: Line, flank: Flank, size: UnitSize) -> Self {
        match size {
            UnitSize::Small => Self::small(line, flank),
            UnitSize::Big => Self::big(flank),
        }
    }

    /// Whether the unit stands on `line`.
    #[must_use]
    pub fn is_on_line(&self, line: Line) -> bool {
        self.size == UnitSize::Big || self.line == line
    }

    /// Whether the unit covers the cell `(line, flank)`.
    #[must_use]
    pub fn occupies(&self, line: Line, flank: Flank) -> bool {
        self.flank == flank && self.is_on_line(line)
    }

    /// Whether two positions share at least one cell.
    #[must_use]
    pub fn overlaps(&self, other: &UnitPosition) -> bool {
        Line::ALL
            .iter()
            .any(|&line| self.occupies(line, self.flank) && other.occupies(line, self.flank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flank_distance() {
        assert_eq!(Flank::Top.distance(Flank::Top), 0);
        assert_eq!(Flank::Top.distance(Flank::Center), 1);
        assert_eq!(Flank::Bottom.distance(Flank::Top), 2);
    }

    #[test]
    fn test_big_unit_covers_both_lines() {
        let big = UnitPosition::new(Line::Back, Flank::Center, UnitSize::Big);
        assert_eq!(big.line, Line::Front);
        assert!(big.occupies(Line::Front, Flank::Center));
        assert!(big.occupies(Line::Back, Flank::Center));
        assert!(!big.occupies(Line::Front, Flank::Top));
    }

    #[test]
    fn test_overlap() {
        let front = UnitPosition::small(Line::Front, Flank::Top);
        let back = UnitPosition::small(Line::Back, Flank::Top);
        let big = UnitPosition::big(Flank::Top);
        assert!(!front.overlaps(&back));
        assert!(big.overlaps(&front));
        assert!(back.overlaps(&big));
        assert!(!big.overlaps(&UnitPosition::big(Flank::Bottom)));
    }
}
