//! Polyomino shape matching over an occupancy snapshot
//!
//! Every family scans candidate origins in a fixed order and reports the
//! first placement that matches. Pattern cells are signed offsets from the
//! origin; offsets that leave the grid read as empty, so an origin too close
//! to the edge simply fails to match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::grid::Occupancy;
use crate::error::SessionError;

/// Shape family a level asks the player to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetShape {
    /// 3×1 or 1×3 line
    #[serde(alias = "3x1_1x3")]
    Line,
    /// T-tetromino cross (ㅜ ㅗ ㅓ ㅏ)
    T,
    /// 2×2 square
    #[serde(alias = "2x2")]
    Square,
    /// L/J family (ㄱ ㄴ and mirrors)
    #[serde(alias = "K")]
    L,
}

impl TargetShape {
    pub const ALL: [TargetShape; 4] = [
        TargetShape::Line,
        TargetShape::T,
        TargetShape::Square,
        TargetShape::L,
    ];

    /// Identifier used by level data
    pub fn id(&self) -> &'static str {
        match self {
            TargetShape::Line => "3x1_1x3",
            TargetShape::T => "T",
            TargetShape::Square => "2x2",
            TargetShape::L => "K",
        }
    }

    /// Variants this family can report
    pub fn variants(&self) -> &'static [ShapeVariant] {
        use ShapeVariant::*;
        match self {
            TargetShape::Line => &[Line3x1, Line1x3],
            TargetShape::T => &[TDown, TUp, TLeft, TRight],
            TargetShape::Square => &[Square2x2],
            TargetShape::L => &[Giyeok, MirroredGiyeok, Nieun, MirroredNieun],
        }
    }
}

impl FromStr for TargetShape {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3x1_1x3" | "Line" | "line" => Ok(TargetShape::Line),
            "T" | "t" => Ok(TargetShape::T),
            "2x2" | "Square" | "square" => Ok(TargetShape::Square),
            "K" | "L" | "l" => Ok(TargetShape::L),
            other => Err(SessionError::UnsupportedTarget { id: other.to_string() }),
        }
    }
}

impl fmt::Display for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Concrete placement orientation reported by a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeVariant {
    /// Three in a row
    Line3x1,
    /// Three in a column
    Line1x3,
    /// ㅜ: bar on top, stem down
    TDown,
    /// ㅗ: stem on top, bar at the bottom
    TUp,
    /// ㅓ: vertical bar with stem to the left
    TLeft,
    /// ㅏ: vertical bar with stem to the right
    TRight,
    Square2x2,
    /// ㄱ
    Giyeok,
    MirroredGiyeok,
    /// ㄴ
    Nieun,
    MirroredNieun,
}

impl ShapeVariant {
    /// Tag string shown by the host UI
    pub fn tag(&self) -> &'static str {
        match self {
            ShapeVariant::Line3x1 => "3x1",
            ShapeVariant::Line1x3 => "1x3",
            ShapeVariant::TDown => "up",
            ShapeVariant::TUp => "down",
            ShapeVariant::TLeft => "right",
            ShapeVariant::TRight => "left",
            ShapeVariant::Square2x2 => "2x2",
            ShapeVariant::Giyeok => "ㄱ",
            ShapeVariant::MirroredGiyeok => "mirrored-ㄱ",
            ShapeVariant::Nieun => "ㄴ",
            ShapeVariant::MirroredNieun => "mirrored-ㄴ",
        }
    }

    /// Pattern cells as `(row, col)` offsets from the scan origin
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            ShapeVariant::Line3x1 => &[(0, 0), (0, 1), (0, 2)],
            ShapeVariant::Line1x3 => &[(0, 0), (1, 0), (2, 0)],
            ShapeVariant::TDown => &[(0, -1), (0, 0), (0, 1), (1, 0), (2, 0)],
            ShapeVariant::TUp => &[(0, 0), (1, 0), (2, -1), (2, 0), (2, 1)],
            ShapeVariant::TLeft => &[(0, 0), (-1, 1), (0, 1), (1, 1), (0, -1)],
            ShapeVariant::TRight => &[(0, 0), (-1, -1), (0, -1), (1, -1), (0, 1)],
            ShapeVariant::Square2x2 => &[(0, 0), (0, 1), (1, 0), (1, 1)],
            ShapeVariant::Giyeok => &[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)],
            ShapeVariant::MirroredGiyeok => &[(0, 0), (0, -1), (0, -2), (1, -2), (2, -2)],
            ShapeVariant::Nieun => &[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)],
            ShapeVariant::MirroredNieun => &[(0, 0), (1, 0), (2, 0), (2, -1), (2, -2)],
        }
    }

    /// Does the pattern fit at `(row, col)`?
    pub fn matches_at(&self, occ: &Occupancy, row: isize, col: isize) -> bool {
        self.offsets()
            .iter()
            .all(|&(dr, dc)| occ.get(row + dr, col + dc))
    }
}

impl fmt::Display for ShapeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of a shape check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Found(ShapeVariant),
    NotFound,
}

impl MatchResult {
    #[inline]
    pub fn found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    #[inline]
    pub fn variant(&self) -> Option<ShapeVariant> {
        match self {
            MatchResult::Found(v) => Some(*v),
            MatchResult::NotFound => None,
        }
    }
}

/// Check the occupancy for one target family
pub fn check_target(occ: &Occupancy, target: TargetShape) -> MatchResult {
    match target {
        TargetShape::Line => line_3x1_1x3(occ),
        TargetShape::T => block_t(occ),
        TargetShape::Square => block_2x2(occ),
        TargetShape::L => block_l(occ),
    }
}

/// Check every family, in declaration order (debug panel view)
pub fn check_all(occ: &Occupancy) -> [(TargetShape, MatchResult); 4] {
    TargetShape::ALL.map(|t| (t, check_target(occ, t)))
}

/// Row scan for 3x1 first, then column scan for 1x3
pub fn line_3x1_1x3(occ: &Occupancy) -> MatchResult {
    let n = occ.size() as isize;
    for row in 0..n {
        for col in 0..=(n - 3) {
            if ShapeVariant::Line3x1.matches_at(occ, row, col) {
                return MatchResult::Found(ShapeVariant::Line3x1);
            }
        }
    }
    for col in 0..n {
        for row in 0..=(n - 3) {
            if ShapeVariant::Line1x3.matches_at(occ, row, col) {
                return MatchResult::Found(ShapeVariant::Line1x3);
            }
        }
    }
    MatchResult::NotFound
}

pub fn block_t(occ: &Occupancy) -> MatchResult {
    scan_origins(occ, TargetShape::T.variants())
}

pub fn block_2x2(occ: &Occupancy) -> MatchResult {
    scan_origins(occ, TargetShape::Square.variants())
}

pub fn block_l(occ: &Occupancy) -> MatchResult {
    scan_origins(occ, TargetShape::L.variants())
}

/// Row-major over origins; at each origin try `variants` in order
fn scan_origins(occ: &Occupancy, variants: &[ShapeVariant]) -> MatchResult {
    let n = occ.size() as isize;
    for row in 0..n {
        for col in 0..n {
            if let Some(v) = variants.iter().find(|v| v.matches_at(occ, row, col)) {
                return MatchResult::Found(*v);
            }
        }
    }
    MatchResult::NotFound
}
