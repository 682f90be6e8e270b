//! Crop anchors.

use std::fmt;

/// Reference point used when cropping to a target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    #[default]
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    /// All anchors, in URL-code order.
    pub const ALL: [Gravity; 9] = [
        Gravity::NorthWest,
        Gravity::North,
        Gravity::NorthEast,
        Gravity::West,
        Gravity::Center,
        Gravity::East,
        Gravity::SouthWest,
        Gravity::South,
        Gravity::SouthEast,
    ];

    /// Parse a URL gravity code (`nw`, `n`, ... `c`).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    /// The URL code for this anchor.
    pub fn code(self) -> &'static str {
        match self {
            Gravity::NorthWest => "nw",
            Gravity::North => "n",
            Gravity::NorthEast => "ne",
            Gravity::West => "w",
            Gravity::Center => "c",
            Gravity::East => "e",
            Gravity::SouthWest => "sw",
            Gravity::South => "s",
            Gravity::SouthEast => "se",
        }
    }

    /// Top-left offset of a crop window, given how many pixels the resized
    /// image exceeds the window by on each axis.
    pub fn crop_offset(self, excess_width: u32, excess_height: u32) -> (u32, u32) {
        let x = match self {
            Gravity::NorthWest | Gravity::West | Gravity::SouthWest => 0,
            Gravity::North | Gravity::Center | Gravity::South => excess_width / 2,
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => excess_width,
        };
        let y = match self {
            Gravity::NorthWest | Gravity::North | Gravity::NorthEast => 0,
            Gravity::West | Gravity::Center | Gravity::East => excess_height / 2,
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => excess_height,
        };
        (x, y)
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
