//! Axial hex coordinates and the six-direction movement vocabulary.
//!
//! The grid is pointy-top. Axial `(q, r)` maps to cube `(x = q, z = r, y = -q - r)`;
//! every distance and rounding routine goes through the cube form so the
//! `x + y + z == 0` constraint is never violated.

use core::fmt;

/// Axial coordinate on the hex grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate implied by the axial pair. Widened so that
    /// every `i32` pair has one.
    #[inline]
    pub const fn s(self) -> i64 {
        -(self.q as i64) - (self.r as i64)
    }

    /// Component-wise sum, or `None` when either axis leaves `i32`.
    pub fn checked_add(self, rhs: HexCoord) -> Option<HexCoord> {
        Some(HexCoord::new(
            self.q.checked_add(rhs.q)?,
            self.r.checked_add(rhs.r)?,
        ))
    }

    /// Cell reached by stepping once in `direction`, or `None` at the edge of
    /// the representable plane.
    pub fn neighbor(self, direction: Direction) -> Option<HexCoord> {
        self.checked_add(direction.offset())
    }

    /// Every representable neighbour, in [`Direction::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = (Direction, HexCoord)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| Some((direction, self.neighbor(direction)?)))
    }

    pub fn is_neighbor(self, other: HexCoord) -> bool {
        self.direction_to(other).is_some()
    }

    /// Direction that moves `self` onto `other`, or `None` when the cells are
    /// not adjacent (including `self == other`).
    ///
    /// This is the only client-side authority for move legality.
    pub fn direction_to(self, other: HexCoord) -> Option<Direction> {
        let dq = i64::from(other.q) - i64::from(self.q);
        let dr = i64::from(other.r) - i64::from(self.r);
        Direction::ALL.into_iter().find(|direction| {
            let offset = direction.offset();
            (i64::from(offset.q), i64::from(offset.r)) == (dq, dr)
        })
    }

    /// Hex distance: the largest absolute cube-coordinate difference.
    pub fn distance(self, other: HexCoord) -> u64 {
        let dx = i64::from(self.q).abs_diff(i64::from(other.q));
        let dz = i64::from(self.r).abs_diff(i64::from(other.r));
        let dy = self.s().abs_diff(other.s());
        dx.max(dy).max(dz)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Movement direction. The discriminant is the ledger's enum index.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Direction {
    #[strum(to_string = "East", serialize = "e")]
    East = 0,
    #[strum(to_string = "NorthEast", serialize = "ne")]
    NorthEast = 1,
    #[strum(to_string = "NorthWest", serialize = "nw")]
    NorthWest = 2,
    #[strum(to_string = "West", serialize = "w")]
    West = 3,
    #[strum(to_string = "SouthWest", serialize = "sw")]
    SouthWest = 4,
    #[strum(to_string = "SouthEast", serialize = "se")]
    SouthEast = 5,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// Axial offset bound to this direction. The mapping is a bijection.
    pub const fn offset(self) -> HexCoord {
        match self {
            Direction::East => HexCoord::new(1, 0),
            Direction::NorthEast => HexCoord::new(1, -1),
            Direction::NorthWest => HexCoord::new(0, -1),
            Direction::West => HexCoord::new(-1, 0),
            Direction::SouthWest => HexCoord::new(-1, 1),
            Direction::SouthEast => HexCoord::new(0, 1),
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::West => Direction::East,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }
}

/// Raised when a ledger value does not name one of the six directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction index {0}")]
pub struct InvalidDirection(pub u64);

impl TryFrom<u64> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Direction::ALL.get(index).copied())
            .ok_or(InvalidDirection(value))
    }
}

/// Fractional cube coordinate produced by pixel picking or interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractionalHex {
    pub q: f64,
    pub r: f64,
    pub s: f64,
}

impl FractionalHex {
    pub fn new(q: f64, r: f64) -> Self {
        Self { q, r, s: -q - r }
    }

    /// Round to the containing hex.
    ///
    /// Each cube component is rounded on its own, then the component with the
    /// largest rounding error is recomputed from the other two so that
    /// `q + r + s == 0` holds exactly. Naive rounding of `q` and `r` picks the
    /// wrong cell near edges.
    pub fn round(self) -> HexCoord {
        let mut q = self.q.round();
        let mut r = self.r.round();
        let s = self.s.round();

        let dq = (q - self.q).abs();
        let dr = (r - self.r).abs();
        let ds = (s - self.s).abs();

        if dq > dr && dq > ds {
            q = -r - s;
        } else if dr > ds {
            r = -q - s;
        }

        HexCoord::new(q as i32, r as i32)
    }
}

/// Pointy-top layout converting between hex cells and world-space points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexLayout {
    /// Centre-to-corner radius of one hex.
    pub size: f64,
    pub origin: (f64, f64),
}

impl HexLayout {
    const SQRT_3: f64 = 1.732_050_807_568_877_2;

    pub fn new(size: f64) -> Self {
        Self {
            size,
            origin: (0.0, 0.0),
        }
    }

    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    /// Centre of `hex` in world space.
    pub fn hex_to_pixel(&self, hex: HexCoord) -> (f64, f64) {
        let q = f64::from(hex.q);
        let r = f64::from(hex.r);
        let x = self.size * (Self::SQRT_3 * q + Self::SQRT_3 / 2.0 * r);
        let y = self.size * (1.5 * r);
        (x + self.origin.0, y + self.origin.1)
    }

    /// Fractional cell under a world-space point, before rounding.
    pub fn pixel_to_fractional(&self, x: f64, y: f64) -> FractionalHex {
        let px = (x - self.origin.0) / self.size;
        let py = (y - self.origin.1) / self.size;
        let q = Self::SQRT_3 / 3.0 * px - py / 3.0;
        let r = 2.0 / 3.0 * py;
        FractionalHex::new(q, r)
    }

    /// Cell containing a world-space point.
    pub fn pixel_to_hex(&self, x: f64, y: f64) -> HexCoord {
        self.pixel_to_fractional(x, y).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<HexCoord> {
        let mut points = Vec::new();
        for q in -6..=6 {
            for r in -6..=6 {
                points.push(HexCoord::new(q * 3 - 1, r * 2 + 1));
            }
        }
        points.push(HexCoord::new(i32::MAX / 4, -(i32::MAX / 4)));
        points
    }

    #[test]
    fn distance_is_a_metric() {
        let points = sample_points();
        for &a in &points {
            assert_eq!(a.distance(a), 0);
            for &b in points.iter().step_by(7) {
                assert_eq!(a.distance(b), b.distance(a));
                for &c in points.iter().step_by(13) {
                    assert!(a.distance(c) <= a.distance(b) + b.distance(c));
                }
            }
        }
    }

    #[test]
    fn distance_matches_known_values() {
        assert_eq!(HexCoord::ORIGIN.distance(HexCoord::new(1, 0)), 1);
        assert_eq!(HexCoord::ORIGIN.distance(HexCoord::new(1, -1)), 1);
        assert_eq!(HexCoord::ORIGIN.distance(HexCoord::new(2, 2)), 4);
        assert_eq!(HexCoord::new(3, -1).distance(HexCoord::new(-2, 4)), 5);
    }

    #[test]
    fn direction_to_inverts_neighbor() {
        for origin in sample_points() {
            for direction in Direction::ALL {
                let next = origin.neighbor(direction).unwrap();
                assert_eq!(origin.direction_to(next), Some(direction));
                assert!(origin.is_neighbor(next));
                assert_eq!(origin.distance(next), 1);
            }
        }
    }

    #[test]
    fn neighbors_are_pairwise_distinct() {
        let neighbors: Vec<_> = HexCoord::new(4, -7).neighbors().map(|(_, hex)| hex).collect();
        assert_eq!(neighbors.len(), 6);
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let min = HexCoord::new(i32::MIN, 0);
        let max = HexCoord::new(i32::MAX, 0);

        assert_eq!(min.distance(HexCoord::ORIGIN), 1 << 31);
        assert_eq!(max.distance(min), u64::from(u32::MAX));
        assert_eq!(
            HexCoord::new(i32::MIN, i32::MIN).distance(HexCoord::new(i32::MAX, i32::MAX)),
            2 * u64::from(u32::MAX)
        );
        assert_eq!(HexCoord::new(i32::MIN, i32::MIN).s(), 1 << 32);

        assert_eq!(max.neighbor(Direction::East), None);
        assert_eq!(max.neighbor(Direction::West), Some(HexCoord::new(i32::MAX - 1, 0)));
        assert_eq!(min.neighbor(Direction::SouthWest), None);
        assert_eq!(max.neighbors().count(), 4);
        assert_eq!(max.direction_to(min), None);
        assert_eq!(min.direction_to(max), None);
    }

    #[test]
    fn direction_to_rejects_non_adjacent() {
        let origin = HexCoord::new(2, 2);
        assert_eq!(origin.direction_to(origin), None);
        assert_eq!(origin.direction_to(HexCoord::new(4, 2)), None);
        // (+1, +1) is distance 2 on an axial grid.
        assert_eq!(origin.direction_to(HexCoord::new(3, 3)), None);
    }

    #[test]
    fn opposite_direction_walks_back() {
        let origin = HexCoord::new(-3, 5);
        for direction in Direction::ALL {
            assert_eq!(
                origin
                    .neighbor(direction)
                    .and_then(|next| next.neighbor(direction.opposite())),
                Some(origin)
            );
        }
    }

    #[test]
    fn direction_index_round_trips() {
        for direction in Direction::ALL {
            assert_eq!(
                Direction::try_from(u64::from(direction.index())),
                Ok(direction)
            );
        }
        assert_eq!(Direction::try_from(6), Err(InvalidDirection(6)));
    }

    #[test]
    fn direction_parses_short_and_long_names() {
        assert_eq!("ne".parse::<Direction>(), Ok(Direction::NorthEast));
        assert_eq!("southwest".parse::<Direction>(), Ok(Direction::SouthWest));
        assert!("north".parse::<Direction>().is_err());
    }

    #[test]
    fn rounding_keeps_cube_constraint() {
        let mut q = -4.0;
        while q < 4.0 {
            let mut r = -4.0;
            while r < 4.0 {
                let hex = FractionalHex::new(q, r).round();
                assert_eq!(i64::from(hex.q) + i64::from(hex.r) + hex.s(), 0);
                let exact = FractionalHex::new(q, r);
                let err = (f64::from(hex.q) - exact.q)
                    .abs()
                    .max((f64::from(hex.r) - exact.r).abs())
                    .max((hex.s() as f64 - exact.s).abs());
                assert!(err <= 1.0, "rounded {hex} too far from ({q}, {r})");
                r += 0.137;
            }
            q += 0.113;
        }
    }

    #[test]
    fn rounding_corrects_the_largest_error() {
        // Naive rounding of q and r lands on (0, 0), two-thirds of a cell away.
        let hex = FractionalHex::new(0.4, 0.4).round();
        assert_eq!(hex, HexCoord::new(0, 1));

        // Naive rounding gives (1, 0); q carries the largest error.
        let edge = FractionalHex::new(0.6, -0.3).round();
        assert_eq!(edge, HexCoord::new(0, 0));
    }

    #[test]
    fn pixel_round_trip_hits_centres() {
        let layout = HexLayout::new(1.0).with_origin(10.0, -5.0);
        for hex in sample_points().into_iter().take(40) {
            let (x, y) = layout.hex_to_pixel(hex);
            assert_eq!(layout.pixel_to_hex(x, y), hex);
            assert_eq!(layout.pixel_to_hex(x + 0.3, y - 0.2), hex);
        }
    }
}
