//! Named reference points and the flag sets the simulate kernel consumes.
//!
//! Every point is computed per step from the triangle formed by the chosen
//! polygon vertex, the next two polygon vertices and, for `current_point`, the
//! particle itself. The bit values are part of the GPU record layout.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    CurrentPoint,
    Vertex0,
    Vertex1,
    Vertex2,
    Incenter,
    Brocard1,
    Brocard2,
    Napoleon1,
    Napoleon2,
    Isodynamic1,
    Isodynamic2,
}

/// Points offered while a single target is chosen per step.
pub const SINGLE_POINT_TYPES: [PointType; 8] = [
    PointType::Vertex0,
    PointType::Incenter,
    PointType::Brocard1,
    PointType::Brocard2,
    PointType::Napoleon1,
    PointType::Napoleon2,
    PointType::Isodynamic1,
    PointType::Isodynamic2,
];

/// Points offered as Bezier control points.
pub const BEZIER_POINT_TYPES: [PointType; 11] = [
    PointType::CurrentPoint,
    PointType::Vertex0,
    PointType::Vertex1,
    PointType::Vertex2,
    PointType::Incenter,
    PointType::Brocard1,
    PointType::Brocard2,
    PointType::Napoleon1,
    PointType::Napoleon2,
    PointType::Isodynamic1,
    PointType::Isodynamic2,
];

impl PointType {
    pub const ALL: [PointType; 11] = BEZIER_POINT_TYPES;

    pub const fn bit(self) -> u32 {
        match self {
            PointType::CurrentPoint => 0x1,
            PointType::Vertex0 => 0x2,
            PointType::Vertex1 => 0x4,
            PointType::Vertex2 => 0x8,
            PointType::Incenter => 0x10,
            PointType::Brocard1 => 0x20,
            PointType::Brocard2 => 0x40,
            PointType::Napoleon1 => 0x80,
            PointType::Napoleon2 => 0x100,
            PointType::Isodynamic1 => 0x200,
            PointType::Isodynamic2 => 0x400,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PointType::CurrentPoint => "current_point",
            PointType::Vertex0 => "vertex0",
            PointType::Vertex1 => "vertex1",
            PointType::Vertex2 => "vertex2",
            PointType::Incenter => "incenter",
            PointType::Brocard1 => "brocard1",
            PointType::Brocard2 => "brocard2",
            PointType::Napoleon1 => "napoleon1",
            PointType::Napoleon2 => "napoleon2",
            PointType::Isodynamic1 => "isodynamic1",
            PointType::Isodynamic2 => "isodynamic2",
        }
    }

    /// Name of the WGSL constant carrying this point's bit.
    pub fn shader_constant(self) -> String {
        format!("P_{}", self.name().to_ascii_uppercase())
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit set over [`PointType`], stored exactly as the GPU reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointSet(u32);

impl PointSet {
    const MASK: u32 = 0x7ff;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn single(point: PointType) -> Self {
        Self(point.bit())
    }

    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, point: PointType) -> bool {
        self.0 & point.bit() != 0
    }

    pub fn insert(&mut self, point: PointType) {
        self.0 |= point.bit();
    }

    pub fn remove(&mut self, point: PointType) {
        self.0 &= !point.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = PointType> {
        PointType::ALL
            .into_iter()
            .filter(move |point| self.contains(*point))
    }

    /// Keeps only the members listed in `allowed`.
    pub fn restricted_to(self, allowed: &[PointType]) -> Self {
        let mask = allowed.iter().fold(0, |acc, point| acc | point.bit());
        Self(self.0 & mask)
    }

    /// First member in `order`, if any.
    pub fn first_in(self, order: &[PointType]) -> Option<PointType> {
        order.iter().copied().find(|point| self.contains(*point))
    }
}

impl FromIterator<PointType> for PointSet {
    fn from_iter<I: IntoIterator<Item = PointType>>(iter: I) -> Self {
        let mut set = PointSet::empty();
        for point in iter {
            set.insert(point);
        }
        set
    }
}

impl fmt::Display for PointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        let names: Vec<&str> = self.iter().map(PointType::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_distinct_powers_of_two() {
        let mut seen = 0u32;
        for point in PointType::ALL {
            assert!(point.bit().is_power_of_two());
            assert_eq!(seen & point.bit(), 0, "{point} reuses a bit");
            seen |= point.bit();
        }
        assert_eq!(seen, 0x7ff);
    }

    #[test]
    fn single_list_excludes_triangle_corners_and_current_point() {
        for point in [
            PointType::CurrentPoint,
            PointType::Vertex1,
            PointType::Vertex2,
        ] {
            assert!(!SINGLE_POINT_TYPES.contains(&point));
        }
    }

    #[test]
    fn restricted_to_drops_unlisted_members() {
        let set: PointSet = [PointType::CurrentPoint, PointType::Brocard1]
            .into_iter()
            .collect();
        let restricted = set.restricted_to(&SINGLE_POINT_TYPES);
        assert_eq!(restricted, PointSet::single(PointType::Brocard1));
    }

    #[test]
    fn first_in_follows_list_order() {
        let set: PointSet = [PointType::Napoleon2, PointType::Incenter]
            .into_iter()
            .collect();
        assert_eq!(set.first_in(&SINGLE_POINT_TYPES), Some(PointType::Incenter));
        assert_eq!(PointSet::empty().first_in(&SINGLE_POINT_TYPES), None);
    }

    #[test]
    fn display_lists_names() {
        let set: PointSet = [PointType::Vertex0, PointType::Isodynamic2]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "{vertex0, isodynamic2}");
        assert_eq!(PointType::Brocard1.shader_constant(), "P_BROCARD1");
    }
}
