//! Index-space decomposition of a grid into 13 regions.
//!
//! Six exterior ghost slabs, six domain boundary faces and the interior.
//! Face regions extend only along their own axis, so the union forms a cross
//! without edge or corner blocks. Every range is `[sub, sup)`.

use crate::grid::{Axis, GridDescriptor};

/// Named region of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Exterior ghost layers below x
    WestGhost,
    /// Exterior ghost layers above x
    EastGhost,
    /// Exterior ghost layers below y
    SouthGhost,
    /// Exterior ghost layers above y
    NorthGhost,
    /// Exterior ghost layers below z
    FrontGhost,
    /// Exterior ghost layers above z
    BackGhost,
    /// First physical node layer in x
    DomainWest,
    /// Last physical node layer in x
    DomainEast,
    /// First physical node layer in y
    DomainSouth,
    /// Last physical node layer in y
    DomainNorth,
    /// First physical node layer in z
    DomainFront,
    /// Last physical node layer in z
    DomainBack,
    /// Everything strictly inside the boundary faces
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Ghost,
    Boundary,
}

impl Region {
    /// All regions in storage order.
    pub const ALL: [Region; 13] = [
        Region::WestGhost,
        Region::EastGhost,
        Region::SouthGhost,
        Region::NorthGhost,
        Region::FrontGhost,
        Region::BackGhost,
        Region::DomainWest,
        Region::DomainEast,
        Region::DomainSouth,
        Region::DomainNorth,
        Region::DomainFront,
        Region::DomainBack,
        Region::Interior,
    ];

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Region::WestGhost => "West Ghost",
            Region::EastGhost => "East Ghost",
            Region::SouthGhost => "South Ghost",
            Region::NorthGhost => "North Ghost",
            Region::FrontGhost => "Front Ghost",
            Region::BackGhost => "Back Ghost",
            Region::DomainWest => "Domain West",
            Region::DomainEast => "Domain East",
            Region::DomainSouth => "Domain South",
            Region::DomainNorth => "Domain North",
            Region::DomainFront => "Domain Front",
            Region::DomainBack => "Domain Back",
            Region::Interior => "Interior",
        }
    }

    fn face(self) -> Option<(Axis, Side, Layer)> {
        use Region::*;
        Some(match self {
            WestGhost => (Axis::X, Side::Lower, Layer::Ghost),
            EastGhost => (Axis::X, Side::Upper, Layer::Ghost),
            SouthGhost => (Axis::Y, Side::Lower, Layer::Ghost),
            NorthGhost => (Axis::Y, Side::Upper, Layer::Ghost),
            FrontGhost => (Axis::Z, Side::Lower, Layer::Ghost),
            BackGhost => (Axis::Z, Side::Upper, Layer::Ghost),
            DomainWest => (Axis::X, Side::Lower, Layer::Boundary),
            DomainEast => (Axis::X, Side::Upper, Layer::Boundary),
            DomainSouth => (Axis::Y, Side::Lower, Layer::Boundary),
            DomainNorth => (Axis::Y, Side::Upper, Layer::Boundary),
            DomainFront => (Axis::Z, Side::Lower, Layer::Boundary),
            DomainBack => (Axis::Z, Side::Upper, Layer::Boundary),
            Interior => return None,
        })
    }

    /// Outward unit normal [x, y, z]; zero for the interior.
    pub fn normal(self) -> [i32; 3] {
        let mut n = [0; 3];
        if let Some((axis, side, _)) = self.face() {
            n[axis.index()] = match side {
                Side::Lower => -1,
                Side::Upper => 1,
            };
        }
        n
    }
}

/// Half-open index box `[sub, sup)` in (i, j, k) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// Inclusive lower bounds
    pub sub: [usize; 3],
    /// Exclusive upper bounds
    pub sup: [usize; 3],
}

impl IndexRange {
    /// Number of nodes in the box.
    pub fn len(&self) -> usize {
        (0..3)
            .map(|a| self.sup[a].saturating_sub(self.sub[a]))
            .product()
    }

    /// Return `true` if the box holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` if (i, j, k) lies inside the box.
    #[inline]
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        let p = [i, j, k];
        (0..3).all(|a| p[a] >= self.sub[a] && p[a] < self.sup[a])
    }
}

/// The 13 index regions of one grid partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    ranges: [IndexRange; 13],
}

impl Partition {
    /// Decompose `grid` into its ghost, boundary and interior regions.
    pub fn new(grid: &GridDescriptor) -> Self {
        let ng = grid.ng;
        let ranges = Region::ALL.map(|region| {
            let mut sub = [0; 3];
            let mut sup = [0; 3];
            for axis in Axis::ALL {
                let a = axis.index();
                let n = grid.nodes[a];
                let (lo, hi) = match region.face() {
                    Some((face_axis, side, layer)) if face_axis == axis => match (layer, side) {
                        (Layer::Ghost, Side::Lower) => (0, ng),
                        (Layer::Ghost, Side::Upper) => (n + ng, n + 2 * ng),
                        (Layer::Boundary, Side::Lower) => (ng, ng + 1),
                        (Layer::Boundary, Side::Upper) => (n + ng - 1, n + ng),
                    },
                    _ => (ng + 1, n + ng - 1),
                };
                sub[a] = lo;
                sup[a] = hi;
            }
            IndexRange { sub, sup }
        });
        Self { ranges }
    }

    /// Index range of `region`.
    pub fn range(&self, region: Region) -> &IndexRange {
        &self.ranges[region as usize]
    }

    /// Index range of the interior region.
    pub fn interior(&self) -> &IndexRange {
        self.range(Region::Interior)
    }
}
