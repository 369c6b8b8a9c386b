//! Packed node flags and their tagged view.
//!
//! Each node stores one `i32`. Categories occupy disjoint ranges so that a
//! single comparison classifies a node, and the owning geometry is recovered
//! by removing the band constants:
//!
//! ```text
//!  1                          boundary / exterior ghost node
//!  0                          interior fluid node
//! -offset - g                 interior solid node of geometry g
//! +offset + g                 interior ghost node of geometry g
//! -offset - g - total         interior solid node of geometry g next to a ghost
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{IbmError, Result};

/// Flag of nodes outside the interior region.
pub const BOUNDARY_FLAG: i32 = 1;

/// Flag of interior fluid nodes.
pub const FLUID_FLAG: i32 = 0;

/// Offset used when the geometry count allows it.
pub const DEFAULT_FLAG_OFFSET: i32 = 10;

/// The offset must exceed `total + FLAG_OFFSET_MARGIN`.
pub const FLAG_OFFSET_MARGIN: i32 = 1;

/// Geometric role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Boundary layer or exterior ghost node
    Boundary,
    /// Interior fluid node
    Fluid,
    /// Interior solid node without ghost neighbors
    Solid {
        /// Owning geometry
        geometry: usize,
    },
    /// Interior solid node with at least one fluid neighbor
    Ghost {
        /// Owning geometry
        geometry: usize,
    },
    /// Interior solid node with at least one ghost neighbor
    SolidWithGhost {
        /// Owning geometry
        geometry: usize,
    },
}

impl NodeKind {
    /// Owning geometry, if the node lies inside one.
    pub fn geometry(self) -> Option<usize> {
        match self {
            NodeKind::Solid { geometry }
            | NodeKind::Ghost { geometry }
            | NodeKind::SolidWithGhost { geometry } => Some(geometry),
            NodeKind::Boundary | NodeKind::Fluid => None,
        }
    }
}

/// Band constants for a fixed geometry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagEncoding {
    offset: i32,
    total: i32,
}

impl FlagEncoding {
    /// Encoding for `total_geometries`, using the default offset unless the
    /// geometry count requires a larger one.
    pub fn new(total_geometries: usize) -> Result<Self> {
        let total = to_i32(total_geometries)?;
        let minimum = total
            .checked_add(FLAG_OFFSET_MARGIN + 1)
            .ok_or_else(|| too_many(total_geometries))?;
        Self::with_offset(DEFAULT_FLAG_OFFSET.max(minimum), total_geometries)
    }

    /// Encoding with an explicit offset.
    pub fn with_offset(offset: i32, total_geometries: usize) -> Result<Self> {
        let total = to_i32(total_geometries)?;
        if offset <= total.saturating_add(FLAG_OFFSET_MARGIN) {
            return Err(IbmError::GeometryConfiguration(format!(
                "flag offset {} must exceed geometry count {} plus margin {}",
                offset, total, FLAG_OFFSET_MARGIN
            )));
        }
        // the deepest band must stay representable
        offset
            .checked_add(total)
            .and_then(|v| v.checked_add(total))
            .ok_or_else(|| too_many(total_geometries))?;
        Ok(Self { offset, total })
    }

    /// Band offset.
    #[inline]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Number of geometries the bands were sized for.
    #[inline]
    pub fn total_geometries(&self) -> usize {
        self.total as usize
    }

    /// Any solid band, with or without ghost neighbors.
    #[inline]
    pub fn is_solid(&self, flag: i32) -> bool {
        flag <= -self.offset
    }

    /// Ghost band.
    #[inline]
    pub fn is_ghost(&self, flag: i32) -> bool {
        flag >= self.offset
    }

    /// Solid-with-ghost-neighbor band.
    #[inline]
    pub fn is_solid_with_ghost(&self, flag: i32) -> bool {
        flag <= -self.offset - self.total
    }

    /// Flag of a solid node of geometry `g`.
    #[inline]
    pub fn solid(&self, g: usize) -> i32 {
        -self.offset - g as i32
    }

    /// Flag of a ghost node of geometry `g`.
    #[inline]
    pub fn ghost(&self, g: usize) -> i32 {
        self.offset + g as i32
    }

    /// Flag of a solid node of geometry `g` next to a ghost node.
    #[inline]
    pub fn solid_with_ghost(&self, g: usize) -> i32 {
        -self.offset - g as i32 - self.total
    }

    /// Geometry owning a ghost flag.
    #[inline]
    pub fn ghost_geometry(&self, flag: i32) -> usize {
        (flag - self.offset) as usize
    }

    /// Geometry owning a solid-with-ghost flag.
    #[inline]
    pub fn solid_with_ghost_geometry(&self, flag: i32) -> usize {
        (-(flag + self.offset + self.total)) as usize
    }

    /// Packed value of `kind`.
    pub fn encode(&self, kind: NodeKind) -> i32 {
        match kind {
            NodeKind::Boundary => BOUNDARY_FLAG,
            NodeKind::Fluid => FLUID_FLAG,
            NodeKind::Solid { geometry } => self.solid(geometry),
            NodeKind::Ghost { geometry } => self.ghost(geometry),
            NodeKind::SolidWithGhost { geometry } => self.solid_with_ghost(geometry),
        }
    }

    /// Tagged view of `flag`; `None` if it falls outside every band.
    pub fn decode(&self, flag: i32) -> Option<NodeKind> {
        match flag {
            BOUNDARY_FLAG => Some(NodeKind::Boundary),
            FLUID_FLAG => Some(NodeKind::Fluid),
            f if f >= self.offset => {
                let g = f - self.offset;
                (g < self.total).then(|| NodeKind::Ghost { geometry: g as usize })
            }
            f if f <= -self.offset => {
                let depth = -(self.offset as i64) - f as i64;
                let total = self.total as i64;
                if depth < total {
                    Some(NodeKind::Solid { geometry: depth as usize })
                } else if depth < 2 * total {
                    Some(NodeKind::SolidWithGhost {
                        geometry: (depth - total) as usize,
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

fn to_i32(total: usize) -> Result<i32> {
    i32::try_from(total).map_err(|_| too_many(total))
}

fn too_many(total: usize) -> IbmError {
    IbmError::GeometryConfiguration(format!(
        "{} geometries cannot be encoded in 32-bit node flags",
        total
    ))
}

/// Per-category node counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagCounts {
    /// Boundary and exterior ghost nodes
    pub boundary: usize,
    /// Interior fluid nodes
    pub fluid: usize,
    /// Pure solid nodes
    pub solid: usize,
    /// Ghost nodes
    pub ghost: usize,
    /// Solid nodes next to a ghost
    pub solid_with_ghost: usize,
}

/// Node flag array together with the encoding that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFlags {
    values: Vec<i32>,
    encoding: FlagEncoding,
}

impl NodeFlags {
    /// All nodes set to [`BOUNDARY_FLAG`].
    pub fn new(len: usize, encoding: FlagEncoding) -> Self {
        Self {
            values: vec![BOUNDARY_FLAG; len],
            encoding,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the array holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encoding of the stored values.
    pub fn encoding(&self) -> &FlagEncoding {
        &self.encoding
    }

    /// Packed flag of node `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> i32 {
        self.values[idx]
    }

    /// Tagged view of node `idx`.
    pub fn kind(&self, idx: usize) -> Option<NodeKind> {
        self.encoding.decode(self.values[idx])
    }

    /// Packed values.
    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.values
    }

    /// Count nodes per category.
    pub fn counts(&self) -> FlagCounts {
        let enc = &self.encoding;
        let mut counts = FlagCounts::default();
        for &f in &self.values {
            if f == BOUNDARY_FLAG {
                counts.boundary += 1;
            } else if f == FLUID_FLAG {
                counts.fluid += 1;
            } else if enc.is_ghost(f) {
                counts.ghost += 1;
            } else if enc.is_solid_with_ghost(f) {
                counts.solid_with_ghost += 1;
            } else if enc.is_solid(f) {
                counts.solid += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offset_is_ten_for_few_geometries() {
        let enc = FlagEncoding::new(3).unwrap();
        assert_eq!(enc.offset(), 10);
        assert_eq!(enc.solid(2), -12);
        assert_eq!(enc.ghost(2), 12);
        assert_eq!(enc.solid_with_ghost(2), -15);
    }

    #[test]
    fn offset_grows_with_geometry_count() {
        let enc = FlagEncoding::new(40).unwrap();
        assert!(enc.offset() > 40 + FLAG_OFFSET_MARGIN);
    }

    #[test]
    fn explicit_offset_too_small_is_rejected() {
        assert!(FlagEncoding::with_offset(10, 9).is_err());
        assert!(FlagEncoding::with_offset(10, 8).is_ok());
        assert!(FlagEncoding::with_offset(i32::MAX - 1, 5).is_err());
    }

    #[test]
    fn bands_decode_back_to_their_kind() {
        let enc = FlagEncoding::new(4).unwrap();
        for g in 0..4 {
            for kind in [
                NodeKind::Solid { geometry: g },
                NodeKind::Ghost { geometry: g },
                NodeKind::SolidWithGhost { geometry: g },
            ] {
                assert_eq!(enc.decode(enc.encode(kind)), Some(kind));
            }
            assert_eq!(enc.ghost_geometry(enc.ghost(g)), g);
            assert_eq!(enc.solid_with_ghost_geometry(enc.solid_with_ghost(g)), g);
        }
        assert_eq!(enc.decode(1), Some(NodeKind::Boundary));
        assert_eq!(enc.decode(0), Some(NodeKind::Fluid));
        assert_eq!(enc.decode(5), None);
        assert_eq!(enc.decode(enc.ghost(4)), None);
        assert_eq!(enc.decode(enc.solid_with_ghost(4)), None);
    }

    #[test]
    fn band_predicates_are_disjoint() {
        let enc = FlagEncoding::new(4).unwrap();
        let ghost = enc.ghost(3);
        let solid = enc.solid(3);
        let deep = enc.solid_with_ghost(0);
        assert!(enc.is_ghost(ghost) && !enc.is_solid(ghost));
        assert!(enc.is_solid(solid) && !enc.is_solid_with_ghost(solid));
        assert!(enc.is_solid(deep) && enc.is_solid_with_ghost(deep));
        assert!(!enc.is_ghost(BOUNDARY_FLAG) && !enc.is_solid(FLUID_FLAG));
    }
}
