//! Ghost-Cell Immersed Boundary Kernel
//!
//! This crate classifies the nodes of a structured 3-D grid against a set of
//! spherical solids and imposes a no-slip wall on the flow field through
//! ghost nodes. It holds no solver loop of its own; a flow solver calls it
//! between time steps.
//!
//! # Modules
//! - [`grid`] -- Extended index space, spacing and node positions.
//! - [`partition`] -- 13-region decomposition of the index space.
//! - [`geometry`] -- Struct-of-arrays sphere storage.
//! - [`flag`] -- Packed `i32` node flags and their tagged `NodeKind` view.
//! - [`classify`] -- The four ordered classification passes.
//! - [`linsys`] -- Small dense LU solves with several right-hand sides.
//! - [`state`] -- Primitive and conserved ideal-gas state.
//! - [`reconstruct`] -- Image point, stencil search and linear fit.
//! - [`boundary`] -- Ghost and solid node overwrite with failure reporting.
//! - [`error`] -- `IbmError` and per-node failure records.

#![warn(missing_docs)]

pub mod boundary;
pub mod classify;
pub mod error;
pub mod flag;
pub mod geometry;
pub mod grid;
pub mod linsys;
pub mod partition;
pub mod reconstruct;
pub mod state;

pub use boundary::{apply_boundary_condition, BoundaryOptions, BoundaryReport, FailurePolicy};
pub use classify::classify_nodes;
pub use error::{IbmError, NodeFailure, Result};
pub use flag::{FlagCounts, FlagEncoding, NodeFlags, NodeKind};
pub use geometry::{GeometryStore, Sphere};
pub use grid::{Axis, GridDescriptor};
pub use partition::{IndexRange, Partition, Region};
pub use reconstruct::{Reconstructor, StencilPolicy};
pub use state::{ConservedField, Primitive, AIR_GAMMA, DIM_U};

// ---------------------------------------------------------------------------
// BoundaryTreatment trait
// ---------------------------------------------------------------------------

/// Trait for immersed boundary treatments on a fixed grid.
///
/// A treatment owns the node flags and works in two phases:
///
/// 1. Classification against the geometries (whenever they change)
/// 2. Boundary application on the flow field (every time step)
pub trait BoundaryTreatment {
    /// Classify every node against `geometries`.
    fn classify(&mut self, geometries: &GeometryStore) -> Result<FlagCounts>;

    /// Overwrite ghost and solid node states of `field`.
    fn apply(
        &self,
        field: &mut ConservedField,
        geometries: &GeometryStore,
        gamma: f64,
        options: BoundaryOptions,
    ) -> Result<BoundaryReport>;

    /// Current node flags.
    fn flags(&self) -> &NodeFlags;

    /// Number of nodes, including exterior ghost layers.
    fn node_count(&self) -> usize {
        self.flags().len()
    }
}

// ---------------------------------------------------------------------------
// GhostCellKernel
// ---------------------------------------------------------------------------

/// Ghost-cell implementation of [`BoundaryTreatment`].
pub struct GhostCellKernel {
    /// Grid the flags are laid out on.
    grid: GridDescriptor,
    /// Region ranges of `grid`.
    partition: Partition,
    /// Node flags from the last successful classification.
    flags: NodeFlags,
    /// Explicit band offset; sized from the geometry count when `None`.
    flag_offset: Option<i32>,
    /// Whether `flags` reflect a classification.
    classified: bool,
}

impl GhostCellKernel {
    /// Create a kernel for `grid`.
    ///
    /// An explicit `flag_offset` is checked against the geometry count on
    /// every classification.
    pub fn new(grid: GridDescriptor, flag_offset: Option<i32>) -> Result<Self> {
        let encoding = match flag_offset {
            Some(offset) => FlagEncoding::with_offset(offset, 0)?,
            None => FlagEncoding::new(0)?,
        };
        let partition = Partition::new(&grid);
        let flags = NodeFlags::new(grid.len(), encoding);
        tracing::info!(
            "Ghost-cell kernel on {}x{}x{} nodes (ghost width {}, {} stored)",
            grid.nodes[0],
            grid.nodes[1],
            grid.nodes[2],
            grid.ng,
            grid.len()
        );
        for region in Region::ALL {
            let range = partition.range(region);
            tracing::debug!("{}: {:?}..{:?}", region.name(), range.sub, range.sup);
        }
        Ok(Self {
            grid,
            partition,
            flags,
            flag_offset,
            classified: false,
        })
    }

    /// Grid descriptor.
    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    /// Region ranges of the grid.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Encoding for a given geometry count.
    fn encoding_for(&self, total: usize) -> Result<FlagEncoding> {
        match self.flag_offset {
            Some(offset) => FlagEncoding::with_offset(offset, total),
            None => FlagEncoding::new(total),
        }
    }
}

impl BoundaryTreatment for GhostCellKernel {
    fn classify(&mut self, geometries: &GeometryStore) -> Result<FlagCounts> {
        // classify into a fresh array so a rejected geometry set keeps the
        // previous flags intact
        let encoding = self.encoding_for(geometries.len())?;
        let mut flags = NodeFlags::new(self.grid.len(), encoding);
        let counts = classify_nodes(&mut flags, &self.grid, &self.partition, geometries)?;
        self.flags = flags;
        self.classified = true;
        tracing::info!(
            "Classified {} geometries (flag offset {}): {} ghost, {} solid-with-ghost nodes",
            geometries.len(),
            encoding.offset(),
            counts.ghost,
            counts.solid_with_ghost
        );
        Ok(counts)
    }

    fn apply(
        &self,
        field: &mut ConservedField,
        geometries: &GeometryStore,
        gamma: f64,
        options: BoundaryOptions,
    ) -> Result<BoundaryReport> {
        if !self.classified {
            return Err(IbmError::GeometryConfiguration(
                "boundary applied before any classification".to_string(),
            ));
        }
        apply_boundary_condition(
            field,
            &self.flags,
            &self.grid,
            &self.partition,
            geometries,
            gamma,
            options,
        )
    }

    fn flags(&self) -> &NodeFlags {
        &self.flags
    }
}
