//! Boundary applicator: overwrites ghost and solid node states with their
//! wall-mirrored reconstructions.
//!
//! Two groups are processed per call, ghosts first and then solid nodes next
//! to a ghost. Stencils only ever read fluid nodes, so every reconstruction
//! of one call sees the field as it was on entry. All states are computed in
//! parallel first and written back afterwards.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IbmError, NodeFailure, Result};
use crate::flag::{FlagEncoding, NodeFlags};
use crate::geometry::GeometryStore;
use crate::grid::GridDescriptor;
use crate::partition::{IndexRange, Partition};
use crate::reconstruct::{Reconstructor, StencilPolicy};
use crate::state::{validate_gamma, ConservedField, Primitive};

/// What to do when a node cannot be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure, leave the node untouched and continue.
    #[default]
    Skip,
    /// Return the first failure and leave the whole field untouched.
    Abort,
}

/// Settings of one boundary sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryOptions {
    /// Handling of nodes whose reconstruction fails
    pub failure: FailurePolicy,
    /// Acceptance rule for stencil candidates
    pub stencil: StencilPolicy,
}

impl From<FailurePolicy> for BoundaryOptions {
    fn from(failure: FailurePolicy) -> Self {
        Self {
            failure,
            ..Self::default()
        }
    }
}

/// Outcome of one boundary sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryReport {
    /// Ghost nodes overwritten
    pub ghosts_updated: usize,
    /// Solid-with-ghost nodes overwritten
    pub solids_updated: usize,
    /// Nodes left untouched because their reconstruction failed
    pub failures: Vec<NodeFailure>,
}

impl BoundaryReport {
    /// Return `true` if every targeted node was reconstructed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total nodes overwritten.
    pub fn updated(&self) -> usize {
        self.ghosts_updated + self.solids_updated
    }
}

/// Which band a sweep targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Ghost,
    SolidWithGhost,
}

impl Target {
    fn owner(self, encoding: &FlagEncoding, flag: i32) -> Option<usize> {
        match self {
            Target::Ghost => encoding
                .is_ghost(flag)
                .then(|| encoding.ghost_geometry(flag)),
            Target::SolidWithGhost => encoding
                .is_solid_with_ghost(flag)
                .then(|| encoding.solid_with_ghost_geometry(flag)),
        }
    }
}

/// Reconstruct and overwrite every ghost and solid-with-ghost node.
pub fn apply_boundary_condition(
    field: &mut ConservedField,
    flags: &NodeFlags,
    grid: &GridDescriptor,
    partition: &Partition,
    geometries: &GeometryStore,
    gamma: f64,
    options: BoundaryOptions,
) -> Result<BoundaryReport> {
    validate_gamma(gamma)?;
    if field.len() != grid.len() || flags.len() != grid.len() {
        return Err(IbmError::GridConfiguration(format!(
            "field holds {} nodes and flags {}, grid has {}",
            field.len(),
            flags.len(),
            grid.len()
        )));
    }
    if flags.encoding().total_geometries() != geometries.len() {
        return Err(IbmError::GeometryConfiguration(format!(
            "flags classified for {} geometries, store holds {}",
            flags.encoding().total_geometries(),
            geometries.len()
        )));
    }

    let reconstructor =
        Reconstructor::new(grid, flags, geometries, gamma).with_stencil_policy(options.stencil);
    let interior = partition.interior();
    let ghosts = sweep(&reconstructor, field, flags, grid, interior, Target::Ghost);
    let solids = sweep(&reconstructor, field, flags, grid, interior, Target::SolidWithGhost);

    let mut report = BoundaryReport::default();
    let mut updates = Vec::with_capacity(ghosts.len() + solids.len());
    for (target, results) in [(Target::Ghost, ghosts), (Target::SolidWithGhost, solids)] {
        for (idx, geometry, result) in results {
            match result {
                Ok(state) => {
                    updates.push((idx, state));
                    match target {
                        Target::Ghost => report.ghosts_updated += 1,
                        Target::SolidWithGhost => report.solids_updated += 1,
                    }
                }
                Err(error) => {
                    let node = grid.coords(idx);
                    tracing::warn!("Boundary reconstruction failed: {}", error);
                    report.failures.push(NodeFailure {
                        node,
                        geometry,
                        error,
                    });
                }
            }
        }
    }

    if options.failure == FailurePolicy::Abort {
        if let Some(first) = report.failures.first() {
            return Err(first.error.clone());
        }
    }

    for (idx, state) in updates {
        field.set_primitive(idx, state, gamma);
    }

    tracing::debug!(
        "Boundary sweep ({:?} stencils): {} ghost and {} solid nodes updated, {} failed",
        options.stencil,
        report.ghosts_updated,
        report.solids_updated,
        report.failures.len()
    );
    Ok(report)
}

/// Reconstruct all interior nodes of one band. Results come back in
/// ascending linear index order.
fn sweep(
    reconstructor: &Reconstructor<'_>,
    field: &ConservedField,
    flags: &NodeFlags,
    grid: &GridDescriptor,
    interior: &IndexRange,
    target: Target,
) -> Vec<(usize, usize, Result<Primitive>)> {
    let encoding = flags.encoding();
    (interior.sub[2]..interior.sup[2])
        .into_par_iter()
        .flat_map_iter(|k| {
            let mut slab = Vec::new();
            for j in interior.sub[1]..interior.sup[1] {
                for i in interior.sub[0]..interior.sup[0] {
                    let idx = grid.index(i, j, k);
                    if let Some(geometry) = target.owner(encoding, flags.get(idx)) {
                        let result = reconstructor.reconstruct(field, [i, j, k], geometry);
                        slab.push((idx, geometry, result));
                    }
                }
            }
            slab
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_nodes;
    use crate::flag::FLUID_FLAG;
    use crate::state::AIR_GAMMA;

    fn classified(
        spheres: &[([f64; 3], f64)],
    ) -> (GridDescriptor, Partition, GeometryStore, NodeFlags) {
        let grid = GridDescriptor::new([0.0; 3], [9.0; 3], [10, 10, 10], 2).unwrap();
        let part = Partition::new(&grid);
        let mut store = GeometryStore::new();
        for &(c, r) in spheres {
            store.push(c, r).unwrap();
        }
        let mut flags = NodeFlags::new(grid.len(), FlagEncoding::new(store.len()).unwrap());
        classify_nodes(&mut flags, &grid, &part, &store).unwrap();
        (grid, part, store, flags)
    }

    fn rest() -> Primitive {
        Primitive { rho: 1.2, u: 3.0, v: 0.0, w: 0.0, p: 1.0e5 }
    }

    #[test]
    fn no_geometries_touches_nothing() {
        let (grid, part, store, flags) = classified(&[]);
        let mut field = ConservedField::uniform(grid.len(), rest(), AIR_GAMMA);
        let before = field.clone();
        let report = apply_boundary_condition(
            &mut field, &flags, &grid, &part, &store, AIR_GAMMA, FailurePolicy::Skip.into(),
        )
        .unwrap();
        assert_eq!(report.updated(), 0);
        assert!(report.is_clean());
        assert_eq!(field, before);
    }

    #[test]
    fn node_on_center_is_reported_and_skipped() {
        let (grid, part, store, flags) = classified(&[([4.0, 4.0, 4.0], 0.5)]);
        let mut field = ConservedField::uniform(grid.len(), rest(), AIR_GAMMA);
        let before = field.clone();
        let report = apply_boundary_condition(
            &mut field, &flags, &grid, &part, &store, AIR_GAMMA, FailurePolicy::Skip.into(),
        )
        .unwrap();
        // the single solid node sits on the sphere center
        assert_eq!(report.ghosts_updated, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, IbmError::DegenerateNormal { .. }));
        assert_eq!(report.failures[0].node, [6, 6, 6]);
        assert_eq!(report.failures[0].geometry, 0);
        assert_eq!(field, before);
    }

    fn independent() -> BoundaryOptions {
        BoundaryOptions {
            stencil: StencilPolicy::AffinelyIndependent,
            ..BoundaryOptions::default()
        }
    }

    #[test]
    fn ghost_states_reverse_velocity() {
        // center between nodes, so no node sits on it
        let (grid, part, store, flags) = classified(&[([4.5, 4.5, 4.5], 1.0)]);
        assert_eq!(flags.counts().ghost, 8);
        let mut field = ConservedField::uniform(grid.len(), rest(), AIR_GAMMA);
        let report = apply_boundary_condition(
            &mut field, &flags, &grid, &part, &store, AIR_GAMMA, independent(),
        )
        .unwrap();
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.ghosts_updated, 8);

        for idx in 0..grid.len() {
            let state = field.primitive(idx, AIR_GAMMA);
            if flags.get(idx) == FLUID_FLAG {
                assert!((state.u - 3.0).abs() < 1e-9);
            } else if flags.encoding().is_ghost(flags.get(idx)) {
                assert!((state.rho - 1.2).abs() < 1e-9);
                assert!((state.u + 3.0).abs() < 1e-9);
                assert!((state.p - 1.0e5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn first_fluid_stencils_report_singular_systems() {
        let (grid, part, store, flags) = classified(&[([4.5, 4.5, 4.5], 1.0)]);
        let mut field = ConservedField::uniform(grid.len(), rest(), AIR_GAMMA);
        let before = field.clone();
        let report = apply_boundary_condition(
            &mut field, &flags, &grid, &part, &store, AIR_GAMMA, BoundaryOptions::default(),
        )
        .unwrap();
        // the three ghosts on the upper faces see four coplanar fluid nodes first
        assert_eq!(report.ghosts_updated, 5);
        let mut failed: Vec<[usize; 3]> = report.failures.iter().map(|f| f.node).collect();
        failed.sort();
        assert_eq!(failed, vec![[6, 6, 7], [6, 7, 6], [7, 6, 6]]);
        for failure in &report.failures {
            assert!(matches!(failure.error, IbmError::SingularSystem { .. }));
            let [i, j, k] = failure.node;
            let idx = grid.index(i, j, k);
            assert_eq!(field.conserved(idx), before.conserved(idx));
        }
    }

    #[test]
    fn abort_leaves_field_untouched() {
        let (grid, part, store, flags) = classified(&[([4.0, 4.0, 4.0], 2.0)]);
        let mut field = ConservedField::uniform(grid.len(), rest(), AIR_GAMMA);
        let before = field.clone();
        let err = apply_boundary_condition(
            &mut field, &flags, &grid, &part, &store, AIR_GAMMA, FailurePolicy::Abort.into(),
        )
        .unwrap_err();
        assert!(err.is_node_local());
        assert_eq!(field, before);
    }

    #[test]
    fn mismatched_field_is_rejected() {
        let (grid, part, store, flags) = classified(&[]);
        let mut field = ConservedField::uniform(grid.len() - 1, rest(), AIR_GAMMA);
        assert!(matches!(
            apply_boundary_condition(
                &mut field, &flags, &grid, &part, &store, AIR_GAMMA, FailurePolicy::Skip.into(),
            ),
            Err(IbmError::GridConfiguration(_))
        ));
    }
}
