//! Error types for classification and reconstruction.
//!
//! Configuration errors are fatal and surface from setup. Reconstruction
//! errors are tied to a single node and are collected per sweep by the
//! boundary applicator instead of aborting it.

use thiserror::Error;

/// Kernel result type.
pub type Result<T> = std::result::Result<T, IbmError>;

/// Errors raised by the immersed boundary kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IbmError {
    /// Invalid grid descriptor or mismatched array sizes.
    #[error("grid configuration error: {0}")]
    GridConfiguration(String),

    /// Geometry store or flag encoding cannot be used with this grid.
    #[error("geometry configuration error: {0}")]
    GeometryConfiguration(String),

    /// Gas or flow field parameters are unusable.
    #[error("flow configuration error: {0}")]
    FlowConfiguration(String),

    /// Fewer than four fluid nodes were found around an image point.
    #[error(
        "under-determined stencil at node ({}, {}, {}) of geometry {geometry}: \
         found {found} of 4 fluid nodes",
        node[0], node[1], node[2]
    )]
    StencilUnderdetermined {
        /// Node index (i, j, k)
        node: [usize; 3],
        /// Owning geometry
        geometry: usize,
        /// Number of fluid stencil nodes found
        found: usize,
    },

    /// Position matrix of the stencil is rank deficient.
    #[error(
        "singular stencil system at node ({}, {}, {}) of geometry {geometry}",
        node[0], node[1], node[2]
    )]
    SingularSystem {
        /// Node index (i, j, k)
        node: [usize; 3],
        /// Owning geometry
        geometry: usize,
    },

    /// Node coincides with the geometry center, so no surface normal exists.
    #[error(
        "node ({}, {}, {}) sits on the center of geometry {geometry}",
        node[0], node[1], node[2]
    )]
    DegenerateNormal {
        /// Node index (i, j, k)
        node: [usize; 3],
        /// Owning geometry
        geometry: usize,
    },
}

impl IbmError {
    /// Return `true` for errors that only invalidate a single node.
    pub fn is_node_local(&self) -> bool {
        matches!(
            self,
            IbmError::StencilUnderdetermined { .. }
                | IbmError::SingularSystem { .. }
                | IbmError::DegenerateNormal { .. }
        )
    }
}

/// A node whose reconstruction failed during a boundary sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    /// Node index (i, j, k)
    pub node: [usize; 3],
    /// Owning geometry
    pub geometry: usize,
    /// Cause of the failure
    pub error: IbmError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_error_names_node_and_geometry() {
        let err = IbmError::StencilUnderdetermined {
            node: [3, 4, 5],
            geometry: 2,
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("(3, 4, 5)"), "{msg}");
        assert!(msg.contains("geometry 2"), "{msg}");
        assert!(msg.contains("found 1 of 4"), "{msg}");
        assert!(err.is_node_local());
    }

    #[test]
    fn configuration_errors_are_not_node_local() {
        let err = IbmError::GeometryConfiguration("bad".to_string());
        assert!(!err.is_node_local());
    }
}
