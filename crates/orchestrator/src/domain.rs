//! Domain setup: grid descriptor, geometry store and initial field

use kernel::{ConservedField, GeometryStore, GridDescriptor, IbmError, Sphere};

use crate::config::ScenarioConfig;

/// Everything the kernel needs for one scenario
#[derive(Debug, Clone)]
pub struct Domain {
    /// Grid layout including ghost layers
    pub grid: GridDescriptor,
    /// Spheres in rasterization order
    pub geometries: GeometryStore,
    /// Conserved field at the initial state
    pub field: ConservedField,
}

/// Build the grid, geometry store and uniform initial field of `config`
pub fn setup_domain(config: &ScenarioConfig) -> Result<Domain, IbmError> {
    let grid = GridDescriptor::new(
        config.grid.min,
        config.grid.max,
        config.grid.nodes,
        config.grid.ghost_width,
    )?;

    let spheres: Vec<Sphere> = config
        .geometries
        .iter()
        .map(|g| Sphere {
            center: g.center,
            radius: g.radius,
        })
        .collect();
    let geometries = GeometryStore::from_spheres(&spheres)?;

    kernel::state::validate_gamma(config.gamma)?;
    let field = ConservedField::uniform(
        grid.len(),
        config.initial_state.to_primitive(),
        config.gamma,
    );

    tracing::info!(
        "Domain setup complete: {} nodes, {} geometries, spacing {:?}",
        grid.len(),
        geometries.len(),
        grid.spacing
    );

    Ok(Domain {
        grid,
        geometries,
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeometryConfig, GridConfig, InitialState};
    use kernel::{FailurePolicy, StencilPolicy, AIR_GAMMA};

    fn config(radius: f64) -> ScenarioConfig {
        ScenarioConfig {
            name: "domain".to_string(),
            grid: GridConfig {
                min: [-1.0, -1.0, -1.0],
                max: [1.0, 1.0, 1.0],
                nodes: [5, 9, 11],
                ghost_width: 1,
            },
            gamma: AIR_GAMMA,
            geometries: vec![GeometryConfig {
                center: [0.0, 0.0, 0.0],
                radius,
            }],
            initial_state: InitialState {
                density: 1.2,
                velocity: [2.0, 0.0, 0.0],
                pressure: 1.0e5,
            },
            flag_offset: None,
            failure_policy: FailurePolicy::Skip,
            stencil_policy: StencilPolicy::FirstFluid,
        }
    }

    #[test]
    fn test_setup_sizes_field_to_grid() {
        let domain = setup_domain(&config(0.5)).unwrap();
        assert_eq!(domain.grid.extent, [7, 11, 13]);
        assert_eq!(domain.field.len(), 7 * 11 * 13);
        assert_eq!(domain.geometries.len(), 1);
        assert!((domain.grid.spacing[1] - 0.25).abs() < 1e-12);

        let state = domain.field.primitive(0, AIR_GAMMA);
        assert!((state.rho - 1.2).abs() < 1e-12);
        assert!((state.u - 2.0).abs() < 1e-12);
        assert!((state.p - 1.0e5).abs() < 1e-6);
    }

    #[test]
    fn test_setup_rejects_bad_radius() {
        assert!(matches!(
            setup_domain(&config(-1.0)),
            Err(IbmError::GeometryConfiguration(_))
        ));
    }
}
