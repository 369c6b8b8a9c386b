//! Reference scenarios runnable via cargo test.

use crate::{CountCheck, ExpectedResult, MirrorCheck, ReferenceTest};
use kernel::{BoundaryTreatment, FailurePolicy, IbmError, StencilPolicy};
use orchestrator::create_boundary;

/// Resolve a path relative to the workspace root (one level up from this crate)
fn project_path(relative: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let project_root = std::path::Path::new(manifest_dir)
        .parent()
        .expect("Could not find workspace root");
    project_root.join(relative).to_string_lossy().to_string()
}

fn run(test: ReferenceTest) {
    let name = test.name.clone();
    let result = test.run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "{} reference test failed", name);
}

#[test]
fn test_single_sphere() {
    run(ReferenceTest {
        name: "Single Sphere".to_string(),
        config_path: project_path("configs/single-sphere.json"),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 26,
                solid_with_ghost: 6,
                solid: 1,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-9 }),
            max_failures: 0,
        },
    });
}

#[test]
fn test_node_centred_sphere() {
    run(ReferenceTest {
        name: "Node-Centred Sphere".to_string(),
        config_path: project_path("configs/node-centred-sphere.json"),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 26,
                solid_with_ghost: 1,
                solid: 0,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-6 }),
            max_failures: 10,
        },
    });
}

#[test]
fn test_overlapping_spheres() {
    run(ReferenceTest {
        name: "Overlapping Spheres".to_string(),
        config_path: project_path("configs/overlapping-spheres.json"),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 42,
                solid_with_ghost: 3,
                solid: 0,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-9 }),
            max_failures: 22,
        },
    });
}

#[test]
fn test_sphere_array() {
    run(ReferenceTest {
        name: "Sphere Array".to_string(),
        config_path: project_path("configs/sphere-array.json"),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 576,
                solid_with_ghost: 364,
                solid: 230,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-6 }),
            max_failures: 7,
        },
    });
}

#[test]
fn test_centre_node_failure_is_reported() {
    let mut setup = create_boundary(&project_path("configs/node-centred-sphere.json"))
        .expect("setup failed");
    let report = setup.apply().expect("sweep failed");
    assert_eq!(report.failures.len(), 10);
    let centre: Vec<_> = report
        .failures
        .iter()
        .filter(|f| matches!(f.error, IbmError::DegenerateNormal { .. }))
        .collect();
    assert_eq!(centre.len(), 1);
    assert_eq!(centre[0].node, [6, 6, 6]);
    let singular = report
        .failures
        .iter()
        .filter(|f| matches!(f.error, IbmError::SingularSystem { .. }))
        .count();
    assert_eq!(singular, 9);
}

#[test]
fn test_first_fluid_stencils_on_single_sphere() {
    let mut setup =
        create_boundary(&project_path("configs/single-sphere.json")).expect("setup failed");
    assert_eq!(setup.config.stencil_policy, StencilPolicy::AffinelyIndependent);
    setup.config.stencil_policy = StencilPolicy::FirstFluid;
    let initial = setup.field.clone();
    let report = setup.apply().expect("sweep failed");

    let mut failed: Vec<[usize; 3]> = report.failures.iter().map(|f| f.node).collect();
    failed.sort();
    assert_eq!(failed, vec![[7, 7, 8], [7, 8, 7], [8, 6, 8], [8, 7, 7], [8, 8, 6]]);
    for failure in &report.failures {
        assert!(matches!(failure.error, IbmError::SingularSystem { .. }));
        let [i, j, k] = failure.node;
        let idx = setup.kernel.grid().index(i, j, k);
        assert_eq!(setup.field.conserved(idx), initial.conserved(idx));
    }
    assert_eq!(report.ghosts_updated, 21);
    assert_eq!(report.solids_updated, 6);
}

#[test]
fn test_abort_policy_keeps_initial_field() {
    let mut setup = create_boundary(&project_path("configs/node-centred-sphere.json"))
        .expect("setup failed");
    setup.config.failure_policy = FailurePolicy::Abort;
    let initial = setup.field.clone();
    assert!(setup.apply().is_err());
    assert_eq!(setup.field, initial);
    assert_eq!(setup.kernel.flags().counts().ghost, 26);
}

#[test]
fn test_missing_config_is_an_error() {
    assert!(create_boundary(&project_path("configs/does-not-exist.json")).is_err());
}
