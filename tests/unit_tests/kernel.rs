use crate::unit_tests::{set_value, single_point_kernel, COMPONENT_NAMES};
use fenris_phasefield::kernel::{AnisotropicDoubleWellEnergy, Kernel, QuadraturePoint, ShapeFunction};
use fenris_phasefield::material::MaterialPropertyStore;
use fenris_phasefield::nalgebra::{Matrix3, Vector3};
use fenris_phasefield::proptest::{quadrature_point, shape_function, vector_in_dim};
use fenris_phasefield::PropertyValues;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

/// Populates the properties with L = 2, df/deta = 3, d^2f/deta^2 = 5 and df/dp = (4, 5, 6)
/// restricted to the active components.
fn populate_scenario(store: &mut MaterialPropertyStore<f64>, n: usize) {
    set_value(store, "L", &[], 2.0);
    set_value(store, "fbulk", &["eta"], 3.0);
    set_value(store, "fbulk", &["eta", "eta"], 5.0);
    for (k, name) in COMPONENT_NAMES[..n].iter().enumerate() {
        set_value(store, "fbulk", &[name], 4.0 + k as f64);
    }
}

fn unit_test_function() -> ShapeFunction<f64> {
    ShapeFunction::new(1.0, Vector3::new(1.0, 0.0, 0.0))
}

#[test]
fn residual_single_component_anisotropic() {
    let (kernel, mut store) = single_point_kernel(1, 1.0);
    populate_scenario(&mut store, 1);

    let qp = QuadraturePoint::new(0, Vector3::new(5.0, 0.0, 0.0));
    assert!(kernel.is_anisotropic(&qp.grad_u));
    let residual = kernel.compute_qp_residual(&store, &qp, &unit_test_function());
    assert_eq!(residual, 14.0);
}

#[test]
fn residual_single_component_isotropic() {
    let (kernel, mut store) = single_point_kernel(1, 1.0);
    populate_scenario(&mut store, 1);

    let qp = QuadraturePoint::new(0, Vector3::new(0.5, 0.0, 0.0));
    assert!(!kernel.is_anisotropic(&qp.grad_u));
    let residual = kernel.compute_qp_residual(&store, &qp, &unit_test_function());
    assert_eq!(residual, 6.0);
}

#[test]
fn threshold_switch_is_strict() {
    let (kernel, mut store) = single_point_kernel(1, 5.0);
    populate_scenario(&mut store, 1);

    // |(3, 4, 0)| is exactly 5
    let at_threshold = QuadraturePoint::new(0, Vector3::new(3.0, 4.0, 0.0));
    assert!(!kernel.is_anisotropic(&at_threshold.grad_u));
    assert_eq!(kernel.compute_qp_residual(&store, &at_threshold, &unit_test_function()), 6.0);

    let (kernel, mut store) = single_point_kernel(1, 4.999);
    populate_scenario(&mut store, 1);
    assert!(kernel.is_anisotropic(&at_threshold.grad_u));
    assert_eq!(kernel.compute_qp_residual(&store, &at_threshold, &unit_test_function()), 14.0);
}

#[test]
fn default_threshold_is_anisotropic_for_zero_gradient() {
    let (kernel, mut store) = single_point_kernel(1, -1.0);
    populate_scenario(&mut store, 1);

    let qp = QuadraturePoint::new(0, Vector3::zeros());
    assert!(kernel.is_anisotropic(&qp.grad_u));
    assert_eq!(kernel.compute_qp_residual(&store, &qp, &unit_test_function()), 14.0);
}

#[test]
fn infinite_threshold_is_always_isotropic() {
    let (kernel, mut store) = single_point_kernel(3, f64::INFINITY);
    populate_scenario(&mut store, 3);

    let qp = QuadraturePoint::new(0, Vector3::new(1e100, 1e100, 1e100));
    assert!(!kernel.is_anisotropic(&qp.grad_u));
    assert_eq!(kernel.compute_qp_residual(&store, &qp, &unit_test_function()), 6.0);
}

#[test]
fn no_components_is_always_isotropic() {
    let (kernel, mut store) = single_point_kernel(0, -1.0);
    populate_scenario(&mut store, 0);

    assert_eq!(kernel.num_gradient_components(), 0);
    assert_eq!(kernel.num_coupled_variables(), 0);

    let test = ShapeFunction::new(0.5, Vector3::new(1.0, 2.0, 3.0));
    let trial = ShapeFunction::new(0.25, Vector3::new(-1.0, 4.0, 2.0));
    for grad_u in [Vector3::zeros(), Vector3::new(1e6, -3.0, 2.0)] {
        let qp = QuadraturePoint::new(0, grad_u);
        assert!(!kernel.is_anisotropic(&grad_u));
        assert_eq!(kernel.compute_qp_residual(&store, &qp, &test), 2.0 * 3.0 * 0.5);
        assert_eq!(kernel.compute_qp_jacobian(&store, &qp, &test, &trial), 2.0 * 5.0 * 0.25 * 0.5);
    }
}

#[test]
fn residual_ignores_inactive_test_gradient_components() {
    let (kernel, mut store) = single_point_kernel(2, -1.0);
    populate_scenario(&mut store, 2);

    let qp = QuadraturePoint::new(0, Vector3::new(1.0, 1.0, 1.0));
    let test = ShapeFunction::new(2.0, Vector3::new(1.0, 1.0, 100.0));
    // 2 * (3 * 2 + 4 * 1 + 5 * 1)
    assert_eq!(kernel.compute_qp_residual(&store, &qp, &test), 30.0);
}

#[test]
fn anisotropic_jacobian_contracts_second_derivatives() {
    let (kernel, mut store) = single_point_kernel(3, 0.1);
    populate_scenario(&mut store, 3);

    #[rustfmt::skip]
    let hessian = Matrix3::new(
        1.0, 2.0, 3.0,
        2.0, 4.0, 5.0,
        3.0, 5.0, 6.0);
    for i in 0..3 {
        for j in i..3 {
            let wrt = [COMPONENT_NAMES[i], COMPONENT_NAMES[j]];
            set_value(&mut store, "fbulk", &wrt, hessian[(i, j)]);
        }
    }

    let qp = QuadraturePoint::new(0, Vector3::new(0.0, 1.0, 0.0));
    let test = ShapeFunction::new(0.5, Vector3::new(1.0, -2.0, 0.5));
    let trial = ShapeFunction::new(-0.25, Vector3::new(3.0, 1.0, -1.0));

    let expected = 2.0 * (5.0 * trial.value * test.value + test.gradient.dot(&(hessian * trial.gradient)));
    let jacobian = kernel.compute_qp_jacobian(&store, &qp, &test, &trial);
    assert_scalar_eq!(jacobian, expected, comp = abs, tol = 1e-12);

    // Below the threshold only the bulk term remains
    let qp = QuadraturePoint::new(0, Vector3::new(0.0, 0.05, 0.0));
    let jacobian = kernel.compute_qp_jacobian(&store, &qp, &test, &trial);
    assert_eq!(jacobian, 2.0 * 5.0 * trial.value * test.value);
}

#[test]
fn off_diagonal_jacobian_couples_directional_fields() {
    let (kernel, mut store) = single_point_kernel(2, 1.0);
    populate_scenario(&mut store, 2);
    set_value(&mut store, "fbulk", &["eta", "dpy"], 7.0);
    set_value(&mut store, "fbulk", &["dpx", "dpy"], 2.0);
    set_value(&mut store, "fbulk", &["dpy", "dpy"], 3.0);

    assert_eq!(kernel.num_coupled_variables(), 2);

    let test = ShapeFunction::new(0.5, Vector3::new(1.0, -1.0, 10.0));
    let trial = ShapeFunction::new(2.0, Vector3::new(-3.0, 3.0, 3.0));

    let isotropic = QuadraturePoint::new(0, Vector3::new(0.5, 0.0, 0.0));
    let value = kernel.compute_qp_off_diagonal_jacobian(&store, &isotropic, &test, &trial, 1);
    assert_eq!(value, 2.0 * 7.0 * 2.0 * 0.5);

    // The row of d^2f/dp^2 for dpy is (2, 3, 0), which dotted with the test gradient gives -1
    let anisotropic = QuadraturePoint::new(0, Vector3::new(2.0, 0.0, 0.0));
    let value = kernel.compute_qp_off_diagonal_jacobian(&store, &anisotropic, &test, &trial, 1);
    assert_eq!(value, 2.0 * (7.0 * 2.0 * 0.5 - 1.0 * 2.0));

    // No mixed derivative with dpx has been set
    let value = kernel.compute_qp_off_diagonal_jacobian(&store, &isotropic, &test, &trial, 0);
    assert_eq!(value, 0.0);
}

#[test]
#[should_panic]
fn off_diagonal_jacobian_panics_for_uncoupled_index() {
    let (kernel, store) = single_point_kernel(2, 1.0);
    let phi = ShapeFunction::new(1.0, Vector3::new(1.0, 0.0, 0.0));
    let qp = QuadraturePoint::new(0, Vector3::zeros());
    kernel.compute_qp_off_diagonal_jacobian(&store, &qp, &phi, &phi, 2);
}

#[test]
fn bulk_energy_density_reads_fbulk() {
    let (kernel, mut store) = single_point_kernel(1, 1.0);
    set_value(&mut store, "fbulk", &[], 0.125);
    assert_eq!(kernel.bulk_energy_density(&store, 0), 0.125);
}

prop_compose! {
    /// A kernel with `n` components and all properties of a single quadrature point populated
    /// with arbitrary values, the mixed second derivatives being symmetric by construction.
    fn populated_kernel(n: usize, threshold: f64)
        (values in proptest::collection::vec(-10.0..10.0, 16))
        -> (AnisotropicDoubleWellEnergy<f64>, MaterialPropertyStore<f64>)
    {
        let (kernel, mut store) = single_point_kernel(n, threshold);
        let names: Vec<String> = store.property_names().map(str::to_string).collect();
        assert!(names.len() <= values.len());
        for (name, value) in names.iter().zip(values) {
            store.set_property_values(name, &[value]).unwrap();
        }
        (kernel, store)
    }
}

proptest! {
    #[test]
    fn isotropic_evaluation_reduces_to_bulk_terms(
        (kernel, store) in (0..=3usize).prop_flat_map(|n| populated_kernel(n, 1e3)),
        qp in quadrature_point(1),
        test in shape_function(),
        trial in shape_function(),
    ) {
        // Gradients of the strategy are bounded well below the threshold
        prop_assert!(!kernel.is_anisotropic(&qp.grad_u));

        let derivatives = kernel.derivatives();
        let l = store.values(kernel.mobility())[0];
        let dfbulk_dvar = store.values(derivatives.dfbulk_dvar())[0];
        let d2fbulk_dvar2 = store.values(derivatives.d2fbulk_dvar2())[0];

        prop_assert_eq!(kernel.compute_qp_residual(&store, &qp, &test), l * dfbulk_dvar * test.value);
        prop_assert_eq!(
            kernel.compute_qp_jacobian(&store, &qp, &test, &trial),
            l * d2fbulk_dvar2 * trial.value * test.value
        );
    }

    #[test]
    fn anisotropic_jacobian_is_symmetric(
        (kernel, store) in (1..=3usize).prop_flat_map(|n| populated_kernel(n, -1.0)),
        qp in quadrature_point(1),
        test in any::<ShapeFunction<f64>>(),
        trial in any::<ShapeFunction<f64>>(),
    ) {
        prop_assert!(kernel.is_anisotropic(&qp.grad_u));
        let j_ab = kernel.compute_qp_jacobian(&store, &qp, &test, &trial);
        let j_ba = kernel.compute_qp_jacobian(&store, &qp, &trial, &test);
        assert_scalar_eq!(j_ab, j_ba, comp = abs, tol = 1e-9);
    }

    #[test]
    fn anisotropic_residual_depends_only_on_active_gradient_components(
        (n, (kernel, store), gradient) in (1..=3usize)
            .prop_flat_map(|n| (Just(n), populated_kernel(n, -1.0), vector_in_dim(n))),
        qp in quadrature_point(1),
        value in -1.0..1.0,
        inactive in -10.0..10.0,
    ) {
        let mut padded = gradient;
        for k in n..3 {
            padded[k] = inactive;
        }
        let r_padded = kernel.compute_qp_residual(&store, &qp, &ShapeFunction::new(value, padded));
        let r_active = kernel.compute_qp_residual(&store, &qp, &ShapeFunction::new(value, gradient));
        prop_assert_eq!(r_padded, r_active);
    }
}
