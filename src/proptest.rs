//! Strategies for property-based testing of kernels.
use crate::kernel::{QuadraturePoint, ShapeFunction};
use ::proptest::prelude::*;
use nalgebra::Vector3;

pub fn vector3() -> impl Strategy<Value = Vector3<f64>> {
    // Keep the range moderate, so that products of several quantities remain
    // well within the range where finite differences are meaningful
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range].prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

/// Vectors whose components beyond the first `dim` are zero.
pub fn vector_in_dim(dim: usize) -> impl Strategy<Value = Vector3<f64>> {
    vector3().prop_map(move |mut v| {
        for k in dim.min(3)..3 {
            v[k] = 0.0;
        }
        v
    })
}

pub fn shape_function() -> impl Strategy<Value = ShapeFunction<f64>> {
    (-1.0..1.0, vector3()).prop_map(|(value, gradient)| ShapeFunction::new(value, gradient))
}

pub fn quadrature_point(num_points: usize) -> impl Strategy<Value = QuadraturePoint<f64>> {
    (0..num_points.max(1), vector3()).prop_map(|(index, grad_u)| QuadraturePoint::new(index, grad_u))
}

impl Arbitrary for ShapeFunction<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        shape_function().boxed()
    }
}
