//! Weak-form kernels evaluated at individual quadrature points.
//!
//! A kernel computes the contribution of a single term of the weak form for one
//! (quadrature point, test function) pair, and its derivative with respect to the
//! coefficient of one trial function. Looping over elements, quadrature points and basis
//! functions, and weighting by quadrature weights, is the responsibility of the caller
//! (see [`crate::assembly`]).
use crate::Real;
use fenris_phasefield_traits::material::PropertyValues;
use nalgebra::Vector3;

mod anisotropic_double_well;
pub mod derivatives;

pub use anisotropic_double_well::*;

/// State of the kernel variable at a quadrature point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadraturePoint<T> {
    /// Index of the quadrature point within the current element.
    pub index: usize,
    /// Physical-space gradient of the kernel variable at the quadrature point.
    pub grad_u: Vector3<T>,
}

impl<T: Real> QuadraturePoint<T> {
    pub fn new(index: usize, grad_u: Vector3<T>) -> Self {
        Self { index, grad_u }
    }
}

/// Value and physical-space gradient of a basis function at a quadrature point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeFunction<T> {
    pub value: T,
    pub gradient: Vector3<T>,
}

impl<T: Real> ShapeFunction<T> {
    pub fn new(value: T, gradient: Vector3<T>) -> Self {
        Self { value, gradient }
    }
}

/// A kernel acting on a scalar variable.
pub trait Kernel<T: Real> {
    /// The residual contribution for the test function `test`.
    fn compute_qp_residual<P>(&self, properties: &P, qp: &QuadraturePoint<T>, test: &ShapeFunction<T>) -> T
    where
        P: PropertyValues<T> + ?Sized;

    /// The derivative of the residual for `test` with respect to the coefficient of `trial`
    /// in the kernel variable.
    fn compute_qp_jacobian<P>(
        &self,
        properties: &P,
        qp: &QuadraturePoint<T>,
        test: &ShapeFunction<T>,
        trial: &ShapeFunction<T>,
    ) -> T
    where
        P: PropertyValues<T> + ?Sized;

    /// Number of coupled variables with off-diagonal Jacobian contributions.
    fn num_coupled_variables(&self) -> usize {
        0
    }

    /// The derivative of the residual for `test` with respect to the coefficient of `trial`
    /// in coupled variable number `coupled`.
    fn compute_qp_off_diagonal_jacobian<P>(
        &self,
        properties: &P,
        qp: &QuadraturePoint<T>,
        test: &ShapeFunction<T>,
        trial: &ShapeFunction<T>,
        coupled: usize,
    ) -> T
    where
        P: PropertyValues<T> + ?Sized,
    {
        let _ = (properties, qp, test, trial, coupled);
        T::zero()
    }
}
