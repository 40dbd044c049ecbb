//! Element-level assembly of kernel contributions.
//!
//! These routines loop over the quadrature points and basis functions of a single element and
//! accumulate weighted kernel contributions into local vectors and matrices. Evaluating basis
//! functions and mapping them to physical space is up to the caller, who supplies the result
//! as [`ElementQuadratureData`]. Likewise, the material properties must already have been
//! computed for the element.
use crate::kernel::{AnisotropicDoubleWellEnergy, Kernel, QuadraturePoint, ShapeFunction};
use crate::Real;
use eyre::eyre;
use fenris_phasefield_traits::material::PropertyValues;
use itertools::izip;
use log::debug;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Vector3};
use rayon::prelude::*;

/// Basis function values and physical-space gradients of one element, evaluated at its
/// quadrature points.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementQuadratureData<T> {
    weights: Vec<T>,
    // n x nqp
    basis_values: DMatrix<T>,
    // Gradient of basis function i at quadrature point q is stored at q * n + i
    basis_gradients: Vec<Vector3<T>>,
}

impl<T: Real> ElementQuadratureData<T> {
    /// Constructs element quadrature data.
    ///
    /// `weights` are the quadrature weights *including* the Jacobian determinant of the
    /// reference-to-physical map. `basis_values` is the `n x nqp` matrix of basis function
    /// values, and `basis_gradients` holds `n * nqp` physical gradients, with the gradient of
    /// basis function `i` at quadrature point `q` at index `q * n + i`.
    pub fn try_new(weights: Vec<T>, basis_values: DMatrix<T>, basis_gradients: Vec<Vector3<T>>) -> eyre::Result<Self> {
        if basis_values.ncols() != weights.len() {
            return Err(eyre!(
                "Number of quadrature weights ({}) must be equal to number of columns in basis values ({})",
                weights.len(),
                basis_values.ncols()
            ));
        }
        if basis_gradients.len() != basis_values.nrows() * basis_values.ncols() {
            return Err(eyre!(
                "Expected {} basis gradients, got {}",
                basis_values.nrows() * basis_values.ncols(),
                basis_gradients.len()
            ));
        }
        Ok(Self {
            weights,
            basis_values,
            basis_gradients,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.basis_values.nrows()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Value and gradient of basis function `node` at quadrature point `qp`.
    pub fn basis_function(&self, node: usize, qp: usize) -> ShapeFunction<T> {
        let n = self.num_nodes();
        ShapeFunction::new(self.basis_values[(node, qp)], self.basis_gradients[qp * n + node])
    }

    /// Interpolates the element field with nodal coefficients `u_element` at quadrature point `qp`.
    pub fn interpolate(&self, u_element: DVectorView<T>, qp: usize) -> T {
        self.basis_values.column(qp).dot(&u_element)
    }

    /// Interpolates the gradient of the element field with nodal coefficients `u_element`
    /// at quadrature point `qp`.
    pub fn interpolate_gradient(&self, u_element: DVectorView<T>, qp: usize) -> Vector3<T> {
        let n = self.num_nodes();
        let gradients = &self.basis_gradients[qp * n..(qp + 1) * n];
        let mut grad_u = Vector3::zeros();
        for (u_i, phi_i_grad) in u_element.iter().zip(gradients) {
            grad_u.axpy(*u_i, phi_i_grad, T::one());
        }
        grad_u
    }

    /// Interpolates the element field at every quadrature point.
    pub fn interpolate_at_quadrature_points(&self, u_element: DVectorView<T>) -> Vec<T> {
        (0..self.num_quadrature_points())
            .map(|qp| self.interpolate(u_element, qp))
            .collect()
    }

    /// Interpolates the gradient of the element field at every quadrature point.
    pub fn interpolate_gradients_at_quadrature_points(&self, u_element: DVectorView<T>) -> Vec<Vector3<T>> {
        (0..self.num_quadrature_points())
            .map(|qp| self.interpolate_gradient(u_element, qp))
            .collect()
    }

    fn check_element_vector(&self, u_element: &DVectorView<T>) -> eyre::Result<()> {
        if u_element.len() != self.num_nodes() {
            return Err(eyre!(
                "Local element dofs (u_element) dimension mismatch: expected {}, got {}",
                self.num_nodes(),
                u_element.len()
            ));
        }
        Ok(())
    }
}

/// Assembles the local residual vector of `kernel` for a single element.
///
/// Entry `i` of the output is $\sum_q w_q R_i(x_q)$, where $R_i$ is the kernel residual for
/// basis function `i`.
///
/// # Panics
///
/// Panics if `properties` does not hold values for every quadrature point of the element.
pub fn assemble_element_residual_into<T, K, P>(
    mut output: DVectorViewMut<T>,
    kernel: &K,
    properties: &P,
    data: &ElementQuadratureData<T>,
    u_element: DVectorView<T>,
) -> eyre::Result<()>
where
    T: Real,
    K: Kernel<T>,
    P: PropertyValues<T> + ?Sized,
{
    data.check_element_vector(&u_element)?;
    let n = data.num_nodes();
    if output.len() != n {
        return Err(eyre!("Output vector dimension mismatch"));
    }

    output.fill(T::zero());
    for (q, &weight) in data.weights().iter().enumerate() {
        let qp = QuadraturePoint::new(q, data.interpolate_gradient(u_element, q));
        for i in 0..n {
            let test = data.basis_function(i, q);
            output[i] += weight * kernel.compute_qp_residual(properties, &qp, &test);
        }
    }
    Ok(())
}

/// Assembles the local Jacobian matrix of `kernel` with respect to its own variable.
///
/// Entry `(i, j)` of the output is $\sum_q w_q J_{ij}(x_q)$.
///
/// # Panics
///
/// Panics if `properties` does not hold values for every quadrature point of the element.
pub fn assemble_element_jacobian_into<T, K, P>(
    mut output: DMatrixViewMut<T>,
    kernel: &K,
    properties: &P,
    data: &ElementQuadratureData<T>,
    u_element: DVectorView<T>,
) -> eyre::Result<()>
where
    T: Real,
    K: Kernel<T>,
    P: PropertyValues<T> + ?Sized,
{
    data.check_element_vector(&u_element)?;
    let n = data.num_nodes();
    if output.nrows() != n || output.ncols() != n {
        return Err(eyre!("Output matrix dimension mismatch"));
    }

    output.fill(T::zero());
    for (q, &weight) in data.weights().iter().enumerate() {
        let qp = QuadraturePoint::new(q, data.interpolate_gradient(u_element, q));
        for i in 0..n {
            let test = data.basis_function(i, q);
            for j in 0..n {
                let trial = data.basis_function(j, q);
                output[(i, j)] += weight * kernel.compute_qp_jacobian(properties, &qp, &test, &trial);
            }
        }
    }
    Ok(())
}

/// Assembles the local Jacobian block of `kernel` with respect to coupled variable `coupled`.
///
/// The coupled variable is assumed to be discretized with the same basis functions as the
/// kernel variable.
pub fn assemble_element_off_diagonal_jacobian_into<T, K, P>(
    mut output: DMatrixViewMut<T>,
    kernel: &K,
    properties: &P,
    data: &ElementQuadratureData<T>,
    u_element: DVectorView<T>,
    coupled: usize,
) -> eyre::Result<()>
where
    T: Real,
    K: Kernel<T>,
    P: PropertyValues<T> + ?Sized,
{
    data.check_element_vector(&u_element)?;
    let n = data.num_nodes();
    if output.nrows() != n || output.ncols() != n {
        return Err(eyre!("Output matrix dimension mismatch"));
    }
    if coupled >= kernel.num_coupled_variables() {
        return Err(eyre!(
            "Coupled variable index {} out of bounds for kernel with {} coupled variables",
            coupled,
            kernel.num_coupled_variables()
        ));
    }

    output.fill(T::zero());
    for (q, &weight) in data.weights().iter().enumerate() {
        let qp = QuadraturePoint::new(q, data.interpolate_gradient(u_element, q));
        for i in 0..n {
            let test = data.basis_function(i, q);
            for j in 0..n {
                let trial = data.basis_function(j, q);
                let value = kernel.compute_qp_off_diagonal_jacobian(properties, &qp, &test, &trial, coupled);
                output[(i, j)] += weight * value;
            }
        }
    }
    Ok(())
}

/// Integrates the bulk energy density of the double-well kernel over a single element.
pub fn integrate_element_bulk_energy<T, P>(
    kernel: &AnisotropicDoubleWellEnergy<T>,
    properties: &P,
    data: &ElementQuadratureData<T>,
) -> T
where
    T: Real,
    P: PropertyValues<T> + ?Sized,
{
    let mut energy = T::zero();
    for (q, &weight) in data.weights().iter().enumerate() {
        energy += weight * kernel.bulk_energy_density(properties, q);
    }
    energy
}

/// The state of a single element required for assembly.
#[derive(Debug, Clone)]
pub struct ElementAssemblyInput<'a, T: Real, P> {
    pub quadrature: &'a ElementQuadratureData<T>,
    pub properties: &'a P,
    pub u_element: DVectorView<'a, T>,
}

/// Assembles the local residual vectors of many elements in parallel.
///
/// Elements are independent, so the result is identical to assembling each element with
/// [`assemble_element_residual_into`].
pub fn par_assemble_element_residuals<T, K, P>(
    kernel: &K,
    elements: &[ElementAssemblyInput<T, P>],
) -> eyre::Result<Vec<DVector<T>>>
where
    T: Real,
    K: Kernel<T> + Sync,
    P: PropertyValues<T> + Sync,
{
    debug!("Assembling residuals of {} elements in parallel.", elements.len());
    elements
        .par_iter()
        .map(|element| -> eyre::Result<DVector<T>> {
            let mut output = DVector::zeros(element.quadrature.num_nodes());
            assemble_element_residual_into(
                DVectorViewMut::from(&mut output),
                kernel,
                element.properties,
                element.quadrature,
                element.u_element,
            )?;
            Ok(output)
        })
        .collect()
}

/// Assembles the local Jacobian matrices of many elements in parallel.
pub fn par_assemble_element_jacobians<T, K, P>(
    kernel: &K,
    elements: &[ElementAssemblyInput<T, P>],
) -> eyre::Result<Vec<DMatrix<T>>>
where
    T: Real,
    K: Kernel<T> + Sync,
    P: PropertyValues<T> + Sync,
{
    debug!("Assembling Jacobians of {} elements in parallel.", elements.len());
    elements
        .par_iter()
        .map(|element| -> eyre::Result<DMatrix<T>> {
            let n = element.quadrature.num_nodes();
            let mut output = DMatrix::zeros(n, n);
            assemble_element_jacobian_into(
                DMatrixViewMut::from(&mut output),
                kernel,
                element.properties,
                element.quadrature,
                element.u_element,
            )?;
            Ok(output)
        })
        .collect()
}

/// Sums weighted quantities over quadrature points.
///
/// Convenience for integrating per-quadrature-point values, e.g. for post-processing.
pub fn integrate_over_element<T: Real>(data: &ElementQuadratureData<T>, values: &[T]) -> eyre::Result<T> {
    if values.len() != data.num_quadrature_points() {
        return Err(eyre!(
            "Expected {} values, got {}",
            data.num_quadrature_points(),
            values.len()
        ));
    }
    let mut result = T::zero();
    for (w, v) in izip!(data.weights(), values) {
        result += *w * *v;
    }
    Ok(result)
}
