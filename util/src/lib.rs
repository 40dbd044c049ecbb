//! Test helpers shared by the crates in this workspace.
use nalgebra::{DMatrix, DVector};

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with central finite differences of step size `h`.
pub fn approximate_jacobian_fd(
    m: usize,
    mut f: impl FnMut(&DVector<f64>) -> DVector<f64>,
    x: &DVector<f64>,
    h: f64,
) -> DMatrix<f64> {
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);
    let mut x = x.clone();

    for j in 0..n {
        let x_j = x[j];
        x[j] = x_j + h;
        let f_plus = f(&x);
        x[j] = x_j - h;
        let f_minus = f(&x);
        x[j] = x_j;

        assert_eq!(f_plus.len(), m, "Function output dimension mismatch");
        let mut column = jacobian.column_mut(j);
        column.copy_from(&f_plus);
        column -= &f_minus;
        column /= 2.0 * h;
    }

    jacobian
}
