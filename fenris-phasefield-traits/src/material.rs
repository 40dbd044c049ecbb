//! Contracts between kernels and the material system that supplies per-quadrature-point
//! scalar properties and their derivatives.
//!
//! Kernels never hold references into material storage. Instead, they declare the properties
//! they need once, at construction time, through a [`PropertyRegistry`] and keep the returned
//! [`PropertyId`] handles. During assembly, the values for the current element are looked up
//! through [`PropertyValues`].

/// Opaque handle to a scalar material property evaluated at quadrature points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(usize);

impl PropertyId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Construction-time access to named material properties.
///
/// Declaring a property registers a dependency on it, so that the material system knows
/// that it must compute and store the property for every quadrature point.
/// Declaring the same property twice must return the same handle.
pub trait PropertyRegistry {
    /// Declares the scalar property with the given name.
    fn declare_property(&mut self, name: &str) -> PropertyId;

    /// Declares the derivative of the named property with respect to the given arguments.
    ///
    /// The derivative is addressed by the name produced by [`derivative_property_name`].
    fn declare_property_derivative(&mut self, name: &str, wrt: &[&str]) -> PropertyId {
        let derivative_name = derivative_property_name(name, wrt);
        self.declare_property(&derivative_name)
    }

    /// Declares the second derivative of the named property with respect to `a` and `b`.
    fn declare_second_derivative(&mut self, name: &str, a: &str, b: &str) -> PropertyId {
        self.declare_property_derivative(name, &[a, b])
    }
}

/// Evaluation-time, read-only access to the property values of the current element.
pub trait PropertyValues<T> {
    /// Returns the values of the property at each quadrature point of the current element.
    fn values(&self, id: PropertyId) -> &[T];

    /// Returns the value of the property at quadrature point `qp`.
    ///
    /// # Panics
    ///
    /// Panics if `qp` is out of bounds.
    fn value(&self, id: PropertyId, qp: usize) -> T
    where
        T: Copy,
    {
        self.values(id)[qp]
    }
}

impl<'a, T, P> PropertyValues<T> for &'a P
where
    P: PropertyValues<T> + ?Sized,
{
    fn values(&self, id: PropertyId) -> &[T] {
        P::values(self, id)
    }
}

/// Metadata that a derivative material exposes about the properties it supplies.
///
/// Used by kernels to check, once all objects are set up, that the material they consume
/// is coupled consistently with the kernel.
pub trait DerivativeMaterialInfo {
    /// Whether some material supplies a property with the given name.
    fn has_property(&self, name: &str) -> bool;

    /// The maximum derivative order available for the named base property, if it is supplied
    /// by a derivative material.
    fn derivative_order(&self, name: &str) -> Option<usize>;

    /// The names of the variables the named property is a function of.
    fn property_arguments(&self, name: &str) -> Option<&[String]>;
}

/// Returns the name under which the derivative of `base` with respect to `wrt` is stored.
///
/// The arguments are sorted, so that mixed derivatives are independent of the order of
/// differentiation. An empty argument list returns `base` itself.
///
/// ```
/// use fenris_phasefield_traits::material::derivative_property_name;
/// assert_eq!(derivative_property_name("F", &[]), "F");
/// assert_eq!(derivative_property_name("F", &["c"]), "dF/dc");
/// assert_eq!(derivative_property_name("F", &["c", "c"]), "d^2F/dc^2");
/// assert_eq!(derivative_property_name("F", &["b", "a"]), "d^2F/dadb");
/// ```
pub fn derivative_property_name(base: &str, wrt: &[&str]) -> String {
    let order = wrt.len();
    if order == 0 {
        return base.to_string();
    }

    let mut args = wrt.to_vec();
    args.sort_unstable();

    let prefix = if order == 1 {
        format!("d{}", base)
    } else {
        format!("d^{}{}", order, base)
    };

    if args.iter().all(|arg| *arg == args[0]) && order > 1 {
        format!("{}/d{}^{}", prefix, args[0], order)
    } else {
        let denominator: String = args.iter().map(|arg| format!("d{}", arg)).collect();
        format!("{}/{}", prefix, denominator)
    }
}
