//! Reference implementations of the material-property collaborator.
//!
//! Kernels only depend on the contracts in [`fenris_phasefield_traits::material`]. This module
//! provides a simple per-element property store together with a few materials that populate
//! it, which is sufficient for driving kernels through the assembly routines in
//! [`crate::assembly`].
use crate::Real;
use eyre::eyre;
use fenris_phasefield_traits::material::{
    derivative_property_name, DerivativeMaterialInfo, PropertyId, PropertyRegistry, PropertyValues,
};
use nalgebra::{DMatrix, DVector, DVectorView};
use numeric_literals::replace_float_literals;
use rustc_hash::FxHashMap;

/// Storage for scalar material properties at the quadrature points of a single element.
///
/// The store doubles as the construction-time [`PropertyRegistry`]: kernels declare the
/// properties they need, and the store allocates room for them. Typically a single store is
/// used for declaration and then cloned for each element (or each worker thread) before it
/// is populated by materials.
#[derive(Debug, Clone)]
pub struct MaterialPropertyStore<T> {
    names: Vec<String>,
    ids: FxHashMap<String, PropertyId>,
    num_quadrature_points: usize,
    // Property-major: values of property `p` occupy `p * nqp .. (p + 1) * nqp`
    values: Vec<T>,
}

impl<T: Real> Default for MaterialPropertyStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> MaterialPropertyStore<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            ids: FxHashMap::default(),
            num_quadrature_points: 0,
            values: Vec::new(),
        }
    }

    pub fn num_properties(&self) -> usize {
        self.names.len()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_quadrature_points
    }

    pub fn property_id(&self, name: &str) -> Option<PropertyId> {
        self.ids.get(name).copied()
    }

    /// Names of all declared properties, in order of declaration.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Resizes the store to hold values for `num_quadrature_points` points.
    ///
    /// All values are reset to zero.
    pub fn resize(&mut self, num_quadrature_points: usize) {
        self.num_quadrature_points = num_quadrature_points;
        self.values.clear();
        self.values
            .resize(self.names.len() * num_quadrature_points, T::zero());
    }

    pub fn values_mut(&mut self, id: PropertyId) -> &mut [T] {
        let n = self.num_quadrature_points;
        let offset = id.index() * n;
        &mut self.values[offset..offset + n]
    }

    /// Overwrites the values of a declared property.
    pub fn set_property_values(&mut self, name: &str, values: &[T]) -> eyre::Result<()> {
        let id = self
            .property_id(name)
            .ok_or_else(|| eyre!("property `{}` has not been declared", name))?;
        if values.len() != self.num_quadrature_points {
            return Err(eyre!(
                "expected {} values for property `{}`, got {}",
                self.num_quadrature_points,
                name,
                values.len()
            ));
        }
        self.values_mut(id).copy_from_slice(values);
        Ok(())
    }
}

impl<T: Real> PropertyRegistry for MaterialPropertyStore<T> {
    fn declare_property(&mut self, name: &str) -> PropertyId {
        if let Some(id) = self.property_id(name) {
            return id;
        }
        let id = PropertyId::from_index(self.names.len());
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.values
            .extend(std::iter::repeat(T::zero()).take(self.num_quadrature_points));
        id
    }
}

impl<T: Real> PropertyValues<T> for MaterialPropertyStore<T> {
    fn values(&self, id: PropertyId) -> &[T] {
        let n = self.num_quadrature_points;
        let offset = id.index() * n;
        &self.values[offset..offset + n]
    }
}

/// Values of coupled variables at the quadrature points of an element.
#[derive(Debug, Clone, Default)]
pub struct CoupledVariableValues<T> {
    names: Vec<String>,
    values: Vec<Vec<T>>,
}

impl<T: Real> CoupledVariableValues<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Inserts (or replaces) the quadrature point values of the named variable.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<T>) {
        let name = name.into();
        match self.names.iter().position(|existing| *existing == name) {
            Some(idx) => self.values[idx] = values,
            None => {
                self.names.push(name);
                self.values.push(values);
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, values: Vec<T>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[T]> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .map(|idx| self.values[idx].as_slice())
    }
}

/// A material that computes properties at quadrature points.
pub trait Material<T: Real>: DerivativeMaterialInfo {
    /// Computes the properties supplied by this material that are declared in `store`.
    ///
    /// Properties that have not been declared are skipped.
    fn compute_properties(
        &self,
        store: &mut MaterialPropertyStore<T>,
        coupled: &CoupledVariableValues<T>,
    ) -> eyre::Result<()>;
}

/// A property that takes the same value at every quadrature point.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMaterial<T> {
    name: String,
    value: T,
}

impl<T> ConstantMaterial<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl<T: Real> DerivativeMaterialInfo for ConstantMaterial<T> {
    fn has_property(&self, name: &str) -> bool {
        self.name == name
    }

    fn derivative_order(&self, _name: &str) -> Option<usize> {
        None
    }

    fn property_arguments(&self, name: &str) -> Option<&[String]> {
        if self.name == name {
            Some(&[])
        } else {
            None
        }
    }
}

impl<T: Real> Material<T> for ConstantMaterial<T> {
    fn compute_properties(
        &self,
        store: &mut MaterialPropertyStore<T>,
        _coupled: &CoupledVariableValues<T>,
    ) -> eyre::Result<()> {
        if let Some(id) = store.property_id(&self.name) {
            store.values_mut(id).fill(self.value);
        }
        Ok(())
    }
}

/// A scalar function together with its first and second derivatives.
///
/// The derivatives are supplied by the implementor; nothing is differentiated automatically.
pub trait BulkEnergyFunction<T: Real> {
    fn num_arguments(&self) -> usize;

    fn evaluate(&self, args: &[T]) -> T;

    /// The gradient with respect to all arguments.
    fn gradient(&self, args: &[T]) -> DVector<T>;

    /// The (symmetric) Hessian with respect to all arguments.
    fn hessian(&self, args: &[T]) -> DMatrix<T>;
}

/// The separable double-well energy
/// $$
/// f(\eta, \vec p) = h \eta^2 (1 - \eta)^2 + \frac{1}{2} \vec p^T K \vec p,
/// $$
/// with barrier height $h$ and symmetric gradient energy coefficients $K$.
///
/// The arguments are ordered as $(\eta, p_0, \dots, p_{n-1})$. Since there are no mixed terms
/// between $\eta$ and $\vec p$, the Jacobian of the double-well kernel is exact for this energy
/// when the directional fields are identified with $\nabla \eta$.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparableDoubleWell<T> {
    barrier_height: T,
    gradient_coefficients: DMatrix<T>,
}

impl<T: Real> SeparableDoubleWell<T> {
    pub fn try_new(barrier_height: T, gradient_coefficients: DMatrix<T>) -> eyre::Result<Self> {
        if !gradient_coefficients.is_square() {
            return Err(eyre!(
                "gradient coefficient matrix must be square, got {}x{}",
                gradient_coefficients.nrows(),
                gradient_coefficients.ncols()
            ));
        }
        if gradient_coefficients != gradient_coefficients.transpose() {
            return Err(eyre!("gradient coefficient matrix must be symmetric"));
        }
        Ok(Self {
            barrier_height,
            gradient_coefficients,
        })
    }

    /// The energy with $K = \kappa I$ for `num_components` directional fields.
    pub fn isotropic(barrier_height: T, kappa: T, num_components: usize) -> Self {
        Self {
            barrier_height,
            gradient_coefficients: DMatrix::from_diagonal_element(num_components, num_components, kappa),
        }
    }

    pub fn barrier_height(&self) -> T {
        self.barrier_height
    }

    pub fn gradient_coefficients(&self) -> &DMatrix<T> {
        &self.gradient_coefficients
    }

    fn split<'a>(&self, args: &'a [T]) -> (T, DVectorView<'a, T>) {
        assert_eq!(args.len(), self.num_arguments(), "Argument count mismatch");
        (args[0], DVectorView::from_slice(&args[1..], args.len() - 1))
    }
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> BulkEnergyFunction<T> for SeparableDoubleWell<T> {
    fn num_arguments(&self) -> usize {
        self.gradient_coefficients.nrows() + 1
    }

    fn evaluate(&self, args: &[T]) -> T {
        let (eta, p) = self.split(args);
        let h = self.barrier_height;
        h * eta * eta * (1.0 - eta) * (1.0 - eta) + 0.5 * p.dot(&(&self.gradient_coefficients * p))
    }

    fn gradient(&self, args: &[T]) -> DVector<T> {
        let (eta, p) = self.split(args);
        let h = self.barrier_height;
        let mut gradient = DVector::zeros(self.num_arguments());
        gradient[0] = h * (2.0 * eta - 6.0 * eta * eta + 4.0 * eta * eta * eta);
        gradient
            .rows_mut(1, p.len())
            .copy_from(&(&self.gradient_coefficients * p));
        gradient
    }

    fn hessian(&self, args: &[T]) -> DMatrix<T> {
        let (eta, p) = self.split(args);
        let h = self.barrier_height;
        let mut hessian = DMatrix::zeros(self.num_arguments(), self.num_arguments());
        hessian[(0, 0)] = h * (2.0 - 12.0 * eta + 12.0 * eta * eta);
        hessian
            .view_mut((1, 1), (p.len(), p.len()))
            .copy_from(&self.gradient_coefficients);
        hessian
    }
}

/// A material that supplies a function of coupled variables and all its derivatives up to
/// second order, stored under the names given by [`derivative_property_name`].
#[derive(Debug, Clone)]
pub struct DerivativeFunctionMaterial<F> {
    name: String,
    arguments: Vec<String>,
    function: F,
}

impl<F> DerivativeFunctionMaterial<F> {
    /// Creates a material supplying `function` under `name`, where `arguments` names the
    /// coupled variables passed to the function, in order.
    pub fn new<S: Into<String>>(name: impl Into<String>, arguments: impl IntoIterator<Item = S>, function: F) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            function,
        }
    }

    pub fn function(&self) -> &F {
        &self.function
    }
}

impl<F> DerivativeMaterialInfo for DerivativeFunctionMaterial<F> {
    fn has_property(&self, name: &str) -> bool {
        self.name == name
    }

    fn derivative_order(&self, name: &str) -> Option<usize> {
        (self.name == name).then_some(2)
    }

    fn property_arguments(&self, name: &str) -> Option<&[String]> {
        (self.name == name).then_some(self.arguments.as_slice())
    }
}

impl<T, F> Material<T> for DerivativeFunctionMaterial<F>
where
    T: Real,
    F: BulkEnergyFunction<T>,
{
    fn compute_properties(
        &self,
        store: &mut MaterialPropertyStore<T>,
        coupled: &CoupledVariableValues<T>,
    ) -> eyre::Result<()> {
        let m = self.arguments.len();
        if self.function.num_arguments() != m {
            return Err(eyre!(
                "material `{}` has {} arguments, but its function takes {}",
                self.name,
                m,
                self.function.num_arguments()
            ));
        }

        let nqp = store.num_quadrature_points();
        let arg_values = self
            .arguments
            .iter()
            .map(|arg| {
                let values = coupled
                    .get(arg)
                    .ok_or_else(|| eyre!("material `{}` requires coupled variable `{}`", self.name, arg))?;
                if values.len() != nqp {
                    return Err(eyre!(
                        "coupled variable `{}` has {} values, expected {}",
                        arg,
                        values.len(),
                        nqp
                    ));
                }
                Ok(values)
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        // Resolve the declared properties once, so that the quadrature loop is lookup-free
        let arg_names: Vec<&str> = self.arguments.iter().map(String::as_str).collect();
        let value_id = store.property_id(&self.name);
        let first_ids: Vec<_> = arg_names
            .iter()
            .map(|a| store.property_id(&derivative_property_name(&self.name, &[a])))
            .collect();
        let mut second_ids = Vec::new();
        for i in 0..m {
            for j in i..m {
                let id = store.property_id(&derivative_property_name(&self.name, &[arg_names[i], arg_names[j]]));
                if let Some(id) = id {
                    second_ids.push((i, j, id));
                }
            }
        }

        let mut x = vec![T::zero(); m];
        for qp in 0..nqp {
            for (x_k, values) in x.iter_mut().zip(&arg_values) {
                *x_k = values[qp];
            }

            if let Some(id) = value_id {
                store.values_mut(id)[qp] = self.function.evaluate(&x);
            }

            if first_ids.iter().any(Option::is_some) {
                let gradient = self.function.gradient(&x);
                for (k, id) in first_ids.iter().enumerate() {
                    if let Some(id) = id {
                        store.values_mut(*id)[qp] = gradient[k];
                    }
                }
            }

            if !second_ids.is_empty() {
                let hessian = self.function.hessian(&x);
                for &(i, j, id) in &second_ids {
                    store.values_mut(id)[qp] = hessian[(i, j)];
                }
            }
        }

        Ok(())
    }
}

/// A collection of materials, queried and evaluated as one.
pub struct MaterialSet<'a, T> {
    materials: Vec<Box<dyn Material<T> + Send + Sync + 'a>>,
}

impl<'a, T: Real> Default for MaterialSet<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Real> MaterialSet<'a, T> {
    pub fn new() -> Self {
        Self { materials: Vec::new() }
    }

    pub fn with_material(mut self, material: impl Material<T> + Send + Sync + 'a) -> Self {
        self.materials.push(Box::new(material));
        self
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Resizes the store to `num_quadrature_points` and computes all materials into it.
    pub fn compute_properties(
        &self,
        store: &mut MaterialPropertyStore<T>,
        num_quadrature_points: usize,
        coupled: &CoupledVariableValues<T>,
    ) -> eyre::Result<()> {
        store.resize(num_quadrature_points);
        for material in &self.materials {
            material.compute_properties(store, coupled)?;
        }
        Ok(())
    }
}

impl<'a, T: Real> DerivativeMaterialInfo for MaterialSet<'a, T> {
    fn has_property(&self, name: &str) -> bool {
        self.materials
            .iter()
            .any(|material| material.has_property(name))
    }

    fn derivative_order(&self, name: &str) -> Option<usize> {
        self.materials
            .iter()
            .find_map(|material| material.derivative_order(name))
    }

    fn property_arguments(&self, name: &str) -> Option<&[String]> {
        self.materials
            .iter()
            .find_map(|material| material.property_arguments(name))
    }
}
