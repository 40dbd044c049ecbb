use crate::config::AnisotropicDoubleWellParams;
use crate::error::{ConfigurationError, CouplingValidationError};
use crate::kernel::derivatives::BulkEnergyDerivatives;
use crate::kernel::{Kernel, QuadraturePoint, ShapeFunction};
use crate::Real;
use fenris_phasefield_traits::material::{DerivativeMaterialInfo, PropertyId, PropertyRegistry, PropertyValues};
use log::{debug, warn};
use nalgebra::Vector3;

/// Generalized Allen-Cahn kernel for a double-well bulk energy depending on the gradient.
///
/// Implements the weak form of
/// $$
/// L \left( \pd{f}{\eta} - \nabla \cdot \pd{f}{\nabla \eta} \right),
/// $$
/// where $f = f(\eta, p_0, \dots, p_{n-1})$ is the bulk energy and the fields $p_k$ hold the
/// components of $\nabla \eta$ as independent, coupled variables. The residual for a test
/// function $\psi$ is
/// $$
/// R = L \left( \pd{f}{\eta} \psi + \pd{f}{\vec p} \cdot \nabla \psi \right)
/// $$
/// where $|\nabla \eta|$ exceeds the configured threshold (*anisotropic* mode), and
/// $R = L \pd{f}{\eta} \psi$ otherwise (*isotropic* mode). The Jacobian treats $\vec p$ as
/// $\nabla \eta$, so that with $\phi$ the trial function,
/// $$
/// J = L \left( \pd{^2 f}{\eta^2} \phi \psi
///     + \sum_{k, l} \partial_k \psi \pd{^2 f}{p_k \partial p_l} \partial_l \phi \right)
/// $$
/// in anisotropic mode.
///
/// The kernel is set up in two phases: [`new`](Self::new) validates the parameters and
/// declares the required material properties, after which [`initial_setup`](Self::initial_setup)
/// must be called once all materials are known. Evaluating a kernel for which `initial_setup`
/// has not succeeded is a logic error: properties that no material supplies read as zero, and
/// the results are meaningless.
///
/// ```
/// use fenris_phasefield::config::AnisotropicDoubleWellParams;
/// use fenris_phasefield::kernel::{AnisotropicDoubleWellEnergy, Kernel, QuadraturePoint, ShapeFunction};
/// use fenris_phasefield::material::{
///     ConstantMaterial, CoupledVariableValues, DerivativeFunctionMaterial, MaterialPropertyStore, MaterialSet,
///     SeparableDoubleWell,
/// };
/// use fenris_phasefield::nalgebra::Vector3;
///
/// let params = AnisotropicDoubleWellParams::default().with_gradient_components(["dpx"]);
/// let mut store = MaterialPropertyStore::<f64>::new();
/// let kernel = AnisotropicDoubleWellEnergy::new("eta", &params, &mut store)?;
///
/// let energy = SeparableDoubleWell::isotropic(1.0, 1.0, 1);
/// let materials = MaterialSet::new()
///     .with_material(ConstantMaterial::new("L", 1.0))
///     .with_material(DerivativeFunctionMaterial::new("fbulk", ["eta", "dpx"], energy));
/// kernel.initial_setup(&materials)?;
///
/// let coupled = CoupledVariableValues::new()
///     .with("eta", vec![0.5])
///     .with("dpx", vec![2.0]);
/// materials.compute_properties(&mut store, 1, &coupled)?;
///
/// let qp = QuadraturePoint::new(0, Vector3::new(2.0, 0.0, 0.0));
/// let test = ShapeFunction::new(1.0, Vector3::new(1.0, 0.0, 0.0));
/// // df/deta vanishes at eta = 1/2, which leaves df/dpx = 2
/// assert_eq!(kernel.compute_qp_residual(&store, &qp, &test), 2.0);
/// # Ok::<(), eyre::Report>(())
/// ```
#[derive(Debug, Clone)]
pub struct AnisotropicDoubleWellEnergy<T> {
    variable: String,
    params: AnisotropicDoubleWellParams,
    gradmag_threshold: T,
    mobility: PropertyId,
    derivatives: BulkEnergyDerivatives,
}

impl<T: Real> AnisotropicDoubleWellEnergy<T> {
    /// Creates a kernel acting on `variable`, declaring its material dependencies in `registry`.
    pub fn new(
        variable: impl Into<String>,
        params: &AnisotropicDoubleWellParams,
        registry: &mut impl PropertyRegistry,
    ) -> Result<Self, ConfigurationError> {
        let variable = variable.into();
        params.validate_configuration(&variable)?;

        let gradmag_threshold =
            T::from_f64(params.gradmag_threshold).ok_or_else(|| ConfigurationError::InvalidThreshold {
                parameter: "gradmag_threshold".to_string(),
                value: params.gradmag_threshold,
            })?;

        let mobility = registry.declare_property(&params.mob_name);
        let derivatives = BulkEnergyDerivatives::gather(
            registry,
            &params.fbulk_name,
            &variable,
            &params.gradient_component_names,
        )?;

        if derivatives.num_components() == 0 {
            warn!(
                "No gradient components coupled to `{}`: the double-well kernel is always isotropic.",
                variable
            );
        }
        debug!(
            "Created double-well kernel for `{}` with {} gradient component(s) and threshold {}.",
            variable,
            derivatives.num_components(),
            params.gradmag_threshold
        );

        Ok(Self {
            variable,
            params: params.clone(),
            gradmag_threshold,
            mobility,
            derivatives,
        })
    }

    /// Checks that the materials supply what the kernel consumes.
    ///
    /// The bulk energy must be supplied by a derivative material with derivatives of at least
    /// second order, and every variable it depends on other than the kernel variable must be
    /// one of the coupled gradient components. An energy that does not depend on the kernel
    /// variable is accepted, its derivatives with respect to the kernel variable being zero.
    pub fn initial_setup<M>(&self, material: &M) -> Result<(), CouplingValidationError>
    where
        M: DerivativeMaterialInfo + ?Sized,
    {
        let fbulk = &self.params.fbulk_name;
        let fbulk_parameter = || "fbulk_name".to_string();

        if !material.has_property(fbulk) {
            return Err(CouplingValidationError::MissingProperty {
                parameter: fbulk_parameter(),
                property: fbulk.clone(),
            });
        }

        match material.derivative_order(fbulk) {
            Some(order) if order >= 2 => {}
            provided => {
                return Err(CouplingValidationError::InsufficientDerivativeOrder {
                    parameter: fbulk_parameter(),
                    property: fbulk.clone(),
                    required: 2,
                    provided,
                })
            }
        }

        let arguments = material.property_arguments(fbulk).unwrap_or(&[]);
        if !arguments.contains(&self.variable) {
            warn!(
                "Bulk energy `{}` does not depend on `{}`: its derivatives with respect to `{}` are zero.",
                fbulk, self.variable, self.variable
            );
        }
        let components = &self.params.gradient_component_names;
        if let Some(argument) = arguments
            .iter()
            .find(|arg| **arg != self.variable && !components.contains(*arg))
        {
            return Err(CouplingValidationError::UncoupledArgument {
                parameter: fbulk_parameter(),
                property: fbulk.clone(),
                argument: argument.clone(),
            });
        }

        if !material.has_property(&self.params.mob_name) {
            return Err(CouplingValidationError::MissingProperty {
                parameter: "mob_name".to_string(),
                property: self.params.mob_name.clone(),
            });
        }

        debug!("Validated material coupling of double-well kernel for `{}`.", self.variable);
        Ok(())
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn params(&self) -> &AnisotropicDoubleWellParams {
        &self.params
    }

    pub fn gradient_component_names(&self) -> &[String] {
        &self.params.gradient_component_names
    }

    pub fn num_gradient_components(&self) -> usize {
        self.derivatives.num_components()
    }

    pub fn gradmag_threshold(&self) -> T {
        self.gradmag_threshold
    }

    pub fn mobility(&self) -> PropertyId {
        self.mobility
    }

    pub fn derivatives(&self) -> &BulkEnergyDerivatives {
        &self.derivatives
    }

    /// Whether the anisotropic terms are active for the given gradient of the kernel variable.
    ///
    /// The switch is strict: a gradient magnitude equal to the threshold is isotropic.
    pub fn is_anisotropic(&self, grad_u: &Vector3<T>) -> bool {
        self.derivatives.num_components() > 0 && grad_u.norm() > self.gradmag_threshold
    }

    /// The bulk energy density $f$ at quadrature point `qp`.
    pub fn bulk_energy_density<P>(&self, properties: &P, qp: usize) -> T
    where
        P: PropertyValues<T> + ?Sized,
    {
        properties.value(self.derivatives.fbulk(), qp)
    }
}

impl<T: Real> Kernel<T> for AnisotropicDoubleWellEnergy<T> {
    fn compute_qp_residual<P>(&self, properties: &P, qp: &QuadraturePoint<T>, test: &ShapeFunction<T>) -> T
    where
        P: PropertyValues<T> + ?Sized,
    {
        let q = qp.index;
        let l = properties.value(self.mobility, q);
        let dfbulk_dvar = properties.value(self.derivatives.dfbulk_dvar(), q);

        if self.is_anisotropic(&qp.grad_u) {
            let dfbulk_dgrad = self.derivatives.assemble_first(properties, q);
            l * (dfbulk_dvar * test.value + dfbulk_dgrad.dot(&test.gradient))
        } else {
            l * dfbulk_dvar * test.value
        }
    }

    fn compute_qp_jacobian<P>(
        &self,
        properties: &P,
        qp: &QuadraturePoint<T>,
        test: &ShapeFunction<T>,
        trial: &ShapeFunction<T>,
    ) -> T
    where
        P: PropertyValues<T> + ?Sized,
    {
        let q = qp.index;
        let l = properties.value(self.mobility, q);
        let d2fbulk_dvar2 = properties.value(self.derivatives.d2fbulk_dvar2(), q);

        if self.is_anisotropic(&qp.grad_u) {
            // sum_k sum_l (grad test)_k * d2f/dp_k dp_l * (grad trial)_l
            let mut contraction = T::zero();
            for k in 0..self.derivatives.num_components() {
                let row = self.derivatives.assemble_second_row(properties, k, q);
                contraction += test.gradient[k] * row.dot(&trial.gradient);
            }
            l * (d2fbulk_dvar2 * trial.value * test.value + contraction)
        } else {
            l * d2fbulk_dvar2 * trial.value * test.value
        }
    }

    fn num_coupled_variables(&self) -> usize {
        self.derivatives.num_components()
    }

    /// Derivative with respect to the gradient component field number `coupled`.
    ///
    /// # Panics
    ///
    /// Panics if `coupled` is not smaller than the number of gradient components.
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
        let n = self.derivatives.num_components();
        assert!(coupled < n, "Coupled index {} out of bounds for {} components", coupled, n);

        let q = qp.index;
        let l = properties.value(self.mobility, q);
        let d2fbulk_dvar_darg = properties.value(self.derivatives.d2fbulk_dvar_darg()[coupled], q);

        if self.is_anisotropic(&qp.grad_u) {
            let row = self.derivatives.assemble_second_row(properties, coupled, q);
            l * (d2fbulk_dvar_darg * trial.value * test.value + row.dot(&test.gradient) * trial.value)
        } else {
            l * d2fbulk_dvar_darg * trial.value * test.value
        }
    }
}
