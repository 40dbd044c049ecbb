//! Derivatives of the bulk energy with respect to the directional (gradient component) fields.
use crate::config::MAX_GRADIENT_COMPONENTS;
use crate::error::ConfigurationError;
use crate::Real;
use fenris_phasefield_traits::material::{derivative_property_name, PropertyId, PropertyRegistry, PropertyValues};
use nalgebra::Vector3;
use rustc_hash::FxHashSet;
use std::iter::once;

/// A spatial vector assembled from up to three directional components.
///
/// Slots beyond the active length are zero. Requesting more components than there are
/// spatial dimensions yields the zero vector with no active components.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalVector<T> {
    components: [T; 3],
    active: usize,
}

impl<T: Real> DirectionalVector<T> {
    pub fn zeros() -> Self {
        Self {
            components: [T::zero(); 3],
            active: 0,
        }
    }

    /// Builds the vector whose `k`-th component is `f(k)` for `k < n`.
    ///
    /// `f` is not called if `n` exceeds the number of spatial dimensions.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize) -> T) -> Self {
        let mut v = Self::zeros();
        if n <= MAX_GRADIENT_COMPONENTS {
            for k in 0..n {
                v.components[k] = f(k);
            }
            v.active = n;
        }
        v
    }

    pub fn from_slice(components: &[T]) -> Self {
        Self::from_fn(components.len(), |k| components[k])
    }

    pub fn active_len(&self) -> usize {
        self.active
    }

    pub fn into_vector(self) -> Vector3<T> {
        Vector3::from(self.components)
    }
}

impl<T: Real> From<DirectionalVector<T>> for Vector3<T> {
    fn from(v: DirectionalVector<T>) -> Self {
        v.into_vector()
    }
}

/// Handles to the bulk energy $f$ and the derivatives consumed by the double-well kernel.
///
/// With $\eta$ the kernel variable and $p_0, \dots, p_{n-1}$ the directional fields,
/// the bundle holds $f$, $\partial_\eta f$, $\partial^2_\eta f$, $\partial_{p_i} f$,
/// $\partial_{p_i} \partial_{p_j} f$ and $\partial_\eta \partial_{p_i} f$.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEnergyDerivatives {
    fbulk: PropertyId,
    dfbulk_dvar: PropertyId,
    d2fbulk_dvar2: PropertyId,
    dfbulk_darg: Vec<PropertyId>,
    // Row-major n x n
    d2fbulk_darg2: Vec<PropertyId>,
    d2fbulk_dvar_darg: Vec<PropertyId>,
}

impl BulkEnergyDerivatives {
    /// Declares all derivatives of `fbulk_name` needed by the kernel acting on `variable`
    /// and coupled to the given directional fields.
    ///
    /// Fails if one of the directional fields is the kernel variable itself, or if two distinct
    /// second derivatives would be stored under the same property name. Nothing is declared
    /// on failure.
    pub fn gather<S: AsRef<str>>(
        registry: &mut impl PropertyRegistry,
        fbulk_name: &str,
        variable: &str,
        components: &[S],
    ) -> Result<Self, ConfigurationError> {
        if components.iter().any(|name| name.as_ref() == variable) {
            return Err(ConfigurationError::SelfCoupling {
                parameter: "gradient_component_names".to_string(),
                variable: variable.to_string(),
            });
        }

        // Names are concatenated without separators, so e.g. (a, db) and (ad, b) collide
        let arguments: Vec<&str> = once(variable)
            .chain(components.iter().map(|name| name.as_ref()))
            .collect();
        let mut second_derivative_names = FxHashSet::default();
        for (i, a) in arguments.iter().enumerate() {
            for b in &arguments[i..] {
                let name = derivative_property_name(fbulk_name, &[*a, *b]);
                if !second_derivative_names.insert(name.clone()) {
                    return Err(ConfigurationError::AmbiguousDerivativeName {
                        parameter: "gradient_component_names".to_string(),
                        name,
                    });
                }
            }
        }

        let n = components.len();
        let fbulk = registry.declare_property(fbulk_name);
        let dfbulk_dvar = registry.declare_property_derivative(fbulk_name, &[variable]);
        let d2fbulk_dvar2 = registry.declare_second_derivative(fbulk_name, variable, variable);

        let mut dfbulk_darg = Vec::with_capacity(n);
        let mut d2fbulk_darg2 = Vec::with_capacity(n * n);
        let mut d2fbulk_dvar_darg = Vec::with_capacity(n);
        for i_name in components {
            let i_name = i_name.as_ref();
            dfbulk_darg.push(registry.declare_property_derivative(fbulk_name, &[i_name]));
            d2fbulk_dvar_darg.push(registry.declare_second_derivative(fbulk_name, variable, i_name));
            for j_name in components {
                d2fbulk_darg2.push(registry.declare_second_derivative(fbulk_name, i_name, j_name.as_ref()));
            }
        }

        Ok(Self {
            fbulk,
            dfbulk_dvar,
            d2fbulk_dvar2,
            dfbulk_darg,
            d2fbulk_darg2,
            d2fbulk_dvar_darg,
        })
    }

    /// Number of directional fields $n$.
    pub fn num_components(&self) -> usize {
        self.dfbulk_darg.len()
    }

    pub fn fbulk(&self) -> PropertyId {
        self.fbulk
    }

    pub fn dfbulk_dvar(&self) -> PropertyId {
        self.dfbulk_dvar
    }

    pub fn d2fbulk_dvar2(&self) -> PropertyId {
        self.d2fbulk_dvar2
    }

    pub fn dfbulk_darg(&self) -> &[PropertyId] {
        &self.dfbulk_darg
    }

    pub fn d2fbulk_dvar_darg(&self) -> &[PropertyId] {
        &self.d2fbulk_dvar_darg
    }

    /// Handle to $\partial_{p_i} \partial_{p_j} f$.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is not smaller than the number of directional fields.
    pub fn d2fbulk_darg2(&self, i: usize, j: usize) -> PropertyId {
        let n = self.num_components();
        assert!(i < n && j < n, "Index ({}, {}) out of bounds for {} components", i, j, n);
        self.d2fbulk_darg2[n * i + j]
    }

    /// Assembles $\partial_{\vec p} f$ at quadrature point `qp` into a spatial vector.
    pub fn assemble_first<T, P>(&self, properties: &P, qp: usize) -> Vector3<T>
    where
        T: Real,
        P: PropertyValues<T> + ?Sized,
    {
        DirectionalVector::from_fn(self.num_components(), |k| properties.value(self.dfbulk_darg[k], qp)).into_vector()
    }

    /// Assembles row `i` of $\partial^2_{\vec p} f$ at quadrature point `qp` into a spatial vector.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not smaller than the number of directional fields.
    pub fn assemble_second_row<T, P>(&self, properties: &P, i: usize, qp: usize) -> Vector3<T>
    where
        T: Real,
        P: PropertyValues<T> + ?Sized,
    {
        let n = self.num_components();
        assert!(i < n, "Row index {} out of bounds for {} components", i, n);
        let row = &self.d2fbulk_darg2[n * i..n * (i + 1)];
        DirectionalVector::from_fn(n, |k| properties.value(row[k], qp)).into_vector()
    }
}
