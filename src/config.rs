//! Parameters for the anisotropic double-well kernel.
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Maximum number of gradient components, one per spatial dimension.
pub const MAX_GRADIENT_COMPONENTS: usize = 3;

/// Parameters of [`AnisotropicDoubleWellEnergy`](crate::kernel::AnisotropicDoubleWellEnergy).
///
/// All fields have defaults, so a parameter set may be deserialized from a partial
/// description:
///
/// | field | default |
/// |---|---|
/// | `mob_name` | `"L"` |
/// | `fbulk_name` | `"fbulk"` |
/// | `gradmag_threshold` | `-1.0` (always anisotropic) |
/// | `gradient_component_names` | `[]` (always isotropic) |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnisotropicDoubleWellParams {
    /// Name of the mobility property $L$, assumed constant in the variables.
    pub mob_name: String,
    /// Name of the bulk energy property $f_{bulk}(\eta, \nabla \eta)$.
    pub fbulk_name: String,
    /// The anisotropic term is only evaluated where $|\nabla \eta|$ exceeds this threshold.
    pub gradmag_threshold: f64,
    /// Names of the coupled fields holding the components of $\nabla \eta$, in $x, y, z$ order.
    pub gradient_component_names: Vec<String>,
}

impl Default for AnisotropicDoubleWellParams {
    fn default() -> Self {
        Self {
            mob_name: "L".to_string(),
            fbulk_name: "fbulk".to_string(),
            gradmag_threshold: -1.0,
            gradient_component_names: Vec::new(),
        }
    }
}

impl AnisotropicDoubleWellParams {
    pub fn with_gradient_components<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.gradient_component_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gradmag_threshold(mut self, threshold: f64) -> Self {
        self.gradmag_threshold = threshold;
        self
    }

    pub fn with_mobility_name(mut self, name: impl Into<String>) -> Self {
        self.mob_name = name.into();
        self
    }

    pub fn with_bulk_energy_name(mut self, name: impl Into<String>) -> Self {
        self.fbulk_name = name.into();
        self
    }

    /// Checks that the parameters are valid for a kernel acting on `variable`.
    pub fn validate_configuration(&self, variable: &str) -> Result<(), ConfigurationError> {
        let components = &self.gradient_component_names;
        let parameter = || "gradient_component_names".to_string();

        if let Some(variable) = components.iter().find(|name| name.as_str() == variable) {
            return Err(ConfigurationError::SelfCoupling {
                parameter: parameter(),
                variable: variable.clone(),
            });
        }

        for (i, name) in components.iter().enumerate() {
            if components[..i].contains(name) {
                return Err(ConfigurationError::DuplicateGradientComponent {
                    parameter: parameter(),
                    component: name.clone(),
                });
            }
        }

        if components.len() > MAX_GRADIENT_COMPONENTS {
            return Err(ConfigurationError::TooManyGradientComponents {
                parameter: parameter(),
                count: components.len(),
            });
        }

        if self.gradmag_threshold.is_nan() {
            return Err(ConfigurationError::InvalidThreshold {
                parameter: "gradmag_threshold".to_string(),
                value: self.gradmag_threshold,
            });
        }

        Ok(())
    }
}
