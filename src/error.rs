//! Errors raised while setting up kernels.
//!
//! Both error types are fatal: they describe static configuration mistakes, detected once
//! before any assembly takes place. Evaluation itself never fails.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// A kernel was constructed with invalid parameters.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The kernel variable was listed among the coupled gradient components.
    SelfCoupling { parameter: String, variable: String },
    /// The same gradient component was listed more than once.
    DuplicateGradientComponent { parameter: String, component: String },
    /// More gradient components were given than there are spatial dimensions.
    TooManyGradientComponents { parameter: String, count: usize },
    /// The gradient magnitude threshold is not a number.
    InvalidThreshold { parameter: String, value: f64 },
    /// Two distinct derivatives of the bulk energy map to the same property name.
    AmbiguousDerivativeName { parameter: String, name: String },
}

impl ConfigurationError {
    /// The name of the offending configuration parameter.
    pub fn parameter(&self) -> &str {
        match self {
            Self::SelfCoupling { parameter, .. }
            | Self::DuplicateGradientComponent { parameter, .. }
            | Self::TooManyGradientComponents { parameter, .. }
            | Self::InvalidThreshold { parameter, .. }
            | Self::AmbiguousDerivativeName { parameter, .. } => parameter,
        }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfCoupling { parameter, variable } => {
                write!(
                    f,
                    "Invalid parameter `{}`: the kernel variable `{}` must not be specified as a gradient component \
                     (directional fields must be independent of the kernel variable).",
                    parameter, variable
                )
            }
            Self::DuplicateGradientComponent { parameter, component } => {
                write!(
                    f,
                    "Invalid parameter `{}`: gradient component `{}` is specified more than once.",
                    parameter, component
                )
            }
            Self::TooManyGradientComponents { parameter, count } => {
                write!(
                    f,
                    "Invalid parameter `{}`: at most 3 gradient components are supported, but {} were given.",
                    parameter, count
                )
            }
            Self::InvalidThreshold { parameter, value } => {
                write!(f, "Invalid parameter `{}`: threshold must be a number, got {}.", parameter, value)
            }
            Self::AmbiguousDerivativeName { parameter, name } => {
                write!(
                    f,
                    "Invalid parameter `{}`: distinct derivatives would share the property name `{}`.",
                    parameter, name
                )
            }
        }
    }
}

impl Error for ConfigurationError {}

/// The material consumed by a kernel is not coupled consistently with the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CouplingValidationError {
    /// No material supplies the property.
    MissingProperty { parameter: String, property: String },
    /// The material does not provide derivatives of sufficiently high order.
    InsufficientDerivativeOrder {
        parameter: String,
        property: String,
        required: usize,
        provided: Option<usize>,
    },
    /// The property depends on a variable that the kernel does not couple to.
    UncoupledArgument {
        parameter: String,
        property: String,
        argument: String,
    },
}

impl CouplingValidationError {
    /// The name of the configuration parameter that refers to the offending property.
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingProperty { parameter, .. }
            | Self::InsufficientDerivativeOrder { parameter, .. }
            | Self::UncoupledArgument { parameter, .. } => parameter,
        }
    }
}

impl Display for CouplingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProperty { parameter, property } => {
                write!(
                    f,
                    "Invalid parameter `{}`: no material supplies the property `{}`.",
                    parameter, property
                )
            }
            Self::InsufficientDerivativeOrder {
                parameter,
                property,
                required,
                provided,
            } => match provided {
                Some(provided) => write!(
                    f,
                    "Invalid parameter `{}`: property `{}` provides derivatives up to order {}, but order {} is required.",
                    parameter, property, provided, required
                ),
                None => write!(
                    f,
                    "Invalid parameter `{}`: property `{}` is not supplied by a derivative material, \
                     but derivatives of order {} are required.",
                    parameter, property, required
                ),
            },
            Self::UncoupledArgument {
                parameter,
                property,
                argument,
            } => {
                write!(
                    f,
                    "Invalid parameter `{}`: property `{}` depends on `{}`, which is not coupled to the kernel.",
                    parameter, property, argument
                )
            }
        }
    }
}

impl Error for CouplingValidationError {}
