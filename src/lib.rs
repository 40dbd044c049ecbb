//! Phase-field kernels for finite element assembly.
//!
//! The central piece is [`kernel::AnisotropicDoubleWellEnergy`], the weak-form contribution of
//! a generalized double-well bulk energy $f(\eta, \nabla \eta)$ to an Allen-Cahn equation,
//! evaluated one quadrature point at a time. Material properties are consumed through the
//! contracts in [`fenris_phasefield_traits::material`], for which [`material`] provides
//! reference implementations, and [`assembly`] provides element-level assembly routines.
pub mod assembly;
pub mod config;
pub mod error;
pub mod kernel;
pub mod material;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;

pub use fenris_phasefield_traits::material::{
    derivative_property_name, DerivativeMaterialInfo, PropertyId, PropertyRegistry, PropertyValues,
};
pub use fenris_phasefield_traits::Real;
