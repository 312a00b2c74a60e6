//! Core types for TechMart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod attributes;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use attributes::{AttributeError, ProductSpecs, SpecField, SpecTemplate, VariantAttributes};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_vnd, to_minor_units};
pub use status::*;
