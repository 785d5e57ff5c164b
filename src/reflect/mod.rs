// Signature reflection over hook classes
//
// The host's own reflection is not reachable from Rust, so signatures come
// from a class catalog: a JSON dump of each hook class and its ancestors.
// Everything downstream (synthesizer, rewriter) only sees the abstract
// MethodSignature model, so another reflection source can be plugged in by
// implementing Reflector.

mod catalog;
mod signature;

pub use catalog::{
    ClassCatalog, ClassDescriptor, MethodDescriptor, ParameterDescriptor, Visibility,
    PROXY_DENYLIST,
};
pub use signature::{
    single_quoted, DefaultLiteral, MethodSignature, ParameterSpec, TypeHint,
    SUPPRESSED_TYPE_HINTS,
};

use crate::error::ReflectionError;

/// Source of public method signatures for a class
pub trait Reflector {
    /// Public, non-static, non-lifecycle methods of `class`, inherited ones included
    fn reflect(&self, class: &str) -> Result<Vec<MethodSignature>, ReflectionError>;
}

impl<R: Reflector + ?Sized> Reflector for &R {
    fn reflect(&self, class: &str) -> Result<Vec<MethodSignature>, ReflectionError> {
        (**self).reflect(class)
    }
}
