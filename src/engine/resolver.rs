//! Fixed-capacity operator registry.
//!
//! Only registered operators can be executed; an artifact that references
//! anything else fails at tensor allocation rather than mid-invoke.

use heapless::Vec;
use log::debug;

use super::kernels::{self, KernelFn};
use super::schema::BuiltinOperator;
use crate::error::OpError;

#[derive(Clone, Copy)]
struct Registration {
    code: BuiltinOperator,
    kernel: KernelFn,
}

/// Registry of at most `CAP` builtin kernels.
pub struct OpResolver<const CAP: usize> {
    registrations: Vec<Registration, CAP>,
}

impl<const CAP: usize> OpResolver<CAP> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register `kernel` for `code`.
    pub fn add(&mut self, code: BuiltinOperator, kernel: KernelFn) -> Result<(), OpError> {
        if self.find(code).is_some() {
            return Err(OpError::AlreadyRegistered(code.0));
        }
        self.registrations
            .push(Registration { code, kernel })
            .map_err(|_| OpError::ResolverFull)?;
        debug!("registered builtin op {}", code.0);
        Ok(())
    }

    pub fn add_fully_connected(&mut self) -> Result<(), OpError> {
        self.add(BuiltinOperator::FULLY_CONNECTED, kernels::fully_connected)
    }

    pub fn add_conv_2d(&mut self) -> Result<(), OpError> {
        self.add(BuiltinOperator::CONV_2D, kernels::conv_2d)
    }

    pub fn add_max_pool_2d(&mut self) -> Result<(), OpError> {
        self.add(BuiltinOperator::MAX_POOL_2D, kernels::max_pool_2d)
    }

    /// Kernel registered for `code`, if any.
    pub fn find(&self, code: BuiltinOperator) -> Option<KernelFn> {
        self.registrations
            .iter()
            .find(|r| r.code == code)
            .map(|r| r.kernel)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl<const CAP: usize> Default for OpResolver<CAP> {
    fn default() -> Self {
        Self::new()
    }
}
