//! Static-graph interpreter over a verified model.
//!
//! Lifecycle:
//!
//! ```text
//!   new ──allocate_tensors──▶ allocated ──(fill input, invoke, read output)*
//! ```
//!
//! `allocate_tensors` resolves every operator to a kernel and plans the
//! arena; after that, `invoke` never allocates and never fails for a reason
//! it could have detected up front, except for a malformed operand that
//! only the kernel can judge.

use heapless::Vec;
use log::{debug, info};

use super::arena::{self, ArenaPlan, TensorArena};
use super::kernels::{KernelFn, OpContext};
use super::model::ModelArtifact;
use super::resolver::OpResolver;
use super::schema::TensorType;
use crate::app::ports::InferencePort;
use crate::error::{AllocationError, InvokeError};

/// Upper bound on operators in one graph.
pub const MAX_OPERATORS: usize = 32;

pub struct Interpreter<'m, const N: usize, const OPS: usize> {
    model: ModelArtifact<'m>,
    resolver: OpResolver<OPS>,
    arena: TensorArena<N>,
    plan: Option<ArenaPlan>,
    kernels: Vec<KernelFn, MAX_OPERATORS>,
}

impl<'m, const N: usize, const OPS: usize> Interpreter<'m, N, OPS> {
    pub fn new(model: ModelArtifact<'m>, resolver: OpResolver<OPS>, arena: TensorArena<N>) -> Self {
        Self {
            model,
            resolver,
            arena,
            plan: None,
            kernels: Vec::new(),
        }
    }

    /// Bind kernels and plan all activation memory inside the arena.
    pub fn allocate_tensors(&mut self) -> Result<(), AllocationError> {
        let op_count = self.model.operator_count();
        if op_count > MAX_OPERATORS {
            return Err(AllocationError::TooManyTensors(op_count));
        }

        let mut kernels = Vec::new();
        for op in self.model.operators() {
            let code = self.model.op_code(&op);
            let kernel = self
                .resolver
                .find(code)
                .ok_or(AllocationError::OpNotRegistered(code.0))?;
            kernels
                .push(kernel)
                .map_err(|_| AllocationError::TooManyTensors(op_count))?;
        }

        for io in [self.model.input_index(), self.model.output_index()] {
            let ty = self
                .model
                .tensor(io)
                .map_or(TensorType::default(), |t| t.type_());
            if ty != TensorType::INT8 {
                return Err(AllocationError::UnsupportedType(ty.0));
            }
        }

        let plan = arena::plan(&self.model, self.arena.capacity())?;
        info!(
            "tensors allocated: {} of {} arena bytes, {} ops",
            plan.used(),
            self.arena.capacity(),
            op_count
        );
        self.kernels = kernels;
        self.plan = Some(plan);
        Ok(())
    }

    pub fn is_allocated(&self) -> bool {
        self.plan.is_some()
    }

    /// Bytes of the arena the plan actually uses.
    pub fn arena_used(&self) -> Option<usize> {
        self.plan.as_ref().map(ArenaPlan::used)
    }

    pub fn arena_size(&self) -> usize {
        self.arena.capacity()
    }

    pub fn model(&self) -> &ModelArtifact<'m> {
        &self.model
    }

    /// Graph input storage as signed values.
    pub fn input_mut(&mut self) -> Option<&mut [i8]> {
        let range = self.plan.as_ref()?.range(self.model.input_index())?;
        Some(as_i8_mut(&mut self.arena.bytes_mut()[range]))
    }

    /// Graph output storage as signed values.
    pub fn output(&self) -> Option<&[i8]> {
        let range = self.plan.as_ref()?.range(self.model.output_index())?;
        Some(as_i8(&self.arena.bytes()[range]))
    }

    /// Run every operator in order.
    pub fn invoke(&mut self) -> Result<(), InvokeError> {
        let plan = self.plan.as_ref().ok_or(InvokeError::NotAllocated)?;
        for (index, (op, kernel)) in self.model.operators().zip(self.kernels.iter()).enumerate() {
            let mut ctx = OpContext::new(index, op, &self.model, self.arena.bytes_mut(), plan);
            kernel(&mut ctx)?;
        }
        debug!("invoke complete ({} ops)", self.kernels.len());
        Ok(())
    }
}

impl<const N: usize, const OPS: usize> InferencePort for Interpreter<'_, N, OPS> {
    fn input_mut(&mut self) -> Option<&mut [i8]> {
        Interpreter::input_mut(self)
    }

    fn invoke(&mut self) -> Result<(), InvokeError> {
        Interpreter::invoke(self)
    }

    fn output(&self) -> Option<&[i8]> {
        Interpreter::output(self)
    }
}

fn as_i8(bytes: &[u8]) -> &[i8] {
    // SAFETY: u8 and i8 have identical size and alignment and every bit
    // pattern is valid for both.
    unsafe { core::slice::from_raw_parts(bytes.as_ptr().cast::<i8>(), bytes.len()) }
}

fn as_i8_mut(bytes: &mut [u8]) -> &mut [i8] {
    // SAFETY: as for `as_i8`; the exclusive borrow is carried over.
    unsafe { core::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<i8>(), bytes.len()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::{ActivationFunctionType, Padding, TensorType};
    use crate::engine::testing::{ModelSpec, OpSpec, TensorSpec};

    fn interpreter(bytes: &[u8]) -> Interpreter<'_, 4096, 3> {
        let model = ModelArtifact::parse(bytes).unwrap();
        let mut resolver = OpResolver::new();
        resolver.add_max_pool_2d().unwrap();
        resolver.add_conv_2d().unwrap();
        resolver.add_fully_connected().unwrap();
        Interpreter::new(model, resolver, TensorArena::new())
    }

    #[test]
    fn invoke_before_allocate_fails() {
        let bytes = ModelSpec::identity(2).build();
        let mut i = interpreter(&bytes);
        assert!(i.input_mut().is_none());
        assert_eq!(i.invoke(), Err(InvokeError::NotAllocated));
    }

    #[test]
    fn identity_pool_copies_input() {
        let bytes = ModelSpec::identity(2).build();
        let mut i = interpreter(&bytes);
        i.allocate_tensors().unwrap();
        i.input_mut().unwrap().copy_from_slice(&[-3, 7, 0, 127]);
        i.invoke().unwrap();
        assert_eq!(i.output().unwrap(), &[-3, 7, 0, 127]);
    }

    #[test]
    fn unregistered_op_fails_allocation() {
        let bytes = ModelSpec::identity(2).build();
        let model = ModelArtifact::parse(&bytes).unwrap();
        let mut i: Interpreter<'_, 4096, 3> =
            Interpreter::new(model, OpResolver::new(), TensorArena::new());
        assert_eq!(
            i.allocate_tensors(),
            Err(AllocationError::OpNotRegistered(17))
        );
        assert!(!i.is_allocated());
    }

    #[test]
    fn perception_graph_follows_mean_brightness() {
        let bytes = ModelSpec::perception().build();
        let model = ModelArtifact::parse(&bytes).unwrap();
        let mut resolver = OpResolver::<3>::new();
        resolver.add_fully_connected().unwrap();
        resolver.add_conv_2d().unwrap();
        resolver.add_max_pool_2d().unwrap();
        let mut i: Interpreter<'_, { 16 * 1024 }, 3> =
            Interpreter::new(model, resolver, TensorArena::new());
        i.allocate_tensors().unwrap();

        i.input_mut().unwrap().fill(100);
        i.invoke().unwrap();
        assert_eq!(i.output().unwrap(), &[100]);

        i.input_mut().unwrap().fill(-128);
        i.invoke().unwrap();
        assert_eq!(i.output().unwrap(), &[-128]);
    }

    #[test]
    fn saturated_bias_clamps_instead_of_overflowing() {
        let mut m = ModelSpec::new();
        let input = m.add_tensor(TensorSpec::int8(&[1, 1]));
        let weights = m.add_tensor(TensorSpec::int8(&[1, 1]).with_data(vec![1]));
        let bias = m.add_tensor(
            TensorSpec::of_type(TensorType::INT32, &[1]).with_data(i32::MAX.to_le_bytes().to_vec()),
        );
        let output = m.add_tensor(TensorSpec::int8(&[1, 1]));
        m.add_op(OpSpec::FullyConnected {
            inputs: vec![input, weights, bias],
            output,
            activation: ActivationFunctionType::NONE,
        });
        m.set_io(&[input], &[output]);
        let bytes = m.build();

        let mut i = interpreter(&bytes);
        i.allocate_tensors().unwrap();
        i.input_mut().unwrap().copy_from_slice(&[1]);
        i.invoke().unwrap();
        assert_eq!(i.output().unwrap(), &[127]);
    }

    #[test]
    fn filter_dims_overflowing_usize_are_rejected() {
        let mut m = ModelSpec::new();
        let input = m.add_tensor(TensorSpec::int8(&[1, 1, 1, 8]));
        let filter =
            m.add_tensor(TensorSpec::int8(&[1, i32::MAX, i32::MAX, 8]).with_data(vec![1; 8]));
        let output = m.add_tensor(TensorSpec::int8(&[1, 1, 1, 1]));
        m.add_op(OpSpec::Conv2D {
            inputs: vec![input, filter, -1],
            output,
            padding: Padding::VALID,
            stride: 1,
            activation: ActivationFunctionType::NONE,
        });
        m.set_io(&[input], &[output]);
        let bytes = m.build();

        let mut i = interpreter(&bytes);
        i.allocate_tensors().unwrap();
        assert_eq!(i.invoke(), Err(InvokeError::ShapeMismatch { op: 0 }));
    }
}
