//! Parsed, validated view over a model artifact.
//!
//! The artifact bytes are borrowed for the whole program lifetime (they are
//! linked into flash), so every accessor hands out `'m` references into
//! them and nothing is copied.  All indices the interpreter dereferences
//! later are range-checked here once.

use flatbuffers::{ForwardsUOffset, Vector};
use log::debug;

use super::schema::{self, BuiltinOperator, Model, Operator, SubGraph, Tensor};
use crate::config::TFLITE_SCHEMA_VERSION;
use crate::error::ModelError;

/// A model whose structure has been verified.
#[derive(Clone, Copy)]
pub struct ModelArtifact<'m> {
    model: Model<'m>,
    tensors: Option<Vector<'m, ForwardsUOffset<Tensor<'m>>>>,
    operators: Option<Vector<'m, ForwardsUOffset<Operator<'m>>>>,
    input: usize,
    output: usize,
}

impl<'m> ModelArtifact<'m> {
    /// Verify `bytes` and index the single subgraph.
    pub fn parse(bytes: &'m [u8]) -> Result<Self, ModelError> {
        let model = schema::root_as_model(bytes).map_err(|e| {
            debug!("model verification failed: {}", e);
            ModelError::Malformed
        })?;

        let subgraphs = model.subgraphs().ok_or(ModelError::UnsupportedSubgraphCount(0))?;
        if subgraphs.len() != 1 {
            return Err(ModelError::UnsupportedSubgraphCount(subgraphs.len()));
        }
        let graph: SubGraph<'m> = subgraphs.get(0);
        let tensors = graph.tensors();
        let tensor_count = tensors.map_or(0, |t| t.len());

        let input = first_index(graph.inputs(), tensor_count)?;
        let output = first_index(graph.outputs(), tensor_count)?;

        let code_count = model.operator_codes().map_or(0, |c| c.len());
        let buffer_count = model.buffers().map_or(0, |b| b.len());

        if let Some(tensors) = tensors {
            for t in tensors.iter() {
                if t.buffer() as usize >= buffer_count.max(1) {
                    return Err(ModelError::Malformed);
                }
            }
        }

        let operators = graph.operators();
        if let Some(ops) = operators {
            for op in ops.iter() {
                if op.opcode_index() as usize >= code_count {
                    return Err(ModelError::Malformed);
                }
                for list in [op.inputs(), op.outputs()].into_iter().flatten() {
                    for idx in list.iter() {
                        // -1 marks an omitted optional operand.
                        if idx != -1 && (idx < 0 || idx as usize >= tensor_count) {
                            return Err(ModelError::TensorIndexOutOfRange(idx));
                        }
                    }
                }
            }
        }

        Ok(Self {
            model,
            tensors,
            operators,
            input,
            output,
        })
    }

    /// Schema version recorded in the artifact.
    pub fn version(&self) -> u32 {
        self.model.version()
    }

    /// Compare the artifact's schema version against the engine's.
    pub fn check_schema_version(&self) -> Result<(), ModelError> {
        let found = self.version();
        if found == TFLITE_SCHEMA_VERSION {
            Ok(())
        } else {
            Err(ModelError::SchemaVersionMismatch {
                found,
                supported: TFLITE_SCHEMA_VERSION,
            })
        }
    }

    pub fn tensor_count(&self) -> usize {
        self.tensors.map_or(0, |t| t.len())
    }

    /// Tensor at `index`.  `index` must come from this artifact (graph I/O
    /// or an operator operand), which `parse` already range-checked.
    pub fn tensor(&self, index: usize) -> Option<Tensor<'m>> {
        let tensors = self.tensors?;
        (index < tensors.len()).then(|| tensors.get(index))
    }

    pub fn operator_count(&self) -> usize {
        self.operators.map_or(0, |o| o.len())
    }

    /// Operators in execution order.
    pub fn operators(&self) -> impl Iterator<Item = Operator<'m>> + use<'m> {
        self.operators.into_iter().flat_map(|ops| ops.iter())
    }

    /// Builtin code an operator refers to.
    pub fn op_code(&self, op: &Operator<'m>) -> BuiltinOperator {
        self.model
            .operator_codes()
            .map_or(BuiltinOperator::default(), |codes| {
                codes.get(op.opcode_index() as usize).resolved_code()
            })
    }

    /// Constant payload of a tensor, `None` for activations.
    ///
    /// Buffer 0 is the schema's reserved empty buffer; a tensor pointing at
    /// it, or at any buffer without data, lives in the arena.
    pub fn constant_data(&self, tensor: &Tensor<'m>) -> Option<&'m [u8]> {
        let index = tensor.buffer() as usize;
        if index == 0 {
            return None;
        }
        let buffers = self.model.buffers()?;
        let data = buffers.get(index).data()?;
        (!data.is_empty()).then(|| data.bytes())
    }

    /// Index of the graph's (first) input tensor.
    pub fn input_index(&self) -> usize {
        self.input
    }

    /// Index of the graph's (first) output tensor.
    pub fn output_index(&self) -> usize {
        self.output
    }
}

fn first_index(list: Option<Vector<'_, i32>>, tensor_count: usize) -> Result<usize, ModelError> {
    let list = list.ok_or(ModelError::MissingIo)?;
    if list.is_empty() {
        return Err(ModelError::MissingIo);
    }
    let idx = list.get(0);
    if idx < 0 || idx as usize >= tensor_count {
        return Err(ModelError::TensorIndexOutOfRange(idx));
    }
    Ok(idx as usize)
}
