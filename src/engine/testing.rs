//! Builder for small synthetic model artifacts.
//!
//! Used by unit tests, the integration suite and the fuzz seeds to produce
//! well-formed artifacts without a converter toolchain.

use flatbuffers::{FlatBufferBuilder, WIPOffset};

use super::schema::{
    ActivationFunctionType, Buffer, BufferArgs, BuiltinOperator, BuiltinOptions, Conv2DOptions,
    Conv2DOptionsArgs, FullyConnectedOptions, FullyConnectedOptionsArgs, Model, ModelArgs,
    Operator, OperatorArgs, OperatorCode, OperatorCodeArgs, Padding, Pool2DOptions,
    Pool2DOptionsArgs, QuantizationParameters, QuantizationParametersArgs, SubGraph, SubGraphArgs,
    Tensor, TensorArgs, TensorType, finish_model_buffer,
};
use crate::config::TFLITE_SCHEMA_VERSION;

#[derive(Debug, Clone)]
pub struct TensorSpec {
    pub shape: Vec<i32>,
    pub ty: TensorType,
    pub data: Option<Vec<u8>>,
    pub scale: f32,
    pub zero_point: i64,
}

impl TensorSpec {
    pub fn int8(shape: &[i32]) -> Self {
        Self {
            shape: shape.to_vec(),
            ty: TensorType::INT8,
            data: None,
            scale: 1.0,
            zero_point: 0,
        }
    }

    pub fn of_type(ty: TensorType, shape: &[i32]) -> Self {
        Self {
            ty,
            ..Self::int8(shape)
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn quantized(mut self, scale: f32, zero_point: i64) -> Self {
        self.scale = scale;
        self.zero_point = zero_point;
        self
    }
}

#[derive(Debug, Clone)]
pub enum OpSpec {
    Conv2D {
        inputs: Vec<i32>,
        output: i32,
        padding: Padding,
        stride: i32,
        activation: ActivationFunctionType,
    },
    MaxPool2D {
        input: i32,
        output: i32,
        filter: i32,
        stride: i32,
        padding: Padding,
    },
    FullyConnected {
        inputs: Vec<i32>,
        output: i32,
        activation: ActivationFunctionType,
    },
}

impl OpSpec {
    fn code(&self) -> BuiltinOperator {
        match self {
            Self::Conv2D { .. } => BuiltinOperator::CONV_2D,
            Self::MaxPool2D { .. } => BuiltinOperator::MAX_POOL_2D,
            Self::FullyConnected { .. } => BuiltinOperator::FULLY_CONNECTED,
        }
    }
}

/// Description of a single-subgraph model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    version: u32,
    tensors: Vec<TensorSpec>,
    ops: Vec<OpSpec>,
    inputs: Option<Vec<i32>>,
    outputs: Option<Vec<i32>>,
    description: Option<String>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSpec {
    pub fn new() -> Self {
        Self {
            version: TFLITE_SCHEMA_VERSION,
            tensors: Vec::new(),
            ops: Vec::new(),
            inputs: Some(Vec::new()),
            outputs: Some(Vec::new()),
            description: None,
        }
    }

    pub fn add_tensor(&mut self, tensor: TensorSpec) -> i32 {
        self.tensors.push(tensor);
        (self.tensors.len() - 1) as i32
    }

    pub fn add_op(&mut self, op: OpSpec) {
        self.ops.push(op);
    }

    pub fn set_io(&mut self, inputs: &[i32], outputs: &[i32]) {
        self.inputs = Some(inputs.to_vec());
        self.outputs = Some(outputs.to_vec());
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_owned());
        self
    }

    pub fn without_outputs(mut self) -> Self {
        self.outputs = None;
        self
    }

    pub fn output_index(mut self, index: i32) -> Self {
        self.outputs = Some(vec![index]);
        self
    }

    /// `[1, side, side, 1]` → 1×1 max-pool → same shape.
    pub fn identity(side: i32) -> Self {
        let mut m = Self::new();
        let a = m.add_tensor(TensorSpec::int8(&[1, side, side, 1]));
        let b = m.add_tensor(TensorSpec::int8(&[1, side, side, 1]));
        m.add_op(OpSpec::MaxPool2D {
            input: a,
            output: b,
            filter: 1,
            stride: 1,
            padding: Padding::VALID,
        });
        m.set_io(&[a], &[b]);
        m
    }

    /// A 96×96 int8 graph using all three perception operators whose single
    /// output is the mean of the 2×2-max-pooled, stride-2-subsampled input.
    pub fn perception() -> Self {
        let mut m = Self::new();
        let input = m.add_tensor(TensorSpec::int8(&[1, 96, 96, 1]));
        let filter = m.add_tensor(TensorSpec::int8(&[1, 1, 1, 1]).with_data(vec![1]));
        let conv_out = m.add_tensor(TensorSpec::int8(&[1, 48, 48, 1]));
        let pool_out = m.add_tensor(TensorSpec::int8(&[1, 24, 24, 1]));
        let weights = m.add_tensor(TensorSpec::int8(&[1, 576]).with_data(vec![1; 576]));
        let output = m.add_tensor(TensorSpec::int8(&[1, 1]).quantized(576.0, 0));

        m.add_op(OpSpec::Conv2D {
            inputs: vec![input, filter, -1],
            output: conv_out,
            padding: Padding::VALID,
            stride: 2,
            activation: ActivationFunctionType::NONE,
        });
        m.add_op(OpSpec::MaxPool2D {
            input: conv_out,
            output: pool_out,
            filter: 2,
            stride: 2,
            padding: Padding::VALID,
        });
        m.add_op(OpSpec::FullyConnected {
            inputs: vec![pool_out, weights, -1],
            output,
            activation: ActivationFunctionType::NONE,
        });
        m.set_io(&[input], &[output]);
        m.description("synthetic perception graph")
    }

    /// Serialize to a TFLite flatbuffer.
    pub fn build(&self) -> Vec<u8> {
        let mut fbb = FlatBufferBuilder::new();

        // Buffer 0 is the reserved empty buffer.
        let mut buffers = vec![Buffer::create(&mut fbb, &BufferArgs::default())];
        let mut tensors = Vec::with_capacity(self.tensors.len());
        for t in &self.tensors {
            let buffer = match &t.data {
                Some(bytes) => {
                    let data = fbb.create_vector(bytes.as_slice());
                    buffers.push(Buffer::create(&mut fbb, &BufferArgs { data: Some(data) }));
                    (buffers.len() - 1) as u32
                }
                None => 0,
            };
            let shape = fbb.create_vector(t.shape.as_slice());
            let scale = fbb.create_vector(&[t.scale]);
            let zero_point = fbb.create_vector(&[t.zero_point]);
            let quantization = QuantizationParameters::create(
                &mut fbb,
                &QuantizationParametersArgs {
                    scale: Some(scale),
                    zero_point: Some(zero_point),
                    ..Default::default()
                },
            );
            tensors.push(Tensor::create(
                &mut fbb,
                &TensorArgs {
                    shape: Some(shape),
                    type_: t.ty,
                    buffer,
                    name: None,
                    quantization: Some(quantization),
                },
            ));
        }

        let mut codes: Vec<BuiltinOperator> = Vec::new();
        let mut operators = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let code = op.code();
            let opcode_index = match codes.iter().position(|&c| c == code) {
                Some(i) => i,
                None => {
                    codes.push(code);
                    codes.len() - 1
                }
            } as u32;

            let (inputs, output, options_type, options) = match op {
                OpSpec::Conv2D {
                    inputs,
                    output,
                    padding,
                    stride,
                    activation,
                } => {
                    let o = Conv2DOptions::create(
                        &mut fbb,
                        &Conv2DOptionsArgs {
                            padding: *padding,
                            stride_w: *stride,
                            stride_h: *stride,
                            fused_activation_function: *activation,
                        },
                    );
                    (
                        inputs.clone(),
                        *output,
                        BuiltinOptions::CONV_2D_OPTIONS,
                        o.as_union_value(),
                    )
                }
                OpSpec::MaxPool2D {
                    input,
                    output,
                    filter,
                    stride,
                    padding,
                } => {
                    let o = Pool2DOptions::create(
                        &mut fbb,
                        &Pool2DOptionsArgs {
                            padding: *padding,
                            stride_w: *stride,
                            stride_h: *stride,
                            filter_width: *filter,
                            filter_height: *filter,
                            fused_activation_function: ActivationFunctionType::NONE,
                        },
                    );
                    (
                        vec![*input],
                        *output,
                        BuiltinOptions::POOL_2D_OPTIONS,
                        o.as_union_value(),
                    )
                }
                OpSpec::FullyConnected {
                    inputs,
                    output,
                    activation,
                } => {
                    let o = FullyConnectedOptions::create(
                        &mut fbb,
                        &FullyConnectedOptionsArgs {
                            fused_activation_function: *activation,
                        },
                    );
                    (
                        inputs.clone(),
                        *output,
                        BuiltinOptions::FULLY_CONNECTED_OPTIONS,
                        o.as_union_value(),
                    )
                }
            };

            let inputs = fbb.create_vector(inputs.as_slice());
            let outputs = fbb.create_vector(&[output]);
            operators.push(Operator::create(
                &mut fbb,
                &OperatorArgs {
                    opcode_index,
                    inputs: Some(inputs),
                    outputs: Some(outputs),
                    builtin_options_type: options_type,
                    builtin_options: Some(options),
                },
            ));
        }

        let op_codes: Vec<WIPOffset<OperatorCode<'_>>> = codes
            .iter()
            .map(|&code| {
                OperatorCode::create(
                    &mut fbb,
                    &OperatorCodeArgs {
                        deprecated_builtin_code: code.0 as i8,
                        builtin_code: code,
                        ..Default::default()
                    },
                )
            })
            .collect();

        let tensors = fbb.create_vector(tensors.as_slice());
        let operators = fbb.create_vector(operators.as_slice());
        let inputs = self.inputs.as_ref().map(|v| fbb.create_vector(v.as_slice()));
        let outputs = self.outputs.as_ref().map(|v| fbb.create_vector(v.as_slice()));
        let subgraph = SubGraph::create(
            &mut fbb,
            &SubGraphArgs {
                tensors: Some(tensors),
                inputs,
                outputs,
                operators: Some(operators),
                name: None,
            },
        );

        let subgraphs = fbb.create_vector(&[subgraph]);
        let op_codes = fbb.create_vector(op_codes.as_slice());
        let buffers = fbb.create_vector(buffers.as_slice());
        let description = self.description.as_deref().map(|d| fbb.create_string(d));
        let root = Model::create(
            &mut fbb,
            &ModelArgs {
                version: self.version,
                operator_codes: Some(op_codes),
                subgraphs: Some(subgraphs),
                description,
                buffers: Some(buffers),
            },
        );
        finish_model_buffer(&mut fbb, root);
        fbb.finished_data().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::ModelArtifact;

    #[test]
    fn perception_graph_parses() {
        let bytes = ModelSpec::perception().build();
        let model = ModelArtifact::parse(&bytes).unwrap();
        assert_eq!(model.tensor_count(), 6);
        assert_eq!(model.operator_count(), 3);
        let weights = model.tensor(4).unwrap();
        assert_eq!(model.constant_data(&weights).map(<[u8]>::len), Some(576));
        assert!(model.constant_data(&model.tensor(0).unwrap()).is_none());
    }

    #[test]
    fn identity_has_file_identifier() {
        let bytes = ModelSpec::identity(2).build();
        assert_eq!(&bytes[4..8], b"TFL3");
    }
}
