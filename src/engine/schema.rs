//! Reader and writer for the subset of the TFLite flatbuffer schema the
//! engine consumes.
//!
//! Field slots follow `schema.fbs` (schema version 3) exactly, so real
//! converter output is readable.  Only the tables and fields listed here
//! are verified; anything else in the artifact is skipped by the
//! verifier's vtable walk.
//!
//! The accessor layout mirrors `flatc --rust` output: one `Table` wrapper
//! per schema table, `VT_*` slot constants, an `*Args` struct plus
//! `create` for building.  Enums are transparent newtypes over their
//! schema representation.

#![allow(clippy::needless_lifetimes)]

use flatbuffers::{
    FlatBufferBuilder, Follow, ForwardsUOffset, InvalidFlatbuffer, Table, VOffsetT, Vector,
    Verifiable, Verifier, WIPOffset,
};

/// File identifier written by the TFLite converter.
pub const MODEL_IDENTIFIER: &str = "TFL3";

// ───────────────────────────────────────────────────────────────
// Enums
// ───────────────────────────────────────────────────────────────

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TensorType(pub i8);

impl TensorType {
    pub const FLOAT32: Self = Self(0);
    pub const FLOAT16: Self = Self(1);
    pub const INT32: Self = Self(2);
    pub const UINT8: Self = Self(3);
    pub const INT64: Self = Self(4);
    pub const BOOL: Self = Self(6);
    pub const INT16: Self = Self(7);
    pub const INT8: Self = Self(9);

    /// Bytes per element, `None` for types the engine cannot size.
    pub fn element_size(self) -> Option<usize> {
        match self {
            Self::FLOAT32 | Self::INT32 => Some(4),
            Self::FLOAT16 | Self::INT16 => Some(2),
            Self::UINT8 | Self::BOOL | Self::INT8 => Some(1),
            Self::INT64 => Some(8),
            _ => None,
        }
    }
}

/// Builtin operator codes used by the perception model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BuiltinOperator(pub i32);

impl BuiltinOperator {
    pub const AVERAGE_POOL_2D: Self = Self(1);
    pub const CONV_2D: Self = Self(3);
    pub const DEPTHWISE_CONV_2D: Self = Self(4);
    pub const FULLY_CONNECTED: Self = Self(9);
    pub const MAX_POOL_2D: Self = Self(17);
    pub const RESHAPE: Self = Self(22);
    pub const SOFTMAX: Self = Self(25);
}

/// Discriminant of the `builtin_options` union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BuiltinOptions(pub u8);

impl BuiltinOptions {
    pub const NONE: Self = Self(0);
    pub const CONV_2D_OPTIONS: Self = Self(1);
    pub const POOL_2D_OPTIONS: Self = Self(5);
    pub const FULLY_CONNECTED_OPTIONS: Self = Self(8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Padding(pub i8);

impl Padding {
    pub const SAME: Self = Self(0);
    pub const VALID: Self = Self(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActivationFunctionType(pub i8);

impl ActivationFunctionType {
    pub const NONE: Self = Self(0);
    pub const RELU: Self = Self(1);
    pub const RELU_N1_TO_1: Self = Self(2);
    pub const RELU6: Self = Self(3);
}

// ───────────────────────────────────────────────────────────────
// Slot helpers
// ───────────────────────────────────────────────────────────────

#[inline]
fn scalar<'a, T>(tab: &Table<'a>, slot: VOffsetT, default: T) -> T
where
    T: Follow<'a, Inner = T> + Copy + 'a,
{
    // SAFETY: tables are only reached through `root_as_model`, whose
    // verifier checked bounds and alignment of every slot read here.
    unsafe { tab.get::<T>(slot, Some(default)) }.unwrap_or(default)
}

#[inline]
fn vector<'a, T: Follow<'a> + 'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<Vector<'a, T>> {
    // SAFETY: as for `scalar`.
    unsafe { tab.get::<ForwardsUOffset<Vector<'a, T>>>(slot, None) }
}

#[inline]
fn string<'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<&'a str> {
    // SAFETY: as for `scalar`.
    unsafe { tab.get::<ForwardsUOffset<&'a str>>(slot, None) }
}

#[inline]
fn table<'a>(tab: &Table<'a>, slot: VOffsetT) -> Option<Table<'a>> {
    // SAFETY: as for `scalar`.
    unsafe { tab.get::<ForwardsUOffset<Table<'a>>>(slot, None) }
}

macro_rules! fb_table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone)]
        pub struct $name<'a> {
            pub _tab: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            type Inner = $name<'a>;

            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    _tab: unsafe { Table::new(buf, loc) },
                }
            }
        }
    };
}

// ───────────────────────────────────────────────────────────────
// Model
// ───────────────────────────────────────────────────────────────

fb_table!(
    /// Root table of a model artifact.
    Model
);

impl<'a> Model<'a> {
    pub const VT_VERSION: VOffsetT = 4;
    pub const VT_OPERATOR_CODES: VOffsetT = 6;
    pub const VT_SUBGRAPHS: VOffsetT = 8;
    pub const VT_DESCRIPTION: VOffsetT = 10;
    pub const VT_BUFFERS: VOffsetT = 12;

    pub fn version(&self) -> u32 {
        scalar(&self._tab, Self::VT_VERSION, 0)
    }

    pub fn operator_codes(&self) -> Option<Vector<'a, ForwardsUOffset<OperatorCode<'a>>>> {
        vector(&self._tab, Self::VT_OPERATOR_CODES)
    }

    pub fn subgraphs(&self) -> Option<Vector<'a, ForwardsUOffset<SubGraph<'a>>>> {
        vector(&self._tab, Self::VT_SUBGRAPHS)
    }

    pub fn description(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_DESCRIPTION)
    }

    pub fn buffers(&self) -> Option<Vector<'a, ForwardsUOffset<Buffer<'a>>>> {
        vector(&self._tab, Self::VT_BUFFERS)
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args ModelArgs<'args>,
    ) -> WIPOffset<Model<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.buffers {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_BUFFERS, x);
        }
        if let Some(x) = args.description {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_DESCRIPTION, x);
        }
        if let Some(x) = args.subgraphs {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_SUBGRAPHS, x);
        }
        if let Some(x) = args.operator_codes {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_OPERATOR_CODES, x);
        }
        fbb.push_slot::<u32>(Self::VT_VERSION, args.version, 0);
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Model<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("version", Self::VT_VERSION, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<OperatorCode<'_>>>>>(
                "operator_codes",
                Self::VT_OPERATOR_CODES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<SubGraph<'_>>>>>(
                "subgraphs",
                Self::VT_SUBGRAPHS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("description", Self::VT_DESCRIPTION, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Buffer<'_>>>>>(
                "buffers",
                Self::VT_BUFFERS,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct ModelArgs<'a> {
    pub version: u32,
    pub operator_codes: Option<WIPOffset<Vector<'a, ForwardsUOffset<OperatorCode<'a>>>>>,
    pub subgraphs: Option<WIPOffset<Vector<'a, ForwardsUOffset<SubGraph<'a>>>>>,
    pub description: Option<WIPOffset<&'a str>>,
    pub buffers: Option<WIPOffset<Vector<'a, ForwardsUOffset<Buffer<'a>>>>>,
}

/// Verify `buf` and return its root [`Model`].
pub fn root_as_model(buf: &[u8]) -> Result<Model<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<Model>(buf)
}

/// Finish a model buffer with the TFLite file identifier.
pub fn finish_model_buffer<'a>(fbb: &mut FlatBufferBuilder<'a>, root: WIPOffset<Model<'a>>) {
    fbb.finish(root, Some(MODEL_IDENTIFIER));
}

// ───────────────────────────────────────────────────────────────
// OperatorCode
// ───────────────────────────────────────────────────────────────

fb_table!(OperatorCode);

impl<'a> OperatorCode<'a> {
    pub const VT_DEPRECATED_BUILTIN_CODE: VOffsetT = 4;
    pub const VT_CUSTOM_CODE: VOffsetT = 6;
    pub const VT_VERSION: VOffsetT = 8;
    pub const VT_BUILTIN_CODE: VOffsetT = 10;

    pub fn deprecated_builtin_code(&self) -> i8 {
        scalar(&self._tab, Self::VT_DEPRECATED_BUILTIN_CODE, 0)
    }

    pub fn custom_code(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_CUSTOM_CODE)
    }

    pub fn version(&self) -> i32 {
        scalar(&self._tab, Self::VT_VERSION, 1)
    }

    pub fn builtin_code(&self) -> BuiltinOperator {
        BuiltinOperator(scalar(&self._tab, Self::VT_BUILTIN_CODE, 0))
    }

    /// Effective builtin code.  Older converters only fill the deprecated
    /// byte field, newer ones fill both; the larger value wins.
    pub fn resolved_code(&self) -> BuiltinOperator {
        let deprecated = i32::from(self.deprecated_builtin_code());
        BuiltinOperator(deprecated.max(self.builtin_code().0))
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args OperatorCodeArgs<'args>,
    ) -> WIPOffset<OperatorCode<'bldr>> {
        let start = fbb.start_table();
        fbb.push_slot::<i32>(Self::VT_BUILTIN_CODE, args.builtin_code.0, 0);
        fbb.push_slot::<i32>(Self::VT_VERSION, args.version, 1);
        if let Some(x) = args.custom_code {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_CUSTOM_CODE, x);
        }
        fbb.push_slot::<i8>(
            Self::VT_DEPRECATED_BUILTIN_CODE,
            args.deprecated_builtin_code,
            0,
        );
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for OperatorCode<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>(
                "deprecated_builtin_code",
                Self::VT_DEPRECATED_BUILTIN_CODE,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("custom_code", Self::VT_CUSTOM_CODE, false)?
            .visit_field::<i32>("version", Self::VT_VERSION, false)?
            .visit_field::<i32>("builtin_code", Self::VT_BUILTIN_CODE, false)?
            .finish();
        Ok(())
    }
}

pub struct OperatorCodeArgs<'a> {
    pub deprecated_builtin_code: i8,
    pub custom_code: Option<WIPOffset<&'a str>>,
    pub version: i32,
    pub builtin_code: BuiltinOperator,
}

impl Default for OperatorCodeArgs<'_> {
    fn default() -> Self {
        Self {
            deprecated_builtin_code: 0,
            custom_code: None,
            version: 1,
            builtin_code: BuiltinOperator::default(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// SubGraph
// ───────────────────────────────────────────────────────────────

fb_table!(SubGraph);

impl<'a> SubGraph<'a> {
    pub const VT_TENSORS: VOffsetT = 4;
    pub const VT_INPUTS: VOffsetT = 6;
    pub const VT_OUTPUTS: VOffsetT = 8;
    pub const VT_OPERATORS: VOffsetT = 10;
    pub const VT_NAME: VOffsetT = 12;

    pub fn tensors(&self) -> Option<Vector<'a, ForwardsUOffset<Tensor<'a>>>> {
        vector(&self._tab, Self::VT_TENSORS)
    }

    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        vector(&self._tab, Self::VT_INPUTS)
    }

    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        vector(&self._tab, Self::VT_OUTPUTS)
    }

    pub fn operators(&self) -> Option<Vector<'a, ForwardsUOffset<Operator<'a>>>> {
        vector(&self._tab, Self::VT_OPERATORS)
    }

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args SubGraphArgs<'args>,
    ) -> WIPOffset<SubGraph<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, x);
        }
        if let Some(x) = args.operators {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_OPERATORS, x);
        }
        if let Some(x) = args.outputs {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_OUTPUTS, x);
        }
        if let Some(x) = args.inputs {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_INPUTS, x);
        }
        if let Some(x) = args.tensors {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_TENSORS, x);
        }
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for SubGraph<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Tensor<'_>>>>>(
                "tensors",
                Self::VT_TENSORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("inputs", Self::VT_INPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("outputs", Self::VT_OUTPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Operator<'_>>>>>(
                "operators",
                Self::VT_OPERATORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct SubGraphArgs<'a> {
    pub tensors: Option<WIPOffset<Vector<'a, ForwardsUOffset<Tensor<'a>>>>>,
    pub inputs: Option<WIPOffset<Vector<'a, i32>>>,
    pub outputs: Option<WIPOffset<Vector<'a, i32>>>,
    pub operators: Option<WIPOffset<Vector<'a, ForwardsUOffset<Operator<'a>>>>>,
    pub name: Option<WIPOffset<&'a str>>,
}

// ───────────────────────────────────────────────────────────────
// Tensor
// ───────────────────────────────────────────────────────────────

fb_table!(Tensor);

impl<'a> Tensor<'a> {
    pub const VT_SHAPE: VOffsetT = 4;
    pub const VT_TYPE_: VOffsetT = 6;
    pub const VT_BUFFER: VOffsetT = 8;
    pub const VT_NAME: VOffsetT = 10;
    pub const VT_QUANTIZATION: VOffsetT = 12;

    pub fn shape(&self) -> Option<Vector<'a, i32>> {
        vector(&self._tab, Self::VT_SHAPE)
    }

    pub fn type_(&self) -> TensorType {
        TensorType(scalar(&self._tab, Self::VT_TYPE_, 0))
    }

    pub fn buffer(&self) -> u32 {
        scalar(&self._tab, Self::VT_BUFFER, 0)
    }

    pub fn name(&self) -> Option<&'a str> {
        string(&self._tab, Self::VT_NAME)
    }

    pub fn quantization(&self) -> Option<QuantizationParameters<'a>> {
        table(&self._tab, Self::VT_QUANTIZATION).map(|t| QuantizationParameters { _tab: t })
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args TensorArgs<'args>,
    ) -> WIPOffset<Tensor<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.quantization {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_QUANTIZATION, x);
        }
        if let Some(x) = args.name {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_NAME, x);
        }
        fbb.push_slot::<u32>(Self::VT_BUFFER, args.buffer, 0);
        if let Some(x) = args.shape {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_SHAPE, x);
        }
        fbb.push_slot::<i8>(Self::VT_TYPE_, args.type_.0, 0);
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Tensor<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("shape", Self::VT_SHAPE, false)?
            .visit_field::<i8>("type_", Self::VT_TYPE_, false)?
            .visit_field::<u32>("buffer", Self::VT_BUFFER, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<QuantizationParameters<'_>>>(
                "quantization",
                Self::VT_QUANTIZATION,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct TensorArgs<'a> {
    pub shape: Option<WIPOffset<Vector<'a, i32>>>,
    pub type_: TensorType,
    pub buffer: u32,
    pub name: Option<WIPOffset<&'a str>>,
    pub quantization: Option<WIPOffset<QuantizationParameters<'a>>>,
}

// ───────────────────────────────────────────────────────────────
// QuantizationParameters
// ───────────────────────────────────────────────────────────────

fb_table!(QuantizationParameters);

impl<'a> QuantizationParameters<'a> {
    pub const VT_MIN: VOffsetT = 4;
    pub const VT_MAX: VOffsetT = 6;
    pub const VT_SCALE: VOffsetT = 8;
    pub const VT_ZERO_POINT: VOffsetT = 10;

    pub fn min(&self) -> Option<Vector<'a, f32>> {
        vector(&self._tab, Self::VT_MIN)
    }

    pub fn max(&self) -> Option<Vector<'a, f32>> {
        vector(&self._tab, Self::VT_MAX)
    }

    pub fn scale(&self) -> Option<Vector<'a, f32>> {
        vector(&self._tab, Self::VT_SCALE)
    }

    pub fn zero_point(&self) -> Option<Vector<'a, i64>> {
        vector(&self._tab, Self::VT_ZERO_POINT)
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args QuantizationParametersArgs<'args>,
    ) -> WIPOffset<QuantizationParameters<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.zero_point {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_ZERO_POINT, x);
        }
        if let Some(x) = args.scale {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_SCALE, x);
        }
        if let Some(x) = args.max {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_MAX, x);
        }
        if let Some(x) = args.min {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_MIN, x);
        }
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for QuantizationParameters<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, f32>>>("min", Self::VT_MIN, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, f32>>>("max", Self::VT_MAX, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, f32>>>("scale", Self::VT_SCALE, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i64>>>(
                "zero_point",
                Self::VT_ZERO_POINT,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct QuantizationParametersArgs<'a> {
    pub min: Option<WIPOffset<Vector<'a, f32>>>,
    pub max: Option<WIPOffset<Vector<'a, f32>>>,
    pub scale: Option<WIPOffset<Vector<'a, f32>>>,
    pub zero_point: Option<WIPOffset<Vector<'a, i64>>>,
}

// ───────────────────────────────────────────────────────────────
// Buffer
// ───────────────────────────────────────────────────────────────

fb_table!(Buffer);

impl<'a> Buffer<'a> {
    pub const VT_DATA: VOffsetT = 4;

    pub fn data(&self) -> Option<Vector<'a, u8>> {
        vector(&self._tab, Self::VT_DATA)
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args BufferArgs<'args>,
    ) -> WIPOffset<Buffer<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.data {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_DATA, x);
        }
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Buffer<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("data", Self::VT_DATA, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct BufferArgs<'a> {
    pub data: Option<WIPOffset<Vector<'a, u8>>>,
}

// ───────────────────────────────────────────────────────────────
// Operator
// ───────────────────────────────────────────────────────────────

fb_table!(Operator);

impl<'a> Operator<'a> {
    pub const VT_OPCODE_INDEX: VOffsetT = 4;
    pub const VT_INPUTS: VOffsetT = 6;
    pub const VT_OUTPUTS: VOffsetT = 8;
    pub const VT_BUILTIN_OPTIONS_TYPE: VOffsetT = 10;
    pub const VT_BUILTIN_OPTIONS: VOffsetT = 12;

    pub fn opcode_index(&self) -> u32 {
        scalar(&self._tab, Self::VT_OPCODE_INDEX, 0)
    }

    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        vector(&self._tab, Self::VT_INPUTS)
    }

    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        vector(&self._tab, Self::VT_OUTPUTS)
    }

    pub fn builtin_options_type(&self) -> BuiltinOptions {
        BuiltinOptions(scalar(&self._tab, Self::VT_BUILTIN_OPTIONS_TYPE, 0))
    }

    pub fn builtin_options(&self) -> Option<Table<'a>> {
        table(&self._tab, Self::VT_BUILTIN_OPTIONS)
    }

    pub fn builtin_options_as_conv_2d_options(&self) -> Option<Conv2DOptions<'a>> {
        if self.builtin_options_type() == BuiltinOptions::CONV_2D_OPTIONS {
            self.builtin_options().map(|t| Conv2DOptions { _tab: t })
        } else {
            None
        }
    }

    pub fn builtin_options_as_pool_2d_options(&self) -> Option<Pool2DOptions<'a>> {
        if self.builtin_options_type() == BuiltinOptions::POOL_2D_OPTIONS {
            self.builtin_options().map(|t| Pool2DOptions { _tab: t })
        } else {
            None
        }
    }

    pub fn builtin_options_as_fully_connected_options(
        &self,
    ) -> Option<FullyConnectedOptions<'a>> {
        if self.builtin_options_type() == BuiltinOptions::FULLY_CONNECTED_OPTIONS {
            self.builtin_options()
                .map(|t| FullyConnectedOptions { _tab: t })
        } else {
            None
        }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args OperatorArgs<'args>,
    ) -> WIPOffset<Operator<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.builtin_options {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_BUILTIN_OPTIONS, x);
        }
        if let Some(x) = args.outputs {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_OUTPUTS, x);
        }
        if let Some(x) = args.inputs {
            fbb.push_slot_always::<WIPOffset<_>>(Self::VT_INPUTS, x);
        }
        fbb.push_slot::<u32>(Self::VT_OPCODE_INDEX, args.opcode_index, 0);
        fbb.push_slot::<u8>(
            Self::VT_BUILTIN_OPTIONS_TYPE,
            args.builtin_options_type.0,
            0,
        );
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Operator<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("opcode_index", Self::VT_OPCODE_INDEX, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("inputs", Self::VT_INPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("outputs", Self::VT_OUTPUTS, false)?
            .visit_union::<u8, _>(
                "builtin_options_type",
                Self::VT_BUILTIN_OPTIONS_TYPE,
                "builtin_options",
                Self::VT_BUILTIN_OPTIONS,
                false,
                |key, v, pos| match BuiltinOptions(key) {
                    BuiltinOptions::CONV_2D_OPTIONS => v
                        .verify_union_variant::<ForwardsUOffset<Conv2DOptions<'_>>>(
                            "BuiltinOptions::Conv2DOptions",
                            pos,
                        ),
                    BuiltinOptions::POOL_2D_OPTIONS => v
                        .verify_union_variant::<ForwardsUOffset<Pool2DOptions<'_>>>(
                            "BuiltinOptions::Pool2DOptions",
                            pos,
                        ),
                    BuiltinOptions::FULLY_CONNECTED_OPTIONS => v
                        .verify_union_variant::<ForwardsUOffset<FullyConnectedOptions<'_>>>(
                            "BuiltinOptions::FullyConnectedOptions",
                            pos,
                        ),
                    _ => Ok(()),
                },
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct OperatorArgs<'a> {
    pub opcode_index: u32,
    pub inputs: Option<WIPOffset<Vector<'a, i32>>>,
    pub outputs: Option<WIPOffset<Vector<'a, i32>>>,
    pub builtin_options_type: BuiltinOptions,
    pub builtin_options: Option<WIPOffset<flatbuffers::UnionWIPOffset>>,
}

// ───────────────────────────────────────────────────────────────
// Builtin option tables
// ───────────────────────────────────────────────────────────────

fb_table!(Conv2DOptions);

impl<'a> Conv2DOptions<'a> {
    pub const VT_PADDING: VOffsetT = 4;
    pub const VT_STRIDE_W: VOffsetT = 6;
    pub const VT_STRIDE_H: VOffsetT = 8;
    pub const VT_FUSED_ACTIVATION_FUNCTION: VOffsetT = 10;

    pub fn padding(&self) -> Padding {
        Padding(scalar(&self._tab, Self::VT_PADDING, 0))
    }

    pub fn stride_w(&self) -> i32 {
        scalar(&self._tab, Self::VT_STRIDE_W, 0)
    }

    pub fn stride_h(&self) -> i32 {
        scalar(&self._tab, Self::VT_STRIDE_H, 0)
    }

    pub fn fused_activation_function(&self) -> ActivationFunctionType {
        ActivationFunctionType(scalar(&self._tab, Self::VT_FUSED_ACTIVATION_FUNCTION, 0))
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args Conv2DOptionsArgs,
    ) -> WIPOffset<Conv2DOptions<'bldr>> {
        let start = fbb.start_table();
        fbb.push_slot::<i32>(Self::VT_STRIDE_H, args.stride_h, 0);
        fbb.push_slot::<i32>(Self::VT_STRIDE_W, args.stride_w, 0);
        fbb.push_slot::<i8>(
            Self::VT_FUSED_ACTIVATION_FUNCTION,
            args.fused_activation_function.0,
            0,
        );
        fbb.push_slot::<i8>(Self::VT_PADDING, args.padding.0, 0);
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Conv2DOptions<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>("padding", Self::VT_PADDING, false)?
            .visit_field::<i32>("stride_w", Self::VT_STRIDE_W, false)?
            .visit_field::<i32>("stride_h", Self::VT_STRIDE_H, false)?
            .visit_field::<i8>(
                "fused_activation_function",
                Self::VT_FUSED_ACTIVATION_FUNCTION,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct Conv2DOptionsArgs {
    pub padding: Padding,
    pub stride_w: i32,
    pub stride_h: i32,
    pub fused_activation_function: ActivationFunctionType,
}

fb_table!(Pool2DOptions);

impl<'a> Pool2DOptions<'a> {
    pub const VT_PADDING: VOffsetT = 4;
    pub const VT_STRIDE_W: VOffsetT = 6;
    pub const VT_STRIDE_H: VOffsetT = 8;
    pub const VT_FILTER_WIDTH: VOffsetT = 10;
    pub const VT_FILTER_HEIGHT: VOffsetT = 12;
    pub const VT_FUSED_ACTIVATION_FUNCTION: VOffsetT = 14;

    pub fn padding(&self) -> Padding {
        Padding(scalar(&self._tab, Self::VT_PADDING, 0))
    }

    pub fn stride_w(&self) -> i32 {
        scalar(&self._tab, Self::VT_STRIDE_W, 0)
    }

    pub fn stride_h(&self) -> i32 {
        scalar(&self._tab, Self::VT_STRIDE_H, 0)
    }

    pub fn filter_width(&self) -> i32 {
        scalar(&self._tab, Self::VT_FILTER_WIDTH, 0)
    }

    pub fn filter_height(&self) -> i32 {
        scalar(&self._tab, Self::VT_FILTER_HEIGHT, 0)
    }

    pub fn fused_activation_function(&self) -> ActivationFunctionType {
        ActivationFunctionType(scalar(&self._tab, Self::VT_FUSED_ACTIVATION_FUNCTION, 0))
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args Pool2DOptionsArgs,
    ) -> WIPOffset<Pool2DOptions<'bldr>> {
        let start = fbb.start_table();
        fbb.push_slot::<i32>(Self::VT_FILTER_HEIGHT, args.filter_height, 0);
        fbb.push_slot::<i32>(Self::VT_FILTER_WIDTH, args.filter_width, 0);
        fbb.push_slot::<i32>(Self::VT_STRIDE_H, args.stride_h, 0);
        fbb.push_slot::<i32>(Self::VT_STRIDE_W, args.stride_w, 0);
        fbb.push_slot::<i8>(
            Self::VT_FUSED_ACTIVATION_FUNCTION,
            args.fused_activation_function.0,
            0,
        );
        fbb.push_slot::<i8>(Self::VT_PADDING, args.padding.0, 0);
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for Pool2DOptions<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>("padding", Self::VT_PADDING, false)?
            .visit_field::<i32>("stride_w", Self::VT_STRIDE_W, false)?
            .visit_field::<i32>("stride_h", Self::VT_STRIDE_H, false)?
            .visit_field::<i32>("filter_width", Self::VT_FILTER_WIDTH, false)?
            .visit_field::<i32>("filter_height", Self::VT_FILTER_HEIGHT, false)?
            .visit_field::<i8>(
                "fused_activation_function",
                Self::VT_FUSED_ACTIVATION_FUNCTION,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct Pool2DOptionsArgs {
    pub padding: Padding,
    pub stride_w: i32,
    pub stride_h: i32,
    pub filter_width: i32,
    pub filter_height: i32,
    pub fused_activation_function: ActivationFunctionType,
}

fb_table!(FullyConnectedOptions);

impl<'a> FullyConnectedOptions<'a> {
    pub const VT_FUSED_ACTIVATION_FUNCTION: VOffsetT = 4;

    pub fn fused_activation_function(&self) -> ActivationFunctionType {
        ActivationFunctionType(scalar(&self._tab, Self::VT_FUSED_ACTIVATION_FUNCTION, 0))
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args FullyConnectedOptionsArgs,
    ) -> WIPOffset<FullyConnectedOptions<'bldr>> {
        let start = fbb.start_table();
        fbb.push_slot::<i8>(
            Self::VT_FUSED_ACTIVATION_FUNCTION,
            args.fused_activation_function.0,
            0,
        );
        let o = fbb.end_table(start);
        WIPOffset::new(o.value())
    }
}

impl Verifiable for FullyConnectedOptions<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>(
                "fused_activation_function",
                Self::VT_FUSED_ACTIVATION_FUNCTION,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct FullyConnectedOptionsArgs {
    pub fused_activation_function: ActivationFunctionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_code_prefers_larger_field() {
        let mut fbb = FlatBufferBuilder::new();
        let code = OperatorCode::create(
            &mut fbb,
            &OperatorCodeArgs {
                deprecated_builtin_code: 3,
                ..Default::default()
            },
        );
        let codes = fbb.create_vector(&[code]);
        let root = Model::create(
            &mut fbb,
            &ModelArgs {
                version: 3,
                operator_codes: Some(codes),
                ..Default::default()
            },
        );
        finish_model_buffer(&mut fbb, root);

        let model = root_as_model(fbb.finished_data()).unwrap();
        assert_eq!(model.version(), 3);
        let code = model.operator_codes().unwrap().get(0);
        assert_eq!(code.resolved_code(), BuiltinOperator::CONV_2D);
        assert_eq!(code.version(), 1);
    }

    #[test]
    fn garbage_is_rejected_by_verifier() {
        assert!(root_as_model(&[]).is_err());
        assert!(root_as_model(&[0xff; 16]).is_err());
    }

    #[test]
    fn element_sizes() {
        assert_eq!(TensorType::INT8.element_size(), Some(1));
        assert_eq!(TensorType::FLOAT32.element_size(), Some(4));
        assert_eq!(TensorType::INT64.element_size(), Some(8));
        assert_eq!(TensorType(5).element_size(), None);
    }
}
