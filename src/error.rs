//! Unified error types for the PetVision firmware.
//!
//! Every stage of the perception pipeline has its own small `Copy` error
//! enum.  They all convert into the top-level [`Error`] so the command loop
//! can report any failure through the single diagnostic channel without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Inference session could not be constructed.
    Setup(SetupError),
    /// One perception cycle was abandoned.
    Cycle(CycleError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "setup: {e}"),
            Self::Cycle(e) => write!(f, "cycle: {e}"),
        }
    }
}

impl From<SetupError> for Error {
    fn from(e: SetupError) -> Self {
        Self::Setup(e)
    }
}

impl From<CycleError> for Error {
    fn from(e: CycleError) -> Self {
        Self::Cycle(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The camera driver refused to start (carries the driver return code).
    InitFailed(i32),
    /// No complete frame could be obtained.
    CaptureFailed,
    /// The driver delivered a frame of unexpected size.
    FrameSizeMismatch { expected: usize, actual: usize },
    /// `read_frame` was called before the camera reached `Ready`.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(rc) => write!(f, "camera init failed (rc={rc})"),
            Self::CaptureFailed => write!(f, "frame capture failed"),
            Self::FrameSizeMismatch { expected, actual } => {
                write!(f, "frame size {actual} bytes, expected {expected}")
            }
            Self::NotReady => write!(f, "camera not initialised"),
        }
    }
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// The artifact is not a valid flatbuffer of the expected schema.
    Malformed,
    /// The artifact was built for a different schema version.
    SchemaVersionMismatch { found: u32, supported: u32 },
    /// The model must contain exactly one subgraph.
    UnsupportedSubgraphCount(usize),
    /// The subgraph does not declare an input or output tensor.
    MissingIo,
    /// A tensor index points outside the tensor table.
    TensorIndexOutOfRange(i32),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "model artifact is malformed"),
            Self::SchemaVersionMismatch { found, supported } => write!(
                f,
                "model provided is schema version {found} not equal to supported version {supported}"
            ),
            Self::UnsupportedSubgraphCount(n) => write!(f, "expected 1 subgraph, found {n}"),
            Self::MissingIo => write!(f, "model has no input or output tensor"),
            Self::TensorIndexOutOfRange(i) => write!(f, "tensor index {i} out of range"),
        }
    }
}

// ---------------------------------------------------------------------------
// Op registration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpError {
    /// The resolver has no free registration slot.
    ResolverFull,
    /// The operator was already registered.
    AlreadyRegistered(i32),
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolverFull => write!(f, "op resolver is full"),
            Self::AlreadyRegistered(code) => write!(f, "builtin op {code} already registered"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tensor allocation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// Planned working memory does not fit the arena.
    ArenaExhausted { required: usize, available: usize },
    /// The model has more tensors or operators than the planner can track.
    TooManyTensors(usize),
    /// An operator in the graph has no registered kernel.
    OpNotRegistered(i32),
    /// A tensor shape contains a negative dimension.
    InvalidShape(usize),
    /// A tensor uses an element type the engine cannot size.
    UnsupportedType(i8),
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaExhausted { required, available } => write!(
                f,
                "arena too small: {required} bytes required, {available} available"
            ),
            Self::TooManyTensors(n) => write!(f, "too many tensors ({n})"),
            Self::OpNotRegistered(code) => write!(f, "no kernel registered for builtin op {code}"),
            Self::InvalidShape(t) => write!(f, "tensor {t} has an invalid shape"),
            Self::UnsupportedType(ty) => write!(f, "unsupported tensor type {ty}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Invoke errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeError {
    /// `invoke` was called before tensors were allocated.
    NotAllocated,
    /// A kernel met a tensor type it does not implement.
    UnsupportedType { op: usize, tensor: usize },
    /// A kernel met a shape it cannot process.
    ShapeMismatch { op: usize },
    /// A constant tensor has no backing data in the model.
    MissingData { tensor: usize },
    /// A fused activation the kernels do not implement.
    UnsupportedActivation { op: usize },
    /// The operator options table is absent or of the wrong type.
    MissingOptions { op: usize },
    /// Input and output activations share arena bytes.
    AliasedTensors { op: usize },
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllocated => write!(f, "tensors not allocated"),
            Self::UnsupportedType { op, tensor } => {
                write!(f, "op {op}: unsupported type for tensor {tensor}")
            }
            Self::ShapeMismatch { op } => write!(f, "op {op}: shape mismatch"),
            Self::MissingData { tensor } => write!(f, "tensor {tensor} has no constant data"),
            Self::UnsupportedActivation { op } => write!(f, "op {op}: unsupported activation"),
            Self::MissingOptions { op } => write!(f, "op {op}: missing builtin options"),
            Self::AliasedTensors { op } => write!(f, "op {op}: input and output overlap"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session setup errors
// ---------------------------------------------------------------------------

/// Setup-time failure.  Leaves the session permanently `NotReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    Model(ModelError),
    OpRegistration(OpError),
    TensorAllocation(AllocationError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "model: {e}"),
            Self::OpRegistration(e) => write!(f, "op registration: {e}"),
            Self::TensorAllocation(e) => write!(f, "AllocateTensors() failed: {e}"),
        }
    }
}

impl From<ModelError> for SetupError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<OpError> for SetupError {
    fn from(e: OpError) -> Self {
        Self::OpRegistration(e)
    }
}

impl From<AllocationError> for SetupError {
    fn from(e: AllocationError) -> Self {
        Self::TensorAllocation(e)
    }
}

// ---------------------------------------------------------------------------
// Per-cycle errors
// ---------------------------------------------------------------------------

/// Failure of a single capture → classify cycle.  The loop returns to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    /// Session setup never completed; nothing was touched.
    SessionNotReady,
    /// The camera could not be started this cycle.
    CameraInit(SensorError),
    /// A frame could not be obtained this cycle.
    ImageCapture(SensorError),
    /// The model input tensor is not a 96×96 int8 buffer.
    InputShapeMismatch { len: usize },
    /// The forward pass failed.
    Invoke(InvokeError),
    /// The output tensor holds no value to classify.
    EmptyOutput,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotReady => write!(f, "inference session not ready"),
            Self::CameraInit(e) => write!(f, "Failed to initialize camera! ({e})"),
            Self::ImageCapture(e) => write!(f, "Image capture failed. ({e})"),
            Self::InputShapeMismatch { len } => {
                write!(f, "input tensor holds {len} values, expected 9216")
            }
            Self::Invoke(e) => write!(f, "Invoke failed. ({e})"),
            Self::EmptyOutput => write!(f, "output tensor is empty"),
        }
    }
}

impl From<InvokeError> for CycleError {
    fn from(e: InvokeError) -> Self {
        Self::Invoke(e)
    }
}
