//! One-time inference session setup.
//!
//! ```text
//!   parse ──▶ schema check ──▶ register ops ──▶ allocate tensors ──▶ Ready
//!     │            │                │                  │
//!     └────────────┴────── error ───┴──────────────────┴──▶ NotReady
//! ```
//!
//! Any failure leaves the session permanently `NotReady`; the command loop
//! keeps running and answers every trigger with "No capture".  A schema
//! version mismatch is only reported unless [`SchemaPolicy::Strict`]
//! applies.

use log::{error, info, warn};

use super::arena::TensorArena;
use super::interpreter::Interpreter;
use super::model::ModelArtifact;
use super::resolver::OpResolver;
use crate::app::context::SessionState;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::{ARENA_SIZE, SystemConfig};
use crate::error::{Error, ModelError, OpError, SetupError};

/// Number of kernels the perception model needs.
pub const REQUIRED_OPS: usize = 3;

/// The interpreter configuration the firmware runs.
pub type PerceptionInterpreter<'m> = Interpreter<'m, ARENA_SIZE, REQUIRED_OPS>;

/// How to treat a schema version mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Report and continue.
    Warn,
    /// Report and fail setup.
    Strict,
}

impl SchemaPolicy {
    pub fn from_config(config: &SystemConfig) -> Self {
        if config.strict_schema_version {
            Self::Strict
        } else {
            Self::Warn
        }
    }
}

/// Register exactly FullyConnected, Conv2D and MaxPool2D.
pub fn build_resolver() -> Result<OpResolver<REQUIRED_OPS>, OpError> {
    let mut resolver = OpResolver::new();
    resolver.add_fully_connected()?;
    resolver.add_conv_2d()?;
    resolver.add_max_pool_2d()?;
    Ok(resolver)
}

/// Build a session from `model_bytes` inside `arena`.
pub fn setup<'m, const N: usize>(
    model_bytes: &'m [u8],
    arena: TensorArena<N>,
    policy: SchemaPolicy,
    sink: &mut impl EventSink,
) -> SessionState<Interpreter<'m, N, REQUIRED_OPS>> {
    match try_setup(model_bytes, arena, policy, sink) {
        Ok(interpreter) => {
            let arena_used = interpreter.arena_used().unwrap_or(0);
            let arena_size = interpreter.arena_size();
            info!("session ready ({} / {} arena bytes)", arena_used, arena_size);
            sink.emit(&AppEvent::SessionReady {
                arena_used,
                arena_size,
            });
            SessionState::Ready(interpreter)
        }
        Err(e) => {
            error!("session setup failed: {}", e);
            sink.emit(&AppEvent::Fault(Error::Setup(e)));
            SessionState::NotReady(e)
        }
    }
}

fn try_setup<'m, const N: usize>(
    model_bytes: &'m [u8],
    arena: TensorArena<N>,
    policy: SchemaPolicy,
    sink: &mut impl EventSink,
) -> Result<Interpreter<'m, N, REQUIRED_OPS>, SetupError> {
    let model = ModelArtifact::parse(model_bytes)?;

    if let Err(e) = model.check_schema_version() {
        warn!("{}", e);
        if let ModelError::SchemaVersionMismatch { found, supported } = e {
            sink.emit(&AppEvent::SchemaMismatch { found, supported });
        }
        if policy == SchemaPolicy::Strict {
            return Err(e.into());
        }
    }

    let resolver = build_resolver()?;
    let mut interpreter = Interpreter::new(model, resolver, arena);
    interpreter.allocate_tensors()?;
    Ok(interpreter)
}
