//! Quantized inference engine.
//!
//! Executes a static int8 graph stored as a TFLite flatbuffer, with every
//! activation placed in a single fixed-size arena.
//!
//! | Module          | Role                                            |
//! |-----------------|-------------------------------------------------|
//! | [`schema`]      | flatbuffer tables and builders                  |
//! | [`model`]       | verified view over the artifact                 |
//! | [`resolver`]    | fixed-capacity op registry                      |
//! | [`arena`]       | tensor arena and memory planner                 |
//! | [`kernels`]     | Conv2D, MaxPool2D, FullyConnected               |
//! | [`interpreter`] | allocate / invoke / tensor access               |
//! | [`session`]     | setup sequence producing a `SessionState`       |

pub mod arena;
pub mod interpreter;
pub mod kernels;
pub mod model;
pub mod resolver;
pub mod schema;
pub mod session;
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
