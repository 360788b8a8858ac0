//! Protobuf bindings for the OpenCensus resource model.
//!
//! Vendored from <https://github.com/census-instrumentation/opencensus-proto/>.
//!
//! Unlike a plain prost-generated binding, [`resource::v1::Resource`]
//! preserves fields it does not recognize, can be encoded with a
//! deterministic label order, and is registered with a schema descriptor
//! for generic tooling (see [`descriptor`]).

#![deny(warnings, rust_2018_idioms)]
#![allow(clippy::derive_partial_eq_without_eq)]
#![forbid(unsafe_code)]

pub mod descriptor;
mod error;
mod options;
mod text;
pub mod unknown;

pub use self::{
    error::{Error, Result},
    options::{MarshalOptions, UnmarshalOptions},
};

pub mod resource {
    pub mod v1;
}
