// src/params/mod.rs

//! Turning a vertex's declarations into a concrete script.
//!
//! - [`resolve`] coerces supplied values and defaults into typed parameters.
//! - [`render`] substitutes them into the script template and persists the
//!   result on the track.
//! - [`source`] abstracts where supplied values come from.

pub mod render;
pub mod resolve;
pub mod source;

pub use render::{extract_template, render_script, render_template};
pub use resolve::{
    InputSpec, ParamSpec, ParamType, ParamValue, Parameters, parse_input_spec,
    resolve_parameters,
};
pub use source::{DefaultsOnly, ParameterSource, StaticParameters, supplied_values};
