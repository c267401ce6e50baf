//! Core types for uxstep
//!
//! This crate holds the data model shared by the provider bridge, the HTTP
//! server and the CLI: step requests and results, the prompt profile
//! registry, the model catalog and best-effort parsing of model output.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod catalog;
pub mod imaging;
pub mod parse;
pub mod profiles;
pub mod types;

pub use parse::{parse_model_output, DecisionFields, ModelOutputError};
pub use profiles::{Profile, UnknownProfile};
pub use types::*;
