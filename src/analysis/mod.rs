//! Static analysis of method bodies.
//!
//! The deobfuscation passes only execute a call when they can prove its arguments are
//! constants. This module provides that proof: [`MethodAnalyzer`] computes, for every
//! instruction of a body, the provenance of the operand-stack values it consumes and
//! produces.
//!
//! # Key Components
//!
//! - [`Frame`] / [`FrameKind`] - symbolic stack entries with their provenance
//! - [`MethodAnalyzer`] - the forward dataflow walk
//! - [`AnalyzerResult`] / [`FrameEntry`] - the per-instruction frame map
//!
//! Only [`FrameKind::Literal`] frames are safe to act on; everything else, including
//! values entering a loop header, is at best partially known.

mod analyzer;
mod frame;

pub use analyzer::{AnalyzerResult, FrameEntry, MethodAnalyzer};
pub use frame::{Frame, FrameKind};
