//! Assemblies: composite products built from stock lines.
//!
//! This crate owns the assembly state machine, its lines and line returns, and
//! the wholesale cost/price rollup. Stock movement and compensation are driven
//! by the caller (see `petalerp-infra`), which keeps these rules pure.

pub mod assembly;
pub mod rollup;
pub mod status;

pub use assembly::{Assembly, AssemblyLine, AssemblyReturn};
pub use rollup::{AssemblyTotals, rollup};
pub use status::{AssemblyStatus, AssemblyTransition};
