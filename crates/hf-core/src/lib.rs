//! hf-core: shared foundation for hydroflow.
//!
//! Contains:
//! - numeric (clamp, ease curves, equal-percentage characteristic)
//! - units (uom SI types, constructors, fixed physical constants)
//! - ids (sub-pipe identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{HfError, HfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
