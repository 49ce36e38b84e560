//! Safe SQL builder: identifiers from registered record types only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
