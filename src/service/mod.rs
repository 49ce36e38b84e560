//! Generic record access by table name.

mod accessor;
pub use accessor::{build_filters, Accessor, QueryOptions, QueryOutput};
