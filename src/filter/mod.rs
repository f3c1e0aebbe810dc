pub mod error;
pub mod order;
pub mod params;
pub mod predicate;
pub mod select;
pub mod types;

pub use error::FilterError;
pub use order::OrderBy;
pub use params::ListQuery;
pub use predicate::Predicate;
pub use select::ListSelect;
pub use types::{Page, Param, SortDirection, SqlResult};
