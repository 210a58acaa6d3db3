//! Data source implementations

pub mod list;

pub use list::EntityListDataSource;
