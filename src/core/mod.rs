pub mod error;
pub mod types;
pub mod value;

pub use error::{GrantError, Result};
pub use types::{Column, Row, find_column_index};
pub use value::{ColumnType, Value};
