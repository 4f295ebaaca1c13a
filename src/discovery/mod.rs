pub mod picker;

pub use picker::{DEFAULT_RETRY_DELAY, NodePicker};
