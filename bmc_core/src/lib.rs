pub mod error;
pub mod format;
pub mod stage;

pub use error::{Error, Result};
pub use format::{Container, Cursor, Geometry};
pub use stage::Stage;
