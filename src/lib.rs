pub mod error;
pub mod math;
pub mod ml;

pub use error::{Error, Result};
pub use math::{Distance, SparseVector};
pub use ml::classic::k_nearest;
