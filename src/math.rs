pub mod distance;
pub mod sparse_vector;

pub use distance::{cosine_similarity, Distance};
pub use sparse_vector::SparseVector;
