//! Vector index, persistent store and MMR retrieval

pub mod index;
pub mod mmr;
mod store;

pub use index::FlatL2Index;
pub use mmr::{cosine_similarity, maximal_marginal_relevance};
pub use store::{SearchResult, VectorStore};
pub(crate) use store::write_atomic;
