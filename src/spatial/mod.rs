//! Spatial indexing for neighbor queries

pub mod sparse_hash;

pub use sparse_hash::SparseHashGrid;
