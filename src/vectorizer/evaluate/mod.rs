pub mod index;
pub mod scoring;
pub mod shard;
