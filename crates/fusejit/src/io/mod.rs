//! Binary tensor dump tooling built around the compiler core.

pub mod blob_dump;

pub use blob_dump::{read_blob, write_blob, BlobHeader};
