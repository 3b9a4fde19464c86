//! Storage backend implementations.

pub mod s3;
