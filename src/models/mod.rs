//! Data carried between the host framework, the adapter and the object store.
//!
//! A [`file::FileDescriptor`] travels from the host into the adapter and back,
//! [`object::ObjectMetadata`] is what the store reports about a stored object,
//! and [`schema`] declares which descriptor fields a host may persist.

pub mod file;
pub mod object;
pub mod schema;
