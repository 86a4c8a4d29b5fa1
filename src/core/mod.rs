//! Storage engine internals
//!
//! Leaf-first: [`transform`] maps keys to paths, [`disk`] and [`walk`] do the
//! physical I/O, [`cache`] and [`index`] hold the in-memory state, and
//! [`store`] ties them together. [`codec`] and [`schema`] sit on top.

pub mod cache;
pub mod codec;
pub mod compression;
pub mod config;
pub mod disk;
pub mod error;
pub mod index;
pub mod schema;
pub mod store;
pub mod transform;
pub mod walk;
