//! Slabkit API - Core interfaces and types for the slabkit allocator
//!
//! This crate provides the interfaces and types shared between the slabkit
//! allocator engine and its embedders. It carries the error type used across
//! the workspace and the page mapper contract the engine allocates slabs
//! through.
//!
//! # Design Principles
//!
//! - **Dependency Inversion**: the engine depends on the `PageMapper`
//!   abstraction, never on a concrete mapping back-end
//! - **Interface Segregation**: the mapper seam is a three-operation
//!   capability set, nothing more

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mapper;

// Re-export commonly used types
pub use crate::error::{Error, Result};
pub use crate::mapper::{MapHandle, MapProt, PageMapper};
