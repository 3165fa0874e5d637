//! Trigon engine crate.
//!
//! This crate owns the GPU runtime behind the render worker: device/surface
//! management, the triangle renderer, and the worker message loop.

pub mod device;
pub mod error;
pub mod render;
pub mod worker;

pub mod logging;
