//! wgpu implementation of the stage backend.
//!
//! `GpuState` owns the device, the accumulation buffers, the palette and the
//! frame encoder. Stage programs are built against layouts fixed at start-up
//! so a reloaded shader can be swapped in without touching bind groups.

mod context;
mod palette;
mod pipeline;
mod state;

pub use pipeline::GpuProgram;
pub(crate) use state::{FrameParts, GpuState};
