#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # editsc-core
//!
//! Voxel chunk storage and face-visibility scanning for block-game world files.
//!
//! ## Key Modules
//!
//! * `voxels` - Block values, chunks, the world file codec and the visibility engine
//! * `task_management` - Worker threads that run visibility scans off the caller's thread
//! * `config` - Editor settings loaded from JSON
//! * `error` - The error type editor commands return
//!
//! ## Data Flow
//!
//! Raw file bytes are decoded into chunks and collected into a [`voxels::world::World`].
//! Edits go through the world to the owning chunk; saving re-encodes every chunk in
//! file order. A renderer asks a [`task_management::WorkerPool`] which faces of which
//! blocks are visible and builds geometry from the masks it gets back.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use editsc_core::voxels::world::World;
//!
//! let bytes = std::fs::read("world.bin").unwrap();
//! let world = World::load_detected(&bytes).unwrap();
//! for chunk in world.chunks() {
//!     println!("({}, {}): {} faces", chunk.x(), chunk.z(), chunk.count_faces(|b| !b.is_air()));
//! }
//! ```

pub mod config;
pub mod error;
pub mod task_management;
pub mod voxels;

#[cfg(not(target_family = "wasm"))]
use log::info;

/// Starts the logger. `RUST_LOG` overrides `level` when set.
#[cfg(not(target_family = "wasm"))]
pub fn init_logger(level: &str) {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_filters(level)
        .parse_env("RUST_LOG");
    if log_builder.try_init().is_ok() {
        info!("Logger initialized");
    }
}

/// Starts the browser console logger at `level`.
#[cfg(target_family = "wasm")]
pub fn init_logger(level: &str) {
    let level = level.parse().unwrap_or(log::Level::Info);
    let _ = console_log::init_with_level(level);
}
