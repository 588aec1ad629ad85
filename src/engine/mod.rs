// Engine modules for the fishpond scene.

pub mod assets;
pub mod boids;
pub mod camera;
pub mod components;
pub mod config;
pub mod input;
pub mod lifecycle;
pub mod mesh;
pub mod overlay;
pub mod particles;
pub mod renderer;
pub mod starfield;

// Re-export commonly used items
pub use components::*;
