pub mod commands;
pub mod engine;
pub mod error;
pub mod font;
pub mod maths;
pub mod rasterizer;
pub mod scene;
pub mod stats;
pub mod window;

pub use engine::{Engine, EngineFlags, Level};
pub use scene::Scene;
