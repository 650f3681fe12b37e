//! # Boltview
//!
//! An interactive viewer for a washer and screw assembly: a fixed scene of
//! textured meshes lit by two Phong point lights, explored with a free-fly
//! camera that can flip between perspective and orthographic projection.
//!
//! ## Controls
//!
//! | Input | Effect |
//! |---|---|
//! | W/S, Up/Down | move forward/back |
//! | A/D, Left/Right | strafe |
//! | Q/E, PageUp/PageDown | move up/down |
//! | R | return to the starting position |
//! | P / O | perspective / orthographic |
//! | mouse | look around (perspective only) |
//! | wheel | movement speed |
//! | Esc | quit |
//!
//! ```no_run
//! use boltview::{AppConfig, LoggingConfig, init_logging};
//!
//! init_logging(LoggingConfig::default());
//! boltview::run(AppConfig::from_env().asset_dir("assets")).unwrap();
//! ```

mod app;
mod camera;
mod config;
mod error;
mod gpu;
mod input;
mod logging;
pub mod mesh;
mod renderer;
pub mod scene;
pub mod shader;
pub mod shapes;
pub mod texture;
pub mod uniforms;

pub use app::run;
pub use camera::{CameraController, Movement, ProjectionMode, front_from_angles};
pub use config::AppConfig;
pub use error::ViewerError;
pub use gpu::GpuContext;
pub use input::{FrameInput, Input, InputDispatcher, MouseTracker};
pub use logging::{LoggingConfig, init_logging};
pub use mesh::{GpuMesh, MeshLibrary, Vertex3d};
pub use renderer::{FramePlan, FrameRenderer};
pub use scene::{Scene, SceneObject};
pub use shader::{ShaderError, ShaderProgram, ShaderStage};
pub use shapes::Shape;
pub use texture::{Texture, TextureError, TextureUnits};

// Re-export math types for convenience
pub use glam::{Mat4, Vec3, Vec4};
