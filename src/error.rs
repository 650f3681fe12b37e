use thiserror::Error;

use crate::shader::ShaderError;
use crate::texture::TextureError;

/// Failures that stop the viewer.
///
/// Anything raised during startup leaves nothing to show, so the caller
/// exits with a failure status. Per-frame surface loss is recovered inside
/// the renderer and never surfaces here.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),

    #[error("event loop failed")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create rendering surface")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("GPU ran out of memory while acquiring a frame")]
    SurfaceOutOfMemory,
}
