//! Window, event loop and frame loop.
//!
//! The viewer starts in [`ViewerApp::Pending`]; once winit resumes it opens
//! the window and builds every GPU resource. Any startup failure is kept and
//! returned from [`run`] after the loop exits. Each redraw polls the keyboard,
//! updates the camera, renders, and requests the next redraw until a close is
//! requested.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::camera::CameraController;
use crate::config::AppConfig;
use crate::error::ViewerError;
use crate::gpu::GpuContext;
use crate::input::{Input, InputDispatcher, scroll_lines};
use crate::mesh::MeshLibrary;
use crate::renderer::{FramePlan, FrameRenderer};
use crate::scene::Scene;
use crate::shader::ShaderProgram;
use crate::texture::TextureUnits;

/// Open the viewer window and run until it is closed.
pub fn run(config: AppConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Stopped { error: Some(err) } => Err(err),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending { config: AppConfig },
    Running(Box<Viewer>),
    Stopped { error: Option<ViewerError> },
}

impl ViewerApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        log::error!("{err}");
        *self = ViewerApp::Stopped { error: Some(err) };
        event_loop.exit();
    }
}

struct Viewer {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: FrameRenderer,
    scene: Scene,
    camera: CameraController,
    input: Input,
    dispatcher: InputDispatcher,
    /// Integrated raw mouse motion, standing in for a cursor position.
    cursor: (f64, f64),
}

impl Viewer {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, ViewerError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        capture_cursor(&window);

        let gpu = GpuContext::new(window.clone())?;
        let program = ShaderProgram::scene(&gpu)?;
        let textures = TextureUnits::load(&gpu, &program, &config.asset_dir)?;
        let meshes = MeshLibrary::upload(&gpu);
        let scene = Scene::washer_and_screw();
        log::info!(
            "Viewer ready: {} objects, {} texture units, {}x{}",
            scene.objects.len(),
            textures.unit_count(),
            gpu.width(),
            gpu.height()
        );
        let renderer = FrameRenderer::new(
            &gpu,
            program,
            meshes,
            textures,
            scene.objects.len() as u32,
        );

        window.request_redraw();

        Ok(Self {
            cursor: (config.width as f64 / 2.0, config.height as f64 / 2.0),
            window,
            gpu,
            renderer,
            scene,
            camera: CameraController::new(),
            input: Input::new(),
            dispatcher: InputDispatcher::new(),
        })
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> Result<(), ViewerError> {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.gpu.resize(size.width, size.height);
                self.renderer.ensure_depth_size(&self.gpu);
            }
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::Focused(true) => capture_cursor(&self.window),
            WindowEvent::MouseWheel { delta, .. } => {
                self.dispatcher
                    .on_scroll(scroll_lines(&delta), &mut self.camera);
            }
            WindowEvent::RedrawRequested => {
                let frame = self.dispatcher.process_keys(&self.input, &mut self.camera);
                let plan = FramePlan::new(
                    frame.view,
                    self.camera.projection_matrix(self.gpu.aspect()),
                    &self.scene,
                    self.camera.projection_mode(),
                );
                self.renderer.render(&self.gpu, &plan)?;

                if frame.close_requested {
                    log::info!("Close requested");
                    event_loop.exit();
                } else {
                    self.window.request_redraw();
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn mouse_motion(&mut self, dx: f64, dy: f64) {
        self.cursor.0 += dx;
        self.cursor.1 += dy;
        self.dispatcher.on_cursor_moved(
            self.cursor.0 as f32,
            self.cursor.1 as f32,
            &mut self.camera,
        );
    }
}

fn capture_cursor(window: &Window) {
    window.set_cursor_visible(false);
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        log::warn!("Could not grab cursor: {err}");
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config } = self else {
            return;
        };

        match Viewer::start(event_loop, config) {
            Ok(viewer) => *self = ViewerApp::Running(Box::new(viewer)),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running(viewer) = self else {
            return;
        };

        if let Err(err) = viewer.window_event(event_loop, event) {
            self.fail(event_loop, err);
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        let ViewerApp::Running(viewer) = self else {
            return;
        };

        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            viewer.mouse_motion(dx, dy);
        }
    }
}
