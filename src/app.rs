use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::ViewerConfig;
use crate::engine::Engine;
use crate::error::ViewerError;
use crate::gfx::rendering::RenderEngine;

/// Colour of points added from the keyboard
const DRAW_COLOR: [f32; 3] = [1.0, 0.5, 0.2];

/// Window host: forwards input to the engine and renders on every redraw
///
/// Held W/A/S/D/Q/E keys fly the camera, dragging with the right mouse button
/// looks around and the wheel zooms. C starts a custom object, Space drops a
/// point in front of the camera and Enter finishes it. Escape quits.
pub struct ViewerApp {
    engine: Engine,
    title: String,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    last_frame: Instant,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            engine: Engine::new(config),
            title: "sculpt".to_string(),
            window: None,
            render_engine: None,
            last_frame: Instant::now(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    /// Handle for populating the scene before (or while) the window runs
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> Result<(), winit::error::EventLoopError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)
    }

    fn handle_shortcut(&self, code: KeyCode) {
        let result = match code {
            KeyCode::KeyC => self.engine.create_custom_object().map(|_| ()),
            KeyCode::Space => self.engine.with_scene(|scene| match scene.active_custom_object() {
                Some(handle) => scene.add_vertex_ahead(handle, DRAW_COLOR).map_err(ViewerError::from),
                None => Ok(()),
            }),
            KeyCode::Enter => self.engine.with_scene(|scene| match scene.active_custom_object() {
                Some(handle) => scene.finish_custom_object(handle).map(|_| ()).map_err(ViewerError::from),
                None => Ok(()),
            }),
            _ => Ok(()),
        };
        if let Err(err) = result {
            log::warn!("{err}");
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let consumed = self
            .engine
            .with_scene(|scene| scene.camera_manager.controller.process_keyed_events(event));
        if consumed || event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if let PhysicalKey::Code(code) = event.physical_key {
            if code == KeyCode::Escape {
                event_loop.exit();
            } else {
                self.handle_shortcut(code);
            }
        }
    }

    fn redraw(&mut self) {
        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if let Err(err) = self.engine.render_frame(render_engine, elapsed) {
            log::error!("Frame failed: {err}");
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Could not create a window: {err}");
                event_loop.exit();
                return;
            }
        };

        let (width, height) = window.inner_size().into();
        let clear_color = self.engine.with_scene(|scene| scene.config().clear_color);
        let window_clone = window.clone();
        match pollster::block_on(RenderEngine::new(window_clone, width, height, clear_color)) {
            Ok(renderer) => {
                self.render_engine = Some(renderer);
                self.window = Some(window);
                self.last_frame = Instant::now();
            }
            Err(err) => {
                log::error!("Could not initialise rendering: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseInput { state, button, .. } => {
                self.engine.with_scene(|scene| {
                    scene.camera_manager.controller.process_mouse_input(button, state)
                });
            }
            WindowEvent::Focused(false) => {
                self.engine
                    .with_scene(|scene| scene.camera_manager.controller.release_all());
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.engine
            .with_scene(|scene| scene.camera_manager.controller.process_events(&event));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
