use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use softbuffer::{Context, Surface};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::engine::{Engine, EngineFlags};
use crate::scene::Keys;

struct Graphics {
    window: Rc<Window>,
    surface: Surface<Rc<Window>, Rc<Window>>,
}

impl Graphics {
    fn new(event_loop: &ActiveEventLoop, engine: &Engine, title: &str) -> Self {
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(
                engine.window_width() as u32,
                engine.window_height() as u32,
            ))
            .with_resizable(!engine.flags().contains(EngineFlags::DISABLE_WINDOW_RESIZE));

        let window = Rc::new(
            event_loop
                .create_window(attributes)
                .expect("Failed to create a window"),
        );

        let context = Context::new(window.clone()).expect("Failed to create a softbuffer context");
        let surface =
            Surface::new(&context, window.clone()).expect("Failed to create a softbuffer surface");

        Graphics { window, surface }
    }
}

/// The desktop shell: owns the window and surface, translates input
/// into engine terms, and blits the engine's pixel buffer every frame.
pub struct App {
    engine: Engine,
    title: String,
    graphics: Option<Graphics>,
    last_frame: Instant,
}

impl App {
    pub fn new(engine: Engine, title: &str) -> Self {
        Self {
            engine,
            title: title.to_string(),
            graphics: None,
            last_frame: Instant::now(),
        }
    }

    pub fn run(mut self) {
        let event_loop = EventLoop::new().expect("Failed to create the event loop");

        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self).expect("Event loop failure");
    }

    fn handle_movement_key(&mut self, code: KeyCode, pressed: bool) {
        let key = match code {
            KeyCode::KeyW => Keys::W,
            KeyCode::KeyA => Keys::A,
            KeyCode::KeyS => Keys::S,
            KeyCode::KeyD => Keys::D,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => Keys::SHIFT,
            _ => return,
        };

        self.engine.input.keys.set(key, pressed);
    }

    fn handle_command_line_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }

        match &event.logical_key {
            Key::Character(text) => {
                for character in text.chars() {
                    self.engine.command_line_character(character);
                }
            }
            Key::Named(winit::keyboard::NamedKey::Space) => {
                self.engine.command_line_character(' ');
            }
            Key::Named(winit::keyboard::NamedKey::Backspace) => {
                self.engine.command_line_backspace();
            }
            Key::Named(winit::keyboard::NamedKey::Enter) => {
                self.engine.execute_command_line();
            }
            Key::Named(winit::keyboard::NamedKey::Escape) => {
                self.engine.cancel_command_line();
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let dt = self.last_frame.elapsed().as_millis() as i32;

        self.last_frame = Instant::now();
        self.engine.update(dt.max(1));

        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        let size = graphics.window.inner_size();
        let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };

        graphics
            .surface
            .resize(width, height)
            .expect("Failed to resize the softbuffer surface");

        let mut buffer = graphics
            .surface
            .buffer_mut()
            .expect("Failed to get the softbuffer buffer");

        self.engine.present_into(&mut buffer);

        buffer
            .present()
            .expect("Failed to present the softbuffer buffer");

        graphics.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.graphics = Some(Graphics::new(event_loop, &self.engine, &self.title));
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.engine
                    .resize(size.width as usize, size.height as usize);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if self.engine.is_command_line_open() {
                    self.handle_command_line_key(&event);
                    return;
                }

                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape)
                        if event.state == ElementState::Pressed && !event.repeat =>
                    {
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::KeyC)
                        if event.state == ElementState::Released =>
                    {
                        self.engine.open_command_line();
                    }
                    PhysicalKey::Code(code) => {
                        self.handle_movement_key(code, event.state == ElementState::Pressed);
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();

                if self.engine.is_stopped() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (x, y) } = event {
            self.engine.input.mouse_dx += x as f32;
            self.engine.input.mouse_dy += y as f32;
        }
    }
}
