//! Windowed driver for a [`Game3D`].
//!
//! [`run_windowed`] takes ownership of a game and runs it inside a winit event
//! loop: every `RedrawRequested` is one animation frame, keyboard events feed
//! the game's input capture, and the headless draw list is presented through
//! the [`DebugRenderer`].

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{WindowAttributes, WindowId};

use super::renderer::DebugRenderer;
use super::scene::HeadlessRenderer;
use crate::game::Game3D;
use crate::input::KeyEvent;

/// Open a window and run `game` until it is closed.
///
/// The game is started when the window exists and disposed when it closes.
///
/// # Errors
///
/// Returns an error if the event loop cannot be created, the window or GPU
/// surface cannot be initialized, or the game refuses to start.
pub fn run_windowed(
    game: Game3D<HeadlessRenderer>,
    title: &str,
    width: u32,
    height: u32,
) -> Result<(), anyhow::Error> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        state: AppState::Pending {
            game,
            title: title.to_owned(),
            width,
            height,
        },
        init_error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.init_error {
        Some(reason) => Err(anyhow::anyhow!("windowed runner failed: {reason}")),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

/// Windows may only be created from `resumed`, so the game waits in
/// `Pending` until then.
enum AppState {
    Pending {
        game: Game3D<HeadlessRenderer>,
        title: String,
        width: u32,
        height: u32,
    },
    Running {
        game: Game3D<HeadlessRenderer>,
        renderer: DebugRenderer,
        clock: Instant,
    },
    Transitioning,
}

struct App {
    state: AppState,
    init_error: Option<String>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, reason: String) {
        tracing::error!(%reason, "windowed runner exiting");
        self.init_error = Some(reason);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending {
            mut game,
            title,
            width,
            height,
        } = std::mem::replace(&mut self.state, AppState::Transitioning)
        else {
            return;
        };

        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, format!("window creation: {e}")),
        };
        let renderer = match pollster::block_on(DebugRenderer::new(window.clone())) {
            Ok(renderer) => renderer,
            Err(e) => return self.fail(event_loop, format!("renderer init: {e}")),
        };
        if let Err(e) = game.start() {
            return self.fail(event_loop, format!("game start: {e}"));
        }
        let size = window.inner_size();
        game.resize(size.width, size.height);
        tracing::info!(width = size.width, height = size.height, "window created");

        window.request_redraw();
        self.state = AppState::Running {
            game,
            renderer,
            clock: Instant::now(),
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running {
            game,
            renderer,
            clock,
        } = &mut self.state
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!(ticks = game.tick_count(), "window closed");
                game.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                game.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                game.input_mut().handle_event(&KeyEvent {
                    code: format!("{code:?}"),
                    pressed: event.state.is_pressed(),
                    repeat: event.repeat,
                });
            }
            WindowEvent::RedrawRequested => {
                game.frame(clock.elapsed().as_secs_f64());

                let view = game.renderer().camera().clone();
                match renderer.render(game.renderer().draw_list(), &view) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = renderer.window().inner_size();
                        renderer.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("GPU out of memory");
                        game.dispose();
                        event_loop.exit();
                        return;
                    }
                    Err(e) => tracing::warn!(error = %e, "surface error"),
                }
                renderer.window().request_redraw();
            }
            _ => {}
        }
    }
}
