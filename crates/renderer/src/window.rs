use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use playback::{FramePacer, Playhead, PlayheadSource, Transport};
use trackdata::sample_index;

use crate::gpu::{FrameParams, GpuState};
use crate::runtime::FrameClock;
use crate::types::RendererConfig;

struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    transport: Transport,
    playhead: Playhead,
    pacer: FramePacer,
    clock: FrameClock,
    drive: Vec<f32>,
    config: RendererConfig,
}

impl WindowState {
    fn new(window: Arc<Window>, config: RendererConfig, now: Instant) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(
            window.as_ref(),
            size,
            &config.text,
            &config.drive,
            &config.params,
            config.antialiasing,
        )?;
        let playhead = Playhead::new(config.duration, config.playhead)?;
        Ok(Self {
            window,
            gpu,
            transport: Transport::new(now),
            playhead,
            pacer: FramePacer::new(config.target_fps),
            clock: FrameClock::new(),
            drive: config.drive.clone(),
            config,
        })
    }

    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if self.playhead.source() != PlayheadSource::Pointer {
            return;
        }
        let width = self.gpu.size().width.max(1) as f64;
        self.playhead.set_pointer_fraction(position.x / width);
    }

    fn handle_key(&mut self, event: &KeyEvent, now: Instant) -> KeyAction {
        if event.state != ElementState::Pressed || event.repeat {
            return KeyAction::None;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Space) => {
                self.transport.toggle_pause(now);
                KeyAction::Redraw
            }
            Key::Named(NamedKey::Escape) => KeyAction::Quit,
            Key::Character(value) => match value.as_str() {
                "n" | "N" => {
                    self.transport.request_step();
                    KeyAction::Redraw
                }
                "c" | "C" => {
                    self.gpu.clear_feedback();
                    KeyAction::Redraw
                }
                "s" | "S" => {
                    match self.gpu.export_png(&self.config.export_dir) {
                        Ok(path) => tracing::info!(path = %path.display(), "frame exported"),
                        Err(err) => tracing::error!(error = %err, "frame export failed"),
                    }
                    KeyAction::None
                }
                "q" | "Q" => KeyAction::Quit,
                _ => KeyAction::None,
            },
            _ => KeyAction::None,
        }
    }

    /// Renders one frame if the transport releases one.
    fn redraw(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        if !self.transport.take_frame(now) {
            return Ok(());
        }
        let media_seconds = self.transport.media_seconds(now);
        let progress = self.playhead.progress(media_seconds);
        let drive = if self.drive.is_empty() {
            0.0
        } else {
            self.drive[sample_index(progress, self.drive.len())]
        };
        let sample = self.clock.sample(media_seconds);
        let result = self.gpu.render(FrameParams {
            sample,
            drive,
            progress,
        });
        if result.is_ok() {
            self.pacer.mark_rendered(now);
        }
        result
    }
}

enum KeyAction {
    None,
    Redraw,
    Quit,
}

pub(crate) fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("typestorm")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window.clone(), config, Instant::now())?;
    state.window.request_redraw();

    let mut result = Ok(());
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                match state.handle_key(&event, Instant::now()) {
                    KeyAction::Quit => elwt.exit(),
                    KeyAction::Redraw => state.window.request_redraw(),
                    KeyAction::None => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.handle_cursor_moved(position);
            }
            WindowEvent::Resized(new_size) => {
                state.gpu.resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let _ = inner_size_writer.request_inner_size(state.gpu.size());
            }
            WindowEvent::RedrawRequested => match state.redraw(Instant::now()) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    state.gpu.resize(state.gpu.size());
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    tracing::error!("surface out of memory; exiting");
                    elwt.exit();
                }
                Err(other) => {
                    tracing::warn!(error = ?other, "surface error; retrying next frame");
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if !state.transport.frame_pending() {
                // Paused with no step queued: sleep until input arrives.
                elwt.set_control_flow(ControlFlow::Wait);
            } else if state.pacer.ready_for_frame(now) {
                state.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = state.pacer.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }
    result
}
