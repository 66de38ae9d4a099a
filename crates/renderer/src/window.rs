use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::platform::scancode::PhysicalKeyExtScancode;
use winit::window::{Window, WindowBuilder};

/// Keys the demo distinguishes; everything else carries its scancode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
}

impl KeyEvent {
    pub const fn press(key: Key) -> Self {
        Self {
            key,
            action: KeyAction::Press,
        }
    }
}

/// Maps a key event and the current close flag to the new close flag.
pub type KeyCallback = fn(&KeyEvent, bool) -> bool;

/// Default key handling: pressing escape asks the window to close.
pub fn escape_closes(event: &KeyEvent, should_close: bool) -> bool {
    should_close || (event.key == Key::Escape && event.action == KeyAction::Press)
}

/// Runs `callback` for `event` against the window's close flag.
///
/// The flag only moves from open to closed; `request_close` is called once,
/// on that transition. Returns the resulting flag.
pub fn dispatch_key<W: WindowHost + ?Sized>(
    window: &mut W,
    callback: KeyCallback,
    event: &KeyEvent,
) -> bool {
    let was_closing = window.should_close();
    let closing = was_closing || callback(event, was_closing);
    if closing && !was_closing {
        debug!(?event, "key requested window close");
        window.request_close();
    }
    closing
}

/// The windowing collaborator the render loop drives.
///
/// Key callbacks run synchronously inside [`WindowHost::poll_events`].
pub trait WindowHost {
    fn set_key_callback(&mut self, callback: KeyCallback);
    /// Processes pending events without blocking.
    fn poll_events(&mut self);
    fn should_close(&self) -> bool;
    fn request_close(&mut self);
    fn swap_buffers(&mut self);
    fn terminate(self)
    where
        Self: Sized;
}

/// A fixed-size desktop window driven by a non-blocking winit event pump.
pub struct DesktopWindow {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    key_callback: KeyCallback,
    close_requested: bool,
}

impl DesktopWindow {
    pub fn create(size: (u32, u32), title: &str, resizable: bool) -> Result<Self> {
        let event_loop =
            EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(size.0, size.1))
            .with_resizable(resizable)
            .build(&event_loop)
            .map_err(|err| anyhow!("failed to create window: {err}"))?;
        info!(width = size.0, height = size.1, title, "window created");

        Ok(Self {
            event_loop,
            window: Arc::new(window),
            key_callback: escape_closes,
            close_requested: false,
        })
    }

    /// Shared handle for surface creation.
    pub fn handle(&self) -> Arc<Window> {
        self.window.clone()
    }
}

impl WindowHost for DesktopWindow {
    fn set_key_callback(&mut self, callback: KeyCallback) {
        self.key_callback = callback;
    }

    fn poll_events(&mut self) {
        let window_id = self.window.id();
        let mut pending = Vec::new();
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _| {
                if let Event::WindowEvent { window_id: id, event } = event {
                    if id == window_id {
                        pending.push(event);
                    }
                }
            });
        if let PumpStatus::Exit(code) = status {
            debug!(code, "event loop exited");
            self.request_close();
        }

        let callback = self.key_callback;
        for event in pending {
            match event {
                WindowEvent::CloseRequested => self.request_close(),
                WindowEvent::KeyboardInput { event, .. } => {
                    let key_event = translate_key(&event);
                    dispatch_key(self, callback, &key_event);
                }
                _ => {}
            }
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }

    fn swap_buffers(&mut self) {
        self.window.pre_present_notify();
    }

    fn terminate(self) {
        let Self {
            event_loop, window, ..
        } = self;
        drop(window);
        drop(event_loop);
        info!("window closed");
    }
}

fn translate_key(event: &winit::event::KeyEvent) -> KeyEvent {
    let key = match event.physical_key {
        PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
        other => Key::Other(other.to_scancode().unwrap_or_default()),
    };
    let action = match (event.state, event.repeat) {
        (ElementState::Pressed, false) => KeyAction::Press,
        (ElementState::Pressed, true) => KeyAction::Repeat,
        (ElementState::Released, _) => KeyAction::Release,
    };
    KeyEvent { key, action }
}
