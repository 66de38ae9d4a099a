//! Recording fakes for the graphics and windowing seams.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use renderer::gpu::{
    BufferId, BufferKind, ClearColor, GraphicsContext, HandleAllocator, ProgramId, ProgramSources,
    TextureDescriptor, TextureId, UniformLocation, VertexArrayDescriptor, VertexArrayId,
};
use renderer::pixels::PixelFormat;
use renderer::window::{dispatch_key, KeyCallback, KeyEvent, WindowHost};
use renderer::{normalize, CanonicalPixelBuffer, PixelBuffer};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateBuffer(BufferKind, BufferId),
    CreateVertexArray(VertexArrayId, VertexArrayDescriptor),
    CreateTexture(TextureId, TextureDescriptor),
    CreateProgram(ProgramId),
    SetSamplerUnit(ProgramId, UniformLocation, u32),
    UseProgram(ProgramId),
    Clear(ClearColor),
    BindTexture(u32, Option<TextureId>),
    BindVertexArray(Option<VertexArrayId>),
    DrawIndexed(u32),
    Present,
    DeleteVertexArray(VertexArrayId),
    DeleteBuffer(BufferId),
    DeleteTexture(TextureId),
    DeleteProgram(ProgramId),
    GpuDropped,
    SetKeyCallback,
    PollEvents,
    SwapBuffers,
    RequestClose,
    Terminate,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &CallLog, matches: impl Fn(&Call) -> bool) -> usize {
    log.borrow().iter().filter(|call| matches(call)).count()
}

/// Where the fake context should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    VertexArray,
    /// The n-th texture creation (zero-based).
    Texture(usize),
    Program,
    Draw,
}

/// Graphics context that records every call and tracks live handles.
pub struct FakeGpu {
    log: CallLog,
    handles: HandleAllocator,
    live: HashSet<u32>,
    textures_created: usize,
    fail: Option<FailPoint>,
    uniforms: Vec<&'static str>,
}

impl FakeGpu {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            handles: HandleAllocator::new(),
            live: HashSet::new(),
            textures_created: 0,
            fail: None,
            uniforms: vec!["ourTexture1", "ourTexture2"],
        }
    }

    pub fn failing_at(log: &CallLog, fail: FailPoint) -> Self {
        let mut gpu = Self::new(log);
        gpu.fail = Some(fail);
        gpu
    }

    /// Sampler uniform names every program reports.
    pub fn with_uniforms(mut self, uniforms: Vec<&'static str>) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn allocate(&mut self) -> std::num::NonZeroU32 {
        let raw = self.handles.allocate();
        self.live.insert(raw.get());
        raw
    }

    fn release(&mut self, raw: u32) {
        assert!(self.live.remove(&raw), "handle {raw} deleted twice or never created");
    }
}

impl GraphicsContext for FakeGpu {
    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId> {
        assert!(!contents.is_empty());
        let id = BufferId::from_raw(self.allocate());
        self.record(Call::CreateBuffer(kind, id));
        Ok(id)
    }

    fn create_vertex_array(&mut self, descriptor: &VertexArrayDescriptor) -> Result<VertexArrayId> {
        if self.fail == Some(FailPoint::VertexArray) {
            return Err(anyhow!("injected vertex array failure"));
        }
        let id = VertexArrayId::from_raw(self.allocate());
        self.record(Call::CreateVertexArray(id, descriptor.clone()));
        Ok(id)
    }

    fn create_texture(
        &mut self,
        _image: &CanonicalPixelBuffer,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureId> {
        let index = self.textures_created;
        self.textures_created += 1;
        if self.fail == Some(FailPoint::Texture(index)) {
            return Err(anyhow!("injected texture failure"));
        }
        let id = TextureId::from_raw(self.allocate());
        self.record(Call::CreateTexture(id, *descriptor));
        Ok(id)
    }

    fn create_program(&mut self, _sources: &ProgramSources) -> Result<ProgramId> {
        if self.fail == Some(FailPoint::Program) {
            return Err(anyhow!("injected link failure"));
        }
        let id = ProgramId::from_raw(self.allocate());
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|uniform| *uniform == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_sampler_unit(&mut self, program: ProgramId, location: UniformLocation, unit: u32) {
        self.record(Call::SetSamplerUnit(program, location, unit));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(Call::UseProgram(program));
    }

    fn clear(&mut self, color: ClearColor) {
        self.record(Call::Clear(color));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.record(Call::BindTexture(unit, texture));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        if self.fail == Some(FailPoint::Draw) {
            return Err(anyhow!("injected draw failure"));
        }
        self.record(Call::DrawIndexed(index_count));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.record(Call::Present);
        Ok(())
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.release(vertex_array.get());
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.release(buffer.get());
        self.record(Call::DeleteBuffer(buffer));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.release(texture.get());
        self.record(Call::DeleteTexture(texture));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.release(program.get());
        self.record(Call::DeleteProgram(program));
    }
}

impl Drop for FakeGpu {
    fn drop(&mut self) {
        self.record(Call::GpuDropped);
    }
}

/// Keys do nothing until a callback is registered.
fn ignore_keys(_: &KeyEvent, should_close: bool) -> bool {
    should_close
}

/// Window whose close flag flips after a fixed number of polls, with
/// optional key events delivered on given polls (one-based).
pub struct FakeWindow {
    log: CallLog,
    polls: Cell<usize>,
    close_after_polls: usize,
    close_requested: bool,
    keys: BTreeMap<usize, KeyEvent>,
    callback: KeyCallback,
}

impl FakeWindow {
    pub fn closing_after(log: &CallLog, polls: usize) -> Self {
        Self {
            log: log.clone(),
            polls: Cell::new(0),
            close_after_polls: polls,
            close_requested: false,
            keys: BTreeMap::new(),
            callback: ignore_keys,
        }
    }

    pub fn with_key_on_poll(mut self, poll: usize, event: KeyEvent) -> Self {
        self.keys.insert(poll, event);
        self
    }
}

impl WindowHost for FakeWindow {
    fn set_key_callback(&mut self, callback: KeyCallback) {
        self.callback = callback;
        self.log.borrow_mut().push(Call::SetKeyCallback);
    }

    fn poll_events(&mut self) {
        let poll = self.polls.get() + 1;
        self.polls.set(poll);
        self.log.borrow_mut().push(Call::PollEvents);
        if let Some(event) = self.keys.get(&poll).copied() {
            let callback = self.callback;
            dispatch_key(self, callback, &event);
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested || self.polls.get() >= self.close_after_polls
    }

    fn request_close(&mut self) {
        self.close_requested = true;
        self.log.borrow_mut().push(Call::RequestClose);
    }

    fn swap_buffers(&mut self) {
        self.log.borrow_mut().push(Call::SwapBuffers);
    }

    fn terminate(self) {
        self.log.borrow_mut().push(Call::Terminate);
    }
}

/// Solid-colour canonical image.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> CanonicalPixelBuffer {
    let bytes = rgba.repeat((width * height) as usize);
    let buffer = PixelBuffer::new(width, height, PixelFormat::RGBA8, bytes).unwrap();
    normalize(buffer).unwrap()
}

pub fn test_images() -> [CanonicalPixelBuffer; 2] {
    [
        solid_image(4, 4, [200, 120, 40, 255]),
        solid_image(2, 2, [10, 20, 30, 128]),
    ]
}
