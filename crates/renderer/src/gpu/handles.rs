use std::fmt;
use std::num::NonZeroU32;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub fn from_raw(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

gpu_handle!(
    /// Vertex or index buffer.
    BufferId,
    "buffer"
);
gpu_handle!(
    /// Vertex buffer + index buffer + attribute layout.
    VertexArrayId,
    "vertex-array"
);
gpu_handle!(TextureId, "texture");
gpu_handle!(
    /// Linked vertex + fragment stage pair.
    ProgramId,
    "program"
);

/// Hands out raw handle values. Values are never reused, so a handle stays
/// distinct from every other one for the life of the context.
#[derive(Debug)]
pub struct HandleAllocator {
    next: NonZeroU32,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self {
            next: NonZeroU32::MIN,
        }
    }
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> NonZeroU32 {
        let raw = self.next;
        self.next = raw.checked_add(1).expect("GPU handle space exhausted");
        raw
    }
}
