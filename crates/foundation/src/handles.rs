/// Opaque reference into a rendering surface: `(index, generation)`.
///
/// The generation identifies the surface instance that issued the handle, so a
/// handle kept past its surface can be told apart from a live one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(u32, u32);

impl NativeHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        NativeHandle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }
}
