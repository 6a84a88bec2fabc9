//! Entity implementation

use slotmap::Key;

slotmap::new_key_type! {
    /// Entity identifier: a generational index into the [`World`](super::World) arena
    pub struct Entity;
}

impl Entity {
    /// Stable numeric form, for logging
    pub fn id(self) -> u64 {
        self.data().as_ffi()
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({:#x})", self.id())
    }
}
