/// Mouse button codes understood by the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum MouseClick {
    Left = 1,
    Right = 2,
    /// Long press, reported as a held left button.
    HoldLeft = 10,
}

impl MouseClick {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            10 => Some(Self::HoldLeft),
            _ => None,
        }
    }
}

/// A key press as the engine sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyboardEvent {
    pub keycode: i32,
    /// Unicode scalar produced by the key, 0 if none.
    pub character: i32,
    pub shift: bool,
}

impl KeyboardEvent {
    /// `keycode | character << 16 | shift << 30`
    pub fn pack(self) -> i32 {
        self.keycode | (self.character << 16) | (i32::from(self.shift) << 30)
    }
}
