use std::sync::atomic::{AtomicI32, Ordering};

use crate::device::SurfaceSize;

use super::types::{KeyboardEvent, MouseClick};

/// Latest-value input slots shared between host and render thread.
#[derive(Debug, Default)]
pub struct InputQueue {
    keyboard: AtomicI32,
    mouse_absolute: AtomicI32,
    mouse_relative: AtomicI32,
    mouse_buttons: AtomicI32,
    offset_x: AtomicI32,
    offset_y: AtomicI32,
}

fn pack_xy(x: i16, y: i16) -> i32 {
    // Both halves are masked so a negative x cannot bleed into y.
    ((x as u16 as u32) | ((y as u16 as u32) << 16)) as i32
}

/// Host coordinates to a 16-bit engine coordinate: saturate to i32, then wrap.
fn to_short(value: f32) -> i16 {
    value as i32 as i16
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen offset subtracted from absolute pointer positions.
    pub fn set_screen_offset(&self, x: i32, y: i32) {
        self.offset_x.store(x, Ordering::Relaxed);
        self.offset_y.store(y, Ordering::Relaxed);
    }

    pub fn screen_offset(&self) -> (i32, i32) {
        (
            self.offset_x.load(Ordering::Relaxed),
            self.offset_y.load(Ordering::Relaxed),
        )
    }

    pub fn move_mouse(&self, rel_x: f32, rel_y: f32, x: f32, y: f32) {
        let (ox, oy) = self.screen_offset();
        let abs_x = to_short(x - ox as f32).max(0);
        let abs_y = to_short(y - oy as f32).max(0);

        self.mouse_absolute
            .store(pack_xy(abs_x, abs_y), Ordering::Release);
        self.mouse_relative
            .store(pack_xy(to_short(rel_x), to_short(rel_y)), Ordering::Release);
    }

    /// Puts the pointer in the middle of a freshly created surface.
    pub fn center_mouse(&self, size: SurfaceSize) {
        let x = (size.width / 2).min(i16::MAX as u32) as i16;
        let y = (size.height / 2).min(i16::MAX as u32) as i16;
        self.mouse_absolute.store(pack_xy(x, y), Ordering::Release);
    }

    pub fn click_mouse(&self, button: MouseClick) {
        self.mouse_buttons.store(button.code(), Ordering::Release);
    }

    pub fn keyboard_event(&self, keycode: i32, character: i32, shift: bool) {
        let packed = KeyboardEvent {
            keycode,
            character,
            shift,
        }
        .pack();
        self.keyboard.store(packed, Ordering::Release);
    }

    // engine side

    /// Packed key of the last event, 0 if none. Clears the slot.
    pub fn poll_keyboard(&self) -> i32 {
        self.keyboard.swap(0, Ordering::AcqRel)
    }

    /// `x | (y & 0xFFFF) << 16` of the last position. Not cleared.
    pub fn poll_mouse_absolute(&self) -> i32 {
        self.mouse_absolute.load(Ordering::Acquire)
    }

    /// Relative motion since the last poll, packed like the absolute position.
    pub fn poll_mouse_relative(&self) -> i32 {
        self.mouse_relative.swap(0, Ordering::AcqRel)
    }

    /// Button code of the last click, 0 if none. Clears the slot.
    pub fn poll_mouse_buttons(&self) -> i32 {
        self.mouse_buttons.swap(0, Ordering::AcqRel)
    }
}
