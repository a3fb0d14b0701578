//! Messages from the engine side to the host UI.
//!
//! The engine never touches host widgets directly; it posts a [`HostMessage`]
//! and the host drains them on its own thread.

#[cfg(feature = "winit")]
mod event_loop;

#[cfg(feature = "winit")]
pub use event_loop::{run, WinitHostConfig};

use flume::{Receiver, SendError, Sender, TryRecvError};

/// Requested screen orientation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Engine rotation code: 1 portrait, 2 landscape, anything else unlocked.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Portrait),
            2 => Some(Self::Landscape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HostMessage {
    /// The engine has started and the host should show the game view.
    SwitchToInGame,
    /// Modal message, usually an error the player must acknowledge.
    ShowMessage(String),
    ShowToast(String),
    /// `None` unlocks the orientation.
    SetOrientation(Option<Orientation>),
    EnableLongClick,
}

/// Cloneable sending half, handed to the render thread and the engine.
#[derive(Debug, Clone)]
pub struct HostSender {
    tx: Sender<HostMessage>,
}

impl HostSender {
    /// Posts a message. A host that has gone away is logged, not an error.
    pub fn send(&self, message: HostMessage) {
        if let Err(SendError(message)) = self.tx.send(message) {
            log::warn!("host is gone, dropping {message:?}");
        }
    }

    pub fn switch_to_in_game(&self) {
        self.send(HostMessage::SwitchToInGame);
    }

    pub fn show_message(&self, text: impl Into<String>) {
        self.send(HostMessage::ShowMessage(text.into()));
    }

    pub fn show_toast(&self, text: impl Into<String>) {
        self.send(HostMessage::ShowToast(text.into()));
    }

    pub fn set_rotation(&self, code: i32) {
        self.send(HostMessage::SetOrientation(Orientation::from_code(code)));
    }

    pub fn enable_long_click(&self) {
        self.send(HostMessage::EnableLongClick);
    }
}

/// Receiving half, owned by the host thread.
#[derive(Debug)]
pub struct HostMessages {
    rx: Receiver<HostMessage>,
}

impl HostMessages {
    /// Next queued message, if any. Never blocks.
    pub fn try_next(&self) -> Option<HostMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now.
    pub fn drain(&self) -> impl Iterator<Item = HostMessage> + '_ {
        self.rx.try_iter()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<HostMessage> {
        self.rx.recv_timeout(timeout).ok()
    }
}

pub fn channel() -> (HostSender, HostMessages) {
    let (tx, rx) = flume::unbounded();
    (HostSender { tx }, HostMessages { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_arrive_in_order() {
        let (tx, rx) = channel();
        tx.switch_to_in_game();
        tx.show_toast("saved");
        tx.enable_long_click();

        let got: Vec<_> = rx.drain().collect();
        assert_eq!(
            got,
            vec![
                HostMessage::SwitchToInGame,
                HostMessage::ShowToast("saved".into()),
                HostMessage::EnableLongClick,
            ]
        );
        assert_eq!(rx.try_next(), None);
    }

    #[test]
    fn rotation_codes() {
        let (tx, rx) = channel();
        tx.set_rotation(1);
        tx.set_rotation(2);
        tx.set_rotation(0);

        assert_eq!(rx.try_next(), Some(HostMessage::SetOrientation(Some(Orientation::Portrait))));
        assert_eq!(rx.try_next(), Some(HostMessage::SetOrientation(Some(Orientation::Landscape))));
        assert_eq!(rx.try_next(), Some(HostMessage::SetOrientation(None)));
    }

    #[test]
    fn sending_after_host_drop_is_harmless() {
        let (tx, rx) = channel();
        drop(rx);
        tx.show_message("nobody listens");
    }
}
