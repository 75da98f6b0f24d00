//! Hotkey to media action mapping for the audio controller.
//!
//! Everything OS specific sits behind [`VolumeEndpoint`] and [`KeySender`], the Windows
//! implementations live in `media_backend`.

use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Volume change for one key press, on the 0.0 to 1.0 scalar scale
pub const VOLUME_STEP: f32 = 0.05;

pub const VK_MEDIA_NEXT_TRACK: u8 = 0xB0;
pub const VK_MEDIA_PREV_TRACK: u8 = 0xB1;
pub const VK_MEDIA_PLAY_PAUSE: u8 = 0xB3;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Audio endpoint call failed with HRESULT 0x{0:08X}")]
    Endpoint(i32),

    #[error("No audio endpoint is available")]
    NoEndpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    VolumeUp,
    VolumeDown,
    PreviousTrack,
    NextTrack,
    PlayPause,
}

impl MediaAction {
    /// Virtual key sent for the action, `None` for volume changes
    pub fn media_key(self) -> Option<u8> {
        match self {
            MediaAction::PreviousTrack => Some(VK_MEDIA_PREV_TRACK),
            MediaAction::NextTrack => Some(VK_MEDIA_NEXT_TRACK),
            MediaAction::PlayPause => Some(VK_MEDIA_PLAY_PAUSE),
            MediaAction::VolumeUp | MediaAction::VolumeDown => None,
        }
    }

    pub fn volume_delta(self) -> Option<f32> {
        match self {
            MediaAction::VolumeUp => Some(VOLUME_STEP),
            MediaAction::VolumeDown => Some(-VOLUME_STEP),
            _ => None,
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MediaAction::VolumeUp => "Volume increased",
            MediaAction::VolumeDown => "Volume decreased",
            MediaAction::PreviousTrack => "Previous track",
            MediaAction::NextTrack => "Next track",
            MediaAction::PlayPause => "Play/Pause",
        };
        f.write_str(text)
    }
}

/// Keys that take part in a hotkey, always combined with exactly ctrl+shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotKey {
    Up,
    Down,
    Left,
    Right,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: HotKey,
    pub action: MediaAction,
    /// Whether the key press is swallowed instead of reaching the focused window
    pub suppress: bool,
}

pub const BINDINGS: [HotkeyBinding; 5] = [
    HotkeyBinding { key: HotKey::Up, action: MediaAction::VolumeUp, suppress: false },
    HotkeyBinding { key: HotKey::Down, action: MediaAction::VolumeDown, suppress: false },
    HotkeyBinding { key: HotKey::Right, action: MediaAction::NextTrack, suppress: true },
    HotkeyBinding { key: HotKey::Left, action: MediaAction::PreviousTrack, suppress: true },
    HotkeyBinding { key: HotKey::Space, action: MediaAction::PlayPause, suppress: true },
];

/// Modifier keys held down at the time of a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl Modifiers {
    pub const CTRL_SHIFT: Modifiers = Modifiers { ctrl: true, shift: true, alt: false, win: false };
}

/// Finds the binding for a key press, only exactly ctrl+shift matches
pub fn find_binding(key: HotKey, modifiers: Modifiers) -> Option<&'static HotkeyBinding> {
    if modifiers != Modifiers::CTRL_SHIFT {
        return None;
    }
    return BINDINGS.iter().find(|binding| binding.key == key);
}

/// Applies `delta` to `current`, keeping the result within 0.0 and 1.0
pub fn clamp_volume(current: f32, delta: f32) -> f32 {
    return (current + delta).clamp(0.0, 1.0);
}

/// Master volume of the default output device
pub trait VolumeEndpoint {
    fn level(&self) -> Result<f32, MediaError>;
    fn set_level(&self, level: f32) -> Result<(), MediaError>;
}

/// Emits synthetic media key presses
pub trait KeySender {
    /// Sends one key down followed by one key up
    fn tap(&self, vk: u8);
}

pub struct MediaController<V, K> {
    volume: V,
    keys: K,
    action_triggered: bool,
}

impl<V: VolumeEndpoint, K: KeySender> MediaController<V, K> {
    pub fn new(volume: V, keys: K) -> Self {
        Self {
            volume,
            keys,
            action_triggered: false,
        }
    }

    pub fn perform(&mut self, action: MediaAction) -> Result<(), MediaError> {
        info!("{}", action);
        if let Some(delta) = action.volume_delta() {
            self.change_volume(delta)?;
            return Ok(());
        }
        if let Some(vk) = action.media_key() {
            self.media_control(vk);
        }
        return Ok(());
    }

    /// Returns the new level
    pub fn change_volume(&mut self, delta: f32) -> Result<f32, MediaError> {
        let level = clamp_volume(self.volume.level()?, delta);
        self.volume.set_level(level)?;
        return Ok(level);
    }

    fn media_control(&mut self, vk: u8) {
        if self.action_triggered {
            warn!(vk, "A media action is already in progress");
            return;
        }
        self.action_triggered = true;
        self.keys.tap(vk);
        self.action_triggered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakeVolume(Cell<f32>);

    impl VolumeEndpoint for FakeVolume {
        fn level(&self) -> Result<f32, MediaError> {
            Ok(self.0.get())
        }

        fn set_level(&self, level: f32) -> Result<(), MediaError> {
            self.0.set(level);
            Ok(())
        }
    }

    struct BrokenVolume;

    impl VolumeEndpoint for BrokenVolume {
        fn level(&self) -> Result<f32, MediaError> {
            Err(MediaError::NoEndpoint)
        }

        fn set_level(&self, _level: f32) -> Result<(), MediaError> {
            Err(MediaError::NoEndpoint)
        }
    }

    #[derive(Default)]
    struct FakeKeys(RefCell<Vec<u8>>);

    impl KeySender for &FakeKeys {
        fn tap(&self, vk: u8) {
            self.0.borrow_mut().push(vk);
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn volume_moves_by_one_step() {
        let keys = FakeKeys::default();
        let mut controller = MediaController::new(FakeVolume(Cell::new(0.5)), &keys);

        controller.perform(MediaAction::VolumeUp).unwrap();
        assert!(approx(controller.volume.0.get(), 0.55));

        controller.perform(MediaAction::VolumeDown).unwrap();
        controller.perform(MediaAction::VolumeDown).unwrap();
        assert!(approx(controller.volume.0.get(), 0.45));
        assert!(keys.0.borrow().is_empty());
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(clamp_volume(0.98, VOLUME_STEP), 1.0);
        assert_eq!(clamp_volume(0.02, -VOLUME_STEP), 0.0);
        assert_eq!(clamp_volume(1.0, VOLUME_STEP), 1.0);
        assert_eq!(clamp_volume(0.0, -VOLUME_STEP), 0.0);
    }

    #[test]
    fn media_actions_tap_their_key() {
        let keys = FakeKeys::default();
        let mut controller = MediaController::new(FakeVolume(Cell::new(0.5)), &keys);

        controller.perform(MediaAction::NextTrack).unwrap();
        controller.perform(MediaAction::PreviousTrack).unwrap();
        controller.perform(MediaAction::PlayPause).unwrap();
        controller.perform(MediaAction::PlayPause).unwrap();

        assert_eq!(*keys.0.borrow(), vec![
            VK_MEDIA_NEXT_TRACK,
            VK_MEDIA_PREV_TRACK,
            VK_MEDIA_PLAY_PAUSE,
            VK_MEDIA_PLAY_PAUSE,
        ]);
        assert!(!controller.action_triggered);
        assert!(approx(controller.volume.0.get(), 0.5));
    }

    #[test]
    fn endpoint_errors_are_propagated() {
        let keys = FakeKeys::default();
        let mut controller = MediaController::new(BrokenVolume, &keys);

        assert!(matches!(controller.perform(MediaAction::VolumeUp), Err(MediaError::NoEndpoint)));
        assert!(controller.perform(MediaAction::NextTrack).is_ok());
    }

    #[test]
    fn hotkeys_require_exactly_ctrl_and_shift() {
        let ctrl_shift = Modifiers::CTRL_SHIFT;
        assert_eq!(find_binding(HotKey::Up, ctrl_shift).map(|b| b.action), Some(MediaAction::VolumeUp));
        assert_eq!(find_binding(HotKey::Up, Modifiers { shift: false, ..ctrl_shift }), None);
        assert_eq!(find_binding(HotKey::Up, Modifiers { ctrl: false, ..ctrl_shift }), None);
        assert_eq!(find_binding(HotKey::Up, Modifiers::default()), None);

        // Extra modifiers make it a different combination
        assert_eq!(find_binding(HotKey::Space, Modifiers { alt: true, ..ctrl_shift }), None);
        assert_eq!(find_binding(HotKey::Space, Modifiers { win: true, ..ctrl_shift }), None);
        assert_eq!(find_binding(HotKey::Left, Modifiers { alt: true, win: true, ..ctrl_shift }), None);
    }

    #[test]
    fn only_track_keys_are_suppressed() {
        let suppressed: Vec<HotKey> = BINDINGS.iter()
            .filter(|binding| binding.suppress)
            .map(|binding| binding.key)
            .collect();
        assert_eq!(suppressed, vec![HotKey::Right, HotKey::Left, HotKey::Space]);

        assert_eq!(find_binding(HotKey::Left, Modifiers::CTRL_SHIFT).map(|b| b.action), Some(MediaAction::PreviousTrack));
        assert_eq!(find_binding(HotKey::Right, Modifiers::CTRL_SHIFT).map(|b| b.action), Some(MediaAction::NextTrack));
        assert_eq!(find_binding(HotKey::Space, Modifiers::CTRL_SHIFT).map(|b| b.action), Some(MediaAction::PlayPause));
        assert_eq!(find_binding(HotKey::Down, Modifiers::CTRL_SHIFT).map(|b| b.action), Some(MediaAction::VolumeDown));
    }
}
