//! Tray icon and keyboard hook of the audio controller.
//!
//! The low level hook only records the matched action and pokes a notice, the actual
//! volume and media key work happens on the GUI thread in the notice handler.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::raw::c_int;
use std::ptr;
use winapi::shared::minwindef::{LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HHOOK;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::winuser::{
    CallNextHookEx,
    GetAsyncKeyState,
    SetWindowsHookExW,
    UnhookWindowsHookEx,
    HC_ACTION,
    KBDLLHOOKSTRUCT,
    VK_CONTROL,
    VK_LWIN,
    VK_MENU,
    VK_RWIN,
    VK_SHIFT,
    WH_KEYBOARD_LL,
    WM_KEYDOWN,
    WM_SYSKEYDOWN,
};
use tracing::{debug, error, info};
use crate::media::{find_binding, MediaAction, MediaController, Modifiers};
use crate::media_backend::{hotkey_from_vk, WindowsKeys, WindowsVolume};
use crate::view::ICON;

thread_local! {
    /// Actions matched by the hook, drained by the notice handler
    static PENDING: RefCell<VecDeque<MediaAction>> = RefCell::new(VecDeque::new());
    static NOTICE: RefCell<Option<nwg::NoticeSender>> = RefCell::new(None);
}

fn is_pressed(vk: c_int) -> bool {
    // High bit set means the key is down
    return unsafe { GetAsyncKeyState(vk) } < 0;
}

fn current_modifiers() -> Modifiers {
    return Modifiers {
        ctrl: is_pressed(VK_CONTROL),
        shift: is_pressed(VK_SHIFT),
        alt: is_pressed(VK_MENU),
        win: is_pressed(VK_LWIN) || is_pressed(VK_RWIN),
    };
}

unsafe extern "system" fn keyboard_hook(code: c_int, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    let key_down = w_param as UINT == WM_KEYDOWN || w_param as UINT == WM_SYSKEYDOWN;

    if code == HC_ACTION && key_down {
        let event = &*(l_param as *const KBDLLHOOKSTRUCT);
        let binding = hotkey_from_vk(event.vkCode)
            .and_then(|key| find_binding(key, current_modifiers()));

        if let Some(binding) = binding {
            PENDING.with(|pending| pending.borrow_mut().push_back(binding.action));
            NOTICE.with(|notice| {
                if let Some(sender) = notice.borrow().as_ref() {
                    sender.notice();
                }
            });
            if binding.suppress {
                return 1;
            }
        }
    }

    return CallNextHookEx(ptr::null_mut(), code, w_param, l_param);
}

/// Installed `WH_KEYBOARD_LL` hook, removed on drop
pub struct KeyboardHook(HHOOK);

impl KeyboardHook {
    pub fn install(sender: nwg::NoticeSender) -> io::Result<Self> {
        NOTICE.with(|notice| *notice.borrow_mut() = Some(sender));

        let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook), GetModuleHandleW(ptr::null()), 0) };
        if hook.is_null() {
            return Err(io::Error::last_os_error());
        }
        info!("Keyboard hook installed");
        return Ok(KeyboardHook(hook));
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        unsafe {
            UnhookWindowsHookEx(self.0);
        }
        NOTICE.with(|notice| *notice.borrow_mut() = None);
        debug!("Keyboard hook removed");
    }
}

#[derive(Default)]
pub struct AudioTray {
    window: nwg::MessageWindow,
    icon: nwg::Icon,
    tray: nwg::TrayNotification,
    tray_menu: nwg::Menu,
    quit_menu: nwg::MenuItem,
    hotkey_notice: nwg::Notice,
    controller: RefCell<Option<MediaController<WindowsVolume, WindowsKeys>>>,
    hook: RefCell<Option<KeyboardHook>>,
}

impl AudioTray {
    fn show_menu(&self) {
        let (x, y) = nwg::GlobalCursor::position();
        self.tray_menu.popup(x, y);
    }

    /// Callback for the hotkey notice
    fn run_pending_actions(&self) {
        let actions: Vec<MediaAction> = PENDING.with(|pending| pending.borrow_mut().drain(..).collect());

        let mut controller = self.controller.borrow_mut();
        let Some(controller) = controller.as_mut() else {
            return;
        };

        for action in actions {
            if let Err(err) = controller.perform(action) {
                error!(%action, error = %err, "Media action failed");
            }
        }
    }

    fn exit(&self) {
        self.hook.borrow_mut().take();
        self.tray.set_visibility(false);
        nwg::stop_thread_dispatch();
    }
}


mod audio_tray_ui {
    use native_windows_gui as nwg;
    use std::rc::Rc;
    use std::cell::RefCell;
    use std::ops::Deref;
    use crate::media::MediaController;
    use crate::media_backend::{WindowsKeys, WindowsVolume};
    use super::{AudioTray, KeyboardHook, ICON};

    pub struct AudioTrayUi {
        inner: Rc<AudioTray>,
        default_handler: RefCell<Vec<nwg::EventHandler>>,
    }

    impl nwg::NativeUi<AudioTrayUi> for AudioTray {
        fn build_ui(mut data: AudioTray) -> Result<AudioTrayUi, nwg::NwgError> {
            use nwg::Event as E;

            // Resources
            nwg::Icon::builder()
                .source_bin(Option::from(ICON))
                .build(&mut data.icon)?;

            // Controls
            nwg::MessageWindow::builder()
                .build(&mut data.window)?;

            nwg::TrayNotification::builder()
                .parent(&data.window)
                .icon(Some(&data.icon))
                .tip(Some("Audio Controller"))
                .build(&mut data.tray)?;

            nwg::Menu::builder()
                .popup(true)
                .parent(&data.window)
                .build(&mut data.tray_menu)?;

            nwg::MenuItem::builder()
                .text("Quit")
                .parent(&data.tray_menu)
                .build(&mut data.quit_menu)?;

            nwg::Notice::builder()
                .parent(&data.window)
                .build(&mut data.hotkey_notice)?;

            // Audio and hotkeys
            let volume = WindowsVolume::default_output()
                .map_err(|err| nwg::NwgError::initialization(format!("Failed to open the audio endpoint: {}", err)))?;
            *data.controller.borrow_mut() = Some(MediaController::new(volume, WindowsKeys));

            let hook = KeyboardHook::install(data.hotkey_notice.sender())
                .map_err(|err| nwg::NwgError::initialization(format!("Failed to install the keyboard hook: {}", err)))?;
            *data.hook.borrow_mut() = Some(hook);

            // Wrap-up
            let ui = AudioTrayUi {
                inner: Rc::new(data),
                default_handler: Default::default(),
            };

            // Events
            let evt_ui = Rc::downgrade(&ui.inner);
            let handle_events = move |evt, _evt_data, handle: nwg::ControlHandle| {
                if let Some(evt_ui) = evt_ui.upgrade() {
                    match evt {
                        E::OnNotice =>
                            if &handle == &evt_ui.hotkey_notice {
                                AudioTray::run_pending_actions(&evt_ui);
                            }
                        E::OnContextMenu =>
                            if &handle == &evt_ui.tray {
                                AudioTray::show_menu(&evt_ui);
                            }
                        E::OnMenuItemSelected =>
                            if &handle == &evt_ui.quit_menu {
                                AudioTray::exit(&evt_ui);
                            },
                        _ => {}
                    }
                }
            };

            ui.default_handler.borrow_mut().push(
                nwg::full_bind_event_handler(&ui.window.handle, handle_events)
            );

            return Ok(ui);
        }
    }

    impl Drop for AudioTrayUi {
        /// To make sure that everything is freed without issues, the default handler must be unbound.
        fn drop(&mut self) {
            let mut handlers = self.default_handler.borrow_mut();
            for handler in handlers.drain(0..) {
                nwg::unbind_event_handler(&handler);
            }
        }
    }

    impl Deref for AudioTrayUi {
        type Target = AudioTray;

        fn deref(&self) -> &AudioTray {
            &self.inner
        }
    }
}
