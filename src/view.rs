use std::{thread, cell::RefCell};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use crate::controller::{Command, Controller};
use crate::popup::ReminderPopup;
use crate::scheduler::Popup;
use crate::settings::format_duration;
use crate::settings_dialog::{SettingsDialog, SettingsDialogData};

pub static ICON: &[u8] = include_bytes!("../icon.ico");

/// How often the loop services timers and polls the command queue
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
pub struct SystemTray {
    window: nwg::MessageWindow,
    icon: nwg::Icon,
    tray: nwg::TrayNotification,
    tray_menu: nwg::Menu,
    settings_menu: nwg::MenuItem,
    separator: nwg::MenuSeparator,
    quit_menu: nwg::MenuItem,
    tick_timer: nwg::AnimationTimer,
    popup: ReminderPopup,
    controller: RefCell<Option<Controller>>,
    commands: RefCell<Option<Sender<Command>>>,
    settings_dialog_data: RefCell<Option<thread::JoinHandle<SettingsDialogData>>>,
    settings_dialog_notice: nwg::Notice,
}

impl SystemTray {
    fn show_menu(&self) {
        let (x, y) = nwg::GlobalCursor::position();
        self.tray_menu.popup(x, y);
    }

    fn show_start_message(&self) {
        let flags = nwg::TrayNotificationFlags::USER_ICON | nwg::TrayNotificationFlags::LARGE_ICON;
        self.tray.show("Eye Saver", Some("Eye Saver is running in the system tray"), Some(flags), Some(&self.icon));
    }

    /// Shows the failed to load the settings file error message
    fn show_settings_load_failed_message(&self, error_message: &str) {
        let message = format!("Failed to load the settings file!\nThe default settings will be used instead.\n\nError: {}", error_message);
        nwg::modal_error_message(&self.window, "Settings loading failed", &message);
    }

    /// Posts a command for the loop, the tray menu never acts directly
    fn send(&self, command: Command) {
        if let Some(sender) = self.commands.borrow().as_ref() {
            if sender.send(command).is_err() {
                warn!(?command, "The command queue is closed");
            }
        }
    }

    fn quit_selected(&self) {
        self.send(Command::Quit);
        self.tray.set_visibility(false);
    }

    /// One iteration of the loop, driven by the tick timer
    fn tick(&self) {
        let command = self.controller.borrow_mut()
            .as_mut()
            .and_then(|controller| controller.tick(Instant::now(), &self.popup));

        match command {
            Some(Command::OpenSettings) => self.open_settings(),
            Some(Command::Quit) => self.exit(),
            None => {}
        }
    }

    /// Called on the close button and on the window close box, the latter only counts once unlocked
    fn dismiss_popup(&self) {
        if !self.popup.is_closable() {
            return;
        }
        // The popup can deliver events while a tick is showing it
        let Ok(mut controller) = self.controller.try_borrow_mut() else {
            return;
        };
        if let Some(controller) = controller.as_mut() {
            controller.dismiss(Instant::now(), &self.popup);
        }
    }

    /// Opens the settings window, unless it is already open
    fn open_settings(&self) {
        if self.settings_dialog_data.borrow().is_some() {
            info!("The settings window is already open");
            return;
        }

        let current = match self.controller.borrow().as_ref() {
            Some(controller) => controller.config(),
            None => return,
        };

        *self.settings_dialog_data.borrow_mut() = Some(SettingsDialog::popup(
            self.settings_dialog_notice.sender(),
            current,
        ));
    }

    /// Callback for the settings dialog notice
    fn read_settings_dialog_output(&self) {
        let data = self.settings_dialog_data.borrow_mut().take();
        let Some(handle) = data else {
            return;
        };

        let dialog_result = match handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("The settings window thread panicked");
                return;
            }
        };

        match dialog_result {
            SettingsDialogData::Value(config) => {
                let result = match self.controller.borrow_mut().as_mut() {
                    Some(controller) => controller.apply_settings(config, Instant::now()),
                    None => return,
                };

                match result {
                    Ok(()) => {
                        self.update_tooltip();
                        nwg::modal_info_message(&self.window, "Settings Saved", "Your settings have been saved and applied.");
                    }
                    Err(err) => {
                        error!(error = %err, "Failed to save the settings");
                        nwg::modal_error_message(&self.window, "Error", &format!("Failed to save the settings: {}", err));
                    }
                }
            }
            SettingsDialogData::Cancel => {}
        }
    }

    /// Updates the tooltip to reflect the current settings
    fn update_tooltip(&self) {
        let config = match self.controller.borrow().as_ref() {
            Some(controller) => controller.config(),
            None => return,
        };

        let tooltip = format!(
            "Eye Saver\nReminder every: {}\nLook away for: {}",
            format_duration(config.interval()),
            format_duration(config.look_away()),
        );
        self.tray.set_tip(&tooltip);
    }

    fn exit(&self) {
        self.tick_timer.stop();
        self.popup.destroy();
        self.tray.set_visibility(false);
        nwg::stop_thread_dispatch();
    }
}


//
// Everything below is what native-windows-derive would otherwise generate
//
mod system_tray_ui {
    use native_windows_gui as nwg;
    use std::rc::Rc;
    use std::cell::RefCell;
    use std::ops::Deref;
    use std::time::Instant;
    use crate::controller::{command_channel, Controller};
    use crate::popup::ReminderPopup;
    use crate::settings::SettingsManager;
    use crate::view::{ICON, SystemTray, TICK_INTERVAL};

    pub struct SystemTrayUi {
        inner: Rc<SystemTray>,
        default_handler: RefCell<Vec<nwg::EventHandler>>,
    }

    impl nwg::NativeUi<SystemTrayUi> for SystemTray {
        fn build_ui(mut data: SystemTray) -> Result<SystemTrayUi, nwg::NwgError> {
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
                .tip(Some("Eye Saver"))
                .build(&mut data.tray)?;

            nwg::Menu::builder()
                .popup(true)
                .parent(&data.window)
                .build(&mut data.tray_menu)?;

            nwg::MenuItem::builder()
                .text("Settings")
                .parent(&data.tray_menu)
                .build(&mut data.settings_menu)?;

            nwg::MenuSeparator::builder()
                .parent(&data.tray_menu)
                .build(&mut data.separator)?;

            nwg::MenuItem::builder()
                .text("Quit")
                .parent(&data.tray_menu)
                .build(&mut data.quit_menu)?;

            nwg::AnimationTimer::builder()
                .parent(&data.window)
                .interval(TICK_INTERVAL)
                .build(&mut data.tick_timer)?;

            ReminderPopup::build(&mut data.popup, &data.icon)?;

            // Dialog events
            nwg::Notice::builder()
                .parent(&data.window)
                .build(&mut data.settings_dialog_notice)?;

            // Wrap-up
            let ui = SystemTrayUi {
                inner: Rc::new(data),
                default_handler: Default::default(),
            };

            // Setup the controller
            let settings_manager = SettingsManager::new().unwrap_or_else(|(err, manager)| {
                ui.inner.show_settings_load_failed_message(&err.to_string());
                return manager;
            });
            let (sender, receiver) = command_channel();
            let mut controller = Controller::new(settings_manager, receiver);
            controller.start(Instant::now());
            *ui.inner.controller.borrow_mut() = Some(controller);
            *ui.inner.commands.borrow_mut() = Some(sender);

            // Update the UI to reflect the controller state at startup
            ui.inner.update_tooltip();
            SystemTray::show_start_message(&ui.inner);

            // Events
            let evt_ui = Rc::downgrade(&ui.inner);
            let handle_events = move |evt, _evt_data, handle: nwg::ControlHandle| {
                if let Some(evt_ui) = evt_ui.upgrade() {
                    match evt {
                        E::OnTimerTick =>
                            if &handle == &evt_ui.tick_timer {
                                SystemTray::tick(&evt_ui);
                            }
                        E::OnNotice =>
                            if &handle == &evt_ui.settings_dialog_notice {
                                SystemTray::read_settings_dialog_output(&evt_ui);
                            }
                        E::OnContextMenu =>
                            if &handle == &evt_ui.tray {
                                SystemTray::show_menu(&evt_ui);
                            }
                        E::OnMenuItemSelected =>
                            if &handle == &evt_ui.settings_menu {
                                SystemTray::send(&evt_ui, crate::controller::Command::OpenSettings);
                            }
                            else if &handle == &evt_ui.quit_menu {
                                SystemTray::quit_selected(&evt_ui);
                            },
                        _ => {}
                    }
                }
            };

            ui.default_handler.borrow_mut().push(
                nwg::full_bind_event_handler(&ui.window.handle, handle_events)
            );

            // The popup is a top level window, its events need their own handler
            let popup_ui = Rc::downgrade(&ui.inner);
            let handle_popup_events = move |evt, evt_data: nwg::EventData, handle: nwg::ControlHandle| {
                if let Some(popup_ui) = popup_ui.upgrade() {
                    match evt {
                        E::OnButtonClick =>
                            if &handle == &popup_ui.popup.close_button {
                                SystemTray::dismiss_popup(&popup_ui);
                            }
                        E::OnWindowClose =>
                            if &handle == &popup_ui.popup.window {
                                // Never let Windows destroy the window, it is hidden and reused instead
                                if let nwg::EventData::OnWindowClose(close_data) = &evt_data {
                                    close_data.close(false);
                                }
                                SystemTray::dismiss_popup(&popup_ui);
                            },
                        _ => {}
                    }
                }
            };

            ui.default_handler.borrow_mut().push(
                nwg::full_bind_event_handler(&ui.popup.window.handle, handle_popup_events)
            );

            ui.tick_timer.start();

            return Ok(ui);
        }
    }

    impl Drop for SystemTrayUi {
        /// To make sure that everything is freed without issues, the default handler must be unbound.
        fn drop(&mut self) {
            let mut handlers = self.default_handler.borrow_mut();
            for handler in handlers.drain(0..) {
                nwg::unbind_event_handler(&handler);
            }
        }
    }

    impl Deref for SystemTrayUi {
        type Target = SystemTray;

        fn deref(&self) -> &SystemTray {
            &self.inner
        }
    }
}
