use std::{thread, cell::RefCell};
use nwg::{ControlHandle, NativeUi};
use tracing::{error, warn};
use crate::settings::{ReminderConfig, ReminderUnit};

pub enum SettingsDialogData {
    Cancel,
    Value(ReminderConfig),
}

#[derive(Default)]
pub struct SettingsDialog {
    window: nwg::Window,
    icon: nwg::Icon,
    interval_label: nwg::Label,
    interval_input: nwg::TextInput,
    minutes_radio: nwg::RadioButton,
    seconds_radio: nwg::RadioButton,
    look_away_label: nwg::Label,
    look_away_input: nwg::TextInput,
    data: RefCell<Option<SettingsDialogData>>,
    save_button: nwg::Button,
    cancel_button: nwg::Button,
}

impl SettingsDialog {

    /// Create the dialog UI on a new thread. The dialog result will be returned by the thread handle.
    /// To alert the main GUI that the dialog completed, this function takes a notice sender object.
    pub(crate) fn popup(sender: nwg::NoticeSender, current: ReminderConfig) -> thread::JoinHandle<SettingsDialogData> {
        return thread::spawn(move || {
            let app = match SettingsDialog::build_ui(Default::default()) {
                Ok(app) => app,
                Err(err) => {
                    error!(error = %err, "Failed to build the settings window");
                    sender.notice();
                    return SettingsDialogData::Cancel;
                }
            };

            app.interval_input.set_text(&current.interval_in_unit().to_string());
            app.look_away_input.set_text(&current.look_away_seconds().to_string());
            match current.unit() {
                ReminderUnit::Minutes => app.minutes_radio.set_check_state(nwg::RadioButtonState::Checked),
                ReminderUnit::Seconds => app.seconds_radio.set_check_state(nwg::RadioButtonState::Checked),
            }

            nwg::dispatch_thread_events();

            // Notice the main thread that the dialog completed
            sender.notice();

            return app.data.take().unwrap_or(SettingsDialogData::Cancel);
        });
    }

    fn selected_unit(&self) -> ReminderUnit {
        if self.seconds_radio.check_state() == nwg::RadioButtonState::Checked {
            return ReminderUnit::Seconds;
        }
        return ReminderUnit::Minutes;
    }

    fn choose(&self, btn: &ControlHandle) {
        if btn == &self.save_button {
            let parsed = ReminderConfig::from_user_input(
                &self.interval_input.text(),
                self.selected_unit(),
                &self.look_away_input.text(),
            );

            match parsed {
                Ok(config) => *self.data.borrow_mut() = Some(SettingsDialogData::Value(config)),
                Err(err) => {
                    // Keep the window open so the user can fix the input
                    warn!(error = %err, "Rejected the settings input");
                    nwg::modal_error_message(&self.window, "Error", &err.to_string());
                    return;
                }
            }
        } else if btn == &self.cancel_button {
            *self.data.borrow_mut() = Some(SettingsDialogData::Cancel);
        }

        self.window.close();
    }

    fn exit(&self) {
        nwg::stop_thread_dispatch();
    }
}

mod settings_dialog_ui {
    use native_windows_gui as nwg;
    use super::*;
    use std::rc::Rc;
    use std::cell::RefCell;
    use std::ops::Deref;
    use crate::view::ICON;

    pub struct SettingsDialogUi {
        inner: Rc<SettingsDialog>,
        default_handler: RefCell<Vec<nwg::EventHandler>>,
    }

    impl NativeUi<SettingsDialogUi> for SettingsDialog {
        fn build_ui(mut data: SettingsDialog) -> Result<SettingsDialogUi, nwg::NwgError> {
            // Resources
            nwg::Icon::builder()
                .source_bin(Option::from(ICON))
                .build(&mut data.icon)?;

            // Controls
            nwg::Window::builder()
                .size((320, 160))
                .center(true)
                .topmost(true)
                .title("Eye Saver Settings")
                .icon(Some(&data.icon))
                .build(&mut data.window)?;

            let mut grid = nwg::GridLayout::default();
            nwg::GridLayout::builder()
                .parent(&data.window)
                .spacing(1)
                .build(&mut grid)?;

            nwg::Label::builder()
                .text("Reminder Interval:")
                .parent(&data.window)
                .build(&mut data.interval_label)?;

            nwg::TextInput::builder()
                .parent(&data.window)
                .build(&mut data.interval_input)?;

            nwg::RadioButton::builder()
                .text("Minutes")
                .flags(nwg::RadioButtonFlags::VISIBLE | nwg::RadioButtonFlags::GROUP)
                .parent(&data.window)
                .build(&mut data.minutes_radio)?;

            nwg::RadioButton::builder()
                .text("Seconds")
                .parent(&data.window)
                .build(&mut data.seconds_radio)?;

            nwg::Label::builder()
                .text("Look Away Time (seconds):")
                .parent(&data.window)
                .build(&mut data.look_away_label)?;

            nwg::TextInput::builder()
                .parent(&data.window)
                .build(&mut data.look_away_input)?;

            nwg::Button::builder()
                .text("Save")
                .parent(&data.window)
                .build(&mut data.save_button)?;

            nwg::Button::builder()
                .text("Cancel")
                .parent(&data.window)
                .build(&mut data.cancel_button)?;

            grid.add_child(0, 0, &data.interval_label);
            grid.add_child(1, 0, &data.interval_input);
            grid.add_child(0, 1, &data.minutes_radio);
            grid.add_child(1, 1, &data.seconds_radio);
            grid.add_child(0, 2, &data.look_away_label);
            grid.add_child(1, 2, &data.look_away_input);
            grid.add_child(0, 3, &data.save_button);
            grid.add_child(1, 3, &data.cancel_button);

            // Wrap-up
            let ui = SettingsDialogUi {
                inner: Rc::new(data),
                default_handler: Default::default(),
            };

            use nwg::Event as E;

            // Events
            let evt_ui = Rc::downgrade(&ui.inner);
            let handle_events = move |evt, _evt_data, handle: ControlHandle| {
                if let Some(ui) = evt_ui.upgrade() {
                    match evt {
                        E::OnButtonClick => {
                            if &handle == &ui.save_button || &handle == &ui.cancel_button {
                                SettingsDialog::choose(&ui, &handle);
                            }
                        }
                        E::OnWindowClose => {
                            if &handle == &ui.window {
                                SettingsDialog::exit(&ui);
                            }
                        }
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

    impl Drop for SettingsDialogUi {
        /// To make sure that everything is freed without issues, the default handler must be unbound.
        fn drop(&mut self) {
            let mut handlers = self.default_handler.borrow_mut();
            for handler in handlers.drain(0..) {
                nwg::unbind_event_handler(&handler);
            }
        }
    }

    impl Deref for SettingsDialogUi {
        type Target = SettingsDialog;

        fn deref(&self) -> &SettingsDialog {
            &self.inner
        }
    }
}
