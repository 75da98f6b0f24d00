use std::cell::Cell;
use crate::scheduler::Popup;

/// The reminder window. It is built once, hidden, and then shown and hidden for every reminder.
#[derive(Default)]
pub struct ReminderPopup {
    pub(crate) window: nwg::Window,
    font: nwg::Font,
    label: nwg::Label,
    pub(crate) close_button: nwg::Button,
    closable: Cell<bool>,
}

/// Static controls want CRLF line breaks
fn to_windows_text(message: &str) -> String {
    return message.replace('\n', "\r\n");
}

impl ReminderPopup {
    pub(crate) fn build(popup: &mut ReminderPopup, icon: &nwg::Icon) -> Result<(), nwg::NwgError> {
        nwg::Window::builder()
            .size((300, 150))
            .center(true)
            .topmost(true)
            .title("Eye Saver Reminder")
            .icon(Some(icon))
            .flags(nwg::WindowFlags::WINDOW)
            .build(&mut popup.window)?;

        nwg::Font::builder()
            .family("Arial")
            .size(18)
            .build(&mut popup.font)?;

        nwg::Label::builder()
            .text("")
            .font(Some(&popup.font))
            .position((10, 10))
            .size((280, 80))
            .parent(&popup.window)
            .build(&mut popup.label)?;

        nwg::Button::builder()
            .text("Close")
            .enabled(false)
            .position((110, 100))
            .size((80, 30))
            .parent(&popup.window)
            .build(&mut popup.close_button)?;

        return Ok(());
    }

    pub fn is_closable(&self) -> bool {
        self.closable.get()
    }
}

impl Popup for ReminderPopup {
    fn show(&self, message: &str) {
        self.label.set_text(&to_windows_text(message));
        self.window.set_visible(true);
        self.window.set_focus();
    }

    fn lock_close(&self) {
        self.closable.set(false);
        self.close_button.set_enabled(false);
    }

    fn unlock_close(&self, message: &str) {
        self.label.set_text(&to_windows_text(message));
        self.close_button.set_enabled(true);
        self.closable.set(true);
    }

    fn destroy(&self) {
        self.closable.set(false);
        self.close_button.set_enabled(false);
        self.window.set_visible(false);
    }
}
