use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Instant;
use tracing::{debug, info, warn};
use crate::error::SettingsError;
use crate::scheduler::{Popup, ReminderScheduler, ReminderState};
use crate::settings::{ReminderConfig, SettingsManager};

/// Commands posted by the tray menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenSettings,
    Quit,
}

/// Creates the queue between the tray menu and the controller
pub fn command_channel() -> (Sender<Command>, Receiver<Command>) {
    return mpsc::channel();
}

/// Owns the whole application state, driven by the GUI loop
pub struct Controller {
    settings: SettingsManager,
    scheduler: ReminderScheduler,
    commands: Receiver<Command>,
    running: bool,
}

impl Controller {
    pub fn new(settings: SettingsManager, commands: Receiver<Command>) -> Self {
        let scheduler = ReminderScheduler::new(settings.config());
        Self {
            settings,
            scheduler,
            commands,
            running: true,
        }
    }

    /// Arms the first reminder
    pub fn start(&mut self, now: Instant) {
        self.scheduler.schedule_next(now);
        info!(interval = ?self.config().interval(), look_away = ?self.config().look_away(), "Eye Saver started");
    }

    /// One loop iteration: fires the due timers, then polls the command queue once without blocking.
    ///
    /// Commands the GUI has to act on are returned. `Quit` is handled here before being returned.
    pub fn tick(&mut self, now: Instant, popup: &dyn Popup) -> Option<Command> {
        if !self.running {
            return None;
        }

        self.scheduler.tick(now, popup);

        match self.commands.try_recv() {
            Ok(Command::Quit) => {
                self.quit();
                Some(Command::Quit)
            }
            Ok(command) => {
                debug!(?command, "Received command");
                Some(command)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("The command queue was closed, quitting");
                self.quit();
                Some(Command::Quit)
            }
        }
    }

    /// Called when the user closes the popup, see [`ReminderScheduler::dismiss`]
    pub fn dismiss(&mut self, now: Instant, popup: &dyn Popup) -> bool {
        if !self.running {
            return false;
        }
        return self.scheduler.dismiss(now, popup);
    }

    /// Persists the new settings and re-arms the next reminder with them.
    /// On failure nothing changes, neither the file nor the schedule.
    pub fn apply_settings(&mut self, config: ReminderConfig, now: Instant) -> Result<(), SettingsError> {
        self.settings.save(config)?;
        self.scheduler.reschedule(config, now);
        info!(interval = ?config.interval(), look_away = ?config.look_away(), "Settings applied");
        return Ok(());
    }

    pub fn quit(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.stop();
        info!("Quitting");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> ReminderConfig {
        self.settings.config()
    }

    pub fn state(&self) -> ReminderState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use crate::scheduler::tests::{PopupCall, RecordingPopup};
    use crate::settings::ReminderUnit;

    fn controller(dir: &TempDir) -> (Controller, Sender<Command>) {
        let settings = SettingsManager::open(dir.path().join("eye_saver_settings.json")).ok().unwrap();
        let (sender, receiver) = command_channel();
        (Controller::new(settings, receiver), sender)
    }

    #[test]
    fn polls_one_command_per_tick() {
        let dir = TempDir::new().unwrap();
        let (mut controller, sender) = controller(&dir);
        let popup = RecordingPopup::default();
        let now = Instant::now();
        controller.start(now);

        sender.send(Command::OpenSettings).unwrap();
        sender.send(Command::OpenSettings).unwrap();

        assert_eq!(controller.tick(now, &popup), Some(Command::OpenSettings));
        assert_eq!(controller.tick(now, &popup), Some(Command::OpenSettings));
        assert_eq!(controller.tick(now, &popup), None);
    }

    #[test]
    fn quit_stops_the_loop_and_the_timers() {
        let dir = TempDir::new().unwrap();
        let (mut controller, sender) = controller(&dir);
        let popup = RecordingPopup::default();
        let now = Instant::now();
        controller.start(now);

        sender.send(Command::Quit).unwrap();
        assert_eq!(controller.tick(now, &popup), Some(Command::Quit));
        assert!(!controller.is_running());
        assert_eq!(controller.scheduler().pending_timers(), 0);

        // Nothing fires after quitting, even long past the interval
        assert_eq!(controller.tick(now + Duration::from_secs(3600), &popup), None);
        assert!(popup.take().is_empty());
    }

    #[test]
    fn closed_queue_quits() {
        let dir = TempDir::new().unwrap();
        let (mut controller, sender) = controller(&dir);
        drop(sender);

        assert_eq!(controller.tick(Instant::now(), &RecordingPopup::default()), Some(Command::Quit));
        assert!(!controller.is_running());
    }

    #[test]
    fn applying_settings_saves_and_reschedules() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _sender) = controller(&dir);
        let now = Instant::now();
        controller.start(now);
        let before = controller.scheduler().next_reminder().unwrap();

        let config = ReminderConfig::from_user_input("30", ReminderUnit::Seconds, "5").unwrap();
        let changed_at = now + Duration::from_secs(10);
        controller.apply_settings(config, changed_at).unwrap();

        assert_eq!(controller.config(), config);
        assert_ne!(controller.scheduler().next_reminder(), Some(before));
        assert_eq!(controller.scheduler().pending_timers(), 1);
        assert_eq!(controller.scheduler().next_reminder_at(), Some(changed_at + Duration::from_secs(30)));
        assert!(dir.path().join("eye_saver_settings.json").exists());
    }

    #[test]
    fn failed_save_keeps_the_schedule() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsManager::open(dir.path().join("gone").join("eye_saver_settings.json")).ok().unwrap();
        let (_sender, receiver) = command_channel();
        let mut controller = Controller::new(settings, receiver);
        let now = Instant::now();
        controller.start(now);
        let before = controller.scheduler().next_reminder_at();

        let config = ReminderConfig::from_user_input("1", ReminderUnit::Minutes, "5").unwrap();
        assert!(controller.apply_settings(config, now + Duration::from_secs(1)).is_err());
        assert_eq!(controller.config(), ReminderConfig::default());
        assert_eq!(controller.scheduler().next_reminder_at(), before);
    }

    #[test]
    fn rejected_settings_leave_the_file_and_schedule_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eye_saver_settings.json");
        fs::write(&path, r#"{"reminder_interval": 60000, "look_away_time": 20000, "reminder_unit": "minutes"}"#).unwrap();
        let (mut controller, _sender) = controller(&dir);
        let now = Instant::now();
        controller.start(now);
        let before = fs::read_to_string(&path).unwrap();
        let scheduled = controller.scheduler().next_reminder_at();

        for invalid in [
            r#"{"reminder_interval": 0, "look_away_time": 20000, "reminder_unit": "minutes"}"#,
            r#"{"reminder_interval": 60000, "look_away_time": -20000, "reminder_unit": "minutes"}"#,
        ] {
            let config: ReminderConfig = serde_json::from_str(invalid).unwrap();
            let result = controller.apply_settings(config, now + Duration::from_secs(5));
            assert!(matches!(result, Err(SettingsError::InvalidInput(_))));
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(controller.config().interval(), Duration::from_secs(60));
        assert_eq!(controller.scheduler().next_reminder_at(), scheduled);
    }

    #[test]
    fn very_long_intervals_are_scheduled() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _sender) = controller(&dir);
        let popup = RecordingPopup::default();
        let now = Instant::now();
        controller.start(now);

        let config = ReminderConfig::from_user_input("1e12", ReminderUnit::Minutes, "20").unwrap();
        controller.apply_settings(config, now).unwrap();

        assert_eq!(controller.scheduler().pending_timers(), 1);
        assert_eq!(controller.tick(now + Duration::from_secs(30 * 24 * 60 * 60), &popup), None);
        assert!(popup.take().is_empty());
        assert_eq!(controller.state(), ReminderState::Idle);
    }

    #[test]
    fn dismiss_goes_through_the_scheduler() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _sender) = controller(&dir);
        let popup = RecordingPopup::default();
        let start = Instant::now();
        controller.start(start);

        let shown = start + Duration::from_secs(20 * 60);
        controller.tick(shown, &popup);
        assert!(!controller.dismiss(shown, &popup));

        controller.tick(shown + Duration::from_secs(20), &popup);
        assert!(controller.dismiss(shown + Duration::from_secs(21), &popup));
        assert_eq!(popup.take().last(), Some(&PopupCall::Destroy));
        assert_eq!(controller.state(), ReminderState::Idle);
    }
}
