use std::time::{Duration, Instant};
use tracing::{debug, info};
use crate::settings::ReminderConfig;
use crate::timer::{TimerHandle, TimerQueue};

/// Lifecycle calls the scheduler makes on the reminder window
pub trait Popup {
    /// Shows the window with the given text
    fn show(&self, message: &str);
    /// Disables every way of closing the window
    fn lock_close(&self);
    /// Enables closing and replaces the text
    fn unlock_close(&self, message: &str);
    fn destroy(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Waiting for the next reminder
    Idle,
    /// Popup visible, closing disabled
    ShowingLocked,
    /// Popup visible, closing enabled
    ShowingUnlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    NextReminder,
    UnlockClose,
}

pub fn locked_message(look_away: Duration) -> String {
    return format!("Remember to look away\nfrom the screen\nfor {} seconds", look_away.as_secs());
}

pub fn unlocked_message(look_away: Duration) -> String {
    return format!(
        "{} seconds have passed.\nYou can now close this window\nand return to your work.",
        look_away.as_secs()
    );
}

/// The reminder cycle: Idle, then a locked popup, then an unlocked popup, then Idle again
pub struct ReminderScheduler {
    config: ReminderConfig,
    state: ReminderState,
    timers: TimerQueue<TimerKind>,
    next_reminder: Option<TimerHandle>,
    /// Look away time of the popup currently on screen
    popup_look_away: Duration,
}

impl ReminderScheduler {
    pub fn new(config: ReminderConfig) -> Self {
        Self {
            config,
            state: ReminderState::Idle,
            timers: TimerQueue::new(),
            next_reminder: None,
            popup_look_away: config.look_away(),
        }
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    pub fn config(&self) -> ReminderConfig {
        self.config
    }

    /// Handle of the pending "next reminder" timer, if one is armed
    pub fn next_reminder(&self) -> Option<TimerHandle> {
        self.next_reminder
    }

    /// When the next reminder is due, if one is armed
    pub fn next_reminder_at(&self) -> Option<Instant> {
        self.next_reminder.and_then(|handle| self.timers.deadline(handle))
    }

    /// Arms the next reminder, replacing the pending one if any
    pub fn schedule_next(&mut self, now: Instant) -> TimerHandle {
        if let Some(previous) = self.next_reminder.take() {
            if self.timers.cancel(previous) {
                debug!(?previous, "Cancelled the pending reminder");
            }
        }

        let handle = self.timers.schedule(now, self.config.interval(), TimerKind::NextReminder);
        debug!(?handle, interval = ?self.config.interval(), "Next reminder scheduled");
        self.next_reminder = Some(handle);
        return handle;
    }

    /// Applies new settings and re-arms the next reminder with the new interval.
    /// A popup that is already on screen keeps its own look away time.
    pub fn reschedule(&mut self, config: ReminderConfig, now: Instant) -> TimerHandle {
        self.config = config;
        return self.schedule_next(now);
    }

    /// Fires every timer that is due at `now`
    pub fn tick(&mut self, now: Instant, popup: &dyn Popup) {
        while let Some((handle, kind)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::NextReminder => {
                    if self.next_reminder == Some(handle) {
                        self.next_reminder = None;
                    }
                    self.show_reminder(now, popup);
                }
                TimerKind::UnlockClose => self.unlock(popup),
            }
        }
    }

    fn show_reminder(&mut self, now: Instant, popup: &dyn Popup) {
        if self.state != ReminderState::Idle {
            debug!(state = ?self.state, "A reminder is already on screen, ignoring the trigger");
            return;
        }

        self.popup_look_away = self.config.look_away();
        popup.show(&locked_message(self.popup_look_away));
        popup.lock_close();
        self.state = ReminderState::ShowingLocked;
        self.timers.schedule(now, self.popup_look_away, TimerKind::UnlockClose);

        info!(look_away = ?self.popup_look_away, "Showing the reminder");
    }

    fn unlock(&mut self, popup: &dyn Popup) {
        if self.state != ReminderState::ShowingLocked {
            return;
        }

        popup.unlock_close(&unlocked_message(self.popup_look_away));
        self.state = ReminderState::ShowingUnlocked;
        debug!("The reminder can now be closed");
    }

    /// Closes the popup if it is unlocked and arms the next reminder.
    /// Returns false, and leaves everything untouched, while the popup is locked or absent.
    pub fn dismiss(&mut self, now: Instant, popup: &dyn Popup) -> bool {
        if self.state != ReminderState::ShowingUnlocked {
            debug!(state = ?self.state, "Refusing to dismiss the reminder");
            return false;
        }

        popup.destroy();
        self.state = ReminderState::Idle;
        self.schedule_next(now);
        info!("Reminder dismissed");
        return true;
    }

    /// Cancels every pending timer, nothing fires afterwards unless rescheduled
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.next_reminder = None;
    }

    /// Number of armed timers, reminder and unlock combined
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::settings::ReminderUnit;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum PopupCall {
        Show(String),
        LockClose,
        UnlockClose(String),
        Destroy,
    }

    /// Records every call so tests can assert on the sequence
    #[derive(Default)]
    pub(crate) struct RecordingPopup {
        pub(crate) calls: RefCell<Vec<PopupCall>>,
    }

    impl RecordingPopup {
        pub(crate) fn take(&self) -> Vec<PopupCall> {
            self.calls.borrow_mut().drain(..).collect()
        }
    }

    impl Popup for RecordingPopup {
        fn show(&self, message: &str) {
            self.calls.borrow_mut().push(PopupCall::Show(message.to_string()));
        }

        fn lock_close(&self) {
            self.calls.borrow_mut().push(PopupCall::LockClose);
        }

        fn unlock_close(&self, message: &str) {
            self.calls.borrow_mut().push(PopupCall::UnlockClose(message.to_string()));
        }

        fn destroy(&self) {
            self.calls.borrow_mut().push(PopupCall::Destroy);
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn config(interval: u64, look_away: u64) -> ReminderConfig {
        ReminderConfig::new(secs(interval), secs(look_away), ReminderUnit::Seconds).unwrap()
    }

    #[test]
    fn nothing_happens_before_the_interval() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);

        scheduler.tick(start + secs(59), &popup);
        assert_eq!(scheduler.state(), ReminderState::Idle);
        assert!(popup.take().is_empty());
    }

    #[test]
    fn shows_a_locked_popup_when_the_interval_elapses() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);

        scheduler.tick(start + secs(60), &popup);
        assert_eq!(scheduler.state(), ReminderState::ShowingLocked);
        assert_eq!(scheduler.next_reminder(), None);
        assert_eq!(popup.take(), vec![
            PopupCall::Show(locked_message(secs(10))),
            PopupCall::LockClose,
        ]);
    }

    #[test]
    fn unlocks_only_after_the_look_away_time() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);
        scheduler.tick(start + secs(60), &popup);
        popup.take();

        scheduler.tick(start + secs(69), &popup);
        assert_eq!(scheduler.state(), ReminderState::ShowingLocked);

        scheduler.tick(start + secs(70), &popup);
        assert_eq!(scheduler.state(), ReminderState::ShowingUnlocked);
        assert_eq!(popup.take(), vec![PopupCall::UnlockClose(unlocked_message(secs(10)))]);
    }

    #[test]
    fn locked_popup_cannot_be_dismissed() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);
        scheduler.tick(start + secs(60), &popup);
        popup.take();

        assert!(!scheduler.dismiss(start + secs(61), &popup));
        assert_eq!(scheduler.state(), ReminderState::ShowingLocked);
        assert!(popup.take().is_empty());

        let mut idle = ReminderScheduler::new(config(60, 10));
        assert!(!idle.dismiss(start, &popup));
    }

    #[test]
    fn dismissing_rearms_the_next_reminder() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);
        scheduler.tick(start + secs(60), &popup);
        scheduler.tick(start + secs(70), &popup);
        popup.take();

        let closed_at = start + secs(75);
        assert!(scheduler.dismiss(closed_at, &popup));
        assert_eq!(scheduler.state(), ReminderState::Idle);
        assert_eq!(popup.take(), vec![PopupCall::Destroy]);
        assert_eq!(scheduler.next_reminder_at(), Some(closed_at + secs(60)));
        assert_eq!(scheduler.pending_timers(), 1);
    }

    #[test]
    fn never_stacks_a_second_popup() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 30));
        scheduler.schedule_next(start);
        scheduler.tick(start + secs(60), &popup);
        popup.take();

        // A settings change while the popup is up arms a reminder that fires before the popup closes
        scheduler.reschedule(config(5, 30), start + secs(61));
        scheduler.tick(start + secs(66), &popup);

        assert_eq!(scheduler.state(), ReminderState::ShowingLocked);
        assert!(popup.take().is_empty());
        assert_eq!(scheduler.next_reminder(), None);
    }

    #[test]
    fn rescheduling_replaces_exactly_one_timer() {
        let start = Instant::now();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        let first = scheduler.schedule_next(start);
        assert_eq!(scheduler.pending_timers(), 1);

        let changed_at = start + secs(20);
        let second = scheduler.reschedule(config(120, 10), changed_at);

        assert_ne!(first, second);
        assert_eq!(scheduler.pending_timers(), 1);
        assert_eq!(scheduler.next_reminder(), Some(second));
        assert_eq!(scheduler.next_reminder_at(), Some(changed_at + secs(120)));
        assert_eq!(scheduler.config().interval(), secs(120));
    }

    #[test]
    fn rescheduling_keeps_the_popup_on_screen_untouched() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);
        scheduler.tick(start + secs(60), &popup);
        popup.take();

        scheduler.reschedule(config(600, 45), start + secs(62));
        assert_eq!(scheduler.state(), ReminderState::ShowingLocked);

        // Still unlocks with the look away time it was shown with
        scheduler.tick(start + secs(70), &popup);
        assert_eq!(scheduler.state(), ReminderState::ShowingUnlocked);
        assert_eq!(popup.take(), vec![PopupCall::UnlockClose(unlocked_message(secs(10)))]);
    }

    #[test]
    fn stop_cancels_everything() {
        let start = Instant::now();
        let popup = RecordingPopup::default();
        let mut scheduler = ReminderScheduler::new(config(60, 10));
        scheduler.schedule_next(start);
        scheduler.stop();

        scheduler.tick(start + secs(3600), &popup);
        assert_eq!(scheduler.state(), ReminderState::Idle);
        assert_eq!(scheduler.pending_timers(), 0);
        assert!(popup.take().is_empty());
    }

    #[test]
    fn messages_use_whole_seconds() {
        assert_eq!(locked_message(secs(20)), "Remember to look away\nfrom the screen\nfor 20 seconds");
        assert_eq!(
            unlocked_message(Duration::from_millis(20_500)),
            "20 seconds have passed.\nYou can now close this window\nand return to your work."
        );
    }
}
