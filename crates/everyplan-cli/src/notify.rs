//! Desktop notifications for reminders.

use std::time::Duration;

use everyplan_realtime::ReminderEvent;
use notify_rust::Notification;
use tracing::{error, info};

use crate::config::NotificationSettings;

/// Shows reminders as desktop notifications.
#[derive(Debug, Clone)]
pub struct ReminderNotifier {
    settings: NotificationSettings,
}

impl ReminderNotifier {
    /// Creates a notifier.
    pub fn new(settings: NotificationSettings) -> Self {
        Self { settings }
    }

    /// Shows one reminder. Returns true if the notification was delivered.
    pub fn show(&self, reminder: &ReminderEvent) -> bool {
        let (summary, body) = render(reminder);

        let mut notification = Notification::new();
        notification
            .appname(&self.settings.app_name)
            .summary(&summary)
            .body(&body)
            .timeout(Duration::from_secs(u64::from(self.settings.timeout_secs)));
        if let Some(ref icon) = self.settings.icon {
            notification.icon(icon);
        }

        match notification.show() {
            Ok(_) => {
                info!(schedule_id = ?reminder.identifier(), "reminder notification shown");
                true
            }
            Err(e) => {
                error!(error = %e, title = %reminder.title, "failed to show reminder notification");
                false
            }
        }
    }
}

/// Builds the notification summary and body for a reminder.
pub fn render(reminder: &ReminderEvent) -> (String, String) {
    let summary = if reminder.title.trim().is_empty() {
        "Upcoming schedule".to_string()
    } else {
        reminder.title.clone()
    };
    let mut lines = Vec::new();
    if let Some(when) = reminder.when() {
        lines.push(when);
    }
    let text = reminder.display_text();
    if !text.is_empty() && text != summary {
        lines.push(text.to_string());
    }
    (summary, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_title_time_and_message() {
        let reminder = ReminderEvent {
            schedule_id: Some("1".into()),
            title: "Dentist".into(),
            message: Some("Leave in 10 minutes".into()),
            schedule_date: Some("2024-05-01".into()),
            start_time: Some("09:00".into()),
            ..Default::default()
        };
        let (summary, body) = render(&reminder);
        assert_eq!(summary, "Dentist");
        assert_eq!(body, "2024-05-01 09:00\nLeave in 10 minutes");
    }

    #[test]
    fn untitled_reminder_without_details() {
        let (summary, body) = render(&ReminderEvent::default());
        assert_eq!(summary, "Upcoming schedule");
        assert_eq!(body, "");
    }
}
