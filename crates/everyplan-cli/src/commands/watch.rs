//! `everyplan watch`: keep the session alive and follow reminders.

use chrono::Local;
use everyplan_realtime::{RealtimeClient, RealtimeNotification};
use everyplan_session::{BootstrapOutcome, TokenMonitor, bootstrap};
use tokio::sync::mpsc;
use tracing::info;

use crate::commands::session_context;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::notify::{ReminderNotifier, render};

/// Runs until Ctrl-C or until the session ends.
pub async fn watch(config: &CliConfig, notify: bool) -> CliResult<()> {
    let ctx = session_context(config)?;
    match bootstrap(&ctx).await {
        BootstrapOutcome::Restored => println!("using configured credentials"),
        BootstrapOutcome::Exchanged(profile) => println!(
            "logged in as {}",
            profile
                .user_nickname
                .or(profile.user_email)
                .unwrap_or_else(|| "unknown user".to_string())
        ),
        BootstrapOutcome::LoggedOut => return Err(CliError::NotLoggedIn),
    }

    let monitor = TokenMonitor::new(ctx.clone(), config.monitor_config()).spawn();
    let realtime = RealtimeClient::new(ctx.clone(), config.realtime_config(ctx.config())?)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<RealtimeNotification>();
    let subscription = realtime.subscribe(tx);

    let notifier = (notify || config.notifications.enabled)
        .then(|| ReminderNotifier::new(config.notifications.clone()));

    let ended = ctx.signal().ended().wait();
    tokio::pin!(ended);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let result = loop {
        tokio::select! {
            notification = rx.recv() => match notification {
                Some(notification) => print_notification(&notification, notifier.as_ref()),
                None => break Ok(()),
            },
            _ = &mut ended => break Err(CliError::SessionEnded),
            _ = &mut interrupted => {
                info!("interrupted, shutting down");
                break Ok(());
            }
        }
    };

    subscription.stop();
    monitor.teardown();
    subscription.join().await;
    result
}

fn print_notification(notification: &RealtimeNotification, notifier: Option<&ReminderNotifier>) {
    let now = Local::now().format("%H:%M:%S");
    match notification {
        RealtimeNotification::Opened => println!("[{}] connected", now),
        RealtimeNotification::Error(e) => eprintln!("[{}] stream error: {}", now, e),
        RealtimeNotification::Reminder(reminder) => {
            let (summary, body) = render(reminder);
            if body.is_empty() {
                println!("[{}] reminder: {}", now, summary);
            } else {
                println!("[{}] reminder: {} ({})", now, summary, body.replace('\n', ", "));
            }
            if let Some(notifier) = notifier {
                notifier.show(reminder);
            }
        }
        RealtimeNotification::Test(event) => println!("[{}] test: {}", now, event.message),
    }
}
