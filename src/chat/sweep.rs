//! Background reclamation of idle rooms and stale waiting entries.

use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info};

use super::Chat;

pub fn spawn_reclaimer(chat: Chat, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let report = chat.sweep();
            let (waiting, rooms) = chat.counts();
            if report.rooms > 0 || report.waiting > 0 {
                info!(
                    reclaimed_rooms = report.rooms,
                    expired_waiting = report.waiting,
                    rooms,
                    waiting,
                    "sweep"
                );
            } else {
                debug!(rooms, waiting, "sweep found nothing to reclaim");
            }
        }
    })
}
