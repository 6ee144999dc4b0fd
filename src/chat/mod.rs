//! Matching and relay core shared by the poll and push transports.
//!
//! Queue, room registry and membership index live in one state object behind a
//! single lock; pairing two participants and registering their room is one
//! atomic step. Events for live connections are handed to the [`Notifier`] while
//! that lock is held, so per-room delivery follows append order.

mod event;
mod lifecycle;
mod queue;
mod room;
pub mod sweep;
mod types;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

pub use event::{Event, Notifier};
pub use types::{
    Delivered, Departure, Pairing, ParticipantId, Poll, RoomId, StartOutcome, Status, SweepReport,
};

use crate::error::ChatError;
use lifecycle::ChatState;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub room_timeout: Duration,
    pub waiting_timeout: Duration,
    pub max_room_messages: usize,
    pub max_message_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room_timeout: Duration::from_secs(30 * 60),
            waiting_timeout: Duration::from_secs(5 * 60),
            max_room_messages: 500,
            max_message_len: 2000,
        }
    }
}

/// Cheaply cloneable handle to the shared chat state.
#[derive(Clone)]
pub struct Chat {
    state: Arc<Mutex<ChatState>>,
    notifier: Arc<dyn Notifier>,
}

impl Chat {
    pub fn new(config: ChatConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChatState::new(config))),
            notifier,
        }
    }

    /// Matches the caller with the oldest waiting participant, or queues it.
    /// Never waits for a partner to arrive.
    pub fn start(&self, id: &ParticipantId, name: Option<String>) -> Pairing {
        self.state
            .lock()
            .start(id, name, Instant::now(), &*self.notifier)
    }

    pub fn status(&self, id: &ParticipantId) -> Status {
        self.state.lock().status(id)
    }

    pub fn send(&self, id: &ParticipantId, room_id: &RoomId, text: String) -> Result<(), ChatError> {
        self.state
            .lock()
            .send(id, room_id, text, Instant::now(), &*self.notifier)
    }

    pub fn poll(&self, id: &ParticipantId, room_hint: Option<&RoomId>) -> Poll {
        self.state.lock().poll(id, room_hint, Instant::now())
    }

    /// Always succeeds; leaving something one was never in is a no-op.
    pub fn leave(&self, id: &ParticipantId, room_hint: Option<&RoomId>) -> Departure {
        self.state.lock().leave(id, room_hint, &*self.notifier)
    }

    pub fn touch(&self, id: &ParticipantId) {
        self.state.lock().touch(id, Instant::now());
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        self.state.lock().sweep(now, &*self.notifier)
    }

    /// `(waiting, rooms)` right now.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.waiting(), state.rooms())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;
    use event::testing::Recorder;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::parse(s).unwrap()
    }

    #[test]
    fn concurrent_starts_never_break_invariants() {
        let chat = Chat::new(ChatConfig::default(), Arc::new(Recorder::default()));

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let chat = chat.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        chat.start(&pid(&format!("t{t}-{i}")), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        chat.state.lock().assert_consistent();
        let (waiting, rooms) = chat.counts();
        assert_eq!(waiting, 0);
        assert_eq!(rooms, 200);

        let mut seen = HashSet::new();
        for t in 0..16 {
            for i in 0..25 {
                let id = pid(&format!("t{t}-{i}"));
                let Status::Matched { partner_id, .. } = chat.status(&id) else {
                    panic!("{id} is not matched");
                };
                assert_ne!(partner_id, id);
                assert!(seen.insert(id));
            }
        }
    }

    #[test]
    fn concurrent_leaves_and_starts_stay_consistent() {
        let chat = Chat::new(ChatConfig::default(), Arc::new(Recorder::default()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let chat = chat.clone();
                thread::spawn(move || {
                    let id = pid(&format!("user-{t}"));
                    for _ in 0..50 {
                        chat.start(&id, None);
                        if let Status::Matched { room_id, .. } = chat.status(&id) {
                            let _ = chat.send(&id, &room_id, "hey".into());
                        }
                        chat.poll(&id, None);
                        chat.leave(&id, None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        chat.state.lock().assert_consistent();
        assert_eq!(chat.counts(), (0, 0));
    }

    #[test]
    fn sweep_at_a_future_instant_reclaims_everything_idle() {
        let chat = Chat::new(ChatConfig::default(), Arc::new(Recorder::default()));
        chat.start(&pid("a"), None);
        chat.start(&pid("b"), None);
        chat.start(&pid("c"), None);

        let report = chat.sweep_at(Instant::now() + Duration::from_secs(60 * 60));
        assert_eq!(report, SweepReport { rooms: 1, waiting: 1 });
        assert_eq!(chat.counts(), (0, 0));
    }
}
