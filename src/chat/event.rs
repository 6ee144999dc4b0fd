//! Events the core pushes toward participants, and the seam transports plug into.

use serde::Serialize;

use super::types::{ParticipantId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Event {
    Waiting,
    Matched {
        room_id: RoomId,
        partner_id: ParticipantId,
        #[serde(skip_serializing_if = "Option::is_none")]
        partner_name: Option<String>,
    },
    ReceiveMessage {
        text: String,
        timestamp: i64,
    },
    PartnerLeft {
        room_id: RoomId,
    },
    /// Transport-level reply to a command the core refused.
    Rejected {
        code: &'static str,
        message: String,
    },
}

/// Delivers events to live participant connections.
///
/// Called while the chat state lock is held, so implementations must not block
/// and must not call back into [`super::Chat`]. Returns whether the event was
/// handed to a live connection; `false` leaves it for the participant's next poll.
pub trait Notifier: Send + Sync {
    fn notify(&self, to: &ParticipantId, event: Event) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;

    use parking_lot::Mutex;

    use super::*;

    /// Records every event; only ids marked online accept them.
    #[derive(Default)]
    pub(crate) struct Recorder {
        online: Mutex<HashSet<ParticipantId>>,
        log: Mutex<Vec<(ParticipantId, Event)>>,
    }

    impl Recorder {
        pub(crate) fn online(&self, id: &ParticipantId) {
            self.online.lock().insert(id.clone());
        }

        pub(crate) fn offline(&self, id: &ParticipantId) {
            self.online.lock().remove(id);
        }

        pub(crate) fn take(&self, id: &ParticipantId) -> Vec<Event> {
            let mut log = self.log.lock();
            let (mine, rest): (Vec<_>, Vec<_>) = log.drain(..).partition(|(to, _)| to == id);
            *log = rest;
            mine.into_iter().map(|(_, event)| event).collect()
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, to: &ParticipantId, event: Event) -> bool {
            if !self.online.lock().contains(to) {
                return false;
            }
            self.log.lock().push((to.clone(), event));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn events_use_socket_event_names() {
        let room_id = RoomId::parse("room-1").unwrap();
        assert_eq!(
            serde_json::to_value(Event::Waiting).unwrap(),
            json!({ "event": "waiting" })
        );
        assert_eq!(
            serde_json::to_value(Event::ReceiveMessage { text: "hi".into(), timestamp: 3 }).unwrap(),
            json!({ "event": "receive-message", "text": "hi", "timestamp": 3 })
        );
        assert_eq!(
            serde_json::to_value(Event::PartnerLeft { room_id: room_id.clone() }).unwrap(),
            json!({ "event": "partner-left", "roomId": "room-1" })
        );
        assert_eq!(
            serde_json::to_value(Event::Matched {
                room_id,
                partner_id: ParticipantId::parse("b").unwrap(),
                partner_name: Some("Shy Owl".into()),
            })
            .unwrap(),
            json!({ "event": "matched", "roomId": "room-1", "partnerId": "b", "partnerName": "Shy Owl" })
        );
    }
}
