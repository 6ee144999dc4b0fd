//! Session lifecycle: NONE → WAITING → MATCHED → NONE, over queue and registry together.

use std::{collections::HashMap, time::Instant};

use tracing::{debug, info, warn};

use super::{
    event::{Event, Notifier},
    queue::{MatchingQueue, WaitingEntry},
    room::RoomRegistry,
    types::{Departure, Pairing, Participant, ParticipantId, Poll, RoomId, Status, SweepReport},
    ChatConfig,
};
use crate::error::ChatError;

/// Everything guarded by the single chat lock.
pub(crate) struct ChatState {
    config: ChatConfig,
    queue: MatchingQueue,
    rooms: RoomRegistry,
    participants: HashMap<ParticipantId, Participant>,
}

impl ChatState {
    pub(crate) fn new(config: ChatConfig) -> Self {
        Self {
            config,
            queue: MatchingQueue::default(),
            rooms: RoomRegistry::default(),
            participants: HashMap::new(),
        }
    }

    pub(crate) fn waiting(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn rooms(&self) -> usize {
        self.rooms.len()
    }

    pub(crate) fn start(
        &mut self,
        id: &ParticipantId,
        name: Option<String>,
        now: Instant,
        out: &dyn Notifier,
    ) -> Pairing {
        self.touch(id, now);

        if let Some(room_id) = self.rooms.room_of(id).cloned() {
            match self.rooms.partner_of(&room_id, id).cloned() {
                Some(partner_id) if self.rooms.is_present(&partner_id, &room_id) => {
                    return self.resume(id, room_id, partner_id, out);
                }
                Some(_) => {
                    // partner already left; the half-empty room goes and the caller rematches
                    let destroyed = self.rooms.depart(id).is_some_and(|(_, destroyed)| destroyed);
                    info!(participant = %id, room = %room_id, destroyed, "left abandoned room to rematch");
                }
                None => {
                    warn!(participant = %id, room = %room_id, "membership points at a missing room");
                    self.rooms.depart(id);
                }
            }
        }

        if self.queue.contains(id) {
            out.notify(id, Event::Waiting);
            return Pairing::Waiting;
        }

        let participant = self
            .participants
            .entry(id.clone())
            .or_insert_with(|| Participant {
                display_name: None,
                last_seen: now,
            });
        if name.is_some() {
            participant.display_name = name;
        }

        while let Some(entry) = self.queue.pop_front() {
            if &entry.id == id {
                warn!(participant = %id, "popped the caller from the waiting queue, re-enqueueing");
                break;
            }
            if self.rooms.room_of(&entry.id).is_some() {
                warn!(participant = %entry.id, "waiting entry already belongs to a room, dropping it");
                continue;
            }
            if self.is_stale(&entry.id, now) {
                debug!(participant = %entry.id, "dropping stale waiting entry");
                self.participants.remove(&entry.id);
                continue;
            }
            return self.pair(entry, id, now, out);
        }

        self.queue.push_back(id.clone(), now);
        info!(participant = %id, queued = self.queue.len(), "waiting for a partner");
        out.notify(id, Event::Waiting);
        Pairing::Waiting
    }

    fn pair(
        &mut self,
        waiter: WaitingEntry,
        id: &ParticipantId,
        now: Instant,
        out: &dyn Notifier,
    ) -> Pairing {
        let room_id = self.rooms.create_room(waiter.id.clone(), id.clone(), now);
        info!(
            room = %room_id,
            first = %waiter.id,
            second = %id,
            waited_ms = now.saturating_duration_since(waiter.enqueued_at).as_millis() as u64,
            "matched"
        );

        let partner_name = self.name_of(&waiter.id);
        out.notify(
            &waiter.id,
            Event::Matched {
                room_id: room_id.clone(),
                partner_id: id.clone(),
                partner_name: self.name_of(id),
            },
        );
        out.notify(
            id,
            Event::Matched {
                room_id: room_id.clone(),
                partner_id: waiter.id.clone(),
                partner_name: partner_name.clone(),
            },
        );

        Pairing::Matched {
            room_id,
            partner_id: waiter.id,
            partner_name,
        }
    }

    fn resume(
        &mut self,
        id: &ParticipantId,
        room_id: RoomId,
        partner_id: ParticipantId,
        out: &dyn Notifier,
    ) -> Pairing {
        let partner_name = self.name_of(&partner_id);
        let announced = out.notify(
            id,
            Event::Matched {
                room_id: room_id.clone(),
                partner_id: partner_id.clone(),
                partner_name: partner_name.clone(),
            },
        );
        if announced {
            self.flush(id, &room_id, out);
        }

        Pairing::Resumed {
            room_id,
            partner_id,
            partner_name,
        }
    }

    /// Pushes the participant's undelivered backlog to its live connection, if any.
    fn flush(&mut self, id: &ParticipantId, room_id: &RoomId, out: &dyn Notifier) {
        let pushed = self.rooms.push_pending(id, room_id, |message| {
            out.notify(
                id,
                Event::ReceiveMessage {
                    text: message.text.clone(),
                    timestamp: message.timestamp,
                },
            )
        });
        if let Ok(pushed @ 1..) = pushed {
            debug!(participant = %id, room = %room_id, pushed, "pushed backlog");
        }
    }

    fn name_of(&self, id: &ParticipantId) -> Option<String> {
        self.participants.get(id)?.display_name.clone()
    }

    fn is_stale(&self, id: &ParticipantId, now: Instant) -> bool {
        self.participants
            .get(id)
            .is_none_or(|p| now.saturating_duration_since(p.last_seen) >= self.config.waiting_timeout)
    }

    pub(crate) fn status(&self, id: &ParticipantId) -> Status {
        if let Some(room_id) = self.rooms.room_of(id) {
            if let Some(partner_id) = self.rooms.partner_of(room_id, id) {
                return Status::Matched {
                    room_id: room_id.clone(),
                    partner_id: partner_id.clone(),
                    partner_present: self.rooms.is_present(partner_id, room_id),
                };
            }
        }

        if self.queue.contains(id) {
            Status::Waiting
        } else {
            Status::None
        }
    }

    pub(crate) fn send(
        &mut self,
        id: &ParticipantId,
        room_id: &RoomId,
        text: String,
        now: Instant,
        out: &dyn Notifier,
    ) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::InvalidInput("message"));
        }
        if text.chars().count() > self.config.max_message_len {
            return Err(ChatError::InvalidInput("message too long"));
        }

        let seq = self
            .rooms
            .append_message(id, room_id, text, now, self.config.max_room_messages)?;
        self.touch(id, now);
        debug!(room = %room_id, participant = %id, seq, "message appended");

        if let Some(partner_id) = self.rooms.partner_of(room_id, id).cloned() {
            if self.rooms.is_present(&partner_id, room_id) {
                self.flush(&partner_id, room_id, out);
            }
        }
        Ok(())
    }

    /// Current status plus, when matched, the partner's messages since the last poll.
    pub(crate) fn poll(&mut self, id: &ParticipantId, room_hint: Option<&RoomId>, now: Instant) -> Poll {
        self.touch(id, now);
        let status = self.status(id);

        let messages = match &status {
            Status::Matched { room_id, .. } if room_hint.is_none_or(|hint| hint == room_id) => {
                self.rooms.take_new_messages(id, room_id).ok()
            }
            _ => None,
        };
        if let Some(count @ 1..) = messages.as_ref().map(Vec::len) {
            debug!(participant = %id, count, "poll delivered messages");
        }

        Poll { status, messages }
    }

    pub(crate) fn leave(
        &mut self,
        id: &ParticipantId,
        room_hint: Option<&RoomId>,
        out: &dyn Notifier,
    ) -> Departure {
        if let Some(room_id) = self.rooms.room_of(id).cloned() {
            if room_hint.is_some_and(|hint| hint != &room_id) {
                return Departure::Stale;
            }

            if let Some(partner_id) = self.rooms.partner_of(&room_id, id).cloned() {
                if self.rooms.is_present(&partner_id, &room_id) {
                    out.notify(&partner_id, Event::PartnerLeft { room_id: room_id.clone() });
                }
            }

            let destroyed = self.rooms.depart(id).is_none_or(|(_, destroyed)| destroyed);
            self.participants.remove(id);
            info!(participant = %id, room = %room_id, destroyed, "left room");
            return Departure::Room { room_id, destroyed };
        }

        if self.queue.remove(id) {
            self.participants.remove(id);
            info!(participant = %id, "left waiting queue");
            return Departure::Queue;
        }

        Departure::Nothing
    }

    /// Refreshes liveness for the participant and its room, if it has either.
    pub(crate) fn touch(&mut self, id: &ParticipantId, now: Instant) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.last_seen = now;
        }
        self.rooms.touch(id, now);
    }

    pub(crate) fn sweep(&mut self, now: Instant, out: &dyn Notifier) -> SweepReport {
        let expired = self.rooms.expire(now, self.config.room_timeout);
        for (room, present) in &expired {
            for member in present {
                out.notify(member, Event::PartnerLeft { room_id: room.id().clone() });
                self.participants.remove(member);
            }
            info!(
                room = %room.id(),
                age_secs = now.saturating_duration_since(room.created_at()).as_secs(),
                "reclaimed idle room"
            );
        }

        let timeout = self.config.waiting_timeout;
        let participants = &self.participants;
        let stale = self.queue.drain_where(|entry| {
            participants
                .get(&entry.id)
                .is_none_or(|p| now.saturating_duration_since(p.last_seen) >= timeout)
        });
        for entry in &stale {
            self.participants.remove(&entry.id);
            info!(participant = %entry.id, "expired waiting entry");
        }

        SweepReport {
            rooms: expired.len(),
            waiting: stale.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashSet;

        let queued: HashSet<&ParticipantId> = self.queue.iter().map(|e| &e.id).collect();
        assert_eq!(queued.len(), self.queue.len(), "duplicate waiting entries");

        let mut expected = queued.clone();
        for (id, room_id) in self.rooms.members() {
            assert!(!queued.contains(id), "{id} is both queued and in {room_id}");
            let room = self.rooms.get(room_id).expect("membership points at a live room");
            let [a, b] = room.member_ids();
            assert_ne!(a, b);
            assert!(a == id || b == id);
            expected.insert(id);
        }

        let actual: HashSet<&ParticipantId> = self.participants.keys().collect();
        assert_eq!(expected, actual, "participant records out of sync");
    }
}
