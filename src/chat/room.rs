//! Two-party rooms, the membership index and per-member delivery cursors.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use rand::{distr::Alphanumeric, Rng};
use time::OffsetDateTime;

use super::types::{Delivered, ParticipantId, RoomId};
use crate::error::ChatError;

pub(crate) fn unix_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Clone)]
pub struct Message {
    /// Position in the room log since creation; survives log trimming.
    pub seq: u64,
    pub sender: ParticipantId,
    pub text: String,
    pub timestamp: i64,
}

impl Message {
    pub fn delivered(&self) -> Delivered {
        Delivered {
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug)]
struct Member {
    id: ParticipantId,
    /// Next seq this member has not yet received (or skipped as its own).
    cursor: u64,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: [Member; 2],
    log: VecDeque<Message>,
    next_seq: u64,
    created_at: Instant,
    last_activity: Instant,
}

impl Room {
    fn new(id: RoomId, a: ParticipantId, b: ParticipantId, now: Instant) -> Self {
        Self {
            id,
            members: [Member { id: a, cursor: 0 }, Member { id: b, cursor: 0 }],
            log: VecDeque::new(),
            next_seq: 0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn member_ids(&self) -> [&ParticipantId; 2] {
        [&self.members[0].id, &self.members[1].id]
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    #[cfg(test)]
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.log.iter()
    }

    pub fn partner_of(&self, id: &ParticipantId) -> Option<&ParticipantId> {
        self.slot(id).map(|slot| &self.members[1 - slot].id)
    }

    fn slot(&self, id: &ParticipantId) -> Option<usize> {
        self.members.iter().position(|m| &m.id == id)
    }

    fn first_seq(&self) -> u64 {
        self.log.front().map_or(self.next_seq, |m| m.seq)
    }

    fn at(&self, seq: u64) -> Option<&Message> {
        let first = self.first_seq();
        if seq < first {
            return None;
        }
        self.log.get((seq - first) as usize)
    }

    fn cursor(&self, slot: usize) -> u64 {
        self.members[slot].cursor.max(self.first_seq())
    }

    fn append(&mut self, slot: usize, text: String, now: Instant, cap: usize) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.log.push_back(Message {
            seq,
            sender: self.members[slot].id.clone(),
            text,
            timestamp: unix_ms(),
        });
        while self.log.len() > cap.max(1) {
            self.log.pop_front();
        }
        self.skip_own(slot);
        self.last_activity = now;
        seq
    }

    /// Moves the member's cursor past its own messages at the head of its backlog.
    fn skip_own(&mut self, slot: usize) {
        let mut cursor = self.cursor(slot);
        while self
            .at(cursor)
            .is_some_and(|m| m.sender == self.members[slot].id)
        {
            cursor += 1;
        }
        self.members[slot].cursor = cursor;
    }

    fn take_pending(&mut self, slot: usize) -> Vec<Delivered> {
        let from = self.cursor(slot);
        let me = &self.members[slot].id;
        let pending = self
            .log
            .iter()
            .skip_while(|m| m.seq < from)
            .filter(|m| &m.sender != me)
            .map(Message::delivered)
            .collect();
        self.members[slot].cursor = self.next_seq;
        pending
    }

    /// Hands the backlog to `deliver` in order, stopping at the first refusal.
    fn push_pending(&mut self, slot: usize, mut deliver: impl FnMut(&Message) -> bool) -> usize {
        let mut cursor = self.cursor(slot);
        let mut pushed = 0;
        while let Some(message) = self.at(cursor) {
            if message.sender != self.members[slot].id {
                if !deliver(message) {
                    break;
                }
                pushed += 1;
            }
            cursor += 1;
        }
        self.members[slot].cursor = cursor;
        pushed
    }

    /// Drops messages every present member has already moved past.
    fn compact(&mut self, present: [bool; 2]) {
        let floor = (0..2)
            .filter(|&slot| present[slot])
            .map(|slot| self.members[slot].cursor)
            .min()
            .unwrap_or(self.next_seq);
        while self.log.front().is_some_and(|m| m.seq < floor) {
            self.log.pop_front();
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    membership: HashMap<ParticipantId, RoomId>,
    counter: u64,
}

impl RoomRegistry {
    /// Creates a room for two distinct participants and indexes both.
    pub fn create_room(&mut self, a: ParticipantId, b: ParticipantId, now: Instant) -> RoomId {
        debug_assert_ne!(a, b);
        let room_id = self.next_room_id();
        self.membership.insert(a.clone(), room_id.clone());
        self.membership.insert(b.clone(), room_id.clone());
        self.rooms
            .insert(room_id.clone(), Room::new(room_id.clone(), a, b, now));
        room_id
    }

    fn next_room_id(&mut self) -> RoomId {
        loop {
            self.counter += 1;
            let suffix: String = rand::rng()
                .sample_iter(Alphanumeric)
                .take(9)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            let id = RoomId::new_unchecked(format!("room-{}-{}-{suffix}", unix_ms(), self.counter));
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_of(&self, id: &ParticipantId) -> Option<&RoomId> {
        self.membership.get(id)
    }

    pub fn is_present(&self, id: &ParticipantId, room_id: &RoomId) -> bool {
        self.membership.get(id) == Some(room_id)
    }

    /// The other member of `room_id`, for relay targeting.
    pub fn partner_of(&self, room_id: &RoomId, id: &ParticipantId) -> Option<&ParticipantId> {
        self.rooms.get(room_id)?.partner_of(id)
    }

    pub fn append_message(
        &mut self,
        id: &ParticipantId,
        room_id: &RoomId,
        text: String,
        now: Instant,
        cap: usize,
    ) -> Result<u64, ChatError> {
        if !self.is_present(id, room_id) {
            return Err(ChatError::NotAMember);
        }
        let room = self.rooms.get_mut(room_id).ok_or(ChatError::NotAMember)?;
        let slot = room.slot(id).ok_or(ChatError::NotAMember)?;
        Ok(room.append(slot, text, now, cap))
    }

    /// Returns the partner's messages past the caller's cursor and advances it to the end.
    pub fn take_new_messages(
        &mut self,
        id: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<Vec<Delivered>, ChatError> {
        let (room, slot) = self.present_slot(id, room_id)?;
        let pending = room.take_pending(slot);
        self.compact(room_id);
        Ok(pending)
    }

    pub fn push_pending(
        &mut self,
        id: &ParticipantId,
        room_id: &RoomId,
        deliver: impl FnMut(&Message) -> bool,
    ) -> Result<usize, ChatError> {
        let (room, slot) = self.present_slot(id, room_id)?;
        let pushed = room.push_pending(slot, deliver);
        self.compact(room_id);
        Ok(pushed)
    }

    fn present_slot(
        &mut self,
        id: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<(&mut Room, usize), ChatError> {
        let room = self.rooms.get_mut(room_id).ok_or(ChatError::NotFound)?;
        if self.membership.get(id) != Some(room_id) {
            return Err(ChatError::NotAMember);
        }
        let slot = room.slot(id).ok_or(ChatError::NotAMember)?;
        Ok((room, slot))
    }

    fn compact(&mut self, room_id: &RoomId) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let present = [0, 1].map(|slot| self.membership.get(&room.members[slot].id) == Some(room_id));
        room.compact(present);
    }

    /// Refreshes the inactivity clock of the participant's current room.
    pub fn touch(&mut self, id: &ParticipantId, now: Instant) {
        if let Some(room) = self
            .membership
            .get(id)
            .and_then(|room_id| self.rooms.get_mut(room_id))
        {
            room.last_activity = now;
        }
    }

    /// Removes the participant's membership; the room goes too once nobody is left.
    /// Returns the room and whether it was destroyed.
    pub fn depart(&mut self, id: &ParticipantId) -> Option<(RoomId, bool)> {
        let room_id = self.membership.remove(id)?;
        let partner_present = self
            .partner_of(&room_id, id)
            .is_some_and(|partner| self.membership.get(partner) == Some(&room_id));

        if partner_present {
            self.compact(&room_id);
            Some((room_id, false))
        } else {
            self.rooms.remove(&room_id);
            Some((room_id, true))
        }
    }

    pub fn destroy_room(&mut self, room_id: &RoomId) -> Result<Room, ChatError> {
        let room = self.rooms.remove(room_id).ok_or(ChatError::NotFound)?;
        for member in &room.members {
            if self.membership.get(&member.id) == Some(room_id) {
                self.membership.remove(&member.id);
            }
        }
        Ok(room)
    }

    /// Destroys rooms idle for at least `timeout`, returning each with the members
    /// that were still present in it.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<(Room, Vec<ParticipantId>)> {
        let stale: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| now.saturating_duration_since(room.last_activity) >= timeout)
            .map(|room| room.id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|room_id| {
                let present: Vec<ParticipantId> = self
                    .rooms
                    .get(&room_id)?
                    .member_ids()
                    .into_iter()
                    .filter(|id| self.membership.get(*id) == Some(&room_id))
                    .cloned()
                    .collect();
                let room = self.destroy_room(&room_id).ok()?;
                Some((room, present))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn members(&self) -> impl Iterator<Item = (&ParticipantId, &RoomId)> {
        self.membership.iter()
    }
}
