use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::chat::{Event, Notifier, ParticipantId};

/// Per-connection outbox. Bounded so a stalled client cannot grow it without limit;
/// a full outbox refuses delivery and the message stays in the room backlog.
pub type Outbox = mpsc::Sender<Event>;

pub const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkId(u64);

#[derive(Debug)]
struct Link {
    id: LinkId,
    outbox: Outbox,
}

/// Live push connections, at most one per participant.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    links: Arc<DashMap<ParticipantId, Link>>,
    next_link: Arc<AtomicU64>,
}

impl Hub {
    /// Registers `outbox` as the participant's connection, replacing any older one.
    pub fn attach(&self, who: ParticipantId, outbox: Outbox) -> LinkId {
        let id = LinkId(self.next_link.fetch_add(1, Ordering::Relaxed));
        if self.links.insert(who.clone(), Link { id, outbox }).is_some() {
            debug!(participant = %who, "replaced existing connection");
        }
        id
    }

    /// Drops the connection if it is still the current one for `who`.
    pub fn detach(&self, who: &ParticipantId, link: LinkId) -> bool {
        self.links.remove_if(who, |_, l| l.id == link).is_some()
    }

    pub fn is_connected(&self, who: &ParticipantId) -> bool {
        self.links.contains_key(who)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Notifier for Hub {
    fn notify(&self, to: &ParticipantId, event: Event) -> bool {
        let Some(link) = self.links.get(to) else {
            return false;
        };
        match link.outbox.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                debug!(participant = %to, error = %err, "outbox refused event");
                false
            }
        }
    }
}
