use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use chrono::Utc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::{
    backend::SlotBackend,
    error::BackendError,
    types::{ReviewRating, SessionCancellation, SessionSlot, SlotInput},
};

pub struct MockSlotBackendInner {
    pub success: AtomicBool,
    pub calls_to_slots: AtomicU64,
    pub calls_to_slot: AtomicU64,
    pub calls_to_add_slot: AtomicU64,
    pub calls_to_update_slot: AtomicU64,
    pub calls_to_remove_slot: AtomicU64,
    pub slots: Mutex<HashMap<Uuid, SessionSlot>>,
    sender: watch::Sender<Vec<SessionSlot>>,
}

#[derive(Clone)]
pub struct MockSlotBackend(pub Arc<MockSlotBackendInner>);

impl MockSlotBackendInner {
    fn new() -> Self {
        let (sender, _) = watch::channel(vec![]);
        Self {
            success: AtomicBool::new(true),
            calls_to_slots: AtomicU64::default(),
            calls_to_slot: AtomicU64::default(),
            calls_to_add_slot: AtomicU64::default(),
            calls_to_update_slot: AtomicU64::default(),
            calls_to_remove_slot: AtomicU64::default(),
            slots: Mutex::default(),
            sender,
        }
    }
}

impl MockSlotBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockSlotBackendInner::new()))
    }

    fn result(&self) -> Result<(), BackendError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(BackendError::Unavailable("Supposed to fail".into())),
        }
    }

    /// Stores a slot without counting it as a backend call.
    pub fn insert(&self, input: SlotInput) -> SessionSlot {
        let slot = self.stored(input);
        self.0.slots.lock().unwrap().insert(slot.id, slot.clone());
        slot
    }

    fn stored(&self, input: SlotInput) -> SessionSlot {
        SessionSlot {
            id: Uuid::new_v4(),
            slot_code: "SLOT-MOCK0000".into(),
            session_id: input.session_id,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            seats: input.seats,
            available_seats: 0,
            booked_seats: 0,
            online_session_details: input.online_session_details,
            active: input.active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl SlotBackend for MockSlotBackend {
    fn slot_stream(&self) -> WatchStream<Vec<SessionSlot>> {
        WatchStream::new(self.0.sender.subscribe())
    }

    fn slots(&self) -> Vec<SessionSlot> {
        self.0.calls_to_slots.fetch_add(1, Ordering::SeqCst);
        self.0.slots.lock().unwrap().values().cloned().collect()
    }

    fn slot(&self, id: Uuid) -> Result<SessionSlot, BackendError> {
        self.0.calls_to_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0
            .slots
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(BackendError::SlotNotFound(id))
    }

    fn add_slot(&self, input: SlotInput) -> Result<SessionSlot, BackendError> {
        self.0.calls_to_add_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(self.insert(input))
    }

    fn update_slot(&self, id: Uuid, input: SlotInput) -> Result<SessionSlot, BackendError> {
        self.0.calls_to_update_slot.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        let slot = SessionSlot {
            id,
            ..self.stored(input)
        };
        self.0.slots.lock().unwrap().insert(id, slot.clone());
        Ok(slot)
    }

    fn remove_slot(&self, _id: Uuid) -> Result<(), BackendError> {
        self.0.calls_to_remove_slot.fetch_add(1, Ordering::SeqCst);
        self.result()
    }

    fn cancellations(&self, _slot_id: Uuid) -> Vec<SessionCancellation> {
        vec![]
    }

    fn reviews(&self, _slot_id: Uuid) -> Vec<ReviewRating> {
        vec![]
    }
}
