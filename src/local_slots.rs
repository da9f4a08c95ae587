use crate::{
    backend::SlotBackend,
    error::BackendError,
    form::default_online_session_details,
    types::{ReviewRating, Session, SessionCancellation, SessionSlot, SlotInput},
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::watch::{self, Sender};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Store {
    slots: HashMap<Uuid, SessionSlot>,
    cancellations: Vec<SessionCancellation>,
    reviews: Vec<ReviewRating>,
}

#[derive(Debug, Clone)]
pub struct LocalSlots {
    store: Arc<Mutex<Store>>,
    sender: Sender<Vec<SessionSlot>>,
}

impl Default for LocalSlots {
    fn default() -> Self {
        let (sender, _) = watch::channel(vec![]);
        Self {
            store: Arc::default(),
            sender,
        }
    }
}

fn slot_code(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("SLOT-{}", hex[..8].to_uppercase())
}

impl LocalSlots {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sorted_slots(store: &Store) -> Vec<SessionSlot> {
        let mut slots: Vec<SessionSlot> = store.slots.values().cloned().collect();
        slots.sort_unstable_by(|a, b| {
            (a.date, a.start_time, &a.slot_code).cmp(&(b.date, b.start_time, &b.slot_code))
        });
        slots
    }

    fn send_slots(&self) {
        let slots = Self::sorted_slots(&self.store());
        self.sender.send_replace(slots);
    }

    pub fn record_cancellation(&self, slot_id: Uuid, reason: String) -> Result<(), BackendError> {
        let mut store = self.store();
        if !store.slots.contains_key(&slot_id) {
            return Err(BackendError::SlotNotFound(slot_id));
        }
        store.cancellations.push(SessionCancellation {
            id: Uuid::new_v4(),
            slot_id,
            reason,
            cancelled_at: Utc::now(),
        });
        Ok(())
    }

    pub fn record_review(
        &self,
        slot_id: Uuid,
        rating: u8,
        review: String,
    ) -> Result<(), BackendError> {
        let mut store = self.store();
        if !store.slots.contains_key(&slot_id) {
            return Err(BackendError::SlotNotFound(slot_id));
        }
        store.reviews.push(ReviewRating {
            id: Uuid::new_v4(),
            slot_id,
            rating: rating.clamp(1, 5),
            review,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Seeds one slot per session for each of the next few days.
    pub fn insert_example_slots(&self, sessions: &[Session], today: NaiveDate) {
        const NUMBER_OF_DAYS: i64 = 3;
        let start_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let end_time = NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default();

        for day in 1..=NUMBER_OF_DAYS {
            for session in sessions.iter().filter(|session| session.active) {
                let online_session_details = if session.session_mode.is_online() {
                    default_online_session_details()
                        .into_iter()
                        .map(|mut detail| {
                            detail.value = format!("https://meet.example.com/{}", session.id);
                            detail
                        })
                        .collect()
                } else {
                    vec![]
                };
                let input = SlotInput {
                    session_id: session.id,
                    date: today + Duration::days(day),
                    start_time,
                    end_time,
                    seats: if session.session_type.is_group() { 20 } else { 1 },
                    online_session_details,
                    active: true,
                };
                let slot = match self.add_slot(input) {
                    Ok(slot) => slot,
                    Err(err) => {
                        warn!(?err, session = %session.name, "Failed to insert example slot");
                        continue;
                    }
                };
                if day == 1 {
                    if let Err(err) = self.record_review(slot.id, 5, "Great session".into()) {
                        warn!(?err, slot_code = %slot.slot_code, "Failed to insert example review");
                    }
                }
                if day == NUMBER_OF_DAYS {
                    if let Err(err) = self.record_cancellation(slot.id, "Instructor unavailable".into()) {
                        warn!(?err, slot_code = %slot.slot_code, "Failed to insert example cancellation");
                    }
                }
            }
        }
        info!("Inserted example slots");
    }
}

impl SlotBackend for LocalSlots {
    fn slot_stream(&self) -> WatchStream<Vec<SessionSlot>> {
        let stream = WatchStream::new(self.sender.subscribe());
        self.send_slots();
        stream
    }

    fn slots(&self) -> Vec<SessionSlot> {
        Self::sorted_slots(&self.store())
    }

    fn slot(&self, id: Uuid) -> Result<SessionSlot, BackendError> {
        self.store()
            .slots
            .get(&id)
            .cloned()
            .ok_or(BackendError::SlotNotFound(id))
    }

    fn add_slot(&self, input: SlotInput) -> Result<SessionSlot, BackendError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let slot = SessionSlot {
            id,
            slot_code: slot_code(id),
            session_id: input.session_id,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            seats: input.seats,
            available_seats: 0,
            booked_seats: 0,
            online_session_details: input.online_session_details,
            active: input.active,
            created_at: now,
            updated_at: now,
        };

        self.store().slots.insert(id, slot.clone());
        debug!(slot_code = %slot.slot_code, "Slot added");
        self.send_slots();
        Ok(slot)
    }

    fn update_slot(&self, id: Uuid, input: SlotInput) -> Result<SessionSlot, BackendError> {
        let updated = {
            let mut store = self.store();
            let slot = store
                .slots
                .get_mut(&id)
                .ok_or(BackendError::SlotNotFound(id))?;
            slot.session_id = input.session_id;
            slot.date = input.date;
            slot.start_time = input.start_time;
            slot.end_time = input.end_time;
            slot.seats = input.seats;
            slot.online_session_details = input.online_session_details;
            slot.active = input.active;
            slot.updated_at = Utc::now();
            slot.clone()
        };
        debug!(slot_code = %updated.slot_code, "Slot updated");
        self.send_slots();
        Ok(updated)
    }

    fn remove_slot(&self, id: Uuid) -> Result<(), BackendError> {
        {
            let mut store = self.store();
            if store.slots.remove(&id).is_none() {
                return Err(BackendError::SlotNotFound(id));
            }
            store.cancellations.retain(|row| row.slot_id != id);
            store.reviews.retain(|row| row.slot_id != id);
        }
        self.send_slots();
        Ok(())
    }

    fn cancellations(&self, slot_id: Uuid) -> Vec<SessionCancellation> {
        self.store()
            .cancellations
            .iter()
            .filter(|row| row.slot_id == slot_id)
            .cloned()
            .collect()
    }

    fn reviews(&self, slot_id: Uuid) -> Vec<ReviewRating> {
        self.store()
            .reviews
            .iter()
            .filter(|row| row.slot_id == slot_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{SessionMode, SessionType};
    use futures::StreamExt;

    fn input(day: u32, hour: u32) -> SlotInput {
        SlotInput {
            session_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            seats: 1,
            online_session_details: vec![],
            active: false,
        }
    }

    #[test]
    fn test_add_update_remove_single_slot() {
        let local_slots = LocalSlots::default();

        let slot = local_slots.add_slot(input(2, 9)).unwrap();
        assert!(slot.slot_code.starts_with("SLOT-"));
        assert_eq!(slot.slot_code.len(), 13);
        assert_eq!(slot.available_seats, 0);
        assert_eq!(slot.booked_seats, 0);
        assert_eq!(local_slots.slots().len(), 1);

        let mut changed = input(3, 11);
        changed.active = true;
        let updated = local_slots.update_slot(slot.id, changed).unwrap();
        assert_eq!(updated.slot_code, slot.slot_code);
        assert_eq!(updated.created_at, slot.created_at);
        assert!(updated.active);
        assert_eq!(local_slots.slot(slot.id).unwrap(), updated);

        local_slots.remove_slot(slot.id).unwrap();
        assert!(local_slots.slots().is_empty());
        assert_eq!(
            local_slots.remove_slot(slot.id).unwrap_err(),
            BackendError::SlotNotFound(slot.id)
        );
    }

    #[test]
    fn test_update_keeps_counters() {
        let local_slots = LocalSlots::default();
        let slot = local_slots.add_slot(input(2, 9)).unwrap();
        local_slots
            .store()
            .slots
            .get_mut(&slot.id)
            .unwrap()
            .booked_seats = 4;

        let updated = local_slots.update_slot(slot.id, input(2, 10)).unwrap();
        assert_eq!(updated.booked_seats, 4);
    }

    #[test]
    fn test_slots_sorted_by_date_and_start() {
        let local_slots = LocalSlots::default();
        local_slots.add_slot(input(5, 9)).unwrap();
        local_slots.add_slot(input(2, 14)).unwrap();
        local_slots.add_slot(input(2, 8)).unwrap();

        let slots = local_slots.slots();
        let order: Vec<(u32, u32)> = slots
            .iter()
            .map(|slot| {
                use chrono::{Datelike, Timelike};
                (slot.date.day(), slot.start_time.hour())
            })
            .collect();
        assert_eq!(order, vec![(2, 8), (2, 14), (5, 9)]);
    }

    #[test]
    fn test_relations_follow_slot() {
        let local_slots = LocalSlots::default();
        let slot = local_slots.add_slot(input(2, 9)).unwrap();
        let other = local_slots.add_slot(input(2, 10)).unwrap();

        local_slots
            .record_cancellation(slot.id, "Sick".into())
            .unwrap();
        local_slots
            .record_review(slot.id, 9, "Lovely".into())
            .unwrap();
        local_slots
            .record_review(Uuid::new_v4(), 3, "Lost".into())
            .unwrap_err();

        assert_eq!(local_slots.cancellations(slot.id).len(), 1);
        assert_eq!(local_slots.reviews(slot.id)[0].rating, 5);
        assert!(local_slots.reviews(other.id).is_empty());

        local_slots.remove_slot(slot.id).unwrap();
        assert!(local_slots.cancellations(slot.id).is_empty());
        assert!(local_slots.reviews(slot.id).is_empty());
    }

    #[test]
    fn test_example_slots_respect_session_kind() {
        let local_slots = LocalSlots::default();
        let group_online = Session {
            id: Uuid::new_v4(),
            name: "Yoga Basics".into(),
            active: true,
            session_type: SessionType::Group,
            session_mode: SessionMode::Online,
        };
        let single_offline = Session {
            id: Uuid::new_v4(),
            name: "1:1 Coaching".into(),
            active: true,
            session_type: SessionType::Individual,
            session_mode: SessionMode::Offline,
        };
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        local_slots.insert_example_slots(&[group_online.clone(), single_offline.clone()], today);

        let slots = local_slots.slots();
        assert_eq!(slots.len(), 6);
        for slot in slots {
            assert!(slot.date > today);
            if slot.session_id == group_online.id {
                assert_eq!(slot.seats, 20);
                assert_eq!(slot.online_session_details.len(), 4);
            } else {
                assert_eq!(slot.seats, 1);
                assert!(slot.online_session_details.is_empty());
            }
        }
    }

    #[test]
    fn test_example_slots_carry_relation_rows() {
        let local_slots = LocalSlots::default();
        let session = Session {
            id: Uuid::new_v4(),
            name: "Evening Pilates".into(),
            active: true,
            session_type: SessionType::Group,
            session_mode: SessionMode::Offline,
        };
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        local_slots.insert_example_slots(&[session], today);

        let slots = local_slots.slots();
        let first = &slots[0];
        let last = &slots[2];
        assert_eq!(local_slots.reviews(first.id).len(), 1);
        assert!(local_slots.cancellations(first.id).is_empty());
        assert_eq!(local_slots.cancellations(last.id).len(), 1);
        assert!(local_slots.reviews(last.id).is_empty());
    }

    #[tokio::test]
    async fn test_stream_publishes_changes() {
        let local_slots = LocalSlots::default();
        let mut stream = local_slots.slot_stream();
        assert!(stream.next().await.unwrap().is_empty());

        local_slots.add_slot(input(2, 9)).unwrap();
        assert_eq!(stream.next().await.unwrap().len(), 1);
    }
}
