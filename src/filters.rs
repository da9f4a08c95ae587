use crate::table::SlotRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterDescriptor {
    DateRange {
        column: &'static str,
    },
    Select {
        column: &'static str,
        relationship: &'static str,
        title_attribute: &'static str,
        label: &'static str,
        indicator: &'static str,
        multiple: bool,
    },
}

pub fn filter_schema() -> Vec<FilterDescriptor> {
    vec![
        FilterDescriptor::DateRange {
            column: "created_at",
        },
        FilterDescriptor::Select {
            column: "session_id",
            relationship: "session",
            title_attribute: "name",
            label: "Session",
            indicator: "Session",
            multiple: true,
        },
    ]
}

/// Active filter values. Empty values leave the rows untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotFilters {
    pub created_from: Option<NaiveDate>,
    pub created_until: Option<NaiveDate>,
    pub session_ids: HashSet<Uuid>,
}

impl SlotFilters {
    /// Both date bounds are inclusive and compared against the UTC date the
    /// slot was created on.
    pub fn apply(&self, rows: Vec<SlotRow>) -> Vec<SlotRow> {
        rows.into_iter()
            .filter(|row| {
                let created = row.slot.created_at.date_naive();
                self.created_from.map_or(true, |from| created >= from)
                    && self.created_until.map_or(true, |until| created <= until)
                    && (self.session_ids.is_empty() || self.session_ids.contains(&row.slot.session_id))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::SessionSlot;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn row(session_id: Uuid, created_day: u32) -> SlotRow {
        let created_at = Utc.with_ymd_and_hms(2030, 1, created_day, 12, 0, 0).unwrap();
        SlotRow {
            slot: SessionSlot {
                id: Uuid::new_v4(),
                slot_code: format!("SLOT-{created_day}"),
                session_id,
                date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                seats: 1,
                available_seats: 0,
                booked_seats: 0,
                online_session_details: vec![],
                active: true,
                created_at,
                updated_at: created_at,
            },
            session_name: None,
        }
    }

    #[test]
    fn test_no_filters_keep_everything() {
        let rows = vec![row(Uuid::new_v4(), 1), row(Uuid::new_v4(), 2)];
        assert_eq!(SlotFilters::default().apply(rows).len(), 2);
    }

    #[test]
    fn test_created_range_is_inclusive() {
        let session = Uuid::new_v4();
        let rows: Vec<SlotRow> = (1..=5).map(|day| row(session, day)).collect();
        let filters = SlotFilters {
            created_from: NaiveDate::from_ymd_opt(2030, 1, 2),
            created_until: NaiveDate::from_ymd_opt(2030, 1, 4),
            ..SlotFilters::default()
        };

        let codes: Vec<String> = filters
            .apply(rows)
            .into_iter()
            .map(|row| row.slot.slot_code)
            .collect();
        assert_eq!(codes, vec!["SLOT-2", "SLOT-3", "SLOT-4"]);
    }

    #[test]
    fn test_session_filter_allows_multiple_sessions() {
        let yoga = Uuid::new_v4();
        let pilates = Uuid::new_v4();
        let coaching = Uuid::new_v4();
        let rows = vec![row(yoga, 1), row(pilates, 1), row(coaching, 1)];
        let filters = SlotFilters {
            session_ids: [yoga, pilates].into_iter().collect(),
            ..SlotFilters::default()
        };

        let kept = filters.apply(rows);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|row| row.slot.session_id != coaching));
    }
}
