use crate::types::SessionSlot;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const PLACEHOLDER: &str = "N/A";
const DATE_FORMAT: &str = "%b %-d, %Y";
const TIME_FORMAT: &str = "%H:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    BooleanIcon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    Plain,
    Date,
    Time,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub format: ColumnFormat,
    pub searchable: bool,
    pub toggleable: bool,
    pub copyable: bool,
    pub align_center: bool,
    pub limit: Option<usize>,
    pub placeholder: Option<&'static str>,
}

impl Column {
    fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            format: ColumnFormat::Plain,
            searchable: true,
            toggleable: true,
            copyable: false,
            align_center: false,
            limit: None,
            placeholder: Some(PLACEHOLDER),
        }
    }

    fn centered(self) -> Self {
        Self {
            align_center: true,
            ..self
        }
    }

    fn format(self, format: ColumnFormat) -> Self {
        Self { format, ..self }
    }
}

/// A slot joined with the name of its session, as listed in the table.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    pub slot: SessionSlot,
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub id: Uuid,
    pub record_title: String,
    pub cells: BTreeMap<&'static str, Value>,
}

/// Per-column search terms keyed by column name.
pub type ColumnSearch = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub poll_interval_secs: u64,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_SECS)
    }
}

impl TableSchema {
    pub fn new(poll_interval_secs: u64) -> Self {
        Self {
            columns: vec![
                Column {
                    copyable: true,
                    ..Column::text("slot_code")
                },
                Column {
                    limit: Some(50),
                    ..Column::text("session.name")
                },
                Column::text("date").centered().format(ColumnFormat::Date),
                Column::text("start_time").centered().format(ColumnFormat::Time),
                Column::text("end_time").centered().format(ColumnFormat::Time),
                Column::text("seats").centered(),
                Column::text("available_seats").centered(),
                Column::text("booked_seats").centered(),
                Column {
                    kind: ColumnKind::BooleanIcon,
                    searchable: false,
                    placeholder: None,
                    ..Column::text("active").centered()
                },
            ],
            poll_interval_secs,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns left after the user's toggles. Columns that cannot be toggled
    /// are always shown.
    pub fn visible_columns<'a>(&'a self, hidden: &'a HashSet<String>) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns
            .iter()
            .filter(move |column| !(column.toggleable && hidden.contains(column.name)))
    }

    /// Keeps the rows matching every non-empty term. Terms are matched
    /// case-insensitively as substrings of the stored value.
    pub fn search(&self, rows: Vec<SlotRow>, search: &ColumnSearch) -> Vec<SlotRow> {
        let terms: Vec<(&Column, String)> = search
            .iter()
            .filter(|(_, term)| !term.trim().is_empty())
            .filter_map(|(name, term)| {
                self.column(name)
                    .filter(|column| column.searchable)
                    .map(|column| (column, term.trim().to_lowercase()))
            })
            .collect();

        rows.into_iter()
            .filter(|row| {
                terms.iter().all(|(column, term)| {
                    stored_value(column.name, row)
                        .is_some_and(|value| value.to_lowercase().contains(term.as_str()))
                })
            })
            .collect()
    }

    pub fn render(&self, row: &SlotRow, hidden: &HashSet<String>) -> RenderedRow {
        let cells = self
            .visible_columns(hidden)
            .map(|column| (column.name, display_value(column, row)))
            .collect();
        RenderedRow {
            id: row.slot.id,
            record_title: row.slot.slot_code.clone(),
            cells,
        }
    }
}

fn stored_value(column: &str, row: &SlotRow) -> Option<String> {
    let slot = &row.slot;
    match column {
        "slot_code" => Some(slot.slot_code.clone()),
        "session.name" => row.session_name.clone(),
        "date" => Some(slot.date.format("%Y-%m-%d").to_string()),
        "start_time" => Some(slot.start_time.format("%H:%M:%S").to_string()),
        "end_time" => Some(slot.end_time.format("%H:%M:%S").to_string()),
        "seats" => Some(slot.seats.to_string()),
        "available_seats" => Some(slot.available_seats.to_string()),
        "booked_seats" => Some(slot.booked_seats.to_string()),
        "active" => Some(slot.active.to_string()),
        _ => None,
    }
}

fn truncate(value: String, limit: Option<usize>) -> String {
    match limit {
        Some(limit) if value.chars().count() > limit => {
            let mut truncated: String = value.chars().take(limit).collect();
            truncated.push_str("...");
            truncated
        }
        _ => value,
    }
}

fn display_value(column: &Column, row: &SlotRow) -> Value {
    let slot = &row.slot;
    if column.kind == ColumnKind::BooleanIcon {
        return json!(slot.active);
    }

    let text = match column.format {
        ColumnFormat::Date => Some(slot.date.format(DATE_FORMAT).to_string()),
        ColumnFormat::Time => match column.name {
            "start_time" => Some(slot.start_time.format(TIME_FORMAT).to_string()),
            "end_time" => Some(slot.end_time.format(TIME_FORMAT).to_string()),
            _ => None,
        },
        ColumnFormat::Plain => stored_value(column.name, row),
    };

    match text.filter(|text| !text.is_empty()) {
        Some(text) => json!(truncate(text, column.limit)),
        None => json!(column.placeholder.unwrap_or_default()),
    }
}
