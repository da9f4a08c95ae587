use crate::{
    filters::{filter_schema, FilterDescriptor},
    form::{form_schema, FormSchema},
    table::TableSchema,
    types::SessionSlot,
};
use serde::Serialize;
use uuid::Uuid;

pub const BASE_PATH: &str = "/slots";
pub const INDEX_PATH: &str = "/";
pub const CREATE_PATH: &str = "/create";
pub const VIEW_PATH: &str = "/{record}";
pub const EDIT_PATH: &str = "/{record}/edit";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    pub label: &'static str,
    pub icon: &'static str,
    pub group: &'static str,
    pub sort: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    List,
    Create,
    View,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub name: &'static str,
    pub kind: PageKind,
    pub path: &'static str,
}

/// Nested panel listing records related to the slot being viewed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationManager {
    pub name: &'static str,
    pub relationship: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotResource {
    pub model: &'static str,
    pub record_title_attribute: &'static str,
    pub navigation: Navigation,
    pub pages: Vec<Page>,
    pub relations: Vec<RelationManager>,
    pub form: FormSchema,
    pub table: TableSchema,
    pub filters: Vec<FilterDescriptor>,
}

impl SlotResource {
    pub fn new(poll_interval_secs: u64) -> Self {
        Self {
            model: "SessionSlot",
            record_title_attribute: "slot_code",
            navigation: Navigation {
                label: "Session Slots",
                icon: "heroicon-o-clock",
                group: "Session Management",
                sort: 2,
            },
            pages: vec![
                Page {
                    name: "index",
                    kind: PageKind::List,
                    path: INDEX_PATH,
                },
                Page {
                    name: "create",
                    kind: PageKind::Create,
                    path: CREATE_PATH,
                },
                Page {
                    name: "view",
                    kind: PageKind::View,
                    path: VIEW_PATH,
                },
                Page {
                    name: "edit",
                    kind: PageKind::Edit,
                    path: EDIT_PATH,
                },
            ],
            relations: vec![
                RelationManager {
                    name: "cancellations",
                    relationship: "session_cancellations",
                    title: "Session Cancellations",
                },
                RelationManager {
                    name: "reviews",
                    relationship: "review_ratings",
                    title: "Review Ratings",
                },
            ],
            form: form_schema(),
            table: TableSchema::new(poll_interval_secs),
            filters: filter_schema(),
        }
    }

    pub fn record_title(&self, slot: &SessionSlot) -> String {
        slot.slot_code.clone()
    }

    /// Absolute URL of a page, with `{record}` filled in for record pages.
    pub fn page_url(&self, name: &str, record: Option<Uuid>) -> Option<String> {
        let page = self.pages.iter().find(|page| page.name == name)?;
        let path = match (page.path.contains("{record}"), record) {
            (true, Some(record)) => page.path.replace("{record}", &record.to_string()),
            (true, None) => return None,
            (false, _) => page.path.to_string(),
        };
        Some(match path.as_str() {
            "/" => BASE_PATH.to_string(),
            _ => format!("{BASE_PATH}{path}"),
        })
    }
}
