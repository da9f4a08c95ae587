//! Form schema for creating and editing session slots.
//!
//! The schema is a flat list of [`FieldDescriptor`]s. Fields whose bounds or
//! visibility depend on other fields are resolved through
//! [`DerivedConstraints`], which is recomputed from the current [`FormState`]
//! every time a reactive field (`session_id`, `date`) changes.

use crate::backend::SessionDirectory;
use crate::types::{OnlineSessionDetail, Session, SessionSlot, SlotInput};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

pub const GROUP_SEAT_CAP: u32 = 999;
pub const SINGLE_SEAT_CAP: u32 = 1;
pub const MINUTES_STEP: u32 = 15;
pub const SESSION_SEARCH_LIMIT: usize = 50;
pub const ONLINE_PRESETS: [&str; 4] = ["Zoom", "Google Meet", "Microsoft Teams", "Skype"];

pub fn default_online_session_details() -> Vec<OnlineSessionDetail> {
    ONLINE_PRESETS
        .iter()
        .map(|name| OnlineSessionDetail::preset(name))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Select {
        searchable: bool,
        search_limit: usize,
    },
    Date,
    Time {
        minutes_step: u32,
    },
    Number,
    Text,
    Hidden,
    Repeater {
        schema: Vec<FieldDescriptor>,
    },
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    pub reactive: bool,
    pub hidden: bool,
    pub placeholder: Option<&'static str>,
    pub default: Value,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Name of a field this value has to be strictly later than.
    pub after: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            reactive: false,
            hidden: false,
            placeholder: None,
            default: Value::Null,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            after: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn reactive(mut self) -> Self {
        self.reactive = true;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn min(mut self, min: Value) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: Value) -> Self {
        self.max = Some(max);
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn after(mut self, field: &'static str) -> Self {
        self.after = Some(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSchema {
    pub fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Applies dynamic bounds and visibility to a copy of the schema.
    pub fn resolve(&self, derived: &DerivedConstraints) -> FormSchema {
        let fields = self
            .fields
            .iter()
            .cloned()
            .map(|field| match field.name {
                "date" => field.min(json!(derived.date_min)),
                "start_time" => match derived.start_time_min {
                    Some(min) => field.min(json!(min.format("%H:%M").to_string())),
                    None => field,
                },
                "seats" => field.max(json!(derived.seats_max)),
                "online_session_details" => {
                    let visible = derived.online_details_visible;
                    FieldDescriptor {
                        required: visible,
                        ..field
                    }
                    .hidden(!visible)
                }
                _ => field,
            })
            .collect();
        FormSchema { fields }
    }
}

pub fn form_schema() -> FormSchema {
    use FieldKind::*;

    FormSchema {
        fields: vec![
            FieldDescriptor::new(
                "session_id",
                Select {
                    searchable: true,
                    search_limit: SESSION_SEARCH_LIMIT,
                },
            )
            .required()
            .reactive()
            .placeholder("Session"),
            FieldDescriptor::new("date", Date)
                .required()
                .reactive()
                .placeholder("Date"),
            FieldDescriptor::new(
                "start_time",
                Time {
                    minutes_step: MINUTES_STEP,
                },
            )
            .required()
            .placeholder("Start Time"),
            FieldDescriptor::new(
                "end_time",
                Time {
                    minutes_step: MINUTES_STEP,
                },
            )
            .required()
            .after("start_time")
            .placeholder("End Time"),
            FieldDescriptor::new("seats", Number)
                .required()
                .min(json!(1))
                .max(json!(SINGLE_SEAT_CAP))
                .default_value(json!(1))
                .placeholder("Seats"),
            FieldDescriptor::new("available_seats", Hidden).default_value(json!(0)),
            FieldDescriptor::new("booked_seats", Hidden).default_value(json!(0)),
            FieldDescriptor::new(
                "online_session_details",
                Repeater {
                    schema: vec![
                        FieldDescriptor::new("Name", Text)
                            .required()
                            .length(3, 25)
                            .placeholder("Social Media"),
                        FieldDescriptor::new("Value", Text)
                            .required()
                            .length(3, 255)
                            .placeholder("Link"),
                    ],
                },
            )
            .required()
            .reactive()
            .hidden(true)
            .default_value(json!(default_online_session_details())),
            FieldDescriptor::new("active", Toggle)
                .required()
                .default_value(json!(false)),
        ],
    }
}

mod time_format {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

/// Current values of the slot form. Every field may be missing while the
/// user is still filling it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormState {
    pub session_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    #[serde(with = "time_format")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "time_format")]
    pub end_time: Option<NaiveTime>,
    pub seats: Option<i64>,
    pub online_session_details: Option<Vec<OnlineSessionDetail>>,
    pub active: Option<bool>,
}

/// Form body as posted by the client. Values are kept untyped so that a
/// malformed entry is reported against its own field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormState {
    #[serde(default)]
    pub session_id: Value,
    #[serde(default)]
    pub date: Value,
    #[serde(default)]
    pub start_time: Value,
    #[serde(default)]
    pub end_time: Value,
    #[serde(default)]
    pub seats: Value,
    #[serde(default)]
    pub online_session_details: Value,
    #[serde(default)]
    pub active: Value,
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(raw) => raw.trim().is_empty(),
        _ => false,
    }
}

fn malformed(errors: &mut ValidationErrors, field: &'static str, code: &'static str, raw: &Value) {
    let mut error = field_error(code, format!("The {field} value is not valid."));
    error.add_param(Cow::from("value"), raw);
    errors.add(field, error);
}

fn parse_field<T: DeserializeOwned>(
    errors: &mut ValidationErrors,
    field: &'static str,
    code: &'static str,
    raw: &Value,
) -> Option<T> {
    if is_blank(raw) {
        return None;
    }
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(_) => {
            malformed(errors, field, code, raw);
            None
        }
    }
}

fn parse_time(errors: &mut ValidationErrors, field: &'static str, raw: &Value) -> Option<NaiveTime> {
    if is_blank(raw) {
        return None;
    }
    let time = raw.as_str().and_then(|raw| time_format::parse(raw.trim()));
    if time.is_none() {
        malformed(errors, field, "time", raw);
    }
    time
}

impl RawFormState {
    /// Parses every field on its own. Blank values count as unset, values
    /// that do not parse are unset in the returned state and reported under
    /// their field name.
    pub fn parse(&self) -> (FormState, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let state = FormState {
            session_id: parse_field(&mut errors, "session_id", "uuid", &self.session_id),
            date: parse_field(&mut errors, "date", "date", &self.date),
            start_time: parse_time(&mut errors, "start_time", &self.start_time),
            end_time: parse_time(&mut errors, "end_time", &self.end_time),
            seats: parse_field(&mut errors, "seats", "integer", &self.seats),
            online_session_details: parse_field(
                &mut errors,
                "online_session_details",
                "array",
                &self.online_session_details,
            ),
            active: parse_field(&mut errors, "active", "boolean", &self.active),
        };
        (state, errors)
    }
}

impl FormState {
    pub fn from_slot(slot: &SessionSlot) -> Self {
        Self {
            session_id: Some(slot.session_id),
            date: Some(slot.date),
            start_time: Some(slot.start_time),
            end_time: Some(slot.end_time),
            seats: Some(i64::from(slot.seats)),
            online_session_details: Some(slot.online_session_details.clone()),
            active: Some(slot.active),
        }
    }

    /// Fills untouched fields with their defaults. Online details are only
    /// kept while the repeater is visible.
    pub fn with_defaults(mut self, derived: &DerivedConstraints) -> Self {
        self.seats.get_or_insert(1);
        self.active.get_or_insert(false);
        if derived.online_details_visible {
            let filled = self
                .online_session_details
                .as_ref()
                .is_some_and(|details| !details.is_empty());
            if !filled {
                self.online_session_details = Some(default_online_session_details());
            }
        } else {
            self.online_session_details = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedConstraints {
    pub seats_max: u32,
    pub online_details_visible: bool,
    pub date_min: NaiveDate,
    pub start_time_min: Option<NaiveTime>,
}

impl DerivedConstraints {
    /// Without a selected session the form stays in its most restrictive
    /// state: a single seat and no online details.
    pub fn compute(session: Option<&Session>, date: Option<NaiveDate>, now: NaiveDateTime) -> Self {
        let seats_max = match session {
            Some(session) if session.session_type.is_group() => GROUP_SEAT_CAP,
            _ => SINGLE_SEAT_CAP,
        };
        let online_details_visible =
            session.is_some_and(|session| session.session_mode.is_online());
        let today = now.date();
        let start_time_min = (date == Some(today)).then(|| now.time());

        Self {
            seats_max,
            online_details_visible,
            date_min: today,
            start_time_min,
        }
    }
}

pub fn derive_constraints<D: SessionDirectory + ?Sized>(
    state: &FormState,
    sessions: &D,
    now: NaiveDateTime,
) -> DerivedConstraints {
    let session = state.session_id.and_then(|id| sessions.find(id));
    DerivedConstraints::compute(session.as_ref(), state.date, now)
}

fn field_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message.into()))
}

/// Flags a missing value unless the field already failed to parse.
fn require(errors: &mut ValidationErrors, field: &'static str, label: &str) {
    if !errors.field_errors().contains_key(field) {
        errors.add(field, field_error("required", format!("The {label} field is required.")));
    }
}

fn on_step(time: NaiveTime) -> bool {
    time.minute() % MINUTES_STEP == 0 && time.second() == 0 && time.nanosecond() == 0
}

fn check_time(
    errors: &mut ValidationErrors,
    field: &'static str,
    time: Option<NaiveTime>,
) -> Option<NaiveTime> {
    match time {
        None => {
            require(errors, field, field);
            None
        }
        Some(time) if !on_step(time) => {
            let mut error = field_error(
                "minutes_step",
                format!("The {field} must be on a {MINUTES_STEP} minute step."),
            );
            error.add_param(Cow::from("step"), &MINUTES_STEP);
            errors.add(field, error);
            Some(time)
        }
        Some(time) => Some(time),
    }
}

/// Validates a submitted form against the selected session and the current
/// wall-clock time, returning every violated field at once. Values that fail
/// to parse are reported alongside the other field errors.
pub fn validate_submission<D: SessionDirectory + ?Sized>(
    raw: &RawFormState,
    sessions: &D,
    now: NaiveDateTime,
) -> Result<SlotInput, ValidationErrors> {
    let (form, errors) = raw.parse();
    check_submission(&form, errors, sessions, now)
}

fn check_submission<D: SessionDirectory + ?Sized>(
    form: &FormState,
    mut errors: ValidationErrors,
    sessions: &D,
    now: NaiveDateTime,
) -> Result<SlotInput, ValidationErrors> {
    let session = match form.session_id {
        None => {
            require(&mut errors, "session_id", "session");
            None
        }
        Some(id) => match sessions.find(id) {
            None => {
                errors.add(
                    "session_id",
                    field_error("exists", "The selected session is invalid."),
                );
                None
            }
            Some(session) => {
                if !session.active {
                    errors.add(
                        "session_id",
                        field_error("active", "The selected session is not active."),
                    );
                }
                Some(session)
            }
        },
    };
    let derived = DerivedConstraints::compute(session.as_ref(), form.date, now);

    match form.date {
        None => require(&mut errors, "date", "date"),
        Some(date) if date < derived.date_min => {
            let mut error = field_error(
                "after_or_equal",
                format!("The date must be {} or later.", derived.date_min),
            );
            error.add_param(Cow::from("min"), &derived.date_min);
            errors.add("date", error);
        }
        Some(_) => {}
    }

    let start_time = check_time(&mut errors, "start_time", form.start_time);
    if let (Some(start), Some(min)) = (start_time, derived.start_time_min) {
        if start < min {
            errors.add(
                "start_time",
                field_error(
                    "after_or_equal",
                    format!("The start time must be {} or later.", min.format("%H:%M")),
                ),
            );
        }
    }

    let end_time = check_time(&mut errors, "end_time", form.end_time);
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if end <= start {
            errors.add(
                "end_time",
                field_error("after", "The end time must be after the start time."),
            );
        }
    }

    match form.seats {
        None => require(&mut errors, "seats", "seats"),
        Some(seats) if seats < 1 => {
            let mut error = field_error("min", "The seats must be at least 1.");
            error.add_param(Cow::from("min"), &1);
            errors.add("seats", error);
        }
        Some(seats) if seats > i64::from(derived.seats_max) => {
            let mut error = field_error(
                "max",
                format!("The seats may not be greater than {}.", derived.seats_max),
            );
            error.add_param(Cow::from("max"), &derived.seats_max);
            errors.add("seats", error);
        }
        Some(_) => {}
    }

    let online_session_details = if derived.online_details_visible {
        match &form.online_session_details {
            Some(details) if !details.is_empty() => {
                for (index, detail) in details.iter().enumerate() {
                    if let Err(entry_errors) = detail.validate() {
                        let mut error = field_error(
                            "invalid_entry",
                            format!("Online session detail {} is invalid.", index + 1),
                        );
                        error.add_param(Cow::from("index"), &index);
                        error.add_param(Cow::from("fields"), &entry_errors);
                        errors.add("online_session_details", error);
                    }
                }
                details.clone()
            }
            _ => {
                require(&mut errors, "online_session_details", "online session details");
                vec![]
            }
        }
    } else {
        vec![]
    };

    if form.active.is_none() {
        require(&mut errors, "active", "active");
    }

    match (session, form.date, start_time, end_time, form.seats, form.active) {
        (Some(session), Some(date), Some(start_time), Some(end_time), Some(seats), Some(active))
            if errors.is_empty() =>
        {
            let seats = u32::try_from(seats).map_err(|_| {
                let mut errors = ValidationErrors::new();
                errors.add("seats", field_error("max", "The seats value is out of range."));
                errors
            })?;
            Ok(SlotInput {
                session_id: session.id,
                date,
                start_time,
                end_time,
                seats,
                online_session_details,
                active,
            })
        }
        _ => Err(errors),
    }
}
