use crate::backend::{SessionDirectory, SlotBackend};
use crate::configuration::Configuration;
use crate::error::AppError;
use crate::filters::SlotFilters;
use crate::form::{
    derive_constraints, validate_submission, DerivedConstraints, FormSchema, FormState, RawFormState,
    SESSION_SEARCH_LIMIT,
};
use crate::resource::{SlotResource, BASE_PATH, CREATE_PATH, EDIT_PATH, INDEX_PATH, VIEW_PATH};
use crate::table::{ColumnSearch, RenderedRow, SlotRow};
use crate::types::{ReviewRating, Session, SessionCancellation, SessionSlot};
use crate::AppState;
use axum::extract::{Path, Query};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{get, post},
    Router,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, convert::Infallible, sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Individual column search terms plus the table filters and column toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
struct ListQuery {
    #[validate(length(max = 255))]
    slot_code: Option<String>,
    #[validate(length(max = 255))]
    session_name: Option<String>,
    #[validate(length(max = 255))]
    date: Option<String>,
    #[validate(length(max = 255))]
    start_time: Option<String>,
    #[validate(length(max = 255))]
    end_time: Option<String>,
    #[validate(length(max = 255))]
    seats: Option<String>,
    #[validate(length(max = 255))]
    available_seats: Option<String>,
    #[validate(length(max = 255))]
    booked_seats: Option<String>,
    created_from: Option<NaiveDate>,
    created_until: Option<NaiveDate>,
    /// Comma separated session ids
    sessions: Option<String>,
    /// Comma separated column names
    hidden: Option<String>,
}

impl ListQuery {
    fn search(&self) -> ColumnSearch {
        [
            ("slot_code", &self.slot_code),
            ("session.name", &self.session_name),
            ("date", &self.date),
            ("start_time", &self.start_time),
            ("end_time", &self.end_time),
            ("seats", &self.seats),
            ("available_seats", &self.available_seats),
            ("booked_seats", &self.booked_seats),
        ]
        .into_iter()
        .filter_map(|(column, term)| term.clone().map(|term| (column.to_string(), term)))
        .collect()
    }

    fn filters(&self) -> Result<SlotFilters, ValidationErrors> {
        let mut session_ids = HashSet::new();
        for raw in split_list(&self.sessions) {
            match Uuid::parse_str(&raw) {
                Ok(id) => {
                    session_ids.insert(id);
                }
                Err(_) => {
                    let mut errors = ValidationErrors::new();
                    let mut error = ValidationError::new("uuid");
                    error.add_param("value".into(), &raw);
                    errors.add("sessions", error);
                    return Err(errors);
                }
            }
        }
        Ok(SlotFilters {
            created_from: self.created_from,
            created_until: self.created_until,
            session_ids,
        })
    }

    fn hidden(&self) -> HashSet<String> {
        split_list(&self.hidden).collect()
    }
}

fn split_list(raw: &Option<String>) -> impl Iterator<Item = String> + '_ {
    raw.iter()
        .flat_map(|raw| raw.split(','))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct SessionSearchQuery {
    #[validate(length(min = 1, max = 100))]
    term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionOption {
    id: Uuid,
    name: String,
}

impl From<Session> for SessionOption {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            name: session.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ListResponse {
    poll_interval_secs: u64,
    columns: Vec<&'static str>,
    total: usize,
    rows: Vec<RenderedRow>,
}

#[derive(Debug, Clone, Serialize)]
struct FormResponse {
    schema: FormSchema,
    state: FormState,
    constraints: DerivedConstraints,
}

#[derive(Debug, Clone, Serialize)]
struct ViewResponse {
    record_title: String,
    record: SessionSlot,
    session: Option<Session>,
    relations: Vec<&'static str>,
    edit_url: Option<String>,
}

pub fn create_app<T, D, C>(slot_backend: T, sessions: Arc<D>, configuration: C) -> Router
where
    T: SlotBackend,
    D: SessionDirectory + 'static,
    C: Configuration,
{
    let state = AppState {
        slot_backend,
        sessions,
        resource: Arc::new(SlotResource::new(configuration.poll_interval_secs())),
        timezone: configuration.timezone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let slots = Router::new()
        .route(INDEX_PATH, get(list_slots::<T, D>).post(create_slot::<T, D>))
        .route(CREATE_PATH, get(create_page::<T, D>))
        .route("/form", post(recompute_form::<T, D>))
        .route("/stream", get(stream_slots::<T, D>))
        .route(
            VIEW_PATH,
            get(view_slot::<T, D>)
                .put(update_slot::<T, D>)
                .delete(remove_slot::<T, D>),
        )
        .route(EDIT_PATH, get(edit_page::<T, D>))
        .route("/{record}/cancellations", get(list_cancellations::<T, D>))
        .route("/{record}/reviews", get(list_reviews::<T, D>));

    let sessions = Router::new()
        .route("/options", get(session_options::<T, D>))
        .route("/search", get(search_sessions::<T, D>));

    Router::new()
        .route("/resource", get(get_resource::<T, D>))
        .nest(BASE_PATH, slots)
        .nest("/sessions", sessions)
        .with_state(state)
        .layer(cors)
}

fn slot_rows<T: SlotBackend, D: SessionDirectory + 'static>(
    state: &AppState<T, D>,
    slots: Vec<SessionSlot>,
) -> Vec<SlotRow> {
    slots
        .into_iter()
        .map(|slot| {
            let session_name = state.sessions.find(slot.session_id).map(|session| session.name);
            SlotRow { slot, session_name }
        })
        .collect()
}

fn form_response<T: SlotBackend, D: SessionDirectory + 'static>(
    state: &AppState<T, D>,
    form_state: FormState,
) -> FormResponse {
    let constraints = derive_constraints(&form_state, state.sessions.as_ref(), state.now());
    FormResponse {
        schema: state.resource.form.resolve(&constraints),
        state: form_state.with_defaults(&constraints),
        constraints,
    }
}

async fn get_resource<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
) -> Json<SlotResource> {
    Json(state.resource.as_ref().clone())
}

async fn list_slots<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<impl IntoResponse, AppError> {
    let table = &state.resource.table;
    let filters = query.filters()?;
    let hidden = query.hidden();

    let rows = slot_rows(&state, state.slot_backend.slots());
    let rows = table.search(filters.apply(rows), &query.search());
    let rows: Vec<RenderedRow> = rows.iter().map(|row| table.render(row, &hidden)).collect();

    Ok(Json(ListResponse {
        poll_interval_secs: table.poll_interval_secs,
        columns: table.visible_columns(&hidden).map(|column| column.name).collect(),
        total: rows.len(),
        rows,
    }))
}

async fn stream_slots<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let keep_alive =
        KeepAlive::new().interval(Duration::from_secs(state.resource.table.poll_interval_secs.max(1)));
    let hidden = HashSet::new();

    let slot_stream = state.slot_backend.slot_stream();
    let stream = slot_stream.map(move |slots| {
        let rows: Vec<RenderedRow> = slot_rows(&state, slots)
            .iter()
            .map(|row| state.resource.table.render(row, &hidden))
            .collect();
        let event = Event::default()
            .event("slots")
            .json_data(&rows)
            .unwrap_or_else(|err| {
                error!(?err, "Failed to encode slot rows");
                Event::default().event("error")
            });
        Ok(event)
    });

    Sse::new(stream).keep_alive(keep_alive)
}

async fn create_page<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
) -> Json<FormResponse> {
    Json(form_response(&state, FormState::default()))
}

async fn recompute_form<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Json(raw): Json<RawFormState>,
) -> Json<FormResponse> {
    // Values that do not parse yet are treated as unset until submission.
    let (form_state, _) = raw.parse();
    Json(form_response(&state, form_state))
}

async fn create_slot<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Json(form): Json<RawFormState>,
) -> Result<impl IntoResponse, AppError> {
    let input = validate_submission(&form, state.sessions.as_ref(), state.now())?;
    let slot = state.slot_backend.add_slot(input)?;

    info!(slot_code = %slot.slot_code, "Created slot");
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn view_slot<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let slot = state.slot_backend.slot(id)?;
    let resource = &state.resource;

    Ok(Json(ViewResponse {
        record_title: resource.record_title(&slot),
        session: state.sessions.find(slot.session_id),
        relations: resource.relations.iter().map(|relation| relation.name).collect(),
        edit_url: resource.page_url("edit", Some(slot.id)),
        record: slot,
    }))
}

async fn edit_page<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let slot = state.slot_backend.slot(id)?;
    Ok(Json(form_response(&state, FormState::from_slot(&slot))))
}

async fn update_slot<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
    Json(form): Json<RawFormState>,
) -> Result<impl IntoResponse, AppError> {
    state.slot_backend.slot(id)?;
    let input = validate_submission(&form, state.sessions.as_ref(), state.now())?;
    let slot = state.slot_backend.update_slot(id, input)?;

    info!(slot_code = %slot.slot_code, "Updated slot");
    Ok(Json(slot))
}

async fn remove_slot<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.slot_backend.remove_slot(id)?;

    info!(%id, "Removed slot");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_cancellations<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionCancellation>>, AppError> {
    state.slot_backend.slot(id)?;
    Ok(Json(state.slot_backend.cancellations(id)))
}

async fn list_reviews<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReviewRating>>, AppError> {
    state.slot_backend.slot(id)?;
    Ok(Json(state.slot_backend.reviews(id)))
}

async fn session_options<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
) -> Json<Vec<SessionOption>> {
    Json(state.sessions.active().into_iter().map(SessionOption::from).collect())
}

async fn search_sessions<T: SlotBackend, D: SessionDirectory + 'static>(
    State(state): State<AppState<T, D>>,
    Valid(Query(query)): Valid<Query<SessionSearchQuery>>,
) -> Json<Vec<SessionOption>> {
    Json(
        state
            .sessions
            .search_active(&query.term, SESSION_SEARCH_LIMIT)
            .into_iter()
            .map(SessionOption::from)
            .collect(),
    )
}
