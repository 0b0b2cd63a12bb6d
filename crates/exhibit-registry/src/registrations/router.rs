use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{ExhibitId, ExhibitReview, ParticipantId, UserId};
use super::export::{collect_tables, export_name, xlsx_workbook, zip_archive, ExportError};
use super::forms::{AppointmentsForm, ExhibitForm, FederationForm, ParticipantForm, TravelForm};
use super::notify::MailTransport;
use super::printout::render_document;
use super::report::{CatalogExtras, CatalogReport, ReportMode};
use super::store::{RecordStore, StoreError};
use super::workflow::{RegistrationWorkflow, Step, WorkflowError};

pub const USER_HEADER: &str = "x-user-id";
pub const REGISTER_PATH: &str = "/api/v1/register";

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Workflow plus the bearer token guarding staff endpoints.
pub struct RegistrationApi<S, M> {
    workflow: RegistrationWorkflow<S, M>,
    staff_token: Option<String>,
}

impl<S, M> RegistrationApi<S, M>
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(workflow: RegistrationWorkflow<S, M>, staff_token: Option<String>) -> Self {
        Self {
            workflow,
            staff_token,
        }
    }

    pub fn workflow(&self) -> &RegistrationWorkflow<S, M> {
        &self.workflow
    }
}

/// Router builder exposing the registration steps and the staff endpoints.
pub fn registration_router<S, M>(api: Arc<RegistrationApi<S, M>>) -> Router
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route("/api/v1/register", get(overview_handler::<S, M>))
        .route(
            "/api/v1/register/:step",
            get(open_step_handler::<S, M>).post(submit_step_handler::<S, M>),
        )
        .route(
            "/api/v1/register/exhibit",
            get(open_exhibit_list_handler::<S, M>).post(submit_new_exhibit_handler::<S, M>),
        )
        .route(
            "/api/v1/register/exhibit/:exhibit_id",
            get(open_exhibit_handler::<S, M>)
                .post(submit_exhibit_handler::<S, M>)
                .delete(remove_exhibit_handler::<S, M>),
        )
        .route("/api/v1/print", get(printout_handler::<S, M>))
        .route("/api/v1/export", get(export_zip_handler::<S, M>))
        .route("/api/v1/export/xlsx", get(export_xlsx_handler::<S, M>))
        .route("/api/v1/report", get(report_handler::<S, M>))
        .route("/api/v1/federations", post(create_federation_handler::<S, M>))
        .route(
            "/api/v1/staff/exhibits/:exhibit_id",
            patch(review_exhibit_handler::<S, M>),
        )
        .route(
            "/api/v1/staff/participants/:participant_id",
            axum::routing::delete(delete_participant_handler::<S, M>),
        )
        .with_state(api)
}

pub fn step_location(step: Step) -> String {
    format!("{REGISTER_PATH}/{}", step.slug())
}

fn redirect_to(step: Step) -> Response {
    Redirect::to(&step_location(step)).into_response()
}

fn error_payload(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

fn workflow_error_response(error: WorkflowError) -> Response {
    match error {
        WorkflowError::Redirect(step) => redirect_to(step),
        WorkflowError::Validation(errors) => {
            let payload = json!({
                "errors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        WorkflowError::Store(StoreError::NotFound) => {
            error_payload(StatusCode::NOT_FOUND, "record not found")
        }
        WorkflowError::Store(err @ StoreError::ParticipationLimit { .. }) => {
            error_payload(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        WorkflowError::Store(StoreError::Conflict) => {
            error_payload(StatusCode::CONFLICT, "record already exists")
        }
        WorkflowError::Dispatch(err) => {
            warn!(error = %err, "notification dispatch failed");
            error_payload(StatusCode::BAD_GATEWAY, err.to_string())
        }
        other => error_payload(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn export_error_response(error: ExportError) -> Response {
    warn!(error = %error, "export failed");
    error_payload(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

fn user_id(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| error_payload(StatusCode::UNAUTHORIZED, "missing x-user-id header"))
}

fn authorize_staff(headers: &HeaderMap, token: Option<&str>) -> Result<(), Response> {
    let Some(expected) = token else {
        return Err(error_payload(
            StatusCode::FORBIDDEN,
            "staff endpoints are disabled",
        ));
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(error_payload(
            StatusCode::UNAUTHORIZED,
            "invalid staff token",
        )),
    }
}

fn parse_form<T: DeserializeOwned>(body: Value) -> Result<T, Response> {
    serde_json::from_value(body)
        .map_err(|err| error_payload(StatusCode::BAD_REQUEST, format!("malformed form: {err}")))
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{file_name}\"");
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

fn with_content_type(body: String, content_type: mime::Mime) -> Response {
    ([(header::CONTENT_TYPE, content_type.to_string())], body).into_response()
}

pub(crate) async fn overview_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    let user = match user_id(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.workflow.overview(&user, None) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

fn open_step<S, M>(
    api: &RegistrationApi<S, M>,
    headers: &HeaderMap,
    step: Step,
    exhibit: Option<ExhibitId>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    let user = match user_id(headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.workflow.open_step(&user, step, exhibit) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn open_step_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(step): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    match step.parse::<Step>() {
        Ok(step) => open_step(&api, &headers, step, None),
        Err(_) => redirect_to(Step::Personal),
    }
}

pub(crate) async fn open_exhibit_list_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    open_step(&api, &headers, Step::Exhibit, None)
}

pub(crate) async fn open_exhibit_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(exhibit_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    match exhibit_id.parse::<u64>() {
        Ok(id) => open_step(&api, &headers, Step::Exhibit, Some(ExhibitId(id))),
        Err(_) => redirect_to(Step::Exhibit),
    }
}

fn submit_step<S, M>(
    api: &RegistrationApi<S, M>,
    headers: &HeaderMap,
    step: Step,
    exhibit: Option<ExhibitId>,
    body: Value,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    let user = match user_id(headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let workflow = &api.workflow;
    let result = match step {
        Step::Personal => parse_form::<ParticipantForm>(body).map(|form| {
            workflow
                .submit_personal(&user, &form)
                .map(|participant| (StatusCode::OK, json!(participant)))
        }),
        Step::Appointments => parse_form::<AppointmentsForm>(body).map(|form| {
            workflow
                .submit_appointments(&user, &form)
                .map(|outcome| (StatusCode::OK, json!(outcome)))
        }),
        Step::Exhibit => parse_form::<ExhibitForm>(body).map(|form| {
            let status = if exhibit.is_some() {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            workflow
                .submit_exhibit(&user, exhibit, &form)
                .map(|outcome| (status, json!(outcome)))
        }),
        Step::Travel => parse_form::<TravelForm>(body).map(|form| {
            workflow
                .submit_travel(&user, &form)
                .map(|travel| (StatusCode::OK, json!(travel)))
        }),
    };
    match result {
        Ok(Ok((status, payload))) => (status, axum::Json(payload)).into_response(),
        Ok(Err(err)) => workflow_error_response(err),
        Err(response) => response,
    }
}

pub(crate) async fn submit_step_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(step): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    match step.parse::<Step>() {
        Ok(step) => submit_step(&api, &headers, step, None, body),
        Err(_) => redirect_to(Step::Personal),
    }
}

pub(crate) async fn submit_new_exhibit_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    submit_step(&api, &headers, Step::Exhibit, None, body)
}

pub(crate) async fn submit_exhibit_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(exhibit_id): Path<String>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    match exhibit_id.parse::<u64>() {
        Ok(id) => submit_step(&api, &headers, Step::Exhibit, Some(ExhibitId(id)), body),
        Err(_) => redirect_to(Step::Exhibit),
    }
}

pub(crate) async fn remove_exhibit_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(exhibit_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    let user = match user_id(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Ok(id) = exhibit_id.parse::<u64>() else {
        return redirect_to(Step::Exhibit);
    };
    match api.workflow.remove_exhibit(&user, ExhibitId(id)) {
        Ok(_) => redirect_to(Step::Exhibit),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn printout_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    let user = match user_id(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.workflow.printout(&user) {
        Ok(sections) => {
            let name = &api.workflow.exhibition().name;
            let document = render_document(name, &format!("{name} - Registration"), &sections);
            with_content_type(document, mime::TEXT_HTML_UTF_8)
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn export_zip_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    let exhibition = api.workflow.exhibition();
    let name = export_name(exhibition, Utc::now().naive_utc());
    let archive = collect_tables(api.workflow.store().as_ref(), &exhibition.native_language)
        .map_err(ExportError::from)
        .and_then(|tables| zip_archive(&tables, &name));
    match archive {
        Ok(bytes) => {
            info!(export = %name, size = bytes.len(), "zip export generated");
            attachment(ZIP_CONTENT_TYPE, &format!("{name}.zip"), bytes)
        }
        Err(err) => export_error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct XlsxQuery {
    /// Catalog sheet grouping, `inventory` leaves out literature.
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

pub(crate) async fn export_xlsx_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Query(query): Query<XlsxQuery>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    let mode = match query.kind.as_deref().unwrap_or_default().parse::<ReportMode>() {
        Ok(mode) => mode,
        Err(err) => return error_payload(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let exhibition = api.workflow.exhibition();
    let store = api.workflow.store().as_ref();
    let name = export_name(exhibition, Utc::now().naive_utc());
    let workbook = collect_tables(store, &exhibition.native_language)
        .and_then(|tables| {
            CatalogReport::from_store(store, mode, CatalogExtras::Plain)
                .map(|catalog| (tables, catalog))
        })
        .map_err(ExportError::from)
        .and_then(|(tables, catalog)| xlsx_workbook(&tables, &catalog));
    match workbook {
        Ok(bytes) => {
            info!(export = %name, ?mode, size = bytes.len(), "xlsx export generated");
            attachment(XLSX_CONTENT_TYPE, &format!("{name}.xlsx"), bytes)
        }
        Err(err) => export_error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    extras: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

pub(crate) async fn report_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Query(query): Query<ReportQuery>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    let mode = match query.mode.as_deref().unwrap_or_default().parse::<ReportMode>() {
        Ok(mode) => mode,
        Err(err) => return error_payload(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let extras = match query.extras.as_deref().unwrap_or_default().parse::<CatalogExtras>() {
        Ok(extras) => extras,
        Err(err) => return error_payload(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let report = match CatalogReport::from_store(api.workflow.store().as_ref(), mode, extras) {
        Ok(report) => report,
        Err(err) => return workflow_error_response(err.into()),
    };

    match query.format.as_deref().unwrap_or("json") {
        "json" => (StatusCode::OK, axum::Json(report)).into_response(),
        "html" => with_content_type(
            report.to_html(&api.workflow.exhibition().name),
            mime::TEXT_HTML_UTF_8,
        ),
        "text" => with_content_type(report.to_text(), mime::TEXT_PLAIN_UTF_8),
        other => error_payload(
            StatusCode::BAD_REQUEST,
            format!("unknown report format '{other}', expected json, html or text"),
        ),
    }
}

pub(crate) async fn create_federation_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<FederationForm>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    match api.workflow.create_federation(&form) {
        Ok(federation) => (StatusCode::CREATED, axum::Json(federation)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn review_exhibit_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(exhibit_id): Path<u64>,
    headers: HeaderMap,
    axum::Json(review): axum::Json<ExhibitReview>,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    match api.workflow.review_exhibit(ExhibitId(exhibit_id), review) {
        Ok(exhibit) => (StatusCode::OK, axum::Json(exhibit)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn delete_participant_handler<S, M>(
    State(api): State<Arc<RegistrationApi<S, M>>>,
    Path(participant_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    if let Err(response) = authorize_staff(&headers, api.staff_token.as_deref()) {
        return response;
    }
    match api.workflow.delete_participant(ParticipantId(participant_id)) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_payload(StatusCode::NOT_FOUND, "participant not found"),
        Err(err) => workflow_error_response(err),
    }
}
