//! HTTP routes for the web server.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::assets::{content_type, StaticAssets};
use super::templates::{LibraryPanelView, PageRequest, PageView, PromptTableView, TemplateEngine};
use crate::consent::ConsentPreferences;
use crate::export::{export, format_markdown, ExportFormat};
use crate::library::{load_bundled_csv, parse_prompt_csv, LibraryStatus};
use crate::session::{PromptMode, PromptRow, SessionStore, Storage, StoreError};
use crate::steps::{SubsetPreset, Variant};

/// Shared application state.
pub struct AppState {
    store: Mutex<SessionStore>,
    storage: Arc<dyn Storage>,
    library_status: Mutex<LibraryStatus>,
    bundled_csv: Option<PathBuf>,
    pub template_engine: TemplateEngine,
    /// Variant shown when the URL does not name one.
    pub default_variant: Variant,
}

impl AppState {
    /// Open the saved session in `storage`.
    pub fn new(storage: Arc<dyn Storage>, default_variant: Variant) -> Result<Self, StoreError> {
        let store = SessionStore::open(Arc::clone(&storage))?;
        let library_status = LibraryStatus::for_saved(&store.state().prompt_rows);

        Ok(Self {
            store: Mutex::new(store),
            storage,
            library_status: Mutex::new(library_status),
            bundled_csv: None,
            template_engine: TemplateEngine::default(),
            default_variant,
        })
    }

    /// Prompt library CSV loaded at startup and again after every reset.
    pub fn with_bundled_csv(mut self, path: Option<PathBuf>) -> Self {
        self.bundled_csv = path;
        self
    }

    /// Load the bundled CSV, if one is configured and usable.
    pub fn load_bundled_prompts(&self) -> Result<(), StoreError> {
        match self.bundled_csv.as_deref().and_then(load_bundled_csv) {
            Some(rows) => self.auto_load_prompts(rows),
            None => Ok(()),
        }
    }

    /// Replace the prompt library with rows from the bundled CSV.
    pub fn auto_load_prompts(&self, rows: Vec<PromptRow>) -> Result<(), StoreError> {
        let count = rows.len();
        self.store().set_prompt_rows(rows)?;
        *self.status() = LibraryStatus::AutoLoaded(count);
        tracing::info!(rows = count, "bundled prompt library loaded");
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> MutexGuard<'_, LibraryStatus> {
        self.library_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn consent(&self) -> ConsentPreferences {
        ConsentPreferences::load(self.storage.as_ref()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read consent preferences");
            ConsentPreferences::default()
        })
    }
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/field", post(field_handler))
        .route("/api/prompt/:mode", post(prompt_entry_handler))
        .route("/api/reset", post(reset_handler))
        .route(
            "/api/prompts",
            get(prompt_table_handler)
                .post(load_prompts_handler)
                .delete(clear_prompts_handler),
        )
        .route("/api/consent", get(get_consent_handler).post(set_consent_handler))
        .route("/export/preview", get(preview_handler))
        .route("/export/:format", get(export_handler))
        .route("/assets/*path", get(assets_handler))
        .with_state(state)
}

/// Query parameters of the workbook page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub variant: Option<String>,
    pub step: Option<String>,
    pub preset: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptText {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsentUpdate {
    pub personal: Option<bool>,
    pub share: Option<bool>,
    pub email: Option<bool>,
}

fn internal_error(context: &str, e: impl Display) -> Response {
    tracing::error!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{}: {}", context, e),
    )
        .into_response()
}

fn render(result: Result<String, minijinja::Error>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error("Template error", e),
    }
}

/// Handler for the workbook page.
async fn page_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let variant = match query.variant.as_deref() {
        Some(value) => Variant::from_query(Some(value)),
        None => state.default_variant,
    };
    // Out-of-range or garbage steps fall back to the first stage.
    let step = query
        .step
        .as_deref()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let preset = query.preset.as_deref().and_then(SubsetPreset::parse);
    let consent = state.consent();

    let status = state.status().clone();
    let store = state.store();
    let page = PageView::new(
        store.state(),
        &PageRequest {
            variant,
            step,
            preset,
            query: query.q.as_deref().unwrap_or(""),
            library_status: &status,
            consent,
        },
    );

    render(state.template_engine.render_page(&page))
}

/// Handler for a single field edit.
async fn field_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<FieldUpdate>,
) -> Response {
    match state.store().set(&update.key, update.value) {
        Ok(()) => {
            tracing::trace!(key = %update.key, "field saved");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => internal_error("Failed to save field", e),
    }
}

/// Handler for recording an ask/clarify entry.
async fn prompt_entry_handler(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    Json(body): Json<PromptText>,
) -> Response {
    let mode: PromptMode = match mode.parse() {
        Ok(mode) => mode,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let text = body.text.trim();
    if text.is_empty() {
        return (StatusCode::BAD_REQUEST, "Prompt text is empty").into_response();
    }

    match state.store().append_prompt_entry(mode, text) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => internal_error("Failed to save prompt", e),
    }
}

/// Handler for clearing the session. The view then starts over from the
/// configured defaults, bundled prompt library included.
async fn reset_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Err(e) = state.store().reset() {
        return internal_error("Failed to reset session", e);
    }
    *state.status() = LibraryStatus::Empty;

    match state.load_bundled_prompts() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal_error("Failed to reload bundled prompt library", e),
    }
}

/// Handler for the filtered prompt table fragment.
async fn prompt_table_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let store = state.store();
    let table = PromptTableView::new(&store.state().prompt_rows, &query.q);
    render(state.template_engine.render_prompt_table(&table))
}

fn library_panel(state: &AppState, status: StatusCode) -> Response {
    let current = state.status().clone();
    let store = state.store();
    let panel = LibraryPanelView::new(&current, &store.state().prompt_rows);
    match state.template_engine.render_library_panel(&panel) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => internal_error("Template error", e),
    }
}

/// Handler for a CSV upload. A parse failure leaves the library untouched.
async fn load_prompts_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let rows = match parse_prompt_csv(body.as_ref()) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "prompt CSV rejected");
            *state.status() = LibraryStatus::ParseError(e.to_string());
            return library_panel(&state, StatusCode::UNPROCESSABLE_ENTITY);
        }
    };

    let count = rows.len();
    if let Err(e) = state.store().set_prompt_rows(rows) {
        return internal_error("Failed to save prompt library", e);
    }
    *state.status() = LibraryStatus::Loaded(count);
    tracing::info!(rows = count, "prompt library loaded");

    library_panel(&state, StatusCode::OK)
}

/// Handler for dropping the prompt library.
async fn clear_prompts_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Err(e) = state.store().clear_prompt_rows() {
        return internal_error("Failed to clear prompt library", e);
    }
    *state.status() = LibraryStatus::Cleared;
    library_panel(&state, StatusCode::OK)
}

async fn get_consent_handler(State(state): State<Arc<AppState>>) -> Json<ConsentPreferences> {
    Json(state.consent())
}

async fn set_consent_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConsentUpdate>,
) -> Response {
    let mut prefs = state.consent();
    prefs.update(update.personal, update.share, update.email);
    match prefs.save(state.storage.as_ref()) {
        Ok(()) => Json(prefs).into_response(),
        Err(e) => internal_error("Failed to save consent preferences", e),
    }
}

/// Handler for export downloads.
async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
) -> Response {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let document = match export(state.store().state(), format, Utc::now()) {
        Ok(document) => document,
        Err(e) => return internal_error("Export failed", e),
    };

    tracing::info!(format = %format, file = document.file_name, "export downloaded");

    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        document.content,
    )
        .into_response()
}

/// Handler for the rendered Markdown export.
async fn preview_handler(State(state): State<Arc<AppState>>) -> Response {
    let markdown = format_markdown(state.store().state(), Utc::now());
    render(state.template_engine.render_preview(&markdown))
}

/// Handler for static assets.
async fn assets_handler(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => (
            [(header::CONTENT_TYPE, content_type(&path))],
            file.data.into_owned(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::util::ServiceExt;

    use crate::session::MemoryStorage;

    fn create_test_state() -> Arc<AppState> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        Arc::new(AppState::new(storage, Variant::A).unwrap())
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        build_router(Arc::clone(state)).oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_page_handler_returns_html() {
        let state = create_test_state();
        let response = send(&state, get_request("/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/html"));

        let html = body_text(response).await;
        assert!(html.contains("id=\"wizard-nav\""));
        assert!(html.contains("1) Problem Identification &amp; Delta"));
    }

    #[tokio::test]
    async fn test_variant_b_shows_subset_choices() {
        let state = create_test_state();
        let html = body_text(send(&state, get_request("/?variant=b")).await).await;

        assert!(html.contains("id=\"subset-choices\""));
        assert!(!html.contains("id=\"wizard-nav\""));
        assert!(html.contains("Start with Problem Statement"));
    }

    #[tokio::test]
    async fn test_variant_b_preset_renders_stages() {
        let state = create_test_state();
        let html = body_text(send(&state, get_request("/?variant=B&preset=experiment")).await).await;

        assert!(html.contains("id=\"step-experiment\""));
        assert!(html.contains("id=\"step-obstacles\""));
        assert!(!html.contains("id=\"step-problem\""));
    }

    #[tokio::test]
    async fn test_default_variant_applies_without_query() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let state = Arc::new(AppState::new(storage, Variant::B).unwrap());

        let html = body_text(send(&state, get_request("/")).await).await;
        assert!(html.contains("id=\"subset-choices\""));

        let html = body_text(send(&state, get_request("/?variant=A")).await).await;
        assert!(html.contains("id=\"wizard-nav\""));
    }

    #[tokio::test]
    async fn test_step_is_clamped() {
        let state = create_test_state();
        let html = body_text(send(&state, get_request("/?step=99")).await).await;
        assert!(html.contains("10) Mastery &amp; Commitment"));
        assert!(html.contains("Finish"));

        let html = body_text(send(&state, get_request("/?step=oops")).await).await;
        assert!(html.contains("id=\"step-problem\""));
    }

    #[tokio::test]
    async fn test_field_edit_persists() {
        let state = create_test_state();
        let response = send(
            &state,
            json_request(
                Method::POST,
                "/api/field",
                r#"{"key":"problem.challenge","value":"time management"}"#,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store().get("problem.challenge"), "time management");

        let html = body_text(send(&state, get_request("/")).await).await;
        assert!(html.contains("time management"));
    }

    #[tokio::test]
    async fn test_prompt_entry_appended() {
        let state = create_test_state();
        let response = send(
            &state,
            json_request(Method::POST, "/api/prompt/ask", r#"{"text":"  Why now? "}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["text"], "Why now?");
        assert!(body["t"].is_i64());
        assert_eq!(state.store().state().ask_log.len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_entry_rejects_blank_and_unknown_mode() {
        let state = create_test_state();
        let response = send(
            &state,
            json_request(Method::POST, "/api/prompt/clarify", r#"{"text":"   "}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            json_request(Method::POST, "/api/prompt/shout", r#"{"text":"hi"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.store().state().clarify_log.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_session() {
        let state = create_test_state();
        state.store().set("root.beliefs", "x").unwrap();

        let response = send(&state, json_request(Method::POST, "/api/reset", "")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store().get("root.beliefs"), "");
    }

    #[tokio::test]
    async fn test_reset_reloads_bundled_prompts() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("prompts.csv");
        std::fs::write(&csv_path, "prompt,completion\nWhy?,Because\n").unwrap();

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let state = Arc::new(
            AppState::new(storage, Variant::A)
                .unwrap()
                .with_bundled_csv(Some(csv_path)),
        );
        state.load_bundled_prompts().unwrap();
        state.store().set("problem.challenge", "x").unwrap();

        let response = send(&state, json_request(Method::POST, "/api/reset", "")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store().get("problem.challenge"), "");

        let html = body_text(send(&state, get_request("/api/prompts")).await).await;
        assert!(html.contains("1 / 1 rows"));

        let html = body_text(send(&state, get_request("/")).await).await;
        assert!(html.contains("Auto-loaded 1 rows from bundled CSV."));
    }

    #[tokio::test]
    async fn test_reset_without_bundled_csv_is_empty() {
        let state = create_test_state();
        state
            .auto_load_prompts(vec![PromptRow::from_pairs([("prompt", "a")])])
            .unwrap();

        send(&state, json_request(Method::POST, "/api/reset", "")).await;

        let html = body_text(send(&state, get_request("/")).await).await;
        assert!(html.contains("No CSV loaded."));
    }

    #[tokio::test]
    async fn test_load_and_search_prompts() {
        let state = create_test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/prompts")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from("prompt,completion\nWhy?,Because\n"))
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Loaded 1 rows."));

        let html = body_text(send(&state, get_request("/api/prompts?q=because")).await).await;
        assert!(html.contains("1 / 1 rows"));
        assert!(html.contains("Because"));

        let html = body_text(send(&state, get_request("/api/prompts?q=zebra")).await).await;
        assert!(html.contains("0 / 1 rows"));
    }

    #[tokio::test]
    async fn test_parse_error_leaves_library_unchanged() {
        let state = create_test_state();
        state
            .store()
            .set_prompt_rows(vec![PromptRow::from_pairs([("prompt", "kept")])])
            .unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/prompts")
            .body(Body::from(vec![b'p', b',', 0xff, b'\n', b'a', b',', b'b']))
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Parse error:"));
        assert_eq!(state.store().state().prompt_rows.len(), 1);
        assert_eq!(state.store().state().prompt_rows[0].prompt(), "kept");
    }

    #[tokio::test]
    async fn test_clear_prompts() {
        let state = create_test_state();
        state
            .store()
            .set_prompt_rows(vec![PromptRow::from_pairs([("prompt", "a")])])
            .unwrap();

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/prompts")
            .body(Body::empty())
            .unwrap();
        let html = body_text(send(&state, request).await).await;

        assert!(html.contains("Cleared."));
        assert!(state.store().state().prompt_rows.is_empty());
    }

    #[tokio::test]
    async fn test_consent_round_trip() {
        let state = create_test_state();
        let response = send(
            &state,
            json_request(Method::POST, "/api/consent", r#"{"email":true}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&body_text(send(&state, get_request("/api/consent")).await).await)
                .unwrap();
        assert_eq!(body["email"], true);
        assert_eq!(body["personal"], false);
    }

    #[tokio::test]
    async fn test_consent_survives_reset() {
        let state = create_test_state();
        send(
            &state,
            json_request(Method::POST, "/api/consent", r#"{"share":true}"#),
        )
        .await;
        send(&state, json_request(Method::POST, "/api/reset", "")).await;

        assert!(state.consent().share);
    }

    #[tokio::test]
    async fn test_export_markdown_download() {
        let state = create_test_state();
        state.store().set("problem.challenge", "time management").unwrap();

        let response = send(&state, get_request("/export/markdown")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(
            disposition,
            "attachment; filename=\"what_is_my_delta_session.md\""
        );

        let text = body_text(response).await;
        assert!(text.contains("## 1) Problem Identification & Delta"));
        assert!(text.contains("**challenge**\n\ntime management"));
    }

    #[tokio::test]
    async fn test_export_json_parses_back() {
        let state = create_test_state();
        state.store().set("action.steps", "walk daily").unwrap();

        let response = send(&state, get_request("/export/json")).await;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("application/json"));

        let map: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(map.get("action.steps").map(String::as_str), Some("walk daily"));
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let state = create_test_state();
        let response = send(&state, get_request("/export/pdf")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_preview_is_html() {
        let state = create_test_state();
        let html = body_text(send(&state, get_request("/export/preview")).await).await;
        assert!(html.contains("<h1>What is my Delta?</h1>"));
    }

    #[tokio::test]
    async fn test_auto_load_sets_status() {
        let state = create_test_state();
        state
            .auto_load_prompts(vec![PromptRow::from_pairs([("prompt", "a")])])
            .unwrap();

        let html = body_text(send(&state, get_request("/")).await).await;
        assert!(html.contains("Auto-loaded 1 rows from bundled CSV."));
    }

    #[tokio::test]
    async fn test_assets_handler_css() {
        let state = create_test_state();
        let response = send(&state, get_request("/assets/styles.css")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/css"));
    }

    #[tokio::test]
    async fn test_assets_handler_not_found() {
        let state = create_test_state();
        let response = send(&state, get_request("/assets/nonexistent.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
