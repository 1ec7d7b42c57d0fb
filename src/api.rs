// Every store operation as a JSON endpoint, plus `GET /api/ogp`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::blocks::{Block, NewBlock};
use crate::error::{AppError, Result};
use crate::files::{FileItem, NewFile, UploadFile};
use crate::notes::{Category, NewNote, Note, NoteFilter, NotePatch};
use crate::preview::LinkPreview;
use crate::projects::{NewProject, Project, ProjectPatch};
use crate::settings::AppSettings;
use crate::todos::{CalendarDay, NewTodo, Todo, TodoPatch, TodoQuery};
use crate::AppState;

type AppStateRef = State<Arc<AppState>>;

pub fn router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let api: Router<Arc<AppState>> = Router::new()
        .route("/ogp", get(handle_ogp))
        // --- Settings ---
        .route(
            "/settings",
            get(get_settings).put(replace_settings).patch(update_setting),
        )
        // --- Projects ---
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        // --- Todos ---
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/quick", post(quick_add_todo))
        .route("/todos/calendar", get(todo_calendar))
        .route("/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/todos/{id}/toggle", post(toggle_todo))
        // --- Notes & categories ---
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/reorder", post(reorder_notes))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/notes/{id}/move", post(move_note))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            patch(rename_category).delete(delete_category),
        )
        .route("/categories/{id}/toggle", post(toggle_category))
        // --- Files ---
        .route("/files", get(list_files).post(create_file))
        .route("/files/upload", post(upload_file))
        .route("/files/{id}", get(get_file).delete(delete_file))
        .route("/files/{id}/version", post(bump_file_version))
        .route("/files/{id}/share", post(share_file))
        .route("/files/{id}/share/{email}", delete(unshare_file))
        // --- Blocks ---
        .route("/blocks", get(list_blocks).post(add_block))
        .route("/blocks/reorder", post(reorder_blocks))
        .route("/blocks/{id}", patch(update_block).delete(delete_block))
        .route("/blocks/{id}/embed", post(embed_block));

    let cors = if cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Extractors ---

/// `Json` whose rejection is reported as a 400 with the usual `{ "error" }` body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// `Query` counterpart of [`ApiJson`].
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingParameter(name))
}

// --- Request bodies ---

#[derive(Deserialize)]
struct UrlParam {
    url: Option<String>,
}

#[derive(Deserialize)]
struct SettingUpdate {
    key: String,
    value: Value,
}

#[derive(Deserialize)]
struct QuickTodo {
    title: String,
}

#[derive(Deserialize)]
struct CalendarParams {
    year: Option<i32>,
    month: Option<u32>,
}

#[derive(Deserialize)]
struct NotesParams {
    category: Option<String>,
}

#[derive(Deserialize)]
struct Reorder {
    from: usize,
    to: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveNote {
    #[serde(default)]
    category_id: Option<String>,
}

#[derive(Deserialize)]
struct CategoryName {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryDeleted {
    category: Category,
    orphaned_notes: usize,
}

#[derive(Deserialize)]
struct FilesParams {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct ShareRequest {
    email: String,
}

#[derive(Deserialize)]
struct BlockContent {
    content: String,
}

// --- Health & link preview ---

async fn handle_health(State(state): AppStateRef) -> Json<Value> {
    let counts = state.read().counts();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "counts": counts,
    }))
}

async fn handle_ogp(State(state): AppStateRef, ApiQuery(params): ApiQuery<UrlParam>) -> Result<Json<LinkPreview>> {
    let url = required(params.url, "url")?;
    let preview = state.previews.fetch(&url).await?;
    Ok(Json(preview))
}

// --- Settings ---

async fn get_settings(State(state): AppStateRef) -> Json<AppSettings> {
    Json(state.read().settings().clone())
}

async fn replace_settings(
    State(state): AppStateRef,
    ApiJson(settings): ApiJson<AppSettings>,
) -> Result<Json<AppSettings>> {
    let mut workspace = state.write();
    Ok(Json(workspace.replace_settings(settings)?.clone()))
}

async fn update_setting(
    State(state): AppStateRef,
    ApiJson(update): ApiJson<SettingUpdate>,
) -> Result<Json<AppSettings>> {
    let mut workspace = state.write();
    Ok(Json(workspace.set_setting(&update.key, update.value)?.clone()))
}

// --- Projects ---

async fn list_projects(State(state): AppStateRef) -> Json<Vec<Project>> {
    Json(state.read().projects.list().to_vec())
}

async fn get_project(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<Project>> {
    Ok(Json(state.read().projects.get(&id)?.clone()))
}

async fn create_project(
    State(state): AppStateRef,
    ApiJson(new): ApiJson<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let mut workspace = state.write();
    let project = workspace.projects.create(new)?.clone();
    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> Result<Json<Project>> {
    let mut workspace = state.write();
    Ok(Json(workspace.projects.update(&id, patch)?.clone()))
}

async fn delete_project(State(state): AppStateRef, Path(id): Path<String>) -> Result<StatusCode> {
    state.write().projects.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Todos ---

async fn list_todos(State(state): AppStateRef, ApiQuery(query): ApiQuery<TodoQuery>) -> Json<Vec<Todo>> {
    let workspace = state.read();
    Json(workspace.todos.view(&query).into_iter().cloned().collect())
}

async fn create_todo(
    State(state): AppStateRef,
    ApiJson(new): ApiJson<NewTodo>,
) -> Result<(StatusCode, Json<Todo>)> {
    let mut workspace = state.write();
    let todo = workspace.todos.create(new)?.clone();
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn quick_add_todo(
    State(state): AppStateRef,
    ApiJson(quick): ApiJson<QuickTodo>,
) -> Result<(StatusCode, Json<Todo>)> {
    let mut workspace = state.write();
    let todo = workspace.todos.add_quick(&quick.title)?.clone();
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TodoPatch>,
) -> Result<Json<Todo>> {
    let mut workspace = state.write();
    Ok(Json(workspace.todos.update(&id, patch)?.clone()))
}

async fn toggle_todo(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<Todo>> {
    let mut workspace = state.write();
    Ok(Json(workspace.todos.toggle(&id)?.clone()))
}

async fn delete_todo(State(state): AppStateRef, Path(id): Path<String>) -> Result<StatusCode> {
    state.write().todos.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn todo_calendar(
    State(state): AppStateRef,
    ApiQuery(params): ApiQuery<CalendarParams>,
) -> Result<Json<Vec<CalendarDay>>> {
    let today = Utc::now().date_naive();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());
    Ok(Json(state.read().todos.calendar(year, month, today)?))
}

// --- Notes ---

async fn list_notes(State(state): AppStateRef, ApiQuery(params): ApiQuery<NotesParams>) -> Json<Vec<Note>> {
    let filter = NoteFilter::from_param(params.category.as_deref());
    let workspace = state.read();
    Json(workspace.notes().filtered(&filter).into_iter().cloned().collect())
}

async fn get_note(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<Note>> {
    Ok(Json(state.read().notes().note(&id)?.clone()))
}

async fn create_note(
    State(state): AppStateRef,
    ApiJson(new): ApiJson<NewNote>,
) -> Result<(StatusCode, Json<Note>)> {
    let note = state.write().edit_notes(|book| book.create_note(new).cloned())?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn update_note(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> Result<Json<Note>> {
    let note = state
        .write()
        .edit_notes(|book| book.update_note(&id, patch).cloned())?;
    Ok(Json(note))
}

async fn move_note(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(target): ApiJson<MoveNote>,
) -> Result<Json<Note>> {
    let note = state
        .write()
        .edit_notes(|book| book.move_note(&id, target.category_id).cloned())?;
    Ok(Json(note))
}

async fn delete_note(State(state): AppStateRef, Path(id): Path<String>) -> Result<StatusCode> {
    state.write().edit_notes(|book| book.delete_note(&id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_notes(
    State(state): AppStateRef,
    ApiJson(reorder): ApiJson<Reorder>,
) -> Result<Json<Vec<Note>>> {
    let mut workspace = state.write();
    workspace.edit_notes(|book| book.reorder_notes(reorder.from, reorder.to))?;
    Ok(Json(workspace.notes().notes().to_vec()))
}

// --- Categories ---

async fn list_categories(State(state): AppStateRef) -> Json<Vec<Category>> {
    Json(state.read().notes().categories().to_vec())
}

async fn create_category(
    State(state): AppStateRef,
    ApiJson(body): ApiJson<CategoryName>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state
        .write()
        .edit_notes(|book| book.create_category(&body.name).cloned())?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CategoryName>,
) -> Result<Json<Category>> {
    let category = state
        .write()
        .edit_notes(|book| book.rename_category(&id, &body.name).cloned())?;
    Ok(Json(category))
}

async fn toggle_category(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<Category>> {
    let category = state
        .write()
        .edit_notes(|book| book.toggle_category(&id).cloned())?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): AppStateRef,
    Path(id): Path<String>,
) -> Result<Json<CategoryDeleted>> {
    let (category, orphaned_notes) = state.write().edit_notes(|book| book.delete_category(&id))?;
    tracing::info!(category = %category.id, orphaned_notes, "category deleted");
    Ok(Json(CategoryDeleted {
        category,
        orphaned_notes,
    }))
}

// --- Files ---

async fn list_files(State(state): AppStateRef, ApiQuery(params): ApiQuery<FilesParams>) -> Json<Vec<FileItem>> {
    let workspace = state.read();
    Json(workspace.files.search(&params.q).into_iter().cloned().collect())
}

async fn get_file(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<FileItem>> {
    Ok(Json(state.read().files.get(&id)?.clone()))
}

async fn create_file(
    State(state): AppStateRef,
    ApiJson(new): ApiJson<NewFile>,
) -> Result<(StatusCode, Json<FileItem>)> {
    let mut workspace = state.write();
    let file = workspace.files.create(new)?.clone();
    Ok((StatusCode::CREATED, Json(file)))
}

async fn upload_file(
    State(state): AppStateRef,
    ApiJson(upload): ApiJson<UploadFile>,
) -> Result<(StatusCode, Json<FileItem>)> {
    let mut workspace = state.write();
    let file = workspace.files.upload(upload)?.clone();
    Ok((StatusCode::CREATED, Json(file)))
}

async fn bump_file_version(State(state): AppStateRef, Path(id): Path<String>) -> Result<Json<FileItem>> {
    let mut workspace = state.write();
    Ok(Json(workspace.files.bump_version(&id)?.clone()))
}

async fn share_file(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ShareRequest>,
) -> Result<Json<FileItem>> {
    let mut workspace = state.write();
    Ok(Json(workspace.files.share(&id, &body.email)?.clone()))
}

async fn unshare_file(
    State(state): AppStateRef,
    Path((id, email)): Path<(String, String)>,
) -> Result<Json<FileItem>> {
    let mut workspace = state.write();
    Ok(Json(workspace.files.unshare(&id, &email)?.clone()))
}

async fn delete_file(State(state): AppStateRef, Path(id): Path<String>) -> Result<StatusCode> {
    state.write().files.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Blocks ---

async fn list_blocks(State(state): AppStateRef) -> Json<Vec<Block>> {
    Json(state.read().blocks.list().to_vec())
}

async fn add_block(
    State(state): AppStateRef,
    ApiJson(new): ApiJson<NewBlock>,
) -> (StatusCode, Json<Block>) {
    let mut workspace = state.write();
    let block = workspace.blocks.add(new).clone();
    (StatusCode::CREATED, Json(block))
}

async fn update_block(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<BlockContent>,
) -> Result<Json<Block>> {
    let mut workspace = state.write();
    Ok(Json(workspace.blocks.update_content(&id, body.content)?.clone()))
}

async fn delete_block(State(state): AppStateRef, Path(id): Path<String>) -> Result<StatusCode> {
    state.write().blocks.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_blocks(
    State(state): AppStateRef,
    ApiJson(reorder): ApiJson<Reorder>,
) -> Result<Json<Vec<Block>>> {
    let mut workspace = state.write();
    workspace.blocks.reorder(reorder.from, reorder.to)?;
    Ok(Json(workspace.blocks.list().to_vec()))
}

/// Fetch a preview for `url` and turn the block into an embed.
///
/// The workspace lock is released while the fetch is in flight. A failed
/// fetch still embeds the bare link; an edit or delete that lands during the
/// fetch wins and the embed is rejected with 409.
async fn embed_block(
    State(state): AppStateRef,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UrlParam>,
) -> Result<Json<Block>> {
    let url = required(body.url, "url")?;
    let ticket = {
        let workspace = state.read();
        workspace.blocks.begin_embed(&id)?
    };

    let preview = match state.previews.fetch(&url).await {
        Ok(preview) => preview,
        Err(e) => {
            tracing::warn!(block = %id, %url, error = %e, "preview failed, embedding bare link");
            LinkPreview::bare(&url)
        }
    };

    let mut workspace = state.write();
    let block = workspace
        .blocks
        .finish_embed(&ticket, preview)
        .inspect_err(|e| tracing::warn!(block = %id, error = %e, "embed discarded"))?;
    Ok(Json(block.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::LinkPreviewService;
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};
    use crate::workspace::Workspace;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::Html;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app(demo_data: bool) -> Router {
        let workspace = Workspace::open(Arc::new(MemoryStore::new()), demo_data).unwrap();
        let previews = LinkPreviewService::new(Some(Duration::from_secs(5))).unwrap();
        router(Arc::new(AppState::new(workspace, previews)), true)
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn write(&self, key: &str, _contents: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn serve_fixture(html: &'static str) -> String {
        let app = Router::new().route("/", get(move || async move { Html(html) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    async fn unreachable_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/", addr)
    }

    fn encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let app = test_app(true);
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["counts"]["projects"], 3);
        assert_eq!(body["counts"]["files"], 2);
    }

    #[tokio::test]
    async fn test_ogp_missing_url_is_bad_request() {
        let app = test_app(false);
        let (status, body) = send(&app, "GET", "/api/ogp", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing parameter: url");

        let (status, _) = send(&app, "GET", "/api/ogp?url=", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ogp_unreachable_is_server_error() {
        let app = test_app(false);
        let url = unreachable_url().await;
        let (status, body) = send(&app, "GET", &format!("/api/ogp?url={}", encode(&url)), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch link preview");

        let (status, _) = send(&app, "GET", "/api/ogp?url=not-a-url", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_ogp_returns_metadata() {
        let url = serve_fixture(
            r#"<html><head>
                <title>Fallback</title>
                <meta property="og:title" content="Fixture Page">
                <meta name="description" content="plain description">
                <meta property="og:image" content="https://example.com/cover.png">
            </head><body></body></html>"#,
        )
        .await;
        let app = test_app(false);
        let (status, body) = send(&app, "GET", &format!("/api/ogp?url={}", encode(&url)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Fixture Page");
        assert_eq!(body["description"], "plain description");
        assert_eq!(body["image"], "https://example.com/cover.png");
        assert_eq!(body["url"], url.as_str());
    }

    #[tokio::test]
    async fn test_settings_single_field_update() {
        let app = test_app(false);
        let (_, body) = send(&app, "GET", "/api/settings", None).await;
        assert_eq!(body, json!({ "theme": "dark", "language": "ja", "notifications": true }));

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/settings",
            Some(json!({ "key": "language", "value": "en" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "en");
        assert_eq!(body["theme"], "dark");

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/settings",
            Some(json!({ "key": "theme", "value": "sepia" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("theme"));
    }

    #[tokio::test]
    async fn test_failed_save_is_not_visible() {
        let workspace = Workspace::open(Arc::new(ReadOnlyStore), false).unwrap();
        let previews = LinkPreviewService::new(None).unwrap();
        let app = router(Arc::new(AppState::new(workspace, previews)), true);

        let (status, body) = send(&app, "POST", "/api/notes", Some(json!({ "title": "A", "content": "a" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        let (_, notes) = send(&app, "GET", "/api/notes", None).await;
        assert_eq!(notes, json!([]));

        let (status, _) = send(
            &app,
            "PUT",
            "/api/settings",
            Some(json!({ "theme": "light", "language": "en", "notifications": false })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (_, settings) = send(&app, "GET", "/api/settings", None).await;
        assert_eq!(settings, json!({ "theme": "dark", "language": "ja", "notifications": true }));
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let app = test_app(false);
        let (status, project) = send(
            &app,
            "POST",
            "/api/projects",
            Some(json!({
                "title": "Thesis",
                "progress": 140,
                "progressColor": "coral",
                "iconType": "table",
                "actions": ["OPEN"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(project["progress"], 100);
        assert_eq!(project["actions"], json!(["OPEN", "EDIT", "DELETE"]));

        let uri = format!("/api/projects/{}", project["id"].as_str().unwrap());
        let (status, updated) = send(&app, "PATCH", &uri, Some(json!({ "actions": [] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["actions"], json!(["EDIT", "DELETE", "OPEN"]));

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Project not found"));
    }

    #[tokio::test]
    async fn test_todos_sort_toggle_and_calendar() {
        let app = test_app(true);
        let (status, todos) = send(&app, "GET", "/api/todos?sortBy=priority&order=desc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(todos[0]["priority"], "high");
        assert_eq!(todos[2]["priority"], "medium");

        let (status, quick) = send(&app, "POST", "/api/todos/quick", Some(json!({ "title": "Call" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(quick["priority"], "medium");

        let uri = format!("/api/todos/{}/toggle", quick["id"].as_str().unwrap());
        let (_, toggled) = send(&app, "POST", &uri, None).await;
        assert_eq!(toggled["completed"], true);

        let (status, days) = send(&app, "GET", "/api/todos/calendar?year=2024&month=3", None).await;
        assert_eq!(status, StatusCode::OK);
        let days = days.as_array().unwrap();
        assert_eq!(days.len(), 42);
        assert_eq!(days[0]["date"], "2024-02-25");
        let due_15th = days.iter().find(|d| d["date"] == "2024-03-15").unwrap();
        assert_eq!(due_15th["todos"][0]["title"], "Define project requirements");

        let (status, _) = send(&app, "GET", "/api/todos?sortBy=colour", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_category_delete_orphans_notes() {
        let app = test_app(false);
        let (_, category) = send(&app, "POST", "/api/categories", Some(json!({ "name": "Work" }))).await;
        let category_id = category["id"].as_str().unwrap().to_string();
        send(
            &app,
            "POST",
            "/api/notes",
            Some(json!({ "title": "A", "content": "a", "categoryId": category_id })),
        )
        .await;
        send(&app, "POST", "/api/notes", Some(json!({ "title": "B", "content": "b" }))).await;

        let (_, categories) = send(&app, "GET", "/api/categories", None).await;
        assert_eq!(categories[0]["noteCount"], 1);

        let uri = format!("/api/categories/{}", category_id);
        let (status, deleted) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["orphanedNotes"], 1);

        let (_, all) = send(&app, "GET", "/api/notes", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        let (_, loose) = send(&app, "GET", "/api/notes?category=uncategorized", None).await;
        assert_eq!(loose.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_note_validation_and_reorder() {
        let app = test_app(false);
        let (status, body) = send(&app, "POST", "/api/notes", Some(json!({ "title": "A", "content": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        send(&app, "POST", "/api/notes", Some(json!({ "title": "A", "content": "a" }))).await;
        send(&app, "POST", "/api/notes", Some(json!({ "title": "B", "content": "b" }))).await;
        let (status, notes) = send(&app, "POST", "/api/notes/reorder", Some(json!({ "from": 0, "to": 1 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notes[0]["title"], "B");
        assert_eq!(notes[1]["title"], "A");

        let (status, _) = send(&app, "POST", "/api/notes/reorder", Some(json!({ "from": 0, "to": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_move_note_to_category_and_back() {
        let app = test_app(false);
        let (_, category) = send(&app, "POST", "/api/categories", Some(json!({ "name": "Ideas" }))).await;
        let (_, note) = send(&app, "POST", "/api/notes", Some(json!({ "title": "A", "content": "a" }))).await;
        let uri = format!("/api/notes/{}/move", note["id"].as_str().unwrap());

        let (_, moved) = send(&app, "POST", &uri, Some(json!({ "categoryId": category["id"] }))).await;
        assert_eq!(moved["categoryId"], category["id"]);

        let (_, moved) = send(&app, "POST", &uri, Some(json!({ "categoryId": null }))).await;
        assert!(moved["categoryId"].is_null());

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "categoryId": "nope" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_file_upload_share_and_search() {
        let app = test_app(false);
        let (status, file) = send(
            &app,
            "POST",
            "/api/files/upload",
            Some(json!({ "name": "logo.png", "mimeType": "image/png", "data": "AAAA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(file["type"], "PNG");
        assert_eq!(file["size"], "3 Bytes");

        let id = file["id"].as_str().unwrap();
        let (_, shared) = send(
            &app,
            "POST",
            &format!("/api/files/{}/share", id),
            Some(json!({ "email": "a@example.com" })),
        )
        .await;
        assert_eq!(shared["sharedWith"], json!(["a@example.com"]));

        let (_, unshared) = send(&app, "DELETE", &format!("/api/files/{}/share/a@example.com", id), None).await;
        assert_eq!(unshared["sharedWith"], json!([]));

        let (_, found) = send(&app, "GET", "/api/files?q=LOGO", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        let (_, found) = send(&app, "GET", "/api/files?q=zip", None).await;
        assert!(found.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_block_uses_preview_metadata() {
        let url = serve_fixture(
            r#"<html><head>
                <meta property="og:title" content="Embedded">
                <meta property="og:image" content="https://example.com/thumb.png">
            </head></html>"#,
        )
        .await;
        let app = test_app(false);
        let (status, block) = send(&app, "POST", "/api/blocks", Some(json!({ "type": "text" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(block["content"], "");

        let uri = format!("/api/blocks/{}/embed", block["id"].as_str().unwrap());
        let (status, embedded) = send(&app, "POST", &uri, Some(json!({ "url": url }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(embedded["type"], "embed");
        assert_eq!(embedded["content"], url.as_str());
        assert_eq!(embedded["metadata"]["title"], "Embedded");
        assert_eq!(embedded["metadata"]["thumbnail"], "https://example.com/thumb.png");
    }

    #[tokio::test]
    async fn test_embed_with_failed_fetch_keeps_bare_link() {
        let app = test_app(false);
        let (_, block) = send(&app, "POST", "/api/blocks", Some(json!({ "type": "text" }))).await;
        let uri = format!("/api/blocks/{}/embed", block["id"].as_str().unwrap());
        let url = unreachable_url().await;

        let (status, embedded) = send(&app, "POST", &uri, Some(json!({ "url": url }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(embedded["type"], "embed");
        assert_eq!(embedded["metadata"], json!({ "url": url }));

        let (status, _) = send(&app, "POST", "/api/blocks/missing/embed", Some(json!({ "url": url }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_reports_json_error() {
        let app = test_app(false);
        let request = Request::builder()
            .method("POST")
            .uri("/api/todos")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }
}
