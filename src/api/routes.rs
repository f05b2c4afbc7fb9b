use crate::config::Config;
use crate::curriculum::Curriculum;
use crate::progress::store::iso_timestamp;
use crate::progress::{ExtraTopicId, ProgressSnapshot, ProgressStore, StepId, StoreOptions};
use crate::storage::SqliteStore;
use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub curriculum: Arc<Curriculum>,
    progress_lock: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(config: Arc<Config>, curriculum: Arc<Curriculum>) -> Self {
        Self {
            config,
            curriculum,
            progress_lock: Arc::new(Mutex::new(())),
        }
    }

    fn open_store(&self) -> Result<ProgressStore<SqliteStore>> {
        let storage = SqliteStore::open(&self.config.db_path)?;
        let mut store = ProgressStore::load(
            storage,
            self.curriculum.totals(),
            StoreOptions::from_config(&self.config),
        );
        if !self.config.allow_unknown_ids {
            store.retain_known(&self.curriculum);
        }

        Ok(store)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/curriculum", get(curriculum))
        .route("/api/v1/progress", get(progress).delete(clear_progress))
        .route("/api/v1/progress/steps/:id/toggle", post(toggle_step))
        .route("/api/v1/progress/extras/:id/toggle", post(toggle_extra))
        .route("/api/v1/progress/export", get(export_progress))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    curriculum: String,
    db_path: String,
    api_port: u16,
    last_activity: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressView {
    completed_steps: Vec<StepId>,
    completed_extras: Vec<ExtraTopicId>,
    last_activity: Option<String>,
    snapshot: ProgressSnapshot,
}

impl ProgressView {
    fn from_store(store: &ProgressStore<SqliteStore>) -> Self {
        Self {
            completed_steps: store.completed_steps().iter().copied().collect(),
            completed_extras: store.completed_extras().iter().cloned().collect(),
            last_activity: store.last_activity().as_ref().map(iso_timestamp),
            snapshot: store.snapshot(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToggleView {
    completed: bool,
    persisted: bool,
    progress: ProgressView,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let store = state.open_store()?;

    Ok(Json(StatusPayload {
        curriculum: state.curriculum.title.clone(),
        db_path: state.config.db_path.display().to_string(),
        api_port: state.config.api_port,
        last_activity: store.last_activity().as_ref().map(iso_timestamp),
    }))
}

async fn curriculum(State(state): State<ApiState>) -> Json<Curriculum> {
    Json(state.curriculum.as_ref().clone())
}

async fn progress(State(state): State<ApiState>) -> ApiResult<Json<ProgressView>> {
    let store = state.open_store()?;
    Ok(Json(ProgressView::from_store(&store)))
}

async fn toggle_step(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<ToggleView>> {
    let id = raw
        .parse::<StepId>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid main step id: {raw}")))?;
    state
        .curriculum
        .check_step(id, state.config.allow_unknown_ids)
        .map_err(|error| ApiError::NotFound(error.to_string()))?;

    // Read-modify-write of the stored sets must not interleave.
    let _guard = state.progress_lock.lock().await;
    let mut store = state.open_store()?;
    let outcome = store.toggle_step(id);
    info!(step = id, completed = outcome.completed, "main step toggled");

    Ok(Json(ToggleView {
        completed: outcome.completed,
        persisted: outcome.persistence.is_saved(),
        progress: ProgressView::from_store(&store),
    }))
}

async fn toggle_extra(
    State(state): State<ApiState>,
    Path(id): Path<ExtraTopicId>,
) -> ApiResult<Json<ToggleView>> {
    state
        .curriculum
        .check_extra(&id, state.config.allow_unknown_ids)
        .map_err(|error| ApiError::NotFound(error.to_string()))?;

    let _guard = state.progress_lock.lock().await;
    let mut store = state.open_store()?;
    let outcome = store.toggle_extra(&id);
    info!(extra = %id, completed = outcome.completed, "extra topic toggled");

    Ok(Json(ToggleView {
        completed: outcome.completed,
        persisted: outcome.persistence.is_saved(),
        progress: ProgressView::from_store(&store),
    }))
}

async fn clear_progress(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let _guard = state.progress_lock.lock().await;
    let mut store = state.open_store()?;
    let persistence = store.clear();
    info!("progress cleared");

    Ok(Json(json!({
        "cleared": true,
        "persisted": persistence.is_saved()
    })))
}

async fn export_progress(State(state): State<ApiState>) -> ApiResult<Response> {
    let store = state.open_store()?;
    let document = store.export();
    let filename = document.file_name(&state.config.key_prefix);

    let mut response = Response::new(document.to_pretty_json()?.into_response().into_body());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))?,
    );

    Ok(response)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApiError, ApiState, clear_progress, export_progress, progress, toggle_extra, toggle_step,
    };
    use crate::config::Config;
    use crate::curriculum::Curriculum;
    use axum::extract::{Path, State};
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state(allow_unknown_ids: bool) -> (TempDir, ApiState) {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            db_path: dir.path().join("progress.db"),
            export_dir: dir.path().join("exports"),
            allow_unknown_ids,
            ..Config::default()
        };
        let state = ApiState::new(
            Arc::new(config),
            Arc::new(Curriculum::embedded().expect("embedded curriculum")),
        );

        (dir, state)
    }

    #[tokio::test]
    async fn toggles_are_persisted_between_requests() {
        let (_dir, state) = state(false);

        let toggled = toggle_step(State(state.clone()), Path("3".to_string()))
            .await
            .expect("toggle step");
        assert!(toggled.0.completed);
        assert!(toggled.0.persisted);

        let extra = toggle_extra(State(state.clone()), Path("docker".to_string()))
            .await
            .expect("toggle extra");
        assert!(extra.0.completed);

        let view = progress(State(state)).await.expect("progress").0;
        assert_eq!(view.completed_steps, vec![3]);
        assert_eq!(view.completed_extras, vec!["docker".to_string()]);
        assert_eq!(view.snapshot.total_extras, 21);
        assert!(view.last_activity.is_some());
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected_without_touching_storage() {
        let (_dir, state) = state(false);

        let step = toggle_step(State(state.clone()), Path("99".to_string())).await;
        let extra = toggle_extra(State(state.clone()), Path("cobol".to_string())).await;

        assert!(matches!(step, Err(ApiError::NotFound(_))));
        assert!(matches!(extra, Err(ApiError::NotFound(_))));
        let view = progress(State(state)).await.expect("progress").0;
        assert!(view.completed_steps.is_empty());
        assert!(view.last_activity.is_none());
    }

    #[tokio::test]
    async fn unknown_ids_pass_when_allowed() {
        let (_dir, state) = state(true);

        let toggled = toggle_step(State(state), Path("99".to_string()))
            .await
            .expect("toggle");
        assert!(toggled.0.completed);
    }

    #[tokio::test]
    async fn malformed_step_id_is_a_json_bad_request() {
        let (_dir, state) = state(false);

        let result = toggle_step(State(state.clone()), Path("abc".to_string())).await;
        let error = match result {
            Err(error @ ApiError::BadRequest(_)) => error,
            other => panic!("expected bad request, got {other:?}"),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .expect("content type");
        assert!(content_type.starts_with("application/json"));

        assert!(matches!(
            toggle_step(State(state), Path("-1".to_string())).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_keep_every_update() {
        let (_dir, state) = state(false);

        let handles = (1..=10)
            .map(|id| {
                let state = state.clone();
                tokio::spawn(async move {
                    toggle_step(State(state), Path(id.to_string())).await
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            let toggled = handle.await.expect("join").expect("toggle step");
            assert!(toggled.0.completed);
        }

        let view = progress(State(state)).await.expect("progress").0;
        assert_eq!(view.completed_steps, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stored_ids_outside_the_curriculum_are_not_counted() {
        let (_dir, state) = state(true);
        let toggled = toggle_step(State(state.clone()), Path("12".to_string()))
            .await
            .expect("toggle");
        assert!(toggled.0.completed);

        let strict = ApiState::new(
            Arc::new(Config {
                allow_unknown_ids: false,
                ..state.config.as_ref().clone()
            }),
            state.curriculum.clone(),
        );
        let view = progress(State(strict)).await.expect("progress").0;
        assert!(view.completed_steps.is_empty());
        assert_eq!(view.snapshot.steps_progress, 0.0);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("Unknown main step: 99".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clear_empties_progress() {
        let (_dir, state) = state(false);
        let toggled = toggle_step(State(state.clone()), Path("1".to_string()))
            .await
            .expect("toggle step");
        assert!(toggled.0.completed);

        let cleared = clear_progress(State(state.clone())).await.expect("clear");
        assert_eq!(cleared.0["persisted"], true);

        let view = progress(State(state)).await.expect("progress").0;
        assert!(view.completed_steps.is_empty());
        assert!(view.last_activity.is_some());
    }

    #[tokio::test]
    async fn export_is_served_as_attachment() {
        let (_dir, state) = state(false);

        let response = export_progress(State(state)).await.expect("export");

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("content disposition");
        assert!(disposition.starts_with("attachment; filename=\"java-roadmap-progress-"));
        assert!(disposition.ends_with(".json\""));
    }
}
