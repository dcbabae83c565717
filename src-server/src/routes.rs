//! HTTP routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use mailwatch::{
    Account, AccountChanges, MailwatchError, NewAccount, NotificationEvent, Protocol, StoreError,
};

use crate::state::AppState;
use crate::ws;

/// Upper bound for `/api/notifications?limit=`.
const MAX_LIMIT: usize = 500;

type ApiError = (StatusCode, String);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::websocket))
        .route("/api/notifications", get(list_notifications))
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route(
            "/api/accounts/{id}",
            put(update_account).delete(delete_account),
        )
        .route("/api/refresh", post(refresh))
        .with_state(state)
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    subscribers: usize,
}

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        subscribers: state.hub.subscriber_count().await,
    })
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotificationQuery {
    limit: Option<usize>,
}

/// Recent notifications, newest first.
pub(crate) async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationEvent>>, ApiError> {
    let limit = query.limit.unwrap_or(state.replay_limit).min(MAX_LIMIT);
    state
        .events
        .recent(limit)
        .map(Json)
        .map_err(internal_error)
}

pub(crate) async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, ApiError> {
    state.registry.list().map(Json).map_err(internal_error)
}

/// Body of `POST /api/accounts`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateAccountRequest {
    email: String,
    password: String,
    host: String,
    port: u16,
    protocol: Protocol,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CreateAccountRequest {
    fn into_new_account(self) -> Result<NewAccount, ApiError> {
        let email = self.email.trim().to_string();
        let host = self.host.trim().to_string();
        if email.is_empty() || host.is_empty() {
            return Err(bad_request("email and host must not be empty"));
        }
        if self.port == 0 {
            return Err(bad_request("port must be between 1 and 65535"));
        }
        if self.password.is_empty() {
            return Err(bad_request("password must not be empty"));
        }
        Ok(NewAccount {
            email,
            secret: SecretString::from(self.password),
            host,
            port: self.port,
            protocol: self.protocol,
            is_active: self.is_active,
        })
    }
}

/// Body of `PUT /api/accounts/{id}`. Absent fields are left unchanged.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateAccountRequest {
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    protocol: Option<Protocol>,
    is_active: Option<bool>,
}

impl UpdateAccountRequest {
    fn into_changes(self) -> Result<AccountChanges, ApiError> {
        if self.port == Some(0) {
            return Err(bad_request("port must be between 1 and 65535"));
        }
        if self.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(bad_request("host must not be empty"));
        }
        Ok(AccountChanges {
            secret: self
                .password
                .filter(|p| !p.is_empty())
                .map(SecretString::from),
            host: self.host.map(|h| h.trim().to_string()),
            port: self.port,
            protocol: self.protocol,
            is_active: self.is_active,
        })
    }
}

/// Adds an account. Subscribers receive the new account list.
pub(crate) async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = request.into_new_account()?;
    state
        .registry
        .create(account)
        .await
        .map(|created| (StatusCode::CREATED, Json(created)))
        .map_err(registry_error)
}

pub(crate) async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    let changes = request.into_changes()?;
    match state.registry.update(id, changes).await {
        Ok(Some(account)) => Ok(Json(account)),
        Ok(None) => Err(not_found(id)),
        Err(e) => Err(registry_error(e)),
    }
}

pub(crate) async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    match state.registry.delete(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found(id)),
        Err(e) => Err(registry_error(e)),
    }
}

/// Requests an immediate poll of every active account.
pub(crate) async fn refresh(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.trigger();
    StatusCode::ACCEPTED
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, message.to_string())
}

fn not_found(id: i64) -> ApiError {
    (StatusCode::NOT_FOUND, format!("Account {} not found", id))
}

fn registry_error(error: MailwatchError) -> ApiError {
    match error {
        MailwatchError::Store(StoreError::DuplicateAccount(email)) => (
            StatusCode::CONFLICT,
            format!("Account {} already exists", email),
        ),
        other => internal_error(other),
    }
}

fn internal_error(error: impl std::fmt::Display) -> ApiError {
    tracing::error!("Request failed: {}", error);
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailwatch::db::Database;
    use mailwatch::{
        AccountRegistry, AccountStore, DedupGate, EventStore, Fetchers, Hub, HubMessage,
        HubOptions, PollScheduler, SqliteStore,
    };
    use std::time::Duration;

    fn state() -> (Arc<AppState>, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::new(Database::open_in_memory().unwrap()));
        let hub = Arc::new(Hub::new(store.clone(), store.clone(), HubOptions::default()));
        let gate = Arc::new(DedupGate::new(store.clone(), hub.clone()));
        let scheduler = PollScheduler::new(
            store.clone(),
            Fetchers::new(),
            gate,
            Duration::from_secs(3600),
        );
        let state = Arc::new(AppState {
            hub: hub.clone(),
            events: store.clone(),
            registry: Arc::new(AccountRegistry::new(store.clone(), hub)),
            scheduler,
            replay_limit: 3,
        });
        (state, store)
    }

    fn insert_event(store: &SqliteStore, n: usize) {
        let json = serde_json::json!({
            "messageId": format!("m{}@example.com", n),
            "accountEmail": "a@x.com",
            "from": "bob@example.com",
            "subject": format!("Message {}", n),
            "receivedAt": format!("2024-05-01T08:{:02}:00Z", n),
            "createdAt": "2024-05-01T09:00:00Z",
        });
        let event: NotificationEvent = serde_json::from_value(json).unwrap();
        store.insert_if_absent(&event).unwrap();
    }

    #[tokio::test]
    async fn test_notifications_default_limit() {
        let (state, store) = state();
        for n in 1..=5 {
            insert_event(&store, n);
        }

        let Json(events) = list_notifications(State(state), Query(NotificationQuery::default()))
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].subject, "Message 5");
    }

    #[tokio::test]
    async fn test_notifications_explicit_limit() {
        let (state, store) = state();
        for n in 1..=5 {
            insert_event(&store, n);
        }

        let query = NotificationQuery { limit: Some(10) };
        let Json(events) = list_notifications(State(state), Query(query)).await.unwrap();
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_accounts_listing() {
        let (state, _store) = state();
        state
            .registry
            .create(NewAccount {
                email: "a@x.com".to_string(),
                secret: "pw".to_string().into(),
                host: "imap.x.com".to_string(),
                port: 993,
                protocol: Protocol::Imap,
                is_active: true,
            })
            .await
            .unwrap();

        let Json(accounts) = list_accounts(State(state)).await.unwrap();
        assert_eq!(accounts.len(), 1);
        let json = serde_json::to_string(&accounts).unwrap();
        assert!(!json.contains("pw"));
    }

    fn create_request(email: &str) -> CreateAccountRequest {
        serde_json::from_value(serde_json::json!({
            "email": email,
            "password": "pw",
            "host": "imap.x.com",
            "port": 993,
            "protocol": "IMAP",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_account_publishes_list() {
        let (state, _store) = state();
        let mut sub = state.hub.subscribe().await.unwrap();
        sub.recv().await.unwrap();
        sub.recv().await.unwrap();

        let (status, Json(account)) =
            create_account(State(state.clone()), Json(create_request("a@x.com")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(account.is_active);

        match sub.recv().await {
            Some(HubMessage::AccountsSnapshot(accounts)) => {
                assert_eq!(accounts.len(), 1);
                assert_eq!(accounts[0].email, "a@x.com");
            }
            other => panic!("expected accounts snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_account_conflicts() {
        let (state, _store) = state();
        create_account(State(state.clone()), Json(create_request("a@x.com")))
            .await
            .unwrap();

        let (status, _) = create_account(State(state), Json(create_request("a@x.com")))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let (state, store) = state();
        let mut request = create_request("a@x.com");
        request.port = 0;

        let (status, _) = create_account(State(state), Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_account() {
        let (state, _store) = state();
        let (_, Json(created)) =
            create_account(State(state.clone()), Json(create_request("a@x.com")))
                .await
                .unwrap();

        let request = UpdateAccountRequest {
            host: Some("imap2.x.com".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let Json(updated) = update_account(State(state), Path(created.id), Json(request))
            .await
            .unwrap();
        assert_eq!(updated.host, "imap2.x.com");
        assert!(!updated.is_active);
        assert_eq!(updated.port, 993);
    }

    #[tokio::test]
    async fn test_update_missing_account_is_not_found() {
        let (state, _store) = state();
        let (status, _) = update_account(
            State(state),
            Path(42),
            Json(UpdateAccountRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let (state, store) = state();
        let (_, Json(created)) =
            create_account(State(state.clone()), Json(create_request("a@x.com")))
                .await
                .unwrap();

        let status = delete_account(State(state.clone()), Path(created.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(store.list().unwrap().is_empty());

        let (status, _) = delete_account(State(state), Path(created.id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_subscribers() {
        let (state, _store) = state();
        let _sub = state.hub.subscribe().await.unwrap();
        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.subscribers, 1);
    }

    #[tokio::test]
    async fn test_refresh_accepted() {
        let (state, _store) = state();
        assert_eq!(refresh(State(state)).await, StatusCode::ACCEPTED);
    }
}
