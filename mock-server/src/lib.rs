use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session=mock-session-1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: String,
}

/// What the echo route saw.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route("/user/list", get(list_users))
        .route("/user/{id}", put(update_user).get(get_user))
        .route("/user/profile/{id}", get(get_profile))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/plain", get(plain))
        .route("/session", get(session))
        .route("/cached", get(cached))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(
    State(db): State<Db>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let users = db.read().await;
    let mut list: Vec<User> = users.values().cloned().collect();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    Json(json!({ "users": list, "query": query }))
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> (StatusCode, Json<User>) {
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    db.write().await.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut users = db.write().await;
    let user = users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = Some(email);
    }
    Ok(Json(user.clone()))
}

async fn get_profile(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, StatusCode> {
    let users = db.read().await;
    let user = users.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(Profile {
        user_id: user.id,
        bio: format!("{} has no bio yet", user.name),
    }))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    })
}

async fn plain() -> &'static str {
    "pong"
}

/// Hands out a session cookie and reports the cookie it was sent.
async fn session(headers: HeaderMap) -> impl IntoResponse {
    let sent = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        Json(json!({ "cookie": sent })),
    )
}

async fn cached(headers: HeaderMap) -> impl IntoResponse {
    if headers.contains_key(header::IF_MODIFIED_SINCE) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(json!({ "fresh": true })).into_response()
    }
}
