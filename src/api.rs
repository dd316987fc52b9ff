use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, Reject, Rejection};
use warp::{Filter, Reply};

use crate::match_query::{MatchFilter, MatchQuery};
use crate::match_store::{MatchStore, UpdateOutcome};
use crate::matches::{Match, MatchKey, MatchPatch};

pub const ROOT_MESSAGE: &str = "Football Match API";
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub type SharedStore = Arc<MatchStore>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("store operation failed: {0:#}")]
    Store(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Store(err)
    }
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

pub fn routes(
    store: SharedStore,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end().and(warp::get()).map(|| {
        warp::reply::json(&Message {
            message: ROOT_MESSAGE,
        })
    });

    let matches = warp::path("matches").and(warp::path::end());

    let list = matches
        .clone()
        .and(warp::get())
        .and(typed_query::<MatchQuery>())
        .and(with_store(store.clone()))
        .and_then(list_matches);

    let create = matches
        .clone()
        .and(warp::post())
        .and(json_body::<Match>())
        .and(with_store(store.clone()))
        .and_then(create_match);

    let update = matches
        .clone()
        .and(warp::put())
        .and(typed_query::<MatchKey>())
        .and(json_body::<MatchPatch>())
        .and(with_store(store.clone()))
        .and_then(update_match);

    let delete = matches
        .and(warp::delete())
        .and(typed_query::<MatchKey>())
        .and(with_store(store))
        .and_then(delete_match);

    root.or(list)
        .or(create)
        .or(update)
        .or(delete)
        .recover(handle_rejection)
}

fn with_store(
    store: SharedStore,
) -> impl Filter<Extract = (SharedStore,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

/// Query string decoding that rejects with `ApiError`, so a bad parameter is
/// reported as such instead of losing out to another route's rejection.
fn typed_query<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .and_then(|raw: String| async move {
            serde_urlencoded::from_str::<T>(&raw).map_err(|err| {
                Rejection::from(ApiError::Validation(format!(
                    "invalid query parameters: {err}"
                )))
            })
        })
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move {
            serde_json::from_slice::<T>(&body).map_err(|err| {
                Rejection::from(ApiError::Validation(format!("invalid request body: {err}")))
            })
        })
}

async fn list_matches(query: MatchQuery, store: SharedStore) -> Result<impl Reply, Rejection> {
    let filter =
        MatchFilter::from_query(&query).map_err(|err| ApiError::BadRequest(err.to_string()))?;
    debug!(?filter, "listing matches");
    let found = with_blocking_store(store, move |s| s.list(&filter)).await?;
    Ok(warp::reply::json(&found))
}

async fn create_match(m: Match, store: SharedStore) -> Result<impl Reply, Rejection> {
    let m = with_blocking_store(store, move |s| s.insert(&m).map(|()| m)).await?;
    info!(date = %m.date, home = %m.hometeam, away = %m.awayteam, "match inserted");
    Ok(warp::reply::json(&Message {
        message: "Match inserted successfully",
    }))
}

async fn update_match(
    key: MatchKey,
    patch: MatchPatch,
    store: SharedStore,
) -> Result<impl Reply, Rejection> {
    let lookup = key.clone();
    match with_blocking_store(store, move |s| s.update(&lookup, &patch)).await? {
        UpdateOutcome::Modified => {
            info!(date = %key.date, home = %key.hometeam, away = %key.awayteam, "match updated");
            Ok(warp::reply::json(&Message {
                message: "Match updated successfully",
            }))
        }
        // A no-op patch is reported like a missing match.
        UpdateOutcome::NotFound | UpdateOutcome::Unchanged => Err(ApiError::NotFound(
            "Match not found or no changes made".to_string(),
        )
        .into()),
    }
}

async fn delete_match(key: MatchKey, store: SharedStore) -> Result<impl Reply, Rejection> {
    let lookup = key.clone();
    if !with_blocking_store(store, move |s| s.delete(&lookup)).await? {
        return Err(ApiError::NotFound("Match not found".to_string()).into());
    }
    info!(date = %key.date, home = %key.hometeam, away = %key.awayteam, "match deleted");
    Ok(warp::reply::json(&Message {
        message: "Match deleted successfully",
    }))
}

/// Runs a store call on the blocking pool; SQLite access holds a mutex and
/// does file I/O.
async fn with_blocking_store<T, F>(store: SharedStore, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&MatchStore) -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| ApiError::Store(anyhow::Error::new(err).context("store task failed")))?
        .map_err(ApiError::from)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(api) = err.find::<ApiError>() {
        if let ApiError::Store(source) = api {
            error!("store failure: {source:#}");
            (api.status(), "Internal Server Error".to_string())
        } else {
            (api.status(), api.to_string())
        }
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Length Required".to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large".to_string())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        error!(?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { detail }),
        status,
    ))
}
