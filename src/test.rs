//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{Backend, TestBackend, TestState};
use crate::error::{Error, ErrorType};
use crate::model::{Amount, Direction, JarId, Transaction, TransactionId, TransferRequest};
use crate::Config;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;
use uuid::Uuid;

/// Test environment that sets up a jarview home directory with a Config.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment whose base URL is unique, so its `TestBackend` state is not
    /// shared with any other test. The backend starts from the seed data.
    pub async fn new() -> Self {
        let rand = Uuid::new_v4().simple().to_string();
        let env = Self::with_base_url(&format!("http://{rand}.test/api")).await;
        env.set_state(TestState::default());
        env
    }

    /// Creates a test environment pointing at `base_url`.
    pub async fn with_base_url(base_url: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("jarview");
        let config = Config::create(&root, base_url).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// The in-memory backend that `Mode::Testing` uses for this environment.
    pub fn backend(&self) -> TestBackend {
        TestBackend::new(self.config.base_url().as_str())
    }

    /// Gets the current state of the TestBackend associated with this environment.
    pub fn get_state(&self) -> TestState {
        self.backend().get_state()
    }

    /// Sets the state of the TestBackend associated with this environment.
    pub fn set_state(&self, state: TestState) {
        self.backend().set_state(state)
    }
}

/// Serves the REST surface of the budgeting API from `backend` on a random local port and returns
/// the base URL, e.g. `http://127.0.0.1:40123/api/`. The server runs until the test's runtime
/// shuts down.
pub async fn serve(backend: TestBackend) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let backend = backend.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handle(backend.clone(), req));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });
    Url::parse(&format!("http://{addr}/api/")).unwrap()
}

async fn handle(
    backend: TestBackend,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query: HashMap<String, String> = url::form_urlencoded::parse(
        req.uri().query().unwrap_or_default().as_bytes(),
    )
    .into_owned()
    .collect();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return Ok(text(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let segments: Vec<&str> = path
        .trim_start_matches("/api")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = route(&backend, &method, &segments, &query, &body).await;
    Ok(match result {
        Ok(Some(json)) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap(),
        Ok(None) => text(StatusCode::NOT_FOUND, format!("No route for {method} {path}")),
        Err(e) => {
            let status = match e.error_type() {
                ErrorType::NotFound => StatusCode::NOT_FOUND,
                ErrorType::Validation | ErrorType::InsufficientFunds | ErrorType::Request => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            text(status, e.to_string())
        }
    })
}

/// Dispatches one request. `Ok(None)` means there is no such route.
async fn route(
    backend: &TestBackend,
    method: &Method,
    segments: &[&str],
    query: &HashMap<String, String>,
    body: &[u8],
) -> crate::Result<Option<String>> {
    let out = match (method, segments) {
        (&Method::GET, ["jars"]) => json(backend.list_jars().await?),
        (&Method::GET, ["jars", id]) => json(backend.get_jar(parse(id)?).await?),
        (&Method::GET, ["jars", id, "balance"]) => json(backend.get_balance(parse(id)?).await?),
        (&Method::POST, ["jars", id, direction]) => {
            let direction: Direction = parse(direction)?;
            let amount: Amount = decode(body)?;
            json(
                backend
                    .adjust_balance(parse(id)?, amount, direction)
                    .await?,
            )
        }
        (&Method::GET, ["transactions"]) => json(backend.list_transactions().await?),
        (&Method::POST, ["transactions"]) => {
            let transaction: Transaction = decode(body)?;
            json(backend.create_transaction(&transaction).await?)
        }
        (&Method::POST, ["transactions", "transfer"]) => {
            let request = TransferRequest::new(
                parse::<JarId>(param(query, "sourceJarId")?)?,
                parse::<JarId>(param(query, "destinationJarId")?)?,
                parse::<Amount>(param(query, "amount")?)?,
                query.get("description").cloned().unwrap_or_default(),
            );
            json(backend.transfer(&request).await?)
        }
        (&Method::GET, ["transactions", "daterange"]) => {
            let start = parse_datetime(param(query, "startDate")?)?;
            let end = parse_datetime(param(query, "endDate")?)?;
            json(backend.transactions_in_range(start, end).await?)
        }
        (&Method::GET, ["transactions", "jar", id]) => {
            json(backend.transactions_for_jar(parse(id)?).await?)
        }
        (&Method::GET, ["transactions", id]) => {
            json(backend.get_transaction(parse::<TransactionId>(id)?).await?)
        }
        _ => return Ok(None),
    };
    Ok(Some(out))
}

fn text(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from(message)))
        .unwrap()
}

fn json<T: Serialize>(value: T) -> String {
    serde_json::to_string(&value).unwrap()
}

fn param<'a>(query: &'a HashMap<String, String>, name: &str) -> crate::Result<&'a str> {
    query
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::msg(ErrorType::Validation, format!("Missing {name}")))
}

fn parse<T>(s: &str) -> crate::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| Error::msg(ErrorType::Validation, format!("Bad value '{s}': {e}")))
}

fn parse_datetime(s: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::msg(ErrorType::Validation, format!("Bad date '{s}': {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::msg(ErrorType::Validation, format!("Bad request body: {e}")))
}
