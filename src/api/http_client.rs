//! Implements the `Backend` trait with `reqwest` against the budgeting REST API.

use crate::api::Backend;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Amount, Direction, Jar, JarId, Transaction, TransactionId, TransferRequest};
use crate::{Config, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

/// Talks to the configured base URL. Every request carries the configured timeout.
pub(crate) struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jarview/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")
            .pub_result(ErrorType::Internal)?;
        Ok(Self {
            client,
            base_url: config.base_url().clone(),
        })
    }

    /// Resolves an endpoint path, given without a leading slash, against the base URL.
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Unable to build a URL for '{path}'"))
            .pub_result(ErrorType::Request)
    }

    fn request(&self, method: Method, path: &str) -> Result<(RequestBuilder, Url)> {
        let url = self.url(path)?;
        Ok((self.client.request(method, url.clone()), url))
    }

    async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let (request, url) = self.request(Method::GET, path)?;
        self.send(request, Method::GET, &url).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let (request, url) = self.request(Method::POST, path)?;
        self.send(request.json(body), Method::POST, &url).await
    }

    /// Sends the request and decodes a JSON response body, classifying every failure.
    async fn send<T>(&self, request: RequestBuilder, method: Method, url: &Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("{method} {url}");
        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))
            .pub_result(ErrorType::Network)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Unable to read the response body of {method} {url}"))
            .pub_result(ErrorType::Network)?;
        trace!("{method} {url} answered {status}: {body}");

        if !status.is_success() {
            let error_type = classify_status(status, &body);
            return Err(Error::msg(
                error_type,
                format!("{method} {url} answered {status}: {}", snippet(&body)),
            ));
        }

        serde_json::from_str(&body)
            .with_context(|| {
                format!(
                    "Unable to decode the response of {method} {url}: {}",
                    snippet(&body)
                )
            })
            .pub_result(ErrorType::Decode)
    }
}

/// Maps a non-success HTTP status to an `ErrorType`.
///
/// - 404 is `NotFound`
/// - 409 is `InsufficientFunds`
/// - 400 and 422 are `Validation`, or `InsufficientFunds` if the body mentions "insufficient"
/// - anything else is `Network`
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ErrorType {
    match status {
        StatusCode::NOT_FOUND => ErrorType::NotFound,
        StatusCode::CONFLICT => ErrorType::InsufficientFunds,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            if body.to_lowercase().contains("insufficient") {
                ErrorType::InsufficientFunds
            } else {
                ErrorType::Validation
            }
        }
        _ => ErrorType::Network,
    }
}

fn snippet(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(200) {
        Some((ix, _)) => &body[..ix],
        None => body,
    }
}

fn timestamp_param(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn list_jars(&self) -> Result<Vec<Jar>> {
        self.get("jars").await
    }

    async fn get_jar(&self, id: JarId) -> Result<Jar> {
        self.get(&format!("jars/{id}")).await
    }

    async fn get_balance(&self, id: JarId) -> Result<Amount> {
        self.get(&format!("jars/{id}/balance")).await
    }

    async fn adjust_balance(
        &self,
        id: JarId,
        amount: Amount,
        direction: Direction,
    ) -> Result<Jar> {
        self.post_json(&format!("jars/{id}/{}", direction.path_segment()), &amount)
            .await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.get("transactions").await
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.get(&format!("transactions/{id}")).await
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<Transaction> {
        self.post_json("transactions", transaction).await
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<Transaction> {
        let (builder, url) = self.request(Method::POST, "transactions/transfer")?;
        let builder = builder.query(&[
            ("sourceJarId", request.source_jar_id.to_string()),
            ("destinationJarId", request.destination_jar_id.to_string()),
            ("amount", request.amount.value().to_string()),
            ("description", request.description.clone()),
        ]);
        self.send(builder, Method::POST, &url).await
    }

    async fn transactions_for_jar(&self, id: JarId) -> Result<Vec<Transaction>> {
        self.get(&format!("transactions/jar/{id}")).await
    }

    async fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let (builder, url) = self.request(Method::GET, "transactions/daterange")?;
        let builder = builder.query(&[
            ("startDate", timestamp_param(start)),
            ("endDate", timestamp_param(end)),
        ]);
        self.send(builder, Method::GET, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestBackend, TestState};
    use crate::test::{serve, TestEnv};
    use chrono::TimeZone;

    async fn http_backend(name: &str) -> (TestEnv, HttpBackend, TestBackend) {
        let memory = TestBackend::new(format!("http://{name}.served/api/"));
        memory.set_state(TestState::default());
        let base_url = serve(memory.clone()).await;
        let env = TestEnv::with_base_url(base_url.as_str()).await;
        let backend = HttpBackend::new(&env.config()).unwrap();
        (env, backend, memory)
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, ""),
            ErrorType::NotFound
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "bad amount"),
            ErrorType::Validation
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "{}"),
            ErrorType::Validation
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "Insufficient funds in jar"),
            ErrorType::InsufficientFunds
        );
        assert_eq!(
            classify_status(StatusCode::CONFLICT, ""),
            ErrorType::InsufficientFunds
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            ErrorType::Network
        );
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "é".repeat(300);
        assert_eq!(snippet(&long).chars().count(), 200);
        assert_eq!(snippet("  short "), "short");
    }

    #[test]
    fn test_timestamp_param() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp_param(dt), "2025-01-02T03:04:05.000Z");
    }

    #[tokio::test]
    async fn test_http_reads() {
        let (_env, backend, memory) = http_backend("http-reads").await;
        let jars = backend.list_jars().await.unwrap();
        assert_eq!(jars, memory.get_state().jars);

        let jar = backend.get_jar(JarId(2)).await.unwrap();
        assert_eq!(jar.name, "Financial Freedom");
        let balance = backend.get_balance(JarId(2)).await.unwrap();
        assert_eq!(balance, Amount::from(300));

        let transactions = backend.list_transactions().await.unwrap();
        assert_eq!(transactions.len(), 6);
        let one = backend.get_transaction(TransactionId(3)).await.unwrap();
        assert_eq!(one.source_jar_id, JarId(5));

        let for_jar = backend.transactions_for_jar(JarId(4)).await.unwrap();
        assert_eq!(for_jar.len(), 1);

        let start = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let in_range = backend.transactions_in_range(start, end).await.unwrap();
        assert_eq!(in_range.len(), 2);
    }

    #[tokio::test]
    async fn test_http_transfer() {
        let (_env, backend, memory) = http_backend("http-transfer").await;
        let request = TransferRequest::new(1, 2, 50, "x");
        let t = backend.transfer(&request).await.unwrap();
        assert_eq!(t.amount, Amount::from(50));
        assert_eq!(t.source_jar_id, JarId(1));
        assert_eq!(t.destination_jar_id, JarId(2));
        assert_eq!(t.description, "x");
        assert_eq!(memory.get_state().transactions[0].id, t.id);
    }

    #[tokio::test]
    async fn test_http_adjust_and_create() {
        let (_env, backend, _memory) = http_backend("http-adjust").await;
        let jar = backend
            .adjust_balance(JarId(5), "12.5".parse().unwrap(), Direction::Add)
            .await
            .unwrap();
        assert_eq!(jar.current_balance.to_string(), "$312.50");

        let jar = backend
            .adjust_balance(JarId(5), Amount::from(12), Direction::Remove)
            .await
            .unwrap();
        assert_eq!(jar.current_balance.to_string(), "$300.50");

        let t = Transaction {
            id: TransactionId::default(),
            source_jar_id: JarId(1),
            destination_jar_id: JarId(6),
            amount: Amount::from(5),
            description: "Charity".into(),
            transaction_date: String::new(),
            created_at: String::new(),
            updated_at: None,
            source_jar: None,
            destination_jar: None,
        };
        let created = backend.create_transaction(&t).await.unwrap();
        assert_eq!(created.description, "Charity");
        assert_eq!(created.destination_jar_id, JarId(6));
    }

    #[tokio::test]
    async fn test_http_error_mapping() {
        let (_env, backend, _memory) = http_backend("http-errors").await;

        let e = backend.get_jar(JarId(77)).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);

        let e = backend
            .transfer(&TransferRequest::new(3, 3, 1, ""))
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let e = backend
            .adjust_balance(JarId(6), Amount::from(1000), Direction::Remove)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::InsufficientFunds);

        // A list where a single jar is expected.
        let e = backend.get::<Jar>("jars").await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Decode);
    }

    #[tokio::test]
    async fn test_http_unreachable_is_network_error() {
        // Nothing listens on the discard port.
        let env = TestEnv::with_base_url("http://127.0.0.1:9/api").await;
        let backend = HttpBackend::new(&env.config()).unwrap();
        let e = backend.list_jars().await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Network);
    }
}
