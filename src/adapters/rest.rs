use crate::config::settings::DatastoreSettings;
use crate::core::sanitize::DEFAULT_ID_FIELD;
use crate::domain::model::{Filter, InsertedRow, Record, SanitizedRecord};
use crate::domain::ports::{Datastore, DatastoreError, DatastoreResult};
use crate::utils::error::{MaintError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const REST_PATH: &str = "rest/v1";

/// Error body PostgREST sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// [`Datastore`] backed by a PostgREST table API (as served by Supabase).
pub struct RestDatastore {
    client: Client,
    base_url: String,
    api_key: String,
    schema: Option<String>,
    id_field: String,
}

impl RestDatastore {
    /// Builds the HTTP client. No request is sent until the first operation.
    pub fn connect(settings: &DatastoreSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| MaintError::Connection {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        tracing::debug!("Datastore handle created for {}", settings.url);
        Ok(Self {
            client,
            base_url: format!("{}/{}", settings.url.trim_end_matches('/'), REST_PATH),
            api_key: settings.api_key.clone(),
            schema: settings.schema.clone().filter(|s| s != "public"),
            id_field: DEFAULT_ID_FIELD.to_string(),
        })
    }

    /// Column read back from inserted rows as the generated identifier.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, table);
        let writes = matches!(method, Method::POST | Method::PATCH | Method::DELETE);

        let mut request = self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key));

        if let Some(schema) = &self.schema {
            let profile = if writes { "Content-Profile" } else { "Accept-Profile" };
            request = request.header(profile, schema);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> DatastoreResult<Response> {
        let response = request.send().await.map_err(|e| DatastoreError::Transport {
            message: describe_transport_error(&e),
        })?;

        tracing::debug!("Datastore response status: {}", response.status());
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(rejection(response).await)
        }
    }

    async fn rows(response: Response) -> DatastoreResult<Vec<Record>> {
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| DatastoreError::Decode {
                message: format!("expected a JSON array of rows: {}", e),
            })
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("could not connect: {}", error)
    } else {
        error.to_string()
    }
}

async fn rejection(response: Response) -> DatastoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => DatastoreError::Rejected {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            details: parsed.details,
            hint: parsed.hint,
        },
        Err(_) => DatastoreError::Rejected {
            status: status.as_u16(),
            code: None,
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                body
            },
            details: None,
            hint: None,
        },
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().split_once('/')?;
    total.parse().ok()
}

#[async_trait]
impl Datastore for RestDatastore {
    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        projection: Option<&[String]>,
        limit: Option<usize>,
    ) -> DatastoreResult<Vec<Record>> {
        let select = projection
            .map(|columns| columns.join(","))
            .unwrap_or_else(|| "*".to_string());

        let mut request = self
            .request(Method::GET, table)
            .query(&[("select", select)])
            .query(&filter.to_query_pairs());
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = self.send(request).await?;
        Self::rows(response).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> DatastoreResult<()> {
        let request = self
            .request(Method::DELETE, table)
            .query(&filter.to_query_pairs())
            .header("Prefer", "return=minimal");
        self.send(request).await?;
        Ok(())
    }

    async fn count(&self, table: &str, filter: &Filter) -> DatastoreResult<u64> {
        let request = self
            .request(Method::HEAD, table)
            .query(&[("select", "*")])
            .query(&filter.to_query_pairs())
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DatastoreError::Decode {
                message: "count response carried no Content-Range header".to_string(),
            })?;
        parse_content_range(range).ok_or_else(|| DatastoreError::Decode {
            message: format!("Content-Range '{}' has no exact total", range),
        })
    }

    async fn insert(&self, table: &str, record: &SanitizedRecord) -> DatastoreResult<InsertedRow> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(record);
        let response = self.send(request).await?;

        let row = match Self::rows(response).await?.into_iter().next() {
            Some(row) => row,
            None => {
                tracing::debug!("Insert into '{}' accepted but no row was returned", table);
                Record::default()
            }
        };
        Ok(InsertedRow {
            id: row.get(&self.id_field).cloned(),
            row,
        })
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Map<String, Value>,
    ) -> DatastoreResult<Vec<Record>> {
        let request = self
            .request(Method::PATCH, table)
            .query(&filter.to_query_pairs())
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(request).await?;
        Self::rows(response).await
    }
}
