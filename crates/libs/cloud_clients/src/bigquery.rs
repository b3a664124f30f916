use crate::{storage::api_error, CloudError, TokenSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const BIGQUERY_API: &str = "https://bigquery.googleapis.com";
const QUERY_TIMEOUT_MS: u64 = 30_000;
const MAX_RESULT_POLLS: u32 = 10;

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(rename = "useLegacySql")]
    use_legacy_sql: bool,
    #[serde(rename = "timeoutMs")]
    timeout_ms: u64,
}

#[derive(Deserialize, Default)]
struct QueryResponse {
    #[serde(rename = "jobComplete", default)]
    job_complete: bool,
    #[serde(rename = "jobReference", default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Deserialize, Clone)]
struct JobReference {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
struct WireRow {
    f: Vec<WireCell>,
}

#[derive(Deserialize)]
struct WireCell {
    #[serde(default)]
    v: Value,
}

#[derive(Serialize)]
struct InsertAllRequest {
    rows: Vec<WireInsertRow>,
}

#[derive(Serialize)]
struct WireInsertRow {
    #[serde(rename = "insertId", skip_serializing_if = "Option::is_none")]
    insert_id: Option<String>,
    json: Value,
}

#[derive(Deserialize, Default)]
struct InsertAllResponse {
    #[serde(rename = "insertErrors", default)]
    insert_errors: Vec<Value>,
}

/// One row for a streaming insert; `insert_id` enables best-effort dedup of
/// redelivered work.
#[derive(Debug, Clone)]
pub struct InsertRow {
    pub insert_id: Option<String>,
    pub json: Value,
}

/// Columnar store client. Queries select through `TO_JSON_STRING(...)` so
/// every result row arrives as one JSON document.
#[derive(Clone)]
pub struct BigQueryClient {
    http: reqwest::Client,
    token: Arc<TokenSource>,
    project: String,
    base_url: String,
}

impl BigQueryClient {
    #[must_use]
    pub fn new(token: Arc<TokenSource>, project: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            project: project.to_string(),
            base_url: BIGQUERY_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// The `project.dataset.table` name used inside query text.
    #[must_use]
    pub fn qualified_table(&self, dataset: &str, table: &str) -> String {
        format!("{}.{dataset}.{table}", self.project)
    }

    /// Runs a query whose select list is a single `TO_JSON_STRING(...)`
    /// column and parses each row's document.
    pub async fn query_json_rows(&self, sql: &str) -> Result<Vec<Value>, CloudError> {
        let token = self.token.token().await?;
        let response = self
            .http
            .post(format!(
                "{}/bigquery/v2/projects/{}/queries",
                self.base_url, self.project
            ))
            .bearer_auth(&token)
            .json(&QueryRequest {
                query: sql,
                use_legacy_sql: false,
                timeout_ms: QUERY_TIMEOUT_MS,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let mut result: QueryResponse = response.json().await?;

        let mut polls = 0;
        while !result.job_complete {
            if polls >= MAX_RESULT_POLLS {
                return Err(CloudError::QueryIncomplete);
            }
            polls += 1;
            tokio::time::sleep(Duration::from_millis(500)).await;
            let job = result
                .job_reference
                .clone()
                .ok_or(CloudError::QueryIncomplete)?;
            let mut url = format!(
                "{}/bigquery/v2/projects/{}/queries/{}?timeoutMs={QUERY_TIMEOUT_MS}",
                self.base_url, self.project, job.job_id
            );
            if let Some(location) = &job.location {
                url.push_str(&format!("&location={location}"));
            }
            let response = self.http.get(url).bearer_auth(&token).send().await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }
            result = response.json().await?;
        }

        parse_json_rows(result.rows)
    }

    /// Streams rows into a table via `insertAll`.
    pub async fn insert_all(
        &self,
        dataset: &str,
        table: &str,
        rows: Vec<InsertRow>,
    ) -> Result<(), CloudError> {
        if rows.is_empty() {
            return Ok(());
        }
        let token = self.token.token().await?;
        let wire_rows = rows
            .into_iter()
            .map(|row| WireInsertRow {
                insert_id: row.insert_id,
                json: row.json,
            })
            .collect();
        let response = self
            .http
            .post(format!(
                "{}/bigquery/v2/projects/{}/datasets/{dataset}/tables/{table}/insertAll",
                self.base_url, self.project
            ))
            .bearer_auth(token)
            .json(&InsertAllRequest { rows: wire_rows })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let outcome: InsertAllResponse = response.json().await?;
        if !outcome.insert_errors.is_empty() {
            return Err(CloudError::InsertErrors(
                serde_json::to_string(&outcome.insert_errors).unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

fn parse_json_rows(rows: Vec<WireRow>) -> Result<Vec<Value>, CloudError> {
    rows.into_iter()
        .map(|row| {
            let cell = row.f.into_iter().next().map(|c| c.v).unwrap_or(Value::Null);
            match cell {
                Value::String(document) => Ok(serde_json::from_str(&document)?),
                other => Ok(other),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_string_rows_parse_into_documents() {
        let response: QueryResponse = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "rows": [
                    {"f": [{"v": "{\"media_id\":\"abc\",\"sequence_number\":2}"}]},
                    {"f": [{"v": "{\"media_id\":\"def\",\"sequence_number\":1}"}]}
                ]
            }"#,
        )
        .unwrap();

        let rows = parse_json_rows(response.rows).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["media_id"], "abc");
        assert_eq!(rows[1]["sequence_number"], 1);
    }

    #[test]
    fn malformed_documents_error_instead_of_crashing() {
        let rows = vec![WireRow {
            f: vec![WireCell {
                v: Value::String("{not json".into()),
            }],
        }];
        assert!(parse_json_rows(rows).is_err());
    }
}
