use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url, header::LOCATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::core::ExchangeRateRow;
use crate::core::warehouse::{SchemaField, TableRef, Warehouse};

/// BigQuery REST v2 client authenticated with an OAuth bearer token.
pub struct BigQueryWarehouse {
    client: Client,
    base_url: String,
    project: String,
    access_token: String,
    location: Option<String>,
    poll_interval: Duration,
}

impl BigQueryWarehouse {
    pub fn new(
        client: Client,
        base_url: &str,
        project: &str,
        access_token: &str,
        location: Option<&str>,
        poll_interval: Duration,
    ) -> Self {
        BigQueryWarehouse {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            access_token: access_token.to_string(),
            location: location.map(str::to_string),
            poll_interval,
        }
    }

    fn api_url(&self, resource: &str) -> Result<Url> {
        Url::parse(&format!(
            "{}/bigquery/v2/projects/{}/{}",
            self.base_url, self.project, resource
        ))
        .with_context(|| format!("Invalid warehouse URL: {}", self.base_url))
    }

    /// URL of an existing job. Lookups outside US/EU need the job's location.
    fn job_url(&self, resource: &str) -> Result<Url> {
        let mut url = self.api_url(resource)?;
        if let Some(location) = &self.location {
            url.query_pairs_mut().append_pair("location", location);
        }
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {}", e, what))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "HTTP error: {} for {}: {}",
                status,
                what,
                error_message(&text)
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", what, e))
    }

    async fn wait_for_query(&self, mut response: QueryResponse) -> Result<QueryResponse> {
        while !response.job_complete {
            let job_id = response
                .job_reference
                .as_ref()
                .map(|r| r.job_id.clone())
                .ok_or_else(|| anyhow!("Incomplete query response without a job reference"))?;
            debug!(%job_id, "Query still running");
            tokio::time::sleep(self.poll_interval).await;

            let url = self.job_url(&format!("queries/{job_id}"))?;
            response = self
                .send_json(self.client.get(url), &format!("query job {job_id}"))
                .await?;
        }
        Ok(response)
    }

    async fn wait_for_job(&self, mut job: Job) -> Result<Job> {
        while job.status.state != "DONE" {
            debug!(job_id = %job.job_reference.job_id, state = %job.status.state, "Load job still running");
            tokio::time::sleep(self.poll_interval).await;

            let url = self.job_url(&format!("jobs/{}", job.job_reference.job_id))?;
            job = self
                .send_json(
                    self.client.get(url),
                    &format!("load job {}", job.job_reference.job_id),
                )
                .await?;
        }
        Ok(job)
    }
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorProto,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    status: JobStatus,
}

/// Newline-delimited JSON, one row per line.
fn ndjson_body(rows: &[ExchangeRateRow]) -> Result<String> {
    let lines = rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    #[instrument(name = "BigQueryQuery", skip(self))]
    async fn query_scalar(&self, sql: &str) -> Result<Option<String>> {
        let url = self.api_url("queries")?;
        debug!("Running query at {}", url);

        let mut body = json!({ "query": sql, "useLegacySql": false });
        if let Some(location) = &self.location {
            body["location"] = json!(location);
        }

        let response: QueryResponse = self
            .send_json(self.client.post(url).json(&body), "query")
            .await?;
        let response = self.wait_for_query(response).await?;

        let value = response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.f.into_iter().next())
            .and_then(|cell| cell.v)
            .and_then(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            });
        debug!(?value, "Query returned");
        Ok(value)
    }

    #[instrument(name = "BigQueryLoad", skip(self, table, schema, rows), fields(table = %table, rows = rows.len()))]
    async fn load_batch(
        &self,
        table: &TableRef,
        schema: &[SchemaField],
        rows: &[ExchangeRateRow],
    ) -> Result<()> {
        if rows.is_empty() {
            debug!("No rows to load");
            return Ok(());
        }

        let mut job_reference = json!({ "projectId": self.project });
        if let Some(location) = &self.location {
            job_reference["location"] = json!(location);
        }
        let job_config = json!({
            "jobReference": job_reference,
            "configuration": {
                "load": {
                    "destinationTable": {
                        "projectId": table.project,
                        "datasetId": table.dataset,
                        "tableId": table.table,
                    },
                    "schema": { "fields": schema },
                    "sourceFormat": "NEWLINE_DELIMITED_JSON",
                    "writeDisposition": "WRITE_APPEND",
                    "createDisposition": "CREATE_IF_NEEDED",
                }
            }
        });

        let mut upload_url = Url::parse(&format!(
            "{}/upload/bigquery/v2/projects/{}/jobs",
            self.base_url, self.project
        ))
        .with_context(|| format!("Invalid warehouse URL: {}", self.base_url))?;
        upload_url
            .query_pairs_mut()
            .append_pair("uploadType", "resumable");
        debug!("Starting load job upload at {}", upload_url);

        let response = self
            .client
            .post(upload_url)
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", "application/octet-stream")
            .json(&job_config)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for load job upload", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "HTTP error: {} for load job upload: {}",
                status,
                error_message(&text)
            );
        }

        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Load job upload response has no session location"))?;

        let body = ndjson_body(rows)?;
        let job: Job = self
            .send_json(
                self.client
                    .put(&session_url)
                    .header("Content-Type", "application/octet-stream")
                    .body(body),
                "load job data",
            )
            .await?;
        info!(job_id = %job.job_reference.job_id, "Load job created");

        let job = self.wait_for_job(job).await?;
        if let Some(error) = job.status.error_result {
            bail!(
                "Load job {} failed: {} {}",
                job.job_reference.job_id,
                error.reason.unwrap_or_default(),
                error.message.unwrap_or_default()
            );
        }

        info!(job_id = %job.job_reference.job_id, "Load job done");
        Ok(())
    }
}
