//! Warehouse access: the `WarehouseClient` seam, the BigQuery REST client and
//! the memoizing wrapper.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::QueryCache;
use crate::config::WarehouseConfig;
use crate::error::WarehouseError;
use crate::query::QueryResult;

/// Executes SQL text and returns rows. Implementations own connection
/// lifecycle; callers construct one client and pass it to every render.
pub trait WarehouseClient {
    fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError>;

    /// Drop any memoized results.
    fn invalidate(&self) {}

    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Serves repeated queries from a `QueryCache`. Failures are never cached.
pub struct CachedWarehouse<W> {
    inner: W,
    cache: RefCell<QueryCache>,
}

impl<W: WarehouseClient> CachedWarehouse<W> {
    pub fn new(inner: W, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RefCell::new(QueryCache::new(ttl)),
        }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// Drop the memo for one statement.
    pub fn invalidate_query(&self, sql: &str) -> bool {
        self.cache.borrow_mut().invalidate(sql)
    }
}

impl<W: WarehouseClient> WarehouseClient for CachedWarehouse<W> {
    fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        if let Some(hit) = self.cache.borrow_mut().get(sql) {
            tracing::trace!(sql, "query cache hit");
            return Ok(hit);
        }
        let result = self.inner.query(sql)?;
        self.cache.borrow_mut().insert(sql, result.clone());
        Ok(result)
    }

    fn invalidate(&self) {
        self.cache.borrow_mut().clear();
        self.inner.invalidate();
        tracing::info!("query cache cleared");
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        let cache = self.cache.borrow();
        Some(CacheStats {
            hits: cache.hits(),
            misses: cache.misses(),
            entries: cache.len(),
        })
    }
}

// BigQuery REST payloads (jobs.query / jobs.getQueryResults)

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    job_complete: Option<bool>,
    page_token: Option<String>,
    job_reference: Option<JobReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TableSchema {
    #[serde(default)]
    fields: Vec<TableField>,
}

#[derive(Debug, Clone, Deserialize)]
struct TableField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

/// BigQuery client over the v2 REST API.
pub struct BigQueryClient {
    agent: ureq::Agent,
    endpoint: String,
    project_id: String,
    location: Option<String>,
    token: Option<String>,
    timeout: Duration,
    page_size: u32,
}

impl BigQueryClient {
    /// Build a client from config. The bearer token is read from the
    /// environment variable named by `access_token_env`.
    pub fn new(config: &WarehouseConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let token = std::env::var(&config.access_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::warn!(
                env = config.access_token_env.as_str(),
                "no access token in environment; requests are unauthenticated"
            );
        }
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            token,
            timeout,
            page_size: config.page_size,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn query_url(&self) -> String {
        format!("{}/projects/{}/queries", self.endpoint, self.project_id)
    }

    fn results_url(&self, job_id: &str) -> String {
        format!(
            "{}/projects/{}/queries/{}",
            self.endpoint, self.project_id, job_id
        )
    }

    fn query_body(&self, sql: &str) -> Value {
        let mut body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": self.timeout.as_millis() as u64,
            "maxResults": self.page_size,
        });
        if let Some(location) = &self.location {
            body["location"] = Value::String(location.clone());
        }
        body
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn post_query(&self, sql: &str) -> Result<QueryResponse, WarehouseError> {
        let request = self
            .authorize(self.agent.post(&self.query_url()))
            .set("Content-Type", "application/json");
        let body = self.query_body(sql).to_string();
        read_response(request.send_string(&body))
    }

    fn get_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, WarehouseError> {
        let mut request = self
            .authorize(self.agent.get(&self.results_url(&job.job_id)))
            .query("maxResults", &self.page_size.to_string())
            .query("timeoutMs", &self.timeout.as_millis().to_string());
        if let Some(location) = job.location.as_deref().or(self.location.as_deref()) {
            request = request.query("location", location);
        }
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }
        read_response(request.call())
    }
}

impl WarehouseClient for BigQueryClient {
    fn query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        let started = Instant::now();
        let mut response = self.post_query(sql)?;
        let mut schema: Option<TableSchema> = None;
        let mut rows: Vec<TableRow> = Vec::new();

        loop {
            let job = response.job_reference.clone();
            if response.job_complete == Some(false) {
                let job = job.ok_or_else(|| {
                    WarehouseError::Decode("incomplete job without a jobReference".into())
                })?;
                if started.elapsed() > self.timeout {
                    return Err(WarehouseError::Service {
                        status: 408,
                        message: format!(
                            "query job {} did not complete within {}s",
                            job.job_id,
                            self.timeout.as_secs()
                        ),
                    });
                }
                tracing::debug!(job_id = job.job_id.as_str(), "waiting for query job");
                response = self.get_results(&job, None)?;
                continue;
            }

            if schema.is_none() {
                schema = response.schema.take();
            }
            rows.append(&mut response.rows);

            match (response.page_token.take(), job) {
                (Some(token), Some(job)) => {
                    tracing::debug!(rows = rows.len(), "fetching next result page");
                    response = self.get_results(&job, Some(&token))?;
                }
                _ => break,
            }
        }

        let schema =
            schema.ok_or_else(|| WarehouseError::Decode("response has no schema".into()))?;
        let frame = decode_rows(&schema, &rows)?;
        Ok(QueryResult::new(frame))
    }
}

fn read_response(
    result: Result<ureq::Response, ureq::Error>,
) -> Result<QueryResponse, WarehouseError> {
    let response = match result {
        Ok(r) => r,
        Err(ureq::Error::Status(status, r)) => {
            let text = r.into_string().unwrap_or_default();
            return Err(WarehouseError::Service {
                status,
                message: service_error_message(&text),
            });
        }
        Err(ureq::Error::Transport(t)) => return Err(WarehouseError::connectivity(t.to_string())),
    };
    let text = response
        .into_string()
        .map_err(|e| WarehouseError::connectivity(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| WarehouseError::Decode(e.to_string()))
}

/// Extract `error.message` from a Google API error body, falling back to the raw text.
fn service_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode `rows[].f[].v` cells into typed columns following `schema`.
pub(crate) fn decode_rows(
    schema: &TableSchema,
    rows: &[TableRow],
) -> Result<DataFrame, WarehouseError> {
    let columns = schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let cells: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.f.get(idx).and_then(|cell| cell_text(&cell.v)))
                .collect();
            decode_column(field, cells)
        })
        .collect::<Result<Vec<Column>, WarehouseError>>()?;
    Ok(DataFrame::new(columns)?)
}

fn cell_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_cells<T>(
    field: &TableField,
    cells: &[Option<String>],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>, WarehouseError> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(s) => parse(s).map(Some).ok_or_else(|| {
                WarehouseError::Decode(format!(
                    "value '{}' in column '{}' is not a valid {}",
                    s, field.name, field.field_type
                ))
            }),
        })
        .collect()
}

fn decode_column(field: &TableField, cells: Vec<Option<String>>) -> Result<Column, WarehouseError> {
    let name = PlSmallStr::from(field.name.as_str());
    if field.mode.as_deref() == Some("REPEATED") {
        return Ok(Column::new(name, cells));
    }
    let column = match field.field_type.to_uppercase().as_str() {
        "INTEGER" | "INT64" => Column::new(name, parse_cells(field, &cells, |s| s.parse::<i64>().ok())?),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => {
            Column::new(name, parse_cells(field, &cells, |s| s.parse::<f64>().ok())?)
        }
        "BOOLEAN" | "BOOL" => Column::new(
            name,
            parse_cells(field, &cells, |s| match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            })?,
        ),
        "DATE" => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| WarehouseError::Decode("invalid epoch".into()))?;
            let days = parse_cells(field, &cells, |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(|d| (d - epoch).num_days() as i32)
            })?;
            Column::new(name, days).cast(&DataType::Date)?
        }
        "TIMESTAMP" => {
            let micros = parse_cells(field, &cells, |s| {
                s.parse::<f64>().ok().map(|secs| (secs * 1_000_000.0).round() as i64)
            })?;
            Column::new(name, micros).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
        _ => Column::new(name, cells),
    };
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const PAYLOAD: &str = r#"{
        "kind": "bigquery#queryResponse",
        "schema": {"fields": [
            {"name": "pddistrict", "type": "STRING", "mode": "NULLABLE"},
            {"name": "year", "type": "INTEGER", "mode": "NULLABLE"},
            {"name": "crime_count", "type": "INTEGER", "mode": "NULLABLE"},
            {"name": "share", "type": "FLOAT"},
            {"name": "reported", "type": "DATE"},
            {"name": "open", "type": "BOOLEAN"}
        ]},
        "jobComplete": true,
        "rows": [
            {"f": [{"v": "PARK"}, {"v": "2010"}, {"v": "412"}, {"v": "0.25"}, {"v": "2010-03-01"}, {"v": "true"}]},
            {"f": [{"v": "BAYVIEW"}, {"v": "2011"}, {"v": null}, {"v": "1.5"}, {"v": null}, {"v": "false"}]}
        ]
    }"#;

    #[test]
    fn decodes_typed_columns() {
        let response: QueryResponse = serde_json::from_str(PAYLOAD).unwrap();
        let schema = response.schema.unwrap();
        let df = decode_rows(&schema, &response.rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("pddistrict").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("year").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("share").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("reported").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("open").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(
            df.column("crime_count").unwrap().get(0).unwrap(),
            AnyValue::Int64(412)
        );
        assert_eq!(
            df.column("crime_count").unwrap().get(1).unwrap(),
            AnyValue::Null
        );
        assert_eq!(df.column("reported").unwrap().null_count(), 1);
    }

    #[test]
    fn rejects_malformed_integer() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"schema": {"fields": [{"name": "n", "type": "INT64"}]},
                "rows": [{"f": [{"v": "twelve"}]}], "jobComplete": true}"#,
        )
        .unwrap();
        let err = decode_rows(&response.schema.unwrap(), &response.rows).unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(msg) if msg.contains("twelve")));
    }

    #[test]
    fn empty_result_keeps_schema() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"schema": {"fields": [{"name": "category", "type": "STRING"}]}, "jobComplete": true}"#,
        )
        .unwrap();
        let df = decode_rows(&response.schema.unwrap(), &response.rows).unwrap();
        assert_eq!(df.height(), 0);
        assert!(df.column("category").is_ok());
    }

    #[test]
    fn service_error_message_prefers_api_message() {
        let body = r#"{"error": {"code": 404, "message": "Not found: Table x", "status": "NOT_FOUND"}}"#;
        assert_eq!(service_error_message(body), "Not found: Table x");
        assert_eq!(service_error_message("plain failure\n"), "plain failure");
    }

    #[test]
    fn urls_and_body_follow_config() {
        let config = WarehouseConfig {
            project_id: "sfpd-demo".into(),
            location: Some("US".into()),
            endpoint: "https://bigquery.googleapis.com/bigquery/v2/".into(),
            ..WarehouseConfig::default()
        };
        let client = BigQueryClient::new(&config);
        assert_eq!(
            client.query_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/sfpd-demo/queries"
        );
        assert_eq!(
            client.results_url("job_1"),
            "https://bigquery.googleapis.com/bigquery/v2/projects/sfpd-demo/queries/job_1"
        );
        let body = client.query_body("SELECT 1");
        assert_eq!(body["useLegacySql"], Value::Bool(false));
        assert_eq!(body["location"], Value::String("US".into()));
        assert_eq!(body["query"], Value::String("SELECT 1".into()));
    }

    struct Counting {
        calls: Cell<usize>,
        fail: bool,
    }

    impl WarehouseClient for Counting {
        fn query(&self, _sql: &str) -> Result<QueryResult, WarehouseError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(WarehouseError::connectivity("timeout"));
            }
            Ok(QueryResult::new(df!("a" => &[1i64]).unwrap()))
        }
    }

    #[test]
    fn cached_warehouse_memoizes_by_sql() {
        let cached = CachedWarehouse::new(
            Counting {
                calls: Cell::new(0),
                fail: false,
            },
            Duration::from_secs(60),
        );
        cached.query("SELECT 1").unwrap();
        cached.query("SELECT 1").unwrap();
        cached.query("SELECT 2").unwrap();
        assert_eq!(cached.inner().calls.get(), 2);
        let stats = cached.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 2);

        assert!(cached.invalidate_query("SELECT 1"));
        cached.query("SELECT 1").unwrap();
        assert_eq!(cached.inner().calls.get(), 3);

        cached.invalidate();
        cached.query("SELECT 2").unwrap();
        assert_eq!(cached.inner().calls.get(), 4);
    }

    #[test]
    fn cached_warehouse_does_not_cache_failures() {
        let cached = CachedWarehouse::new(
            Counting {
                calls: Cell::new(0),
                fail: true,
            },
            Duration::from_secs(60),
        );
        assert!(cached.query("SELECT 1").is_err());
        assert!(cached.query("SELECT 1").is_err());
        assert_eq!(cached.inner().calls.get(), 2);
        assert_eq!(cached.cache_stats().unwrap().entries, 0);
    }
}
