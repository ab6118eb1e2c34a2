use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::{debug, error, info, instrument};

use super::TaskStore;
use crate::error::{Error, Result};
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// Connection details for the hosted table API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

/// PostgREST-style client for the `tasks` table. Rows are scoped to the
/// authenticated user; the service assigns `id` and `created_at`.
#[derive(Debug)]
pub struct RemoteTaskStore {
    client: Client,
    cfg: RemoteConfig,
    table_url: Url,
}

impl RemoteTaskStore {
    pub fn new(cfg: RemoteConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Self::with_client(cfg, client)
    }

    /// Uses a caller-built HTTP client, e.g. one with proxies disabled.
    pub fn with_client(cfg: RemoteConfig, client: Client) -> Result<Self> {
        let base = cfg.base_url.trim_end_matches('/');
        let table_url = Url::parse(&format!("{base}/rest/v1/{}", cfg.table))
            .map_err(|err| Error::validation(format!("invalid remote url {base}: {err}")))?;
        info!(url = %table_url, user = ?cfg.user_id, "configured remote task store");
        Ok(Self {
            client,
            cfg,
            table_url,
        })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn url_with(&self, pairs: &[(&str, String)]) -> Url {
        let mut url = self.table_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        url
    }

    fn id_filter(&self, id: &TaskId) -> Url {
        self.url_with(&[("id", format!("eq.{id}"))])
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .cfg
            .access_token
            .as_deref()
            .unwrap_or(self.cfg.api_key.as_str());
        req.header("apikey", &self.cfg.api_key).bearer_auth(bearer)
    }
}

impl TaskStore for RemoteTaskStore {
    #[instrument(skip(self))]
    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut pairs = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(user) = &self.cfg.user_id {
            pairs.push(("user_id", format!("eq.{user}")));
        }
        let url = self.url_with(&pairs);
        debug!(%url, "listing tasks");

        let resp = checked("list", self.authorized(self.client.get(url)).send()?)?;
        let tasks: Vec<Task> = resp.json()?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, fields), fields(title = %fields.title))]
    fn create_task(&mut self, mut fields: NewTask) -> Result<Task> {
        if fields.user_id.is_none() {
            fields.user_id = self.cfg.user_id.clone();
        }
        let req = self
            .authorized(self.client.post(self.table_url.clone()))
            .header("Prefer", "return=representation")
            .json(&fields);
        let resp = checked("create", req.send()?)?;
        let mut rows: Vec<Task> = resp.json()?;
        let task = rows
            .pop()
            .ok_or_else(|| Error::remote("create returned no row"))?;
        debug!(id = %task.id, "created remote task");
        Ok(task)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<()> {
        let req = self
            .authorized(self.client.patch(self.id_filter(id)))
            .json(&patch);
        checked("update", req.send()?)?;
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    fn delete_task(&mut self, id: &TaskId) -> Result<()> {
        let req = self.authorized(self.client.delete(self.id_filter(id)));
        checked("delete", req.send()?)?;
        Ok(())
    }
}

fn checked(op: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    error!(op, %status, body = %body, "remote call failed");
    Err(Error::remote(format!("{op} failed with {status}: {}", body.trim())))
}
