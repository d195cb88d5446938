//! Async job tracking
//!
//! Every DNS mutation answers 202 Accepted with a job body instead of the
//! final state. The job is polled at `/status/{id}?showDetails=true` until
//! its status leaves `RUNNING`/`INITIALIZED`, then inspected for
//! `COMPLETED` or `ERROR`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Predicate, Refresh, Result, WaitOptions, wait_for,
};

/// Wire shape of a job as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDetail {
    #[serde(rename = "jobId")]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A pending DNS job. Terminal statuses are `COMPLETED` and `ERROR`; the
/// response payload is only populated once the job finishes.
#[derive(Debug, Clone)]
pub struct JobStatus {
    client: Client,
    pub id: String,
    pub status: String,
    pub response: Option<Value>,
    pub error: Option<Value>,
}

impl JobStatus {
    pub(crate) fn from_detail(client: &Client, detail: JobDetail) -> Self {
        let mut job = Self {
            client: client.clone(),
            id: String::new(),
            status: String::new(),
            response: None,
            error: None,
        };
        job.apply(detail);
        job
    }

    pub(crate) fn apply(&mut self, detail: JobDetail) {
        self.id = detail.id;
        self.status = detail.status;
        self.response = detail.response;
        self.error = detail.error;
    }

    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }

    pub fn is_error(&self) -> bool {
        self.status == "ERROR"
    }

    /// Poll until the job leaves its in-flight statuses. The returned job is
    /// terminal but not necessarily successful; check
    /// [`JobStatus::is_completed`].
    pub async fn wait_for_result(self, options: WaitOptions) -> Result<JobStatus> {
        wait_for(
            self,
            Predicate::custom(|job: &JobStatus| {
                job.status != "RUNNING" && job.status != "INITIALIZED"
            }),
            options,
        )
        .await
    }
}

#[async_trait]
impl Refresh for JobStatus {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/status/{}", self.id))
                    .endpoint(EndpointSelector::dns())
                    .query("showDetails", true),
            )
            .await?
            .success()?;
        self.apply(response.json()?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "status" => Some(self.status.clone()),
            _ => None,
        }
    }
}
