//! DNS domains and their record operations
//!
//! Every mutation on a domain is asynchronous server-side and answers with a
//! job body. The `*_with_wait` variants poll the job to completion and hand
//! back the final payload.

use serde::Deserialize;
use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, Error, Result, StatusCode, WaitOptions,
};

use crate::api::dns_endpoint;
use crate::job::JobStatus;
use crate::record::{NewRecord, Record, new_record_body, update_record_body};

/// Wire shape of a domain as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDetail {
    pub id: u64,
    pub name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub nameservers: Vec<Value>,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// A DNS domain.
#[derive(Debug, Clone)]
pub struct Domain {
    client: Client,
    pub id: u64,
    pub name: String,
    pub email_address: Option<String>,
    pub ttl: Option<u32>,
    pub comment: Option<String>,
    pub nameservers: Vec<Value>,
    pub account_id: Option<u64>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

impl Domain {
    pub(crate) fn from_detail(client: &Client, detail: DomainDetail) -> Self {
        let mut domain = Self {
            client: client.clone(),
            id: 0,
            name: String::new(),
            email_address: None,
            ttl: None,
            comment: None,
            nameservers: Vec::new(),
            account_id: None,
            created: None,
            updated: None,
        };
        domain.apply(detail);
        domain
    }

    pub(crate) fn apply(&mut self, detail: DomainDetail) {
        self.id = detail.id;
        self.name = detail.name;
        self.email_address = detail.email_address;
        self.ttl = detail.ttl;
        self.comment = detail.comment;
        self.nameservers = detail.nameservers;
        self.account_id = detail.account_id;
        self.created = detail.created;
        self.updated = detail.updated;
    }

    /// Re-fetch the domain and update this instance in place.
    pub async fn details(&mut self) -> Result<()> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/domains/{}", self.id)).endpoint(dns_endpoint()))
            .await?
            .success()?;
        self.apply(response.json()?);
        Ok(())
    }

    pub async fn records(&self) -> Result<Vec<Record>> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/domains/{}/records", self.id)).endpoint(dns_endpoint()),
            )
            .await?
            .success()?;
        response.field("records")
    }

    pub async fn record(&self, id: &str) -> Result<Record> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/domains/{}/records/{id}", self.id))
                    .endpoint(dns_endpoint()),
            )
            .await?
            .success()?;
        response.json()
    }

    pub async fn add_record(&self, record: &NewRecord) -> Result<JobStatus> {
        self.add_records(std::slice::from_ref(record)).await
    }

    /// Queue a batch of new records. Answers with the pending job.
    pub async fn add_records(&self, records: &[NewRecord]) -> Result<JobStatus> {
        if records.is_empty() {
            return Err(Error::MissingArgument("records"));
        }

        tracing::debug!(domain = %self.name, count = records.len(), "adding records");
        let body = json!({
            "records": records.iter().map(new_record_body).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .request(
                ApiRequest::post(format!("/domains/{}/records", self.id))
                    .endpoint(dns_endpoint())
                    .body(body),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    /// Add records and poll the job to completion, returning the records the
    /// API created.
    pub async fn add_records_with_wait(
        &self,
        records: &[NewRecord],
        wait: WaitOptions,
    ) -> Result<Vec<Record>> {
        let job = self.add_records(records).await?.wait_for_result(wait).await?;
        records_from_job(&job)
    }

    pub async fn update_record(&self, record: &Record) -> Result<JobStatus> {
        self.update_records(std::slice::from_ref(record)).await
    }

    pub async fn update_records(&self, records: &[Record]) -> Result<JobStatus> {
        if records.is_empty() {
            return Err(Error::MissingArgument("records"));
        }

        let body = json!({
            "records": records.iter().map(update_record_body).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .request(
                ApiRequest::put(format!("/domains/{}/records", self.id))
                    .endpoint(dns_endpoint())
                    .body(body),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    pub async fn update_records_with_wait(
        &self,
        records: &[Record],
        wait: WaitOptions,
    ) -> Result<Vec<Record>> {
        let job = self
            .update_records(records)
            .await?
            .wait_for_result(wait)
            .await?;
        records_from_job(&job)
    }

    pub async fn delete_record(&self, id: &str) -> Result<JobStatus> {
        let response = self
            .client
            .request(
                ApiRequest::delete(format!("/domains/{}/records/{id}", self.id))
                    .endpoint(dns_endpoint()),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    pub async fn delete_records(&self, ids: &[&str]) -> Result<JobStatus> {
        if ids.is_empty() {
            return Err(Error::MissingArgument("records"));
        }

        let mut request =
            ApiRequest::delete(format!("/domains/{}/records", self.id)).endpoint(dns_endpoint());
        for id in ids {
            request = request.query("id", id);
        }
        let response = self
            .client
            .request(request)
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    /// Delete records and poll the job to completion, returning the final
    /// job status string.
    pub async fn delete_records_with_wait(
        &self,
        ids: &[&str],
        wait: WaitOptions,
    ) -> Result<String> {
        let job = self.delete_records(ids).await?.wait_for_result(wait).await?;
        Ok(job.status)
    }
}

/// Pull the created/updated records out of a finished job's payload.
fn records_from_job(job: &JobStatus) -> Result<Vec<Record>> {
    if job.is_error() {
        return Err(Error::Api {
            status: 202,
            message: job
                .error
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| format!("job {} failed", job.id)),
        });
    }

    match job.response.as_ref().and_then(|response| response.get("records")) {
        Some(records) => Ok(serde_json::from_value(records.clone())?),
        None => Ok(Vec::new()),
    }
}
