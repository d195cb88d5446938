//! DNS operations

use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Error, Result, StatusCode,
};

use crate::domain::{Domain, DomainDetail};
use crate::job::JobStatus;

pub(crate) fn dns_endpoint() -> EndpointSelector {
    EndpointSelector::dns()
}

/// Options for registering a domain. Name and email are required; a TTL
/// below the API's 300 second floor is ignored rather than rejected.
#[derive(Debug, Clone)]
pub struct CreateDomainOptions {
    pub name: String,
    pub email_address: String,
    pub ttl: Option<u32>,
    pub comment: Option<String>,
}

impl CreateDomainOptions {
    pub fn new(name: impl Into<String>, email_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email_address: email_address.into(),
            ttl: None,
            comment: None,
        }
    }

    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

pub(crate) fn create_domain_body(options: &CreateDomainOptions) -> Value {
    let mut body = json!({
        "name": options.name,
        "emailAddress": options.email_address,
    });
    if let Some(ttl) = options.ttl.filter(|ttl| *ttl >= 300) {
        body["ttl"] = json!(ttl);
    }
    if let Some(comment) = &options.comment {
        body["comment"] = json!(comment);
    }
    body
}

/// Fields of a domain that can be changed after registration.
#[derive(Debug, Clone, Default)]
pub struct DomainUpdate {
    pub id: u64,
    pub ttl: Option<u32>,
    pub email_address: Option<String>,
    pub comment: Option<String>,
}

fn domain_update_body(update: &DomainUpdate) -> Value {
    let mut body = json!({ "id": update.id });
    if let Some(ttl) = update.ttl {
        body["ttl"] = json!(ttl);
    }
    if let Some(email_address) = &update.email_address {
        body["emailAddress"] = json!(email_address);
    }
    if let Some(comment) = &update.comment {
        body["comment"] = json!(comment);
    }
    body
}

/// DNS API surface. Mutations return the pending [`JobStatus`] rather than
/// the final state.
#[derive(Debug, Clone)]
pub struct Dns {
    client: Client,
}

impl Dns {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// List domains, optionally filtered by (sub)string match on the name.
    pub async fn list_domains(&self, name: Option<&str>) -> Result<Vec<Domain>> {
        let mut request = ApiRequest::get("/domains").endpoint(dns_endpoint());
        if let Some(name) = name {
            request = request.query("name", name);
        }
        let response = self.client.request(request).await?.success()?;
        let details: Vec<DomainDetail> = response.field("domains")?;
        Ok(details
            .into_iter()
            .map(|detail| Domain::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn domain(&self, id: u64) -> Result<Domain> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/domains/{id}")).endpoint(dns_endpoint()))
            .await?
            .success()?;
        Ok(Domain::from_detail(&self.client, response.json()?))
    }

    pub async fn create_domain(&self, options: &CreateDomainOptions) -> Result<JobStatus> {
        if options.name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        if options.email_address.is_empty() {
            return Err(Error::MissingArgument("emailAddress"));
        }

        let response = self
            .client
            .request(
                ApiRequest::post("/domains")
                    .endpoint(dns_endpoint())
                    .body(create_domain_body(options)),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    /// Provision a domain from a BIND 9 zone file.
    pub async fn import_domain(&self, contents: &str) -> Result<JobStatus> {
        if contents.is_empty() {
            return Err(Error::MissingArgument("contents"));
        }

        let response = self
            .client
            .request(
                ApiRequest::post("/domains/import")
                    .endpoint(dns_endpoint())
                    .body(json!({
                        "contentType": "BIND_9",
                        "contents": contents,
                    })),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    pub async fn update_domain(&self, update: &DomainUpdate) -> Result<JobStatus> {
        self.update_domains(std::slice::from_ref(update)).await
    }

    pub async fn update_domains(&self, updates: &[DomainUpdate]) -> Result<JobStatus> {
        if updates.is_empty() {
            return Err(Error::MissingArgument("domains"));
        }

        let body = json!({
            "domains": updates.iter().map(domain_update_body).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .request(
                ApiRequest::put("/domains")
                    .endpoint(dns_endpoint())
                    .body(body),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(JobStatus::from_detail(&self.client, response.json()?))
    }

    /// Delete a domain, and with `delete_subdomains` its subdomains too.
    pub async fn delete_domain(&self, id: u64, delete_subdomains: bool) -> Result<JobStatus> {
        self.delete_domains(&[id], delete_subdomains).await
    }

    pub async fn delete_domains(&self, ids: &[u64], delete_subdomains: bool) -> Result<JobStatus> {
        if ids.is_empty() {
            return Err(Error::MissingArgument("domains"));
        }

        let mut request = ApiRequest::delete("/domains")
            .endpoint(dns_endpoint())
            .query("deleteSubdomains", delete_subdomains);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::offline_client;

    #[test]
    fn test_create_domain_body_drops_low_ttl() {
        let options = CreateDomainOptions::new("example.com", "hostmaster@example.com").ttl(60);
        let body = create_domain_body(&options);
        assert!(body.get("ttl").is_none());

        let options = CreateDomainOptions::new("example.com", "hostmaster@example.com")
            .ttl(3600)
            .comment("primary zone");
        let body = create_domain_body(&options);
        assert_eq!(body["ttl"], 3600);
        assert_eq!(body["comment"], "primary zone");
    }

    #[tokio::test]
    async fn test_create_domain_validates_required_fields() {
        let dns = Dns::new(&offline_client());

        let result = dns
            .create_domain(&CreateDomainOptions::new("", "hostmaster@example.com"))
            .await;
        assert!(matches!(result, Err(Error::MissingArgument("name"))));

        let result = dns
            .create_domain(&CreateDomainOptions::new("example.com", ""))
            .await;
        assert!(matches!(result, Err(Error::MissingArgument("emailAddress"))));
    }

    #[tokio::test]
    async fn test_import_requires_contents() {
        let dns = Dns::new(&offline_client());
        let result = dns.import_domain("").await;
        assert!(matches!(result, Err(Error::MissingArgument("contents"))));
    }

    #[test]
    fn test_domain_update_body() {
        let update = DomainUpdate {
            id: 1234,
            ttl: Some(7200),
            email_address: Some("dns@example.com".to_string()),
            comment: None,
        };
        let body = domain_update_body(&update);
        assert_eq!(body["id"], 1234);
        assert_eq!(body["ttl"], 7200);
        assert_eq!(body["emailAddress"], "dns@example.com");
        assert!(body.get("comment").is_none());
    }
}
