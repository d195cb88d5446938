//! Database instance operations

use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Error, Result, StatusCode, WaitOptions,
};

use crate::instance::{Instance, InstanceDetail};
use crate::types::{DatabaseSpec, UserSpec};

pub(crate) fn db_endpoint() -> EndpointSelector {
    EndpointSelector::database()
}

/// Options for creating a database instance. Flavor and volume size are
/// required; databases and users created alongside the instance are
/// optional.
#[derive(Debug, Clone, Default)]
pub struct CreateInstanceOptions {
    pub flavor_ref: String,
    pub size: u64,
    pub name: Option<String>,
    pub databases: Vec<DatabaseSpec>,
    pub users: Vec<UserSpec>,
}

impl CreateInstanceOptions {
    pub fn new(flavor_ref: impl Into<String>, size: u64) -> Self {
        Self {
            flavor_ref: flavor_ref.into(),
            size,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn database(mut self, database: DatabaseSpec) -> Self {
        self.databases.push(database);
        self
    }

    pub fn user(mut self, user: UserSpec) -> Self {
        self.users.push(user);
        self
    }
}

pub(crate) fn create_instance_body(options: &CreateInstanceOptions) -> Result<Value> {
    let mut instance = json!({
        "flavorRef": options.flavor_ref,
        "volume": { "size": options.size },
    });
    if let Some(name) = &options.name {
        instance["name"] = json!(name);
    }
    if !options.databases.is_empty() {
        instance["databases"] = serde_json::to_value(&options.databases)?;
    }
    if !options.users.is_empty() {
        instance["users"] = serde_json::to_value(&options.users)?;
    }
    Ok(json!({ "instance": instance }))
}

/// Database API surface.
#[derive(Debug, Clone)]
pub struct Databases {
    client: Client,
}

impl Databases {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        let response = self
            .client
            .request(ApiRequest::get("/instances").endpoint(db_endpoint()))
            .await?
            .success()?;
        let details: Vec<InstanceDetail> = response.field("instances")?;
        Ok(details
            .into_iter()
            .map(|detail| Instance::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn instance(&self, id: &str) -> Result<Instance> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/instances/{id}")).endpoint(db_endpoint()))
            .await?
            .success()?;
        Ok(Instance::from_detail(
            &self.client,
            response.field("instance")?,
        ))
    }

    pub async fn create_instance(&self, options: &CreateInstanceOptions) -> Result<Instance> {
        if options.flavor_ref.is_empty() {
            return Err(Error::MissingArgument("flavor"));
        }
        if options.size == 0 {
            return Err(Error::MissingArgument("size"));
        }

        let response = self
            .client
            .request(
                ApiRequest::post("/instances")
                    .endpoint(db_endpoint())
                    .body(create_instance_body(options)?),
            )
            .await?
            .success()?;
        Ok(Instance::from_detail(
            &self.client,
            response.field("instance")?,
        ))
    }

    /// Create an instance and poll until it reports active. The status
    /// comparison ignores case; this service is not consistent about it.
    pub async fn create_instance_with_wait(
        &self,
        options: &CreateInstanceOptions,
        wait: WaitOptions,
    ) -> Result<Instance> {
        let instance = self.create_instance(options).await?;
        tracing::debug!(id = %instance.id, "database instance created, waiting for ACTIVE");
        instance.wait_for_status("ACTIVE", wait).await
    }

    pub async fn delete_instance(&self, id: &str) -> Result<()> {
        self.client
            .request(ApiRequest::delete(format!("/instances/{id}")).endpoint(db_endpoint()))
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::offline_client;

    #[test]
    fn test_create_instance_body() {
        let body = create_instance_body(&CreateInstanceOptions::new("1", 2)).unwrap();
        assert_eq!(body["instance"]["flavorRef"], "1");
        assert_eq!(body["instance"]["volume"]["size"], 2);
        assert!(body["instance"].get("name").is_none());
        assert!(body["instance"].get("databases").is_none());

        let body = create_instance_body(
            &CreateInstanceOptions::new("1", 2)
                .name("orders-db")
                .database(DatabaseSpec::new("orders"))
                .user(UserSpec::new("app", "hunter2").database("orders")),
        )
        .unwrap();
        assert_eq!(body["instance"]["name"], "orders-db");
        assert_eq!(body["instance"]["databases"][0]["name"], "orders");
        assert_eq!(body["instance"]["users"][0]["databases"][0]["name"], "orders");
    }

    #[tokio::test]
    async fn test_create_instance_validates_required_fields() {
        let databases = Databases::new(&offline_client());

        let result = databases
            .create_instance(&CreateInstanceOptions::new("", 2))
            .await;
        assert!(matches!(result, Err(Error::MissingArgument("flavor"))));

        let result = databases
            .create_instance(&CreateInstanceOptions::new("1", 0))
            .await;
        assert!(matches!(result, Err(Error::MissingArgument("size"))));
    }
}
