//! Database instance projection
//!
//! The database service reports status in mixed case (`ACTIVE`, `active`,
//! `Active` have all been observed), so status waits on instances compare
//! case-insensitively.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, Error, Predicate, Refresh, Result, StatusCode, WaitOptions, wait_for,
};

use crate::api::db_endpoint;
use crate::types::{Database, DatabaseSpec, DatabaseUser, UserSpec};

/// Wire shape of an instance as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub flavor: Option<Value>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// A managed database instance.
#[derive(Debug, Clone)]
pub struct Instance {
    client: Client,
    pub id: String,
    pub name: Option<String>,
    pub status: String,
    pub hostname: Option<String>,
    pub flavor: Option<Value>,
    pub volume: Option<Value>,
    pub created_at: Option<String>,
    pub updated: Option<String>,
}

impl Instance {
    pub(crate) fn from_detail(client: &Client, detail: InstanceDetail) -> Self {
        let mut instance = Self {
            client: client.clone(),
            id: String::new(),
            name: None,
            status: String::new(),
            hostname: None,
            flavor: None,
            volume: None,
            created_at: None,
            updated: None,
        };
        instance.apply(detail);
        instance
    }

    pub(crate) fn apply(&mut self, detail: InstanceDetail) {
        self.id = detail.id;
        self.name = detail.name;
        self.status = detail.status;
        self.hostname = detail.hostname;
        self.flavor = detail.flavor;
        self.volume = detail.volume;
        self.created_at = detail.created_at;
        self.updated = detail.updated;
    }

    /// Poll until the instance reaches `status`, compared without regard to
    /// case.
    pub async fn wait_for_status(self, status: &str, options: WaitOptions) -> Result<Instance> {
        wait_for(
            self,
            Predicate::attributes_fold_case([("status", status)]),
            options,
        )
        .await
    }

    pub async fn databases(&self) -> Result<Vec<Database>> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/instances/{}/databases", self.id))
                    .endpoint(db_endpoint()),
            )
            .await?
            .success()?;
        response.field("databases")
    }

    pub async fn create_database(&self, database: &DatabaseSpec) -> Result<()> {
        self.create_databases(std::slice::from_ref(database)).await
    }

    pub async fn create_databases(&self, databases: &[DatabaseSpec]) -> Result<()> {
        if databases.is_empty() {
            return Err(Error::MissingArgument("databases"));
        }
        if databases.iter().any(|database| database.name.is_empty()) {
            return Err(Error::MissingArgument("name"));
        }

        self.client
            .request(
                ApiRequest::post(format!("/instances/{}/databases", self.id))
                    .endpoint(db_endpoint())
                    .body(json!({ "databases": databases })),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn delete_database(&self, name: &str) -> Result<()> {
        self.client
            .request(
                ApiRequest::delete(format!("/instances/{}/databases/{name}", self.id))
                    .endpoint(db_endpoint()),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn users(&self) -> Result<Vec<DatabaseUser>> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/instances/{}/users", self.id)).endpoint(db_endpoint()),
            )
            .await?
            .success()?;
        response.field("users")
    }

    pub async fn create_user(&self, user: &UserSpec) -> Result<()> {
        self.create_users(std::slice::from_ref(user)).await
    }

    pub async fn create_users(&self, users: &[UserSpec]) -> Result<()> {
        if users.is_empty() {
            return Err(Error::MissingArgument("users"));
        }
        if users.iter().any(|user| user.name.is_empty()) {
            return Err(Error::MissingArgument("name"));
        }
        if users.iter().any(|user| user.password.is_empty()) {
            return Err(Error::MissingArgument("password"));
        }

        self.client
            .request(
                ApiRequest::post(format!("/instances/{}/users", self.id))
                    .endpoint(db_endpoint())
                    .body(json!({ "users": users })),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn delete_user(&self, name: &str) -> Result<()> {
        self.client
            .request(
                ApiRequest::delete(format!("/instances/{}/users/{name}", self.id))
                    .endpoint(db_endpoint()),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    async fn action(&self, body: Value) -> Result<()> {
        self.client
            .request(
                ApiRequest::post(format!("/instances/{}/action", self.id))
                    .endpoint(db_endpoint())
                    .body(body),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn restart(&self) -> Result<()> {
        self.action(json!({ "restart": {} })).await
    }

    /// Move the instance to another flavor.
    pub async fn resize(&self, flavor_ref: &str) -> Result<()> {
        if flavor_ref.is_empty() {
            return Err(Error::MissingArgument("flavor"));
        }
        self.action(json!({ "resize": { "flavorRef": flavor_ref } }))
            .await
    }

    /// Grow the instance's storage volume. Shrinking is not supported
    /// server-side.
    pub async fn resize_volume(&self, size: u64) -> Result<()> {
        if size == 0 {
            return Err(Error::MissingArgument("size"));
        }
        self.action(json!({ "resize": { "volume": { "size": size } } }))
            .await
    }

    pub async fn delete(&self) -> Result<()> {
        crate::Databases::new(&self.client).delete_instance(&self.id).await
    }
}

#[async_trait]
impl Refresh for Instance {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/instances/{}", self.id)).endpoint(db_endpoint()))
            .await?
            .success()?;
        self.apply(response.field("instance")?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "name" => self.name.clone(),
            "status" => Some(self.status.clone()),
            "hostname" => self.hostname.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::offline_client;

    fn instance(raw: &str) -> Instance {
        Instance::from_detail(&offline_client(), serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn test_instance_detail_deserializes() {
        let detail: InstanceDetail = serde_json::from_str(
            r#"{
                "id": "inst-1",
                "name": "orders-db",
                "status": "BUILD",
                "hostname": "inst-1.db.example",
                "flavor": { "id": "1" },
                "volume": { "size": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(detail.id, "inst-1");
        assert_eq!(detail.status, "BUILD");
        assert_eq!(detail.volume.unwrap()["size"], 2);
    }

    #[test]
    fn test_status_matching_ignores_case() {
        // The service reports mixed-case statuses; the wait predicate has to
        // treat them as equal.
        let ready = Predicate::attributes_fold_case([("status", "ACTIVE")]);
        assert!(ready.matches(&instance(r#"{ "id": "i", "status": "active" }"#)));
        assert!(ready.matches(&instance(r#"{ "id": "i", "status": "Active" }"#)));
        assert!(!ready.matches(&instance(r#"{ "id": "i", "status": "BUILD" }"#)));
    }

    #[tokio::test]
    async fn test_empty_batches_are_rejected() {
        let instance = instance(r#"{ "id": "inst-2", "status": "ACTIVE" }"#);

        let result = instance.create_databases(&[]).await;
        assert!(matches!(result, Err(Error::MissingArgument("databases"))));

        let result = instance.create_users(&[]).await;
        assert!(matches!(result, Err(Error::MissingArgument("users"))));

        let result = instance.create_users(&[UserSpec::new("app", "")]).await;
        assert!(matches!(result, Err(Error::MissingArgument("password"))));
    }

    #[tokio::test]
    async fn test_resize_validations() {
        let instance = instance(r#"{ "id": "inst-3", "status": "ACTIVE" }"#);

        let result = instance.resize("").await;
        assert!(matches!(result, Err(Error::MissingArgument("flavor"))));

        let result = instance.resize_volume(0).await;
        assert!(matches!(result, Err(Error::MissingArgument("size"))));
    }
}
