//! Server images

use async_trait::async_trait;
use serde::Deserialize;
use stratus_client::{ApiRequest, Client, Predicate, Refresh, Result, WaitOptions, wait_for};

/// Wire shape of an image as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageDetail {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// A server image. Snapshots taken with `create_server_image` start out in
/// `SAVING` and are polled to `ACTIVE`.
#[derive(Debug, Clone)]
pub struct Image {
    client: Client,
    pub id: String,
    pub name: String,
    pub status: String,
    pub progress: Option<u64>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

impl Image {
    pub(crate) fn from_detail(client: &Client, detail: ImageDetail) -> Self {
        let mut image = Self {
            client: client.clone(),
            id: String::new(),
            name: String::new(),
            status: String::new(),
            progress: None,
            created: None,
            updated: None,
        };
        image.apply(detail);
        image
    }

    pub(crate) fn apply(&mut self, detail: ImageDetail) {
        self.id = detail.id;
        self.name = detail.name;
        self.status = detail.status;
        self.progress = detail.progress;
        self.created = detail.created;
        self.updated = detail.updated;
    }

    /// Poll until the image reaches `status` (exact match).
    pub async fn wait_for_status(self, status: &str, options: WaitOptions) -> Result<Image> {
        wait_for(self, Predicate::status(status), options).await
    }

    pub async fn delete(&self) -> Result<()> {
        crate::Compute::new(&self.client).delete_image(&self.id).await
    }
}

#[async_trait]
impl Refresh for Image {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/images/{}", self.id)))
            .await?
            .success()?;
        self.apply(response.field("image")?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "status" => Some(self.status.clone()),
            "progress" => self.progress.map(|progress| progress.to_string()),
            _ => None,
        }
    }
}
