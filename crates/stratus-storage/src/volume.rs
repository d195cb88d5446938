//! Block storage volume projection

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Predicate, Refresh, Result, WaitOptions, wait_for,
};

/// Wire shape of a volume as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeDetail {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub display_description: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A block storage volume. Refreshed in place during waits; the status
/// lifecycle runs `creating → available → in-use` (and back) server-side.
#[derive(Debug, Clone)]
pub struct Volume {
    client: Client,
    pub id: String,
    pub display_name: Option<String>,
    pub display_description: Option<String>,
    pub size: u64,
    pub status: String,
    pub volume_type: Option<String>,
    pub snapshot_id: Option<String>,
    pub attachments: Vec<Value>,
    pub created_at: Option<String>,
    pub availability_zone: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Volume {
    pub(crate) fn from_detail(client: &Client, detail: VolumeDetail) -> Self {
        let mut volume = Self {
            client: client.clone(),
            id: String::new(),
            display_name: None,
            display_description: None,
            size: 0,
            status: String::new(),
            volume_type: None,
            snapshot_id: None,
            attachments: Vec::new(),
            created_at: None,
            availability_zone: None,
            metadata: HashMap::new(),
        };
        volume.apply(detail);
        volume
    }

    pub(crate) fn apply(&mut self, detail: VolumeDetail) {
        self.id = detail.id;
        self.display_name = detail.display_name;
        self.display_description = detail.display_description;
        self.size = detail.size;
        self.status = detail.status;
        self.volume_type = detail.volume_type;
        self.snapshot_id = detail.snapshot_id;
        self.attachments = detail.attachments;
        self.created_at = detail.created_at;
        self.availability_zone = detail.availability_zone;
        self.metadata = detail.metadata;
    }

    /// Poll until the volume reaches `status` (exact match), e.g. `in-use`
    /// after an attach or `available` after a detach.
    pub async fn wait_for_status(self, status: &str, options: WaitOptions) -> Result<Volume> {
        wait_for(self, Predicate::status(status), options).await
    }

    pub async fn delete(&self) -> Result<()> {
        crate::BlockStorage::new(&self.client)
            .delete_volume(&self.id)
            .await
    }
}

#[async_trait]
impl Refresh for Volume {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/volumes/{}", self.id))
                    .endpoint(EndpointSelector::block_storage()),
            )
            .await?
            .success()?;
        self.apply(response.field("volume")?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "status" => Some(self.status.clone()),
            "display_name" => self.display_name.clone(),
            "volume_type" => self.volume_type.clone(),
            "snapshot_id" => self.snapshot_id.clone(),
            "availability_zone" => self.availability_zone.clone(),
            "size" => Some(self.size.to_string()),
            _ => None,
        }
    }
}
