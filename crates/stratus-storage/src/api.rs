//! Block storage operations

use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Error, Predicate, Result, StatusCode, WaitOptions,
    wait_for,
};

use crate::volume::{Volume, VolumeDetail};

/// Volume performance tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Ssd,
    Sata,
}

impl VolumeType {
    pub fn as_str(self) -> &'static str {
        match self {
            VolumeType::Ssd => "SSD",
            VolumeType::Sata => "SATA",
        }
    }
}

/// Options for creating a volume. Only the size is required.
#[derive(Debug, Clone, Default)]
pub struct CreateVolumeOptions {
    pub size: u64,
    pub display_name: Option<String>,
    pub display_description: Option<String>,
    pub snapshot_id: Option<String>,
    pub volume_type: Option<VolumeType>,
}

impl CreateVolumeOptions {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn display_description(mut self, description: impl Into<String>) -> Self {
        self.display_description = Some(description.into());
        self
    }

    pub fn snapshot_id(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    pub fn volume_type(mut self, volume_type: VolumeType) -> Self {
        self.volume_type = Some(volume_type);
        self
    }
}

pub(crate) fn create_volume_body(options: &CreateVolumeOptions) -> Value {
    let mut volume = json!({ "size": options.size });
    if let Some(name) = &options.display_name {
        volume["display_name"] = json!(name);
    }
    if let Some(description) = &options.display_description {
        volume["display_description"] = json!(description);
    }
    if let Some(snapshot_id) = &options.snapshot_id {
        volume["snapshot_id"] = json!(snapshot_id);
    }
    if let Some(volume_type) = options.volume_type {
        volume["volume_type"] = json!(volume_type.as_str());
    }
    json!({ "volume": volume })
}

/// Block storage API surface.
#[derive(Debug, Clone)]
pub struct BlockStorage {
    client: Client,
}

impl BlockStorage {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    fn endpoint() -> EndpointSelector {
        EndpointSelector::block_storage()
    }

    pub async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let response = self
            .client
            .request(ApiRequest::get("/volumes").endpoint(Self::endpoint()))
            .await?
            .success()?;
        let details: Vec<VolumeDetail> = response.field("volumes")?;
        Ok(details
            .into_iter()
            .map(|detail| Volume::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn volume(&self, id: &str) -> Result<Volume> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/volumes/{id}")).endpoint(Self::endpoint()))
            .await?
            .success()?;
        Ok(Volume::from_detail(&self.client, response.field("volume")?))
    }

    pub async fn create_volume(&self, options: &CreateVolumeOptions) -> Result<Volume> {
        if options.size == 0 {
            return Err(Error::MissingArgument("size"));
        }

        let response = self
            .client
            .request(
                ApiRequest::post("/volumes")
                    .endpoint(Self::endpoint())
                    .body(create_volume_body(options)),
            )
            .await?
            .expect_status(StatusCode::OK)?;
        Ok(Volume::from_detail(&self.client, response.field("volume")?))
    }

    /// Create a volume and poll until it reports `ACTIVE`.
    pub async fn create_volume_with_wait(
        &self,
        options: &CreateVolumeOptions,
        wait: WaitOptions,
    ) -> Result<Volume> {
        let volume = self.create_volume(options).await?;
        tracing::debug!(id = %volume.id, "volume created, waiting for ACTIVE");
        wait_for(volume, Predicate::status("ACTIVE"), wait).await
    }

    pub async fn delete_volume(&self, id: &str) -> Result<()> {
        self.client
            .request(ApiRequest::delete(format!("/volumes/{id}")).endpoint(Self::endpoint()))
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_volume_body_minimal() {
        let body = create_volume_body(&CreateVolumeOptions::new(100));
        assert_eq!(body, json!({ "volume": { "size": 100 } }));
    }

    #[test]
    fn test_create_volume_body_full() {
        let options = CreateVolumeOptions::new(250)
            .display_name("data")
            .display_description("database files")
            .snapshot_id("snap-1")
            .volume_type(VolumeType::Ssd);
        let body = create_volume_body(&options);
        assert_eq!(body["volume"]["size"], 250);
        assert_eq!(body["volume"]["display_name"], "data");
        assert_eq!(body["volume"]["display_description"], "database files");
        assert_eq!(body["volume"]["snapshot_id"], "snap-1");
        assert_eq!(body["volume"]["volume_type"], "SSD");
    }

    #[tokio::test]
    async fn test_zero_size_is_rejected() {
        let storage = BlockStorage::new(&crate::tests::offline_client());
        let result = storage.create_volume(&CreateVolumeOptions::new(0)).await;
        assert!(matches!(result, Err(Error::MissingArgument("size"))));
    }
}
