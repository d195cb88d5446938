//! Server projection and per-server actions
//!
//! Most actions go through the shared `action` helper: one POST to
//! `/servers/{id}/action` whose body names the action, with 202 Accepted as
//! the expected status unless the API documents otherwise (confirm resize
//! answers 204, rescue answers 200 with the new admin password).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, Error, Predicate, Refresh, Result, StatusCode, WaitOptions, wait_for,
};
use stratus_storage::{BlockStorage, Volume};

/// One entry of a server's per-network address list.
#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub version: u8,
    pub addr: String,
}

/// Reference to a flavor or image embedded in a server body.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// A block storage volume attached to a server.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeAttachment {
    pub id: String,
    #[serde(rename = "serverId", default)]
    pub server_id: Option<String>,
    #[serde(rename = "volumeId", default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Wire shape of a server as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDetail {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: Option<u64>,
    #[serde(rename = "adminPass", default)]
    pub admin_pass: Option<String>,
    #[serde(rename = "hostId", default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<Address>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(rename = "accessIPv4", default)]
    pub access_ipv4: Option<String>,
    #[serde(rename = "accessIPv6", default)]
    pub access_ipv6: Option<String>,
    #[serde(default)]
    pub flavor: Option<ResourceRef>,
    #[serde(default)]
    pub image: Option<ResourceRef>,
}

/// Soft reboots go through the guest OS; hard reboots cycle power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebootType {
    #[default]
    Soft,
    Hard,
}

impl RebootType {
    fn as_str(self) -> &'static str {
        match self {
            RebootType::Soft => "SOFT",
            RebootType::Hard => "HARD",
        }
    }
}

/// Overrides for a rebuild. Anything left `None` falls back to the server's
/// current value.
#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    pub name: Option<String>,
    pub image_ref: Option<String>,
    pub flavor_ref: Option<String>,
    pub admin_pass: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

/// A compute server. Refreshed in place during waits; the interesting status
/// values are `BUILD`, `ACTIVE`, `VERIFY_RESIZE` and `ERROR`.
#[derive(Debug, Clone)]
pub struct Server {
    client: Client,
    pub id: String,
    pub name: String,
    pub status: String,
    pub progress: Option<u64>,
    pub admin_pass: Option<String>,
    pub host_id: Option<String>,
    pub addresses: HashMap<String, Vec<Address>>,
    pub metadata: HashMap<String, String>,
    pub access_ipv4: Option<String>,
    pub access_ipv6: Option<String>,
    pub flavor: Option<ResourceRef>,
    pub image: Option<ResourceRef>,
}

impl Server {
    pub(crate) fn from_detail(client: &Client, detail: ServerDetail) -> Self {
        let mut server = Self {
            client: client.clone(),
            id: String::new(),
            name: String::new(),
            status: String::new(),
            progress: None,
            admin_pass: None,
            host_id: None,
            addresses: HashMap::new(),
            metadata: HashMap::new(),
            access_ipv4: None,
            access_ipv6: None,
            flavor: None,
            image: None,
        };
        server.apply(detail);
        server
    }

    pub(crate) fn apply(&mut self, detail: ServerDetail) {
        self.id = detail.id;
        self.name = detail.name;
        self.status = detail.status;
        self.progress = detail.progress;
        // The password only appears in the create response; keep the one we
        // have when a later refresh omits it.
        if detail.admin_pass.is_some() {
            self.admin_pass = detail.admin_pass;
        }
        self.host_id = detail.host_id;
        self.addresses = detail.addresses;
        self.metadata = detail.metadata;
        self.access_ipv4 = detail.access_ipv4;
        self.access_ipv6 = detail.access_ipv6;
        if detail.flavor.is_some() {
            self.flavor = detail.flavor;
        }
        if detail.image.is_some() {
            self.image = detail.image;
        }
    }

    /// Poll until the server reaches `status` (exact match).
    pub async fn wait_for_status(self, status: &str, options: WaitOptions) -> Result<Server> {
        wait_for(self, Predicate::status(status), options).await
    }

    async fn action(&self, body: Value, expected: StatusCode) -> Result<()> {
        self.client
            .request(ApiRequest::post(format!("/servers/{}/action", self.id)).body(body))
            .await?
            .expect_status(expected)?;
        Ok(())
    }

    pub async fn reboot(&self, kind: RebootType) -> Result<()> {
        self.action(
            json!({ "reboot": { "type": kind.as_str() } }),
            StatusCode::ACCEPTED,
        )
        .await
    }

    /// Resize to another flavor. The previous server is kept server-side
    /// until [`Server::confirm_resize`] or [`Server::revert_resize`].
    pub async fn resize(&self, flavor_ref: &str) -> Result<()> {
        self.action(
            json!({ "resize": { "flavorRef": flavor_ref } }),
            StatusCode::ACCEPTED,
        )
        .await
    }

    /// Sign off on a resize. The saved previous server is discarded and the
    /// resize can no longer be rolled back.
    pub async fn confirm_resize(&self) -> Result<()> {
        self.action(json!({ "confirmResize": null }), StatusCode::NO_CONTENT)
            .await
    }

    pub async fn revert_resize(&self) -> Result<()> {
        self.action(json!({ "revertResize": null }), StatusCode::ACCEPTED)
            .await
    }

    /// Rebuild from an image. All data on the server is lost.
    pub async fn rebuild(&self, options: &RebuildOptions) -> Result<()> {
        self.action(
            json!({ "rebuild": rebuild_body(self, options) }),
            StatusCode::ACCEPTED,
        )
        .await
    }

    /// Rename the server. Does not change the hostname.
    pub async fn change_name(&mut self, name: &str) -> Result<()> {
        let response = self
            .client
            .request(
                ApiRequest::put(format!("/servers/{}", self.id))
                    .body(json!({ "server": { "name": name } })),
            )
            .await?
            .expect_status(StatusCode::OK)?;
        self.apply(response.field("server")?);
        Ok(())
    }

    pub async fn change_admin_password(&self, new_password: &str) -> Result<()> {
        self.action(
            json!({ "changePassword": { "adminPass": new_password } }),
            StatusCode::ACCEPTED,
        )
        .await
    }

    /// Reboot into rescue mode. Returns the temporary root password for the
    /// rescue environment.
    pub async fn rescue(&self) -> Result<String> {
        let response = self
            .client
            .request(
                ApiRequest::post(format!("/servers/{}/action", self.id))
                    .body(json!({ "rescue": "none" })),
            )
            .await?
            .expect_status(StatusCode::OK)?;
        response.field("adminPass")
    }

    pub async fn unrescue(&self) -> Result<()> {
        self.action(json!({ "unrescue": null }), StatusCode::ACCEPTED)
            .await
    }

    /// Network addresses, keyed by network label.
    pub async fn addresses(&self) -> Result<HashMap<String, Vec<Address>>> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/servers/{}/ips", self.id)))
            .await?
            .success()?;
        response.field("addresses")
    }

    pub async fn list_volume_attachments(&self) -> Result<Vec<VolumeAttachment>> {
        let response = self
            .client
            .request(ApiRequest::get(format!(
                "/servers/{}/os-volume_attachments",
                self.id
            )))
            .await?
            .success()?;
        response.field("volumeAttachments")
    }

    /// Attach a block storage volume, then poll until the volume reports
    /// `in-use`.
    pub async fn attach_volume(
        &self,
        volume_id: &str,
        device: Option<&str>,
        wait: WaitOptions,
    ) -> Result<Volume> {
        if volume_id.is_empty() {
            return Err(Error::MissingArgument("volume_id"));
        }

        let mut attachment = json!({ "volumeId": volume_id });
        if let Some(device) = device {
            attachment["device"] = json!(device);
        }

        self.client
            .request(
                ApiRequest::post(format!("/servers/{}/os-volume_attachments", self.id))
                    .body(json!({ "volumeAttachment": attachment })),
            )
            .await?
            .success()?;

        tracing::debug!(server = %self.id, volume = %volume_id, "volume attached, waiting for in-use");
        let volume = BlockStorage::new(&self.client).volume(volume_id).await?;
        volume.wait_for_status("in-use", wait).await
    }

    /// Detach a volume, then poll until it reports `available` again. The
    /// attachment id is the volume id.
    pub async fn detach_volume(&self, attachment_id: &str, wait: WaitOptions) -> Result<Volume> {
        self.client
            .request(ApiRequest::delete(format!(
                "/servers/{}/os-volume_attachments/{attachment_id}",
                self.id
            )))
            .await?
            .success()?;

        let volume = BlockStorage::new(&self.client).volume(attachment_id).await?;
        volume.wait_for_status("available", wait).await
    }

    pub async fn delete(&self) -> Result<()> {
        crate::Compute::new(&self.client).delete_server(&self.id).await
    }
}

fn rebuild_body(server: &Server, options: &RebuildOptions) -> Value {
    let name = options.name.as_deref().unwrap_or(&server.name);
    let image_ref = options
        .image_ref
        .as_deref()
        .or(server.image.as_ref().map(|image| image.id.as_str()))
        .unwrap_or_default();
    let flavor_ref = options
        .flavor_ref
        .as_deref()
        .or(server.flavor.as_ref().map(|flavor| flavor.id.as_str()))
        .unwrap_or_default();
    let metadata = options.metadata.as_ref().unwrap_or(&server.metadata);

    let mut body = json!({
        "name": name,
        "imageRef": image_ref,
        "flavorRef": flavor_ref,
        "metadata": metadata,
    });
    if let Some(admin_pass) = &options.admin_pass {
        body["adminPass"] = json!(admin_pass);
    }
    body
}

#[async_trait]
impl Refresh for Server {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/servers/{}", self.id)))
            .await?
            .success()?;
        self.apply(response.field("server")?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "status" => Some(self.status.clone()),
            "progress" => self.progress.map(|progress| progress.to_string()),
            "host_id" => self.host_id.clone(),
            "access_ipv4" => self.access_ipv4.clone(),
            "access_ipv6" => self.access_ipv6.clone(),
            _ => None,
        }
    }
}
