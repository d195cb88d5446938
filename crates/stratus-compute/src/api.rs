//! Compute operations

use std::collections::HashMap;

use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, Error, Predicate, Result, StatusCode, WaitOptions, wait_for,
};

use crate::flavor::Flavor;
use crate::image::{Image, ImageDetail};
use crate::server::{Server, ServerDetail};

/// Server list filters. All optional; unset filters are omitted from the
/// query string.
#[derive(Debug, Clone, Default)]
pub struct ServerFilters {
    pub name: Option<String>,
    pub status: Option<String>,
    pub image: Option<String>,
    pub flavor: Option<String>,
    pub marker: Option<String>,
    pub limit: Option<u32>,
}

impl ServerFilters {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(name) = &self.name {
            request = request.query("name", name);
        }
        if let Some(status) = &self.status {
            request = request.query("status", status);
        }
        if let Some(image) = &self.image {
            request = request.query("image", image);
        }
        if let Some(flavor) = &self.flavor {
            request = request.query("flavor", flavor);
        }
        if let Some(marker) = &self.marker {
            request = request.query("marker", marker);
        }
        if let Some(limit) = self.limit {
            request = request.query("limit", limit);
        }
        request
    }
}

/// Options for creating a server. Name, flavor and image are required.
#[derive(Debug, Clone, Default)]
pub struct CreateServerOptions {
    pub name: String,
    pub flavor_ref: String,
    pub image_ref: String,
    pub admin_pass: Option<String>,
    pub metadata: HashMap<String, String>,
    pub personality: Vec<Value>,
}

impl CreateServerOptions {
    pub fn new(
        name: impl Into<String>,
        flavor_ref: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            flavor_ref: flavor_ref.into(),
            image_ref: image_ref.into(),
            ..Self::default()
        }
    }

    pub fn admin_pass(mut self, admin_pass: impl Into<String>) -> Self {
        self.admin_pass = Some(admin_pass.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub(crate) fn create_server_body(options: &CreateServerOptions) -> Value {
    let mut server = json!({
        "name": options.name,
        "imageRef": options.image_ref,
        "flavorRef": options.flavor_ref,
        "metadata": options.metadata,
        "personality": options.personality,
    });
    // The API generates a password unless one is supplied.
    if let Some(admin_pass) = &options.admin_pass {
        server["adminPass"] = json!(admin_pass);
    }
    json!({ "server": server })
}

/// Extract the image id from the `Location` header of a snapshot response.
/// The header points at an endpoint that cannot be fetched directly, so the
/// trailing id segment is all that is kept.
pub(crate) fn image_id_from_location(location: &str) -> Option<&str> {
    let (prefix, id) = location.rsplit_once("/images/")?;
    if id.is_empty() || id.contains('/') || prefix.is_empty() {
        return None;
    }
    Some(id)
}

/// Compute API surface: servers, flavors and images.
#[derive(Debug, Clone)]
pub struct Compute {
    client: Client,
}

impl Compute {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list_servers(&self, filters: &ServerFilters) -> Result<Vec<Server>> {
        let request = filters.apply(ApiRequest::get("/servers/detail"));
        let response = self.client.request(request).await?.success()?;
        let details: Vec<ServerDetail> = response.field("servers")?;
        Ok(details
            .into_iter()
            .map(|detail| Server::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn server(&self, id: &str) -> Result<Server> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/servers/{id}")))
            .await?
            .success()?;
        Ok(Server::from_detail(&self.client, response.field("server")?))
    }

    pub async fn create_server(&self, options: &CreateServerOptions) -> Result<Server> {
        if options.name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        if options.flavor_ref.is_empty() {
            return Err(Error::MissingArgument("flavor"));
        }
        if options.image_ref.is_empty() {
            return Err(Error::MissingArgument("image"));
        }

        let response = self
            .client
            .request(ApiRequest::post("/servers").body(create_server_body(options)))
            .await?
            .success()?;
        Ok(Server::from_detail(&self.client, response.field("server")?))
    }

    /// Create a server and poll until it reports `ACTIVE`.
    pub async fn create_server_with_wait(
        &self,
        options: &CreateServerOptions,
        wait: WaitOptions,
    ) -> Result<Server> {
        let server = self.create_server(options).await?;
        tracing::debug!(id = %server.id, "server created, waiting for ACTIVE");
        wait_for(server, Predicate::status("ACTIVE"), wait).await
    }

    pub async fn delete_server(&self, id: &str) -> Result<()> {
        self.client
            .request(ApiRequest::delete(format!("/servers/{id}")))
            .await?
            .expect_status(StatusCode::NO_CONTENT)?;
        Ok(())
    }

    pub async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        let response = self
            .client
            .request(ApiRequest::get("/flavors/detail"))
            .await?
            .success()?;
        response.field("flavors")
    }

    pub async fn flavor(&self, id: &str) -> Result<Flavor> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/flavors/{id}")))
            .await?
            .success()?;
        response.field("flavor")
    }

    pub async fn list_images(&self) -> Result<Vec<Image>> {
        let response = self
            .client
            .request(ApiRequest::get("/images/detail"))
            .await?
            .success()?;
        let details: Vec<ImageDetail> = response.field("images")?;
        Ok(details
            .into_iter()
            .map(|detail| Image::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn image(&self, id: &str) -> Result<Image> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/images/{id}")))
            .await?
            .success()?;
        Ok(Image::from_detail(&self.client, response.field("image")?))
    }

    /// Snapshot a server into a new image. The API answers 202 with the new
    /// image's id only in the `Location` header.
    pub async fn create_server_image(&self, server_id: &str, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        if server_id.is_empty() {
            return Err(Error::MissingArgument("server"));
        }

        let response = self
            .client
            .request(
                ApiRequest::post(format!("/servers/{server_id}/action"))
                    .body(json!({ "createImage": { "name": name } })),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;

        let location = response.header("location").ok_or_else(|| {
            Error::UnexpectedResponse("missing Location header in image response".to_string())
        })?;
        image_id_from_location(location)
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("unparseable image location `{location}`"))
            })
    }

    pub async fn delete_image(&self, id: &str) -> Result<()> {
        self.client
            .request(ApiRequest::delete(format!("/images/{id}")))
            .await?
            .expect_status(StatusCode::NO_CONTENT)?;
        Ok(())
    }
}
