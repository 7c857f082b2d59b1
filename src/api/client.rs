use std::fmt::Display;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::error::{parse_detail, ApiError, Result};
use crate::models::{CreateDeviceResponse, Device, NewDevice};

/// HTTP client for the device inventory backend.
///
/// Every call is a direct request against the configured base URL: no
/// retries, no timeouts beyond the transport defaults, no caching.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /devices/`
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = format!("{}/devices/", self.base_url);
        tracing::debug!(url = %url, "Listing devices");

        let response = self.client.get(&url).send().await?;
        json_body(response).await
    }

    /// `POST /devices/`
    ///
    /// A duplicate `device_id` comes back as a 409, see [`ApiError::kind`].
    pub async fn create_device(&self, payload: &NewDevice) -> Result<CreateDeviceResponse> {
        let url = format!("{}/devices/", self.base_url);
        tracing::debug!(url = %url, device_id = %payload.device_id, "Creating device");

        let response = self.client.post(&url).json(payload).send().await?;
        json_body(response).await
    }

    /// `GET /devices/{id}`
    pub async fn get_device(&self, id: impl Display) -> Result<Device> {
        let url = self.device_url(&id.to_string());
        tracing::debug!(url = %url, "Fetching device");

        let response = self.client.get(&url).send().await?;
        json_body(response).await
    }

    /// `DELETE /devices/{device_id}`, keyed by the business key.
    pub async fn delete_device(&self, device_id: &str) -> Result<()> {
        let url = self.device_url(device_id);
        tracing::debug!(url = %url, device_id = %device_id, "Deleting device");

        let response = self.client.delete(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn device_url(&self, key: &str) -> String {
        format!("{}/devices/{}", self.base_url, urlencoding::encode(key))
    }
}

/// Turn a non-success response into [`ApiError::Status`], keeping the
/// server's `detail` message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = parse_detail(&body);
    tracing::debug!(status = %status, body = %body, "Device API returned error");

    Err(ApiError::Status { status, detail })
}

async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_device_url_encodes_business_key() {
        let client = ApiClient::new("http://localhost:8000");
        assert_eq!(
            client.device_url("rack 4/unit 2"),
            "http://localhost:8000/devices/rack%204%2Funit%202"
        );
        assert_eq!(client.device_url("DEV-001"), "http://localhost:8000/devices/DEV-001");
    }
}
