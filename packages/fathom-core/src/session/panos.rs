//! Authenticated handle to the PAN-OS firewall XML API.

use std::time::Duration;

use super::SessionError;

/// Firewalls routinely run self-signed management certificates; requests
/// still need a hard timeout so a wedged management plane fails the job.
const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Authenticated firewall API session. `connect` performs the keygen
/// exchange; `op` runs operational commands and returns the raw XML
/// result for the scraper to decode.
#[derive(Debug, Clone)]
pub struct PanosApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    host: String,
}

impl PanosApi {
    /// Authenticate against the firewall and obtain an API key.
    pub async fn connect(
        ip: &str,
        username: &str,
        password: &str,
        hostname: &str,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| SessionError::Transport {
                host: hostname.to_string(),
                message: e.to_string(),
            })?;

        let base_url = format!("https://{}", ip);

        let resp = client
            .get(format!("{}/api/", base_url))
            .query(&[("type", "keygen"), ("user", username), ("password", password)])
            .send()
            .await
            .map_err(|_| SessionError::Connect {
                host: hostname.to_string(),
                port: 443,
            })?;

        let body = resp.text().await.map_err(|e| SessionError::Transport {
            host: hostname.to_string(),
            message: e.to_string(),
        })?;

        let api_key = extract_api_key(&body).ok_or_else(|| SessionError::ApiAuth {
            host: hostname.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            host: hostname.to_string(),
        })
    }

    /// Run an operational command, returning the XML response body.
    pub async fn op(&self, cmd: &str) -> Result<String, SessionError> {
        let resp = self
            .client
            .get(format!("{}/api/", self.base_url))
            .query(&[("type", "op"), ("cmd", cmd), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SessionError::Transport {
                host: self.host.clone(),
                message: e.to_string(),
            })?;

        let body = resp.text().await.map_err(|e| SessionError::Transport {
            host: self.host.clone(),
            message: e.to_string(),
        })?;

        if !response_succeeded(&body) {
            return Err(SessionError::Transport {
                host: self.host.clone(),
                message: format!("api command rejected: {}", cmd),
            });
        }

        Ok(body)
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Pull the API key out of a keygen response. Anything other than a
/// success response with a key is an authentication failure.
fn extract_api_key(xml: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    let root = doc.root_element();

    if root.attribute("status") != Some("success") {
        return None;
    }

    root.descendants()
        .find(|n| n.has_tag_name("key"))
        .and_then(|n| n.text())
        .map(|s| s.to_string())
}

fn response_succeeded(xml: &str) -> bool {
    roxmltree::Document::parse(xml)
        .map(|doc| doc.root_element().attribute("status") == Some("success"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_extracted_from_keygen_response() {
        let xml = r#"<response status="success"><result><key>LUFRPT14MW5xOEo1R09KVlBZNnpnemh0VHRBOWl6TGM9</key></result></response>"#;
        assert_eq!(
            extract_api_key(xml).as_deref(),
            Some("LUFRPT14MW5xOEo1R09KVlBZNnpnemh0VHRBOWl6TGM9")
        );
    }

    #[test]
    fn failed_keygen_yields_no_key() {
        let xml = r#"<response status="error"><result><msg>Invalid credentials.</msg></result></response>"#;
        assert!(extract_api_key(xml).is_none());
        assert!(extract_api_key("not xml at all").is_none());
    }

    #[test]
    fn response_status_detection() {
        assert!(response_succeeded(r#"<response status="success"><result/></response>"#));
        assert!(!response_succeeded(r#"<response status="error"/>"#));
        assert!(!response_succeeded("garbage"));
    }
}
