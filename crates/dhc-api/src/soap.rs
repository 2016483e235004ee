//! SOAP transport for HL7 v3 CDA documents
//!
//! Mirth exposes an `acceptMessage(arg0)` operation described by a WSDL.
//! The endpoint address advertised inside the WSDL is routinely an internal
//! one, so the scheme and host are rewritten to the configured base while
//! the path and query are kept.

use std::time::Duration;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ApiError, Result};

/// Replace the scheme/host of a discovered endpoint with the configured base
///
/// Returns the discovered URL untouched when either side does not parse as
/// an HTTP URL.
pub fn rewrite_endpoint(override_base: &str, discovered: &str) -> String {
    let Ok(override_url) = reqwest::Url::parse(override_base) else {
        return discovered.to_string();
    };
    let Ok(mut url) = reqwest::Url::parse(discovered) else {
        return discovered.to_string();
    };

    if !matches!(url.scheme(), "http" | "https") {
        return discovered.to_string();
    }

    let _ = url.set_scheme(override_url.scheme());
    let _ = url.set_host(override_url.host_str());
    let _ = url.set_port(override_url.port());
    url.to_string()
}

/// Find the first `address` element's `location` attribute in a WSDL
pub fn extract_soap_address(wsdl: &str) -> Option<String> {
    let mut reader = Reader::from_str(wsdl);

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let local = name.local_name();
                if local.as_ref() == b"address" {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"location" {
                            return String::from_utf8(attr.value.to_vec()).ok();
                        }
                    }
                }
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// Build the `acceptMessage` envelope around an XML document
pub fn accept_message_envelope(content: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ws=\"http://ws.connectors.connect.mirth.com/\">\
         <soapenv:Header/><soapenv:Body>\
         <ws:acceptMessage><arg0>{}</arg0></ws:acceptMessage>\
         </soapenv:Body></soapenv:Envelope>",
        escape(content)
    )
}

/// SOAP client for the Mirth CDA endpoint
pub struct MirthClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl MirthClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Send a CDA document through `acceptMessage`
    pub async fn send_cda(&self, content: &str) -> Result<()> {
        let endpoint = self.discover_endpoint().await?;
        tracing::debug!(%endpoint, "POSTing CDA message to Mirth");

        let response = self
            .http
            .post(&endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .body(accept_message_envelope(content))
            .send()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::ServiceUnavailable(format!(
                "Mirth returned HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::debug!("CDA message accepted by Mirth");
        Ok(())
    }

    async fn discover_endpoint(&self) -> Result<String> {
        let wsdl_url = format!("{}?wsdl", self.base_url);
        let wsdl = self
            .http
            .get(&wsdl_url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

        let discovered = extract_soap_address(&wsdl)
            .ok_or_else(|| ApiError::ServiceUnavailable("No endpoint in WSDL".to_string()))?;

        Ok(rewrite_endpoint(&self.base_url, &discovered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_endpoint_replaces_host_keeps_path() {
        let rewritten = rewrite_endpoint(
            "https://mirth.example.com:8443",
            "http://10.0.0.5:8081/services/cda?version=1",
        );
        assert_eq!(
            rewritten,
            "https://mirth.example.com:8443/services/cda?version=1"
        );
    }

    #[test]
    fn test_rewrite_endpoint_non_http_passthrough() {
        let rewritten = rewrite_endpoint("https://mirth.example.com", "ftp://10.0.0.5/x");
        assert_eq!(rewritten, "ftp://10.0.0.5/x");
    }

    #[test]
    fn test_extract_soap_address() {
        let wsdl = r#"<definitions xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/">
            <service name="cda">
                <port name="cdaPort">
                    <soap:address location="http://10.0.0.5:8081/services/cda"/>
                </port>
            </service>
        </definitions>"#;

        assert_eq!(
            extract_soap_address(wsdl).as_deref(),
            Some("http://10.0.0.5:8081/services/cda")
        );
    }

    #[test]
    fn test_extract_soap_address_missing() {
        assert_eq!(extract_soap_address("<definitions/>"), None);
    }

    #[test]
    fn test_envelope_escapes_content() {
        let envelope = accept_message_envelope("<ClinicalDocument a=\"1\"/>");
        assert!(envelope.contains("&lt;ClinicalDocument"));
        assert!(envelope.contains("<ws:acceptMessage><arg0>"));
    }
}
