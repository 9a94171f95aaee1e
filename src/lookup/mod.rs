//! IP lookup clients — geolocation and abuse reputation.
//!
//! Two stateless operations against fixed third-party REST endpoints.
//! No retries, no caching; each call is a single blocking round-trip
//! formatted straight into report text.

use anyhow::Context;
use serde_json::Value;

/// Public geolocation endpoint (no API key required).
const GEO_API_URL: &str = "http://ip-api.com/json";

/// AbuseIPDB check endpoint (requires an API key).
const ABUSE_API_URL: &str = "https://api.abuseipdb.com/api/v2/check";

/// Reported-abuse window sent to AbuseIPDB, in days.
const ABUSE_MAX_AGE_DAYS: &str = "90";

/// Client for the two IP lookup endpoints.
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: reqwest::Client,
    geo_base_url: String,
    abuse_url: String,
    abuse_api_key: Option<String>,
}

impl LookupClient {
    /// Create a client against the public endpoints.
    pub fn new(abuse_api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_endpoints(GEO_API_URL, ABUSE_API_URL, abuse_api_key)
    }

    /// Create a client against custom endpoints (used by tests).
    pub fn with_endpoints(
        geo_base_url: &str,
        abuse_url: &str,
        abuse_api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .context("building HTTP client for IP lookups")?;
        Ok(Self {
            client,
            geo_base_url: geo_base_url.trim_end_matches('/').to_string(),
            abuse_url: abuse_url.to_string(),
            abuse_api_key,
        })
    }

    /// Fetch location and ISP details for an IP address.
    ///
    /// An upstream `status: "fail"` (private ranges, bogus input) is a
    /// lookup miss, not an error: the caller gets a plain
    /// `"Could not find data for {ip}."` line.
    pub async fn fetch_ip_data(&self, ip: &str) -> anyhow::Result<String> {
        let url = format!("{}/{ip}", self.geo_base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("geolocation request for {ip}"))?;
        let data: Value = resp
            .json()
            .await
            .context("parsing geolocation response")?;

        if data["status"].as_str() == Some("fail") {
            return Ok(format!("Could not find data for {ip}."));
        }

        Ok(format_geo_report(&data))
    }

    /// Fetch abuse-report details for an IP address from AbuseIPDB.
    ///
    /// Renders the decoded response as sorted, indented JSON.
    pub async fn fetch_abuse_ip_data(&self, ip: &str) -> anyhow::Result<String> {
        let key = self
            .abuse_api_key
            .as_deref()
            .context("abuse lookup requires lookup.abuse_api_key")?;

        let resp = self
            .client
            .get(&self.abuse_url)
            .query(&[("ipAddress", ip), ("maxAgeInDays", ABUSE_MAX_AGE_DAYS)])
            .header("Accept", "application/json")
            .header("Key", key)
            .send()
            .await
            .with_context(|| format!("abuse lookup request for {ip}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("AbuseIPDB returned {status}: {text}");
        }

        let decoded: Value = resp.json().await.context("parsing abuse response")?;
        // serde_json's default map keeps keys sorted, matching the
        // sort_keys output the report consumers expect.
        serde_json::to_string_pretty(&decoded).context("rendering abuse response")
    }
}

/// Render a successful geolocation payload as report text.
fn format_geo_report(data: &Value) -> String {
    format!(
        "IP: {}\nLocation: {}, {}\nISP: {}\nLat/Lon: {}, {}",
        field(data, "query"),
        field(data, "city"),
        field(data, "country"),
        field(data, "isp"),
        field(data, "lat"),
        field(data, "lon"),
    )
}

/// A JSON field as display text: strings unquoted, everything else via
/// its JSON rendering.
fn field(data: &Value, key: &str) -> String {
    match &data[key] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn geo_report_layout() {
        let data = json!({
            "status": "success",
            "query": "8.8.8.8",
            "city": "Ashburn",
            "country": "United States",
            "isp": "Google LLC",
            "lat": 39.03,
            "lon": -77.5
        });
        let report = format_geo_report(&data);
        assert_eq!(
            report,
            "IP: 8.8.8.8\nLocation: Ashburn, United States\nISP: Google LLC\nLat/Lon: 39.03, -77.5"
        );
    }

    #[test]
    fn missing_fields_render_empty() {
        let data = json!({ "query": "10.0.0.1" });
        let report = format_geo_report(&data);
        assert!(report.starts_with("IP: 10.0.0.1\nLocation: , "));
    }
}
