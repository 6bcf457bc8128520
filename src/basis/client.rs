use super::CampaignOperations;
use crate::basis::types::{BasisLineItem, BasisStatsRecord, DataResponse};
use crate::error::{AppError, Result};
use crate::models::LineItem;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

pub struct BasisClient {
    client: Client,
    access_token: String,
    api_base_url: String,
}

impl BasisClient {
    /// Create a client that sends `access_token` as a bearer token.
    ///
    /// The token is used as-is: a rejected token surfaces as an API error
    /// on each call, there is no refresh.
    pub fn new(api_base_url: &str, access_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let body = Self::success_body(response).await?;
        let parsed: DataResponse<serde_json::Value> = serde_json::from_str(&body)?;

        // A record that does not decode is dropped on its own.
        Ok(parsed
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed record");
                    None
                }
            })
            .collect())
    }

    async fn success_body(response: Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Basis { status, body });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CampaignOperations for BasisClient {
    #[instrument(name = "Fetching line items", skip(self))]
    async fn list_line_items(&self, campaign_id: &str) -> Result<Vec<LineItem>> {
        let url = format!("{}/campaigns/{}/line_items", self.api_base_url, campaign_id);

        let line_items: Vec<BasisLineItem> = self.get_data(&url, &[]).await?;

        Ok(line_items
            .into_iter()
            .filter_map(|li| match LineItem::try_from(li) {
                Ok(line_item) => Some(line_item),
                Err(rejected) => {
                    debug!(name = ?rejected.name, "Skipping line item without id");
                    None
                }
            })
            .collect())
    }

    #[instrument(name = "Fetching line item stats", skip(self))]
    async fn list_stats(&self, campaign_id: &str) -> Result<Vec<BasisStatsRecord>> {
        let url = format!("{}/stats/line_item", self.api_base_url);

        self.get_data(&url, &[("campaign_id", campaign_id)]).await
    }
}
