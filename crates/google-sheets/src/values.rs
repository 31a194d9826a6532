//! `spreadsheets.values` operations.

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::error::SheetsError;
use crate::types::{
    ApiErrorBody, AppendValuesResponse, UpdateValuesResponse, ValueInputOption, ValueRange,
};

impl Client {
    /// Read every value in `range`.
    pub async fn get_values(&self, range: &str) -> Result<ValueRange, SheetsError> {
        let url = self.values_url(range, None)?;
        let headers = self.build_headers().await?;

        tracing::trace!(range, "sheets values.get");
        let response = self
            .http_client()
            .get(url)
            .headers(headers)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Append rows after the last row of the table found in `range`.
    pub async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInputOption,
    ) -> Result<AppendValuesResponse, SheetsError> {
        let mut url = self.values_url(range, Some("append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input.as_str())
            .append_pair("insertDataOption", "INSERT_ROWS");
        let headers = self.build_headers().await?;
        let body = ValueRange::from_rows(range, rows);

        tracing::trace!(range, "sheets values.append");
        let response = self
            .http_client()
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Overwrite the cells in `range` with `rows`.
    pub async fn update_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInputOption,
    ) -> Result<UpdateValuesResponse, SheetsError> {
        let mut url = self.values_url(range, None)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input.as_str());
        let headers = self.build_headers().await?;
        let body = ValueRange::from_rows(range, rows);

        tracing::trace!(range, "sheets values.update");
        let response = self
            .http_client()
            .put(url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        parse_response(response).await
    }
}

/// Check the status and decode the JSON body.
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, SheetsError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SheetsError::ApiError {
            status,
            message: api_error_message(&body),
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Pull the human-readable message out of a Google error envelope,
/// falling back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{}: {}", status, parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.to_string(),
    }
}
