//! Client for the Google Sheets v4 API.

use std::path::Path;
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;

use crate::error::SheetsError;
use crate::SHEETS_SCOPE;

/// Sheets API base URL
const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Token endpoint written into service accounts assembled from key parts
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Token provider variants
#[derive(Clone)]
enum TokenProviderVariant {
    /// Custom service account credentials
    ServiceAccount(Arc<CustomServiceAccount>),
    /// Application default credentials (returns Arc<dyn TokenProvider>)
    Default(Arc<dyn TokenProvider>),
}

impl TokenProviderVariant {
    async fn token(&self, scopes: &[&str]) -> Result<Arc<gcp_auth::Token>, gcp_auth::Error> {
        match self {
            TokenProviderVariant::ServiceAccount(sa) => sa.token(scopes).await,
            TokenProviderVariant::Default(provider) => provider.token(scopes).await,
        }
    }
}

/// Client bound to a single spreadsheet.
///
/// Cloning is cheap; the HTTP client and token provider are shared.
#[derive(Clone)]
pub struct Client {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Target spreadsheet ID
    spreadsheet_id: String,
    /// Token provider for authentication
    token_provider: TokenProviderVariant,
    /// API base, overridable for tests and proxies
    base_url: String,
}

impl Client {
    /// Create a new client from a service account JSON file.
    pub async fn from_service_account(
        credentials_path: impl AsRef<Path>,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        let path = credentials_path.as_ref();

        let service_account =
            CustomServiceAccount::from_file(path).map_err(|e| SheetsError::CredentialsError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::with_provider(
            TokenProviderVariant::ServiceAccount(Arc::new(service_account)),
            spreadsheet_id,
        )
    }

    /// Create a new client from a service account JSON string.
    pub async fn from_service_account_json(
        credentials_json: &str,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        let service_account = CustomServiceAccount::from_json(credentials_json).map_err(|e| {
            SheetsError::AuthenticationError(format!("Failed to parse credentials JSON: {}", e))
        })?;

        Self::with_provider(
            TokenProviderVariant::ServiceAccount(Arc::new(service_account)),
            spreadsheet_id,
        )
    }

    /// Create a new client from a bare client email and PEM private key.
    ///
    /// Keys copied out of environment variables usually carry literal `\n`
    /// sequences instead of newlines; those are expanded before use.
    pub async fn from_key_parts(
        client_email: &str,
        private_key: &str,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        if client_email.trim().is_empty() || private_key.trim().is_empty() {
            return Err(SheetsError::ConfigError(
                "client email and private key are both required".to_string(),
            ));
        }

        let credentials = serde_json::json!({
            "type": "service_account",
            "client_email": client_email.trim(),
            "private_key": private_key.replace("\\n", "\n"),
            "token_uri": GOOGLE_TOKEN_URI,
        });

        Self::from_service_account_json(&credentials.to_string(), spreadsheet_id).await
    }

    /// Create a new client using Application Default Credentials.
    ///
    /// This uses the `GOOGLE_APPLICATION_CREDENTIALS` environment variable
    /// or the default gcloud credentials.
    pub async fn from_env(spreadsheet_id: impl Into<String>) -> Result<Self, SheetsError> {
        let auth_manager = gcp_auth::provider()
            .await
            .map_err(|e| SheetsError::AuthenticationError(e.to_string()))?;

        Self::with_provider(TokenProviderVariant::Default(auth_manager), spreadsheet_id)
    }

    fn with_provider(
        token_provider: TokenProviderVariant,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(SheetsError::ConfigError(
                "spreadsheet id is not set".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(SheetsError::HttpError)?;

        Ok(Self {
            http_client,
            spreadsheet_id,
            token_provider,
            base_url: SHEETS_ENDPOINT.to_string(),
        })
    }

    /// Point the client at a different API base (emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the `values` endpoint URL for a range.
    pub(crate) fn values_url(&self, range: &str, verb: Option<&str>) -> Result<Url, SheetsError> {
        build_values_url(&self.base_url, &self.spreadsheet_id, range, verb)
    }

    /// Get an access token for authentication.
    pub(crate) async fn get_token(&self) -> Result<String, SheetsError> {
        let token = self
            .token_provider
            .token(&[SHEETS_SCOPE])
            .await
            .map_err(|e| SheetsError::AuthenticationError(e.to_string()))?;

        Ok(token.as_str().to_string())
    }

    /// Build headers with authentication.
    pub(crate) async fn build_headers(&self) -> Result<HeaderMap, SheetsError> {
        let token = self.get_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| SheetsError::ConfigError(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// Get the HTTP client.
    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Get the spreadsheet ID.
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }
}

/// Build `{base}/{spreadsheet}/values/{range}[:verb]`.
///
/// The range is pushed as a single path segment so sheet names with
/// spaces or quotes are percent-encoded.
fn build_values_url(
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
    verb: Option<&str>,
) -> Result<Url, SheetsError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| SheetsError::ConfigError(format!("Invalid base URL: {}", e)))?;

    let segment = match verb {
        Some(verb) => format!("{}:{}", range, verb),
        None => range.to_string(),
    };

    url.path_segments_mut()
        .map_err(|_| SheetsError::ConfigError("Base URL cannot be a base".to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&segment);

    Ok(url)
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
