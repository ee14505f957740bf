//! Google Sheets access through the v4 REST API, authenticated with a
//! service-account key (signed JWT exchanged for an OAuth access token).

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tokio::sync::Mutex;

use crate::error::RemoteError;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
/// Let Sheets parse values the way a user typing them would, so ranks and
/// totals land as numbers.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";
const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

/// The spreadsheet operations the publisher needs.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Open the spreadsheet by id and confirm the named worksheet exists.
    async fn open_worksheet(&self, spreadsheet_id: &str, worksheet: &str) -> Result<(), RemoteError>;

    async fn clear(&self, spreadsheet_id: &str, worksheet: &str) -> Result<(), RemoteError>;

    /// Write `rows` starting at the worksheet's top-left cell.
    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        rows: &[Vec<String>],
    ) -> Result<(), RemoteError>;

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        row: &[String],
    ) -> Result<(), RemoteError>;

    /// Every non-empty row of the worksheet, header included, as displayed text.
    async fn read_rows(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct GoogleSheetsClient {
    client: Client,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsClient {
    pub fn from_key_file(path: &Path) -> Result<Self, RemoteError> {
        if !path.exists() {
            return Err(RemoteError::Credentials(format!(
                "service account key not found at {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        tracing::info!("Loaded Google service account {}", key.client_email);

        Ok(Self {
            client: Client::new(),
            key,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, RemoteError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - 60 > now {
                return Ok(token.value.clone());
            }
        }

        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Credentials(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::info!("Authenticated Google Sheets API client.");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/<id>/values/<range><suffix>`
    fn values_url(spreadsheet_id: &str, range: &str, suffix: &str) -> Result<Url, RemoteError> {
        let mut url = spreadsheet_url(spreadsheet_id)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Credentials("invalid Sheets API base URL".into()))?
            .push("values")
            .push(&format!("{}{}", range, suffix));
        Ok(url)
    }

    /// Values URL for a write, with the input option set.
    fn write_url(spreadsheet_id: &str, range: &str, suffix: &str) -> Result<Url, RemoteError> {
        let mut url = Self::values_url(spreadsheet_id, range, suffix)?;
        url.query_pairs_mut().append_pair("valueInputOption", VALUE_INPUT_OPTION);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api { status, body })
    }
}

fn spreadsheet_url(spreadsheet_id: &str) -> Result<Url, RemoteError> {
    let base = Url::parse(SHEETS_API)
        .map_err(|e| RemoteError::Credentials(format!("invalid Sheets API base URL: {}", e)))?;
    base.join(spreadsheet_id)
        .map_err(|e| RemoteError::Credentials(format!("invalid spreadsheet id: {}", e)))
}

/// A1 range covering a whole worksheet, quoted so names with spaces work.
pub fn worksheet_range(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

#[async_trait]
impl SheetsClient for GoogleSheetsClient {
    async fn open_worksheet(&self, spreadsheet_id: &str, worksheet: &str) -> Result<(), RemoteError> {
        let token = self.access_token().await?;
        let mut url = spreadsheet_url(spreadsheet_id)?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

        let response = self.client.get(url).bearer_auth(&token).send().await?;
        let meta: SpreadsheetMeta = Self::check(response).await?.json().await?;

        if meta.sheets.iter().any(|s| s.properties.title == worksheet) {
            Ok(())
        } else {
            Err(RemoteError::WorksheetNotFound(worksheet.to_string()))
        }
    }

    async fn clear(&self, spreadsheet_id: &str, worksheet: &str) -> Result<(), RemoteError> {
        let token = self.access_token().await?;
        let url = Self::values_url(spreadsheet_id, &worksheet_range(worksheet), ":clear")?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        rows: &[Vec<String>],
    ) -> Result<(), RemoteError> {
        let token = self.access_token().await?;
        let range = worksheet_range(worksheet);
        let url = Self::write_url(spreadsheet_id, &range, "")?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&token)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        row: &[String],
    ) -> Result<(), RemoteError> {
        let token = self.access_token().await?;
        let range = worksheet_range(worksheet);
        let mut url = Self::write_url(spreadsheet_id, &range, ":append")?;
        url.query_pairs_mut().append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(&token)
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn read_rows(&self, spreadsheet_id: &str, worksheet: &str) -> Result<Vec<Vec<String>>, RemoteError> {
        let token = self.access_token().await?;
        let url = Self::values_url(spreadsheet_id, &worksheet_range(worksheet), "")?;

        let response = self.client.get(url).bearer_auth(&token).send().await?;
        let range: ValueRange = Self::check(response).await?.json().await?;
        Ok(cell_strings(range.values))
    }
}

/// Cell values as text; numbers and booleans keep their JSON spelling.
fn cell_strings(values: Vec<Vec<serde_json::Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(text) => text,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worksheet_range_quotes_names() {
        assert_eq!(worksheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(worksheet_range("Bob's Run Log"), "'Bob''s Run Log'");
    }

    #[test]
    fn test_values_url() {
        let url = GoogleSheetsClient::values_url("abc123", "'Run_Log'", ":append").unwrap();
        assert!(url.as_str().starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc123/values/"));
        assert!(url.as_str().ends_with(":append"));
    }

    #[test]
    fn test_writes_let_sheets_parse_numbers() {
        let url = GoogleSheetsClient::write_url("abc123", "'Sheet1'", ":append").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("valueInputOption".to_string(), "USER_ENTERED".to_string())]);
    }

    #[test]
    fn test_value_range_cells_become_text() {
        let body = r#"{"range":"Run_Log!A1:E2","majorDimension":"ROWS",
            "values":[["Pipeline Name","Duration"],["NFL Matchup Pipeline",12.5,true]]}"#;
        let range: ValueRange = serde_json::from_str(body).unwrap();
        assert_eq!(
            cell_strings(range.values),
            vec![
                vec!["Pipeline Name", "Duration"],
                vec!["NFL Matchup Pipeline", "12.5", "true"],
            ]
        );

        let empty: ValueRange = serde_json::from_str(r#"{"range":"Run_Log!A1:Z1000"}"#).unwrap();
        assert!(empty.values.is_empty());
    }

    #[test]
    fn test_missing_key_file() {
        let err = GoogleSheetsClient::from_key_file(Path::new("/nonexistent/credentials.json"))
            .err()
            .unwrap();
        assert!(matches!(err, RemoteError::Credentials(_)));
    }
}
