//! Google Sheets implementation of [`SheetStore`].
//!
//! The spreadsheet is looked up by document name through the Drive v3 files
//! listing, then addressed by id through the Sheets v4 REST API:
//!
//! - `GET  spreadsheets/{id}?fields=sheets.properties` to find a tab
//! - `POST spreadsheets/{id}:batchUpdate` with `addSheet` to create one
//! - `GET  spreadsheets/{id}/values/{range}` to read rows
//! - `POST spreadsheets/{id}/values/{range}:append` to append a row
//! - `PUT  spreadsheets/{id}/values/{range}` to update a cell
//!
//! Values are written with `valueInputOption=RAW`.

use super::auth::TokenProvider;
use super::{
    SheetStore, SheetsError, TAB_COLUMNS, TAB_ROWS, Tab, column_letter, pad_rows, quote_tab,
};
use crate::config::SheetsConfig;
use crate::models::{HEADER, SummaryRow};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Reply>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    add_sheet: Option<AddSheetReply>,
}

#[derive(Deserialize)]
struct AddSheetReply {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// A spreadsheet opened through the Google APIs.
#[derive(Debug)]
pub struct GoogleSheets {
    http: reqwest::Client,
    auth: TokenProvider,
    sheets_api_base: String,
    spreadsheet_id: String,
}

/// Reject non-success responses, keeping the body for the error message.
async fn check(res: Response) -> Result<Response, SheetsError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        let body = res.text().await.unwrap_or_default();
        Err(SheetsError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl GoogleSheets {
    /// Authorize with the service account and open the spreadsheet by name.
    #[instrument(level = "info", skip_all, fields(spreadsheet = %config.spreadsheet))]
    pub async fn open(http: reqwest::Client, config: &SheetsConfig) -> Result<Self, SheetsError> {
        let auth = TokenProvider::new(http.clone(), config.credentials.clone());
        let token = auth.access_token().await?;

        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            config.spreadsheet.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let res = http
            .get(format!("{}/files", config.drive_api_base.trim_end_matches('/')))
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id)"), ("pageSize", "1")])
            .send()
            .await?;
        let list: FileList = check(res).await?.json().await?;

        let spreadsheet_id = list
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(config.spreadsheet.clone()))?;
        info!(%spreadsheet_id, "Opened spreadsheet");

        Ok(Self {
            http,
            auth,
            sheets_api_base: config.sheets_api_base.trim_end_matches('/').to_string(),
            spreadsheet_id,
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.sheets_api_base, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        check(request.bearer_auth(token).send().await?).await
    }

    async fn find_tab(&self, name: &str) -> Result<Option<Tab>, SheetsError> {
        let meta: SpreadsheetMeta = self
            .send(
                self.http
                    .get(self.spreadsheet_url())
                    .query(&[("fields", "sheets.properties")]),
            )
            .await?
            .json()
            .await?;

        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == name)
            .map(|p| Tab {
                title: p.title,
                sheet_id: p.sheet_id,
            }))
    }

    async fn add_tab(&self, name: &str) -> Result<Tab, SheetsError> {
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": name,
                        "gridProperties": { "rowCount": TAB_ROWS, "columnCount": TAB_COLUMNS }
                    }
                }
            }]
        });
        let res: BatchUpdateResponse = self
            .send(
                self.http
                    .post(format!("{}:batchUpdate", self.spreadsheet_url()))
                    .json(&body),
            )
            .await?
            .json()
            .await?;

        let properties = res
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|a| a.properties)
            .ok_or(SheetsError::Malformed("batchUpdate reply without addSheet"))?;

        Ok(Tab {
            title: properties.title,
            sheet_id: properties.sheet_id,
        })
    }

    async fn append_cells(&self, tab: &Tab, cells: Vec<String>) -> Result<(), SheetsError> {
        let range = format!("{}!A1", quote_tab(&tab.title));
        self.send(
            self.http
                .post(format!("{}:append", self.values_url(&range)))
                .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                .json(&json!({ "values": [cells] })),
        )
        .await?;
        Ok(())
    }
}

impl SheetStore for GoogleSheets {
    #[instrument(level = "info", skip_all, fields(%name))]
    async fn get_or_create_tab(&self, name: &str) -> Result<Tab, SheetsError> {
        if let Some(tab) = self.find_tab(name).await? {
            info!(sheet_id = tab.sheet_id, "Opened existing tab");
            return Ok(tab);
        }

        let tab = self.add_tab(name).await?;
        self.append_cells(&tab, HEADER.iter().map(|h| h.to_string()).collect())
            .await?;
        info!(sheet_id = tab.sheet_id, "Created tab with header");
        Ok(tab)
    }

    async fn read_all_rows(&self, tab: &Tab) -> Result<Vec<Vec<String>>, SheetsError> {
        let values: ValueRange = self
            .send(self.http.get(self.values_url(&quote_tab(&tab.title))))
            .await?
            .json()
            .await?;
        debug!(tab = %tab.title, rows = values.values.len(), "Read tab");
        Ok(pad_rows(values.values))
    }

    async fn append_row(&self, tab: &Tab, row: &SummaryRow) -> Result<(), SheetsError> {
        self.append_cells(tab, row.to_cells()).await
    }

    async fn update_cell(
        &self,
        tab: &Tab,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), SheetsError> {
        let range = format!("{}!{}{}", quote_tab(&tab.title), column_letter(column), row);
        self.send(
            self.http
                .put(self.values_url(&range))
                .query(&[("valueInputOption", "RAW")])
                .json(&json!({ "range": range, "values": [[value]] })),
        )
        .await?;
        Ok(())
    }
}
