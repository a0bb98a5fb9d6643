use super::{Row, SheetInfo, StoreError, StoreResult, TabularStore};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 values/batchUpdate client. Values are written RAW.
pub struct GoogleSheetsStore {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_SHEETS_API, spreadsheet_id, access_token)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        }
    }

    fn spreadsheet_url(&self, suffix: &str) -> StoreResult<Url> {
        let raw = format!("{}/{}{}", self.api_base, self.spreadsheet_id, suffix);
        Url::parse(&raw).map_err(|err| StoreError::UnexpectedResponse(err.to_string()))
    }

    /// `.../values/<range><action>`, with the range percent-encoded as a
    /// single path segment.
    fn values_url(&self, range: &str, action: &str) -> StoreResult<Url> {
        let mut url = self.spreadsheet_url("")?;
        url.path_segments_mut()
            .map_err(|_| StoreError::UnexpectedResponse("api base cannot be a base".into()))?
            .push("values")
            .push(&format!("{range}{action}"));
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Upstream {
            service: "sheets",
            status: status.as_u16(),
            body,
        })
    }

    fn batch_update(&self, requests: Value) -> StoreResult<Value> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let response = self.send(
            self.client
                .post(url)
                .json(&json!({ "requests": requests })),
        )?;
        Ok(response.json()?)
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl TabularStore for GoogleSheetsStore {
    fn read_range(&self, range: &str) -> StoreResult<Vec<Row>> {
        let url = self.values_url(range, "")?;
        let response = self.send(self.client.get(url))?;
        let body: ValueRange = response.json()?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    fn update_range(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send(
            self.client
                .put(url)
                .json(&json!({ "range": range, "values": values })),
        )?;
        Ok(())
    }

    fn append_rows(&self, range: &str, values: &[Row]) -> StoreResult<()> {
        let mut url = self.values_url(range, ":append")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send(self.client.post(url).json(&json!({ "values": values })))?;
        Ok(())
    }

    fn clear_range(&self, range: &str) -> StoreResult<()> {
        let url = self.values_url(range, ":clear")?;
        self.send(self.client.post(url).json(&json!({})))?;
        Ok(())
    }

    fn create_sheet(&self, title: &str) -> StoreResult<SheetInfo> {
        let reply = self.batch_update(json!([
            { "addSheet": { "properties": { "title": title } } }
        ]))?;
        let properties = reply
            .pointer("/replies/0/addSheet/properties")
            .cloned()
            .ok_or_else(|| StoreError::UnexpectedResponse("addSheet reply missing".into()))?;
        let properties: SheetProperties = serde_json::from_value(properties)?;
        Ok(SheetInfo {
            sheet_id: properties.sheet_id,
            title: properties.title,
        })
    }

    fn list_sheets(&self) -> StoreResult<Vec<SheetInfo>> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let response = self.send(self.client.get(url))?;
        let info: SpreadsheetInfo = response.json()?;
        Ok(info
            .sheets
            .into_iter()
            .map(|entry| SheetInfo {
                sheet_id: entry.properties.sheet_id,
                title: entry.properties.title,
            })
            .collect())
    }

    fn delete_sheet(&self, sheet_id: i64) -> StoreResult<()> {
        self.batch_update(json!([{ "deleteSheet": { "sheetId": sheet_id } }]))?;
        Ok(())
    }
}
