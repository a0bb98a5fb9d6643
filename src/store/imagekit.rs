use super::{FileStore, FileUpload, StoreError, StoreResult, StoredFile};
use reqwest::Url;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

pub const DEFAULT_UPLOAD_API: &str = "https://upload.imagekit.io/api/v1";
pub const DEFAULT_MEDIA_API: &str = "https://api.imagekit.io/v1";

/// ImageKit media API client. Authenticates with the private key as the
/// basic-auth user name.
pub struct ImageKitStore {
    client: Client,
    private_key: String,
    upload_api: String,
    media_api: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageKitFile {
    file_id: String,
    name: String,
    url: String,
}

impl From<ImageKitFile> for StoredFile {
    fn from(file: ImageKitFile) -> Self {
        StoredFile {
            file_id: file.file_id,
            file_name: file.name,
            url: file.url,
        }
    }
}

impl ImageKitStore {
    pub fn new(private_key: impl Into<String>) -> Self {
        Self::with_endpoints(private_key, DEFAULT_UPLOAD_API, DEFAULT_MEDIA_API)
    }

    pub fn with_endpoints(
        private_key: impl Into<String>,
        upload_api: impl Into<String>,
        media_api: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            private_key: private_key.into(),
            upload_api: upload_api.into().trim_end_matches('/').to_string(),
            media_api: media_api.into().trim_end_matches('/').to_string(),
        }
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .basic_auth(&self.private_key, Some(""))
            .send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Upstream {
            service: "imagekit",
            status: status.as_u16(),
            body,
        })
    }

    fn media_url(&self, path: &str) -> StoreResult<Url> {
        Url::parse(&format!("{}{}", self.media_api, path))
            .map_err(|err| StoreError::UnexpectedResponse(err.to_string()))
    }
}

impl FileStore for ImageKitStore {
    fn upload(&self, upload: FileUpload) -> StoreResult<StoredFile> {
        let part = Part::bytes(upload.bytes).file_name(upload.file_name.clone());
        let form = Form::new()
            .part("file", part)
            .text("fileName", upload.file_name)
            .text("folder", upload.folder)
            .text("useUniqueFileName", "true");
        let url = format!("{}/files/upload", self.upload_api);
        let response = self.send(self.client.post(url).multipart(form))?;
        let file: ImageKitFile = response.json()?;
        Ok(file.into())
    }

    fn delete(&self, file_id: &str) -> StoreResult<()> {
        let mut url = self.media_url("/files")?;
        url.path_segments_mut()
            .map_err(|_| StoreError::UnexpectedResponse("media api cannot be a base".into()))?
            .push(file_id);
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn list(&self, folder: &str) -> StoreResult<Vec<StoredFile>> {
        let mut url = self.media_url("/files")?;
        url.query_pairs_mut()
            .append_pair("path", folder)
            .append_pair("fileType", "all");
        let response = self.send(self.client.get(url))?;
        let files: Vec<ImageKitFile> = response.json()?;
        Ok(files.into_iter().map(StoredFile::from).collect())
    }
}
