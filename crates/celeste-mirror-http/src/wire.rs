use serde::{Deserialize, Serialize};

/// Response from the storage backend's listing endpoint.
/// `GET {base}/files/{category}`
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub files: Vec<String>,
}

/// `POST {base}/files/{category}/delete`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub file_names: &'a [String],
}

/// `POST {base}/files/{category}/fetch`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest<'a> {
    pub file_name: &'a str,
    pub url: &'a str,
}
