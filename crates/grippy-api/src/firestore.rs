// Firestore REST client - only the handful of document operations Grippy needs
use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::firebase::{build_http_client, error_message, FirebaseError, Result};

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// A document with its string fields flattened out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let id = raw.name.rsplit('/').next().unwrap_or_default().to_string();
        // Non-string fields are skipped, nothing we store uses them
        let fields = raw
            .fields
            .into_iter()
            .filter_map(|(k, v)| v.string_value.map(|s| (k, s)))
            .collect();
        Document { id, fields }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct QueryEntry {
    document: Option<RawDocument>,
}

pub(crate) fn parse_document(body: &str) -> Result<Document> {
    let raw: RawDocument = serde_json::from_str(body)?;
    Ok(raw.into())
}

pub(crate) fn parse_list(body: &str) -> Result<Vec<Document>> {
    let list: ListResponse = serde_json::from_str(body)?;
    Ok(list.documents.into_iter().map(Document::from).collect())
}

/// runQuery streams back one entry per match, plus a trailing entry with only
/// a read time when nothing matched
pub(crate) fn parse_query(body: &str) -> Result<Vec<Document>> {
    let entries: Vec<QueryEntry> = serde_json::from_str(body)?;
    Ok(entries
        .into_iter()
        .filter_map(|e| e.document)
        .map(Document::from)
        .collect())
}

pub(crate) fn encode_fields(fields: &[(&str, &str)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in fields {
        map.insert(
            (*name).to_string(),
            serde_json::json!({ "stringValue": value }),
        );
    }
    serde_json::json!({ "fields": map })
}

pub(crate) fn equality_query(collection_id: &str, field: &str, value: &str) -> serde_json::Value {
    serde_json::json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection_id }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": { "stringValue": value }
                }
            }
        }
    })
}

pub struct FirestoreClient {
    client: reqwest::Client,
    project_id: String,
    base_url: String,
}

impl FirestoreClient {
    pub fn new(project_id: String) -> Result<Self> {
        Self::with_base_url(project_id, FIRESTORE_API_BASE.to_string())
    }

    /// For the Firestore emulator
    pub fn with_base_url(project_id: String, base_url: String) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            project_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url,
            urlencoding::encode(&self.project_id)
        )
    }

    /// Create a document with an auto-generated id under `parent/collection_id`
    pub async fn create_document(
        &self,
        id_token: &str,
        parent: &str,
        collection_id: &str,
        fields: &[(&str, &str)],
    ) -> Result<Document> {
        let url = format!("{}/{}/{}", self.documents_root(), parent, collection_id);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(id_token)
            .json(&encode_fields(fields))
            .send()
            .await?;

        let body = check_response(response, &url).await?;
        parse_document(&body)
    }

    /// All documents in `parent/collection_id` whose `field` equals `value`
    pub async fn query_by_field(
        &self,
        id_token: &str,
        parent: &str,
        collection_id: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let url = format!("{}/{}:runQuery", self.documents_root(), parent);
        debug!("POST {} ({} == {})", url, field, value);

        let response = self
            .client
            .post(&url)
            .bearer_auth(id_token)
            .json(&equality_query(collection_id, field, value))
            .send()
            .await?;

        let body = check_response(response, &url).await?;
        parse_query(&body)
    }

    /// Delete by id. Fails with `NotFound` if the document does not exist.
    pub async fn delete_document(
        &self,
        id_token: &str,
        parent: &str,
        collection_id: &str,
        id: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/{}/{}/{}",
            self.documents_root(),
            parent,
            collection_id,
            urlencoding::encode(id)
        );
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(id_token)
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;

        check_response(response, &url).await?;
        Ok(())
    }

    pub async fn list_documents(
        &self,
        id_token: &str,
        parent: &str,
        collection_id: &str,
        page_size: usize,
    ) -> Result<Vec<Document>> {
        let url = format!("{}/{}/{}", self.documents_root(), parent, collection_id);
        debug!("GET {} pageSize={}", url, page_size);

        let response = self
            .client
            .get(&url)
            .bearer_auth(id_token)
            .query(&[("pageSize", page_size.to_string())])
            .send()
            .await?;

        let body = check_response(response, &url).await?;
        parse_list(&body)
    }
}

async fn check_response(response: reqwest::Response, url: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FirebaseError::NotFound(url.to_string()));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(FirebaseError::Auth(
            error_message(&body).unwrap_or_else(|| "Permission denied".to_string()),
        ));
    }

    if !status.is_success() {
        return Err(FirebaseError::RequestFailed {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or(body),
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_takes_id_from_name() {
        let body = r#"{
            "name": "projects/p/databases/(default)/documents/favourite/uid-1/gifs/doc42",
            "fields": {"url": {"stringValue": "https://media.giphy.com/x.gif"}, "n": {"integerValue": "3"}},
            "createTime": "2024-01-01T00:00:00Z"
        }"#;
        let doc = parse_document(body).unwrap();
        assert_eq!(doc.id, "doc42");
        assert_eq!(doc.field("url"), Some("https://media.giphy.com/x.gif"));
        assert_eq!(doc.field("n"), None);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_list("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_query_skips_read_time_only_entries() {
        let body = r#"[
            {"document": {"name": "a/b/gifs/one", "fields": {"url": {"stringValue": "u1"}}}, "readTime": "t"},
            {"readTime": "t"}
        ]"#;
        let docs = parse_query(body).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "one");
    }

    #[test]
    fn test_encode_fields() {
        let body = encode_fields(&[("url", "https://x")]);
        assert_eq!(body["fields"]["url"]["stringValue"], "https://x");
    }

    #[test]
    fn test_equality_query_shape() {
        let q = equality_query("gifs", "url", "https://x");
        let filter = &q["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(q["structuredQuery"]["from"][0]["collectionId"], "gifs");
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["field"]["fieldPath"], "url");
        assert_eq!(filter["value"]["stringValue"], "https://x");
    }
}
