//! REST implementation of [`Backend`]

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use super::{Backend, Query};
use crate::auth::{SIGNED_OUT, SessionFallback};
use crate::config::{BackendConfig, MediaConfig};
use crate::data::{Account, DocumentList, MediaFile, Session, StoredFile};
use crate::error::AppError;
use crate::metrics::{GATEWAY_REQUEST_DURATION_SECONDS, GATEWAY_REQUESTS_TOTAL};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_HEADER: &str = "X-Fallback-Cookies";

#[derive(Deserialize)]
struct ListBody {
    total: u64,
    documents: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Platform client over HTTPS
///
/// Carries the session in the fallback-cookie header and persists every
/// value the platform hands back.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    database_id: String,
    fallback: SessionFallback,
    cookies: RwLock<Option<String>>,
}

impl HttpBackend {
    /// Build the client and pick up the last persisted session
    pub async fn new(config: &BackendConfig, fallback: SessionFallback) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Reactgram/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        let cookies = fallback
            .load()
            .await?
            .filter(|value| value != SIGNED_OUT && !value.is_empty());

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            fallback,
            cookies: RwLock::new(cookies),
        })
    }

    fn documents_path(&self, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection_id
        )
    }

    fn document_path(&self, collection_id: &str, document_id: &str) -> String {
        format!("{}/{}", self.documents_path(collection_id), document_id)
    }

    fn current_cookies(&self) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(PROJECT_HEADER, &self.project_id);

        match self.current_cookies() {
            Some(cookies) => builder.header(FALLBACK_HEADER, cookies),
            None => builder,
        }
    }

    /// Public URL with the project id in the query string
    fn public_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| AppError::Config(format!("invalid platform URL: {}", e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("project", &self.project_id);
        Ok(url)
    }

    async fn send(&self, service: &'static str, builder: RequestBuilder) -> Result<Response, AppError> {
        let timer = GATEWAY_REQUEST_DURATION_SECONDS
            .with_label_values(&[service])
            .start_timer();
        let result = builder.send().await;
        timer.observe_duration();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                GATEWAY_REQUESTS_TOTAL
                    .with_label_values(&[service, "error"])
                    .inc();
                return Err(e.into());
            }
        };

        let status = response.status();
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[service, status.as_str()])
            .inc();
        self.capture_fallback(&response).await;

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::debug!(
            service,
            status = status.as_u16(),
            message = %message,
            "Platform request failed"
        );
        Err(AppError::from_status(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, AppError> {
        let response = self.send(service, builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn capture_fallback(&self, response: &Response) {
        let Some(value) = response
            .headers()
            .get(FALLBACK_HEADER)
            .and_then(|value| value.to_str().ok())
        else {
            return;
        };

        let value = value.to_string();
        {
            let mut cookies = self
                .cookies
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *cookies = (value != SIGNED_OUT).then(|| value.clone());
        }

        if let Err(e) = self.fallback.store(&value).await {
            tracing::warn!(error = %e, "Failed to persist session fallback");
        }
    }

    async fn forget_session(&self) {
        *self
            .cookies
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;

        if let Err(e) = self.fallback.mark_signed_out().await {
            tracing::warn!(error = %e, "Failed to persist sign-out");
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError> {
        let builder = self
            .request(Method::POST, &self.documents_path(collection_id))
            .json(&json!({ "documentId": document_id, "data": data }));
        self.send_json("databases", builder).await
    }

    async fn get_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Value, AppError> {
        let builder = self.request(Method::GET, &self.document_path(collection_id, document_id));
        self.send_json("databases", builder).await
    }

    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError> {
        let builder = self
            .request(Method::PATCH, &self.document_path(collection_id, document_id))
            .json(&json!({ "data": data }));
        self.send_json("databases", builder).await
    }

    async fn delete_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<(), AppError> {
        let builder = self.request(Method::DELETE, &self.document_path(collection_id, document_id));
        self.send("databases", builder).await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList<Value>, AppError> {
        let params = queries
            .iter()
            .map(|query| Ok(("queries[]", query.encode()?)))
            .collect::<Result<Vec<_>, AppError>>()?;

        let builder = self
            .request(Method::GET, &self.documents_path(collection_id))
            .query(&params);
        let body: ListBody = self.send_json("databases", builder).await?;

        Ok(DocumentList {
            total: body.total,
            documents: body.documents,
        })
    }

    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, AppError> {
        let builder = self.request(Method::POST, "/account").json(&json!({
            "userId": account_id,
            "email": email,
            "password": password,
            "name": name,
        }));
        self.send_json("account", builder).await
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let builder = self
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        self.send_json("account", builder).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        let builder = self.request(Method::DELETE, &format!("/account/sessions/{}", session_id));
        self.send("account", builder).await?;
        self.forget_session().await;
        Ok(())
    }

    async fn get_account(&self) -> Result<Account, AppError> {
        let builder = self.request(Method::GET, "/account");
        self.send_json("account", builder).await
    }

    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: MediaFile,
    ) -> Result<StoredFile, AppError> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let builder = self
            .request(Method::POST, &format!("/storage/buckets/{}/files", bucket_id))
            .multipart(form);
        self.send_json("storage", builder).await
    }

    fn file_preview_url(
        &self,
        bucket_id: &str,
        file_id: &str,
        preview: &MediaConfig,
    ) -> Result<Url, AppError> {
        self.public_url(
            &format!("/storage/buckets/{}/files/{}/preview", bucket_id, file_id),
            &[
                ("width", preview.preview_width.to_string()),
                ("height", preview.preview_height.to_string()),
                ("gravity", preview.preview_gravity.clone()),
                ("quality", preview.preview_quality.to_string()),
            ],
        )
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<(), AppError> {
        let builder = self.request(
            Method::DELETE,
            &format!("/storage/buckets/{}/files/{}", bucket_id, file_id),
        );
        self.send("storage", builder).await?;
        Ok(())
    }

    fn initials_avatar_url(&self, name: &str) -> Result<Url, AppError> {
        self.public_url("/avatars/initials", &[("name", name.to_string())])
    }
}

/// Message from a platform error body, or the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.message)
        .unwrap_or_else(|_| body.to_string())
}
