use async_trait::async_trait;
use reqwest::{
    header::ACCEPT,
    multipart::{Form, Part},
    Client,
};
use tracing::debug;

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// A submission ready to go on the wire. All action endpoints are `POST`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub path: String,
    pub body: RequestBody,
}

impl OutboundRequest {
    pub fn json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn multipart(path: impl Into<String>, parts: Vec<FormPart>) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Multipart(parts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<ServerResponse, TransportError>;
}

pub struct HttpTransport {
    http: Client,
    server_url: String,
}

impl HttpTransport {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                filename,
                mime_type,
                bytes,
            } => {
                let mut file = Part::bytes(bytes).file_name(filename);
                if let Some(mime_type) = mime_type {
                    file = file.mime_str(&mime_type)?;
                }
                form.part(name, file)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ServerResponse, TransportError> {
        let url = format!("{}{}", self.server_url, request.path);
        let builder = self.http.post(&url);
        let builder = match request.body {
            RequestBody::Json(body) => builder.header(ACCEPT, "application/json").json(&body),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(%url, status, body_len = body.len(), "submission response received");

        Ok(ServerResponse { status, body })
    }
}
