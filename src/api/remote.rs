//! Purpose: Provide the HTTP implementation of the session transport.
//! Exports: `HttpClient`.
//! Role: Maps each `Transport` method onto one remote endpoint.
//! Invariants: Request/response envelopes are owned here, not by the core.
//! Invariants: Network and non-2xx failures both carry `ErrorKind::Transport`.
#![allow(clippy::result_large_err)]

use super::transport::{ApiResult, Document, Filter, Outcome, Transport};
use crate::core::error::{Error, ErrorKind};
use crate::core::listing::{DatabaseInfo, DatabaseListing, RoleAssignments};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use url::Url;

#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

struct HttpClientInner {
    base_url: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug)]
struct AcceptAllServerCertVerifier;

impl ServerCertVerifier for AcceptAllServerCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[derive(Deserialize)]
struct ListingEnvelope {
    databases: DatabaseListing,
}

#[derive(Deserialize)]
struct RolesEnvelope {
    roles: RoleAssignments,
}

#[derive(Deserialize)]
struct EmptyGroupEnvelope {
    empty: Vec<DatabaseInfo>,
}

#[derive(Deserialize)]
struct DocumentsEnvelope {
    documents: Vec<Document>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    message: Option<String>,
    hint: Option<String>,
    database: Option<String>,
    collection: Option<String>,
}

#[derive(Serialize)]
struct DatabaseRequest<'a> {
    database: &'a str,
}

#[derive(Serialize)]
struct CollectionRequest<'a> {
    database: &'a str,
    collection: &'a str,
}

#[derive(Serialize)]
struct FindRequest<'a> {
    database: &'a str,
    collection: &'a str,
    filter: &'a Filter,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(HttpClientInner {
                base_url,
                token: None,
                agent,
            }),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.token = Some(token.into());
        } else {
            self.inner = Arc::new(HttpClientInner {
                base_url: self.inner.base_url.clone(),
                token: Some(token.into()),
                agent: self.inner.agent.clone(),
            });
        }
        self
    }

    pub fn with_tls_ca_file(self, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "failed to read TLS CA/certificate file {}",
                    path.display()
                ))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "failed to parse TLS CA/certificate file {}",
                        path.display()
                    ))
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no certificates"));
        }

        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut root_store = rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no parsable certificates"));
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let agent = ureq::builder().tls_config(Arc::new(tls_config)).build();
        Ok(self.with_agent(agent))
    }

    pub fn with_tls_skip_verify(self) -> Self {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let tls_config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllServerCertVerifier))
            .with_no_client_auth();
        let agent = ureq::builder().tls_config(Arc::new(tls_config)).build();
        self.with_agent(agent)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn with_agent(mut self, agent: ureq::Agent) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.agent = agent;
        } else {
            self.inner = Arc::new(HttpClientInner {
                base_url: self.inner.base_url.clone(),
                token: self.inner.token.clone(),
                agent,
            });
        }
        self
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        let mut request = self.inner.agent.request(method, url.as_str());
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: &T) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        tracing::debug!(%method, url = %url, "remote request");
        let request = self.request(method, url).set("Accept", "application/json");
        let response = if method == "GET" {
            request.call()
        } else {
            let payload = serde_json::to_string(body).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode request json")
                    .with_source(err)
            })?;
            request
                .set("Content-Type", "application/json")
                .send_string(&payload)
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.inner.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base")
            })?;
            path.clear();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

impl Transport for HttpClient {
    fn fetch_listing(&self) -> ApiResult<DatabaseListing> {
        let url = self.endpoint(&["db"])?;
        let envelope: ListingEnvelope = self.request_json("GET", &url, &())?;
        Ok(envelope.databases)
    }

    fn fetch_roles(&self) -> ApiResult<RoleAssignments> {
        let url = self.endpoint(&["db", "roles"])?;
        let envelope: RolesEnvelope = self.request_json("GET", &url, &())?;
        Ok(envelope.roles)
    }

    fn create_database(&self, database: &str, collection: &str) -> ApiResult<Vec<DatabaseInfo>> {
        let url = self.endpoint(&["db", "create"])?;
        let payload = CollectionRequest {
            database,
            collection,
        };
        let envelope: EmptyGroupEnvelope = self
            .request_json("POST", &url, &payload)
            .map_err(|err| err.with_database(database))?;
        Ok(envelope.empty)
    }

    fn drop_database(&self, database: &str) -> ApiResult<Outcome> {
        let url = self.endpoint(&["db", "drop"])?;
        let payload = DatabaseRequest { database };
        self.request_json("POST", &url, &payload)
            .map_err(|err| err.with_database(database))
    }

    fn create_collection(&self, database: &str, collection: &str) -> ApiResult<Outcome> {
        let url = self.endpoint(&["collection", "create"])?;
        let payload = CollectionRequest {
            database,
            collection,
        };
        self.request_json("POST", &url, &payload)
            .map_err(|err| err.with_database(database).with_collection(collection))
    }

    fn fetch_page(&self, database: &str, collection: &str, page: u64) -> ApiResult<Vec<Document>> {
        let mut url = self.endpoint(&["collection", "documents"])?;
        url.query_pairs_mut()
            .append_pair("database", database)
            .append_pair("collection", collection)
            .append_pair("page", &page.to_string());
        let envelope: DocumentsEnvelope = self
            .request_json("GET", &url, &())
            .map_err(|err| err.with_database(database).with_collection(collection))?;
        Ok(envelope.documents)
    }

    fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> ApiResult<Vec<Document>> {
        let url = self.endpoint(&["documents", "find"])?;
        let payload = FindRequest {
            database,
            collection,
            filter,
        };
        let envelope: DocumentsEnvelope = self
            .request_json("POST", &url, &payload)
            .map_err(|err| err.with_database(database).with_collection(collection))?;
        Ok(envelope.documents)
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(status, envelope.error);
    }
    Error::new(ErrorKind::Transport).with_message(format!("remote error status {status}"))
}

fn error_from_remote(status: u16, remote: RemoteError) -> Error {
    let mut err = Error::new(ErrorKind::Transport)
        .with_message(format!("remote error status {status}"));
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(database) = remote.database {
        err = err.with_database(database);
    }
    if let Some(collection) = remote.collection {
        err = err.with_collection(collection);
    }
    err
}
