use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GatewayError, Result};
use crate::model::{
    Category, Comment, CommentEdit, NewComment, NewPost, Post, PostEdit, VoteDirection,
    VoteRequest,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("readable-tui/{}", crate::VERSION),
            timeout: Duration::from_secs(20),
            headers: BTreeMap::new(),
            http_client: None,
        }
    }
}

/// Blocking client for the board's REST server.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct CategoriesEnvelope {
    categories: Vec<Category>,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("board client user agent required");
        }
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("parse board url {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("board url {} cannot hold paths", config.base_url);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("build http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            headers,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        let envelope: CategoriesEnvelope = self.get(&["categories"])?;
        Ok(envelope.categories)
    }

    pub fn posts(&self) -> Result<Vec<Post>> {
        self.get(&["posts"])
    }

    pub fn category_posts(&self, category: &str) -> Result<Vec<Post>> {
        self.get(&[category, "posts"])
    }

    pub fn post(&self, id: &str) -> Result<Post> {
        self.get(&["posts", id])
    }

    /// The server answers `{}` instead of an error for some bad payloads, so
    /// a created post without an id counts as a rejection.
    pub fn create_post(&self, post: &NewPost) -> Result<Post> {
        let created: CreatedRecord<Post> = self.send(Method::POST, &["posts"], Some(post))?;
        created
            .into_record()
            .ok_or_else(|| GatewayError::Rejected("created post carries no id".into()))
    }

    pub fn update_post(&self, id: &str, edit: &PostEdit) -> Result<Post> {
        self.send(Method::PUT, &["posts", id], Some(edit))
    }

    pub fn delete_post(&self, id: &str) -> Result<Post> {
        self.send::<(), _>(Method::DELETE, &["posts", id], None)
    }

    pub fn vote_post(&self, id: &str, direction: VoteDirection) -> Result<Post> {
        let body = VoteRequest { option: direction };
        self.send(Method::POST, &["posts", id], Some(&body))
    }

    pub fn post_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.get(&["posts", post_id, "comments"])
    }

    pub fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let created: CreatedRecord<Comment> =
            self.send(Method::POST, &["comments"], Some(comment))?;
        created
            .into_record()
            .ok_or_else(|| GatewayError::Rejected("created comment carries no id".into()))
    }

    pub fn update_comment(&self, id: &str, edit: &CommentEdit) -> Result<Comment> {
        self.send(Method::PUT, &["comments", id], Some(edit))
    }

    pub fn delete_comment(&self, id: &str) -> Result<Comment> {
        self.send::<(), _>(Method::DELETE, &["comments", id], None)
    }

    pub fn vote_comment(&self, id: &str, direction: VoteDirection) -> Result<Comment> {
        let body = VoteRequest { option: direction };
        self.send(Method::POST, &["comments", id], Some(&body))
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.send::<(), T>(Method::GET, segments, None)
    }

    fn send<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "board request");
        let mut req = self.prepare(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send()?;
        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            tracing::warn!(%method, %url, %status, "board request failed");
            return Err(GatewayError::Status { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn prepare(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .headers(self.headers.clone())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Create endpoints answer with the stored record, or with an empty object
/// when the payload was refused.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreatedRecord<T> {
    Record(T),
    Empty(serde_json::Value),
}

impl<T> CreatedRecord<T> {
    fn into_record(self) -> Option<T> {
        match self {
            CreatedRecord::Record(record) => Some(record),
            CreatedRecord::Empty(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_user_agent() {
        let config = ClientConfig {
            user_agent: "  ".into(),
            ..ClientConfig::default()
        };
        assert!(Client::new(config).is_err());
    }

    #[test]
    fn rejects_invalid_header() {
        let mut config = ClientConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        assert!(Client::new(config).is_err());
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let client = Client::new(ClientConfig {
            base_url: "http://localhost:3001/api".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        let url = client.endpoint(&["web dev", "posts"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/web%20dev/posts");
    }

    #[test]
    fn created_record_without_id_is_empty() {
        let created: CreatedRecord<Post> = serde_json::from_str("{}").unwrap();
        assert!(created.into_record().is_none());
        let created: CreatedRecord<Post> =
            serde_json::from_str(r#"{"id":"x","title":"t"}"#).unwrap();
        assert_eq!(created.into_record().map(|p| p.id), Some("x".to_string()));
    }
}
