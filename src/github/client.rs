//! GitHub REST contents API client

use base64::Engine;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ContentApi, GitHubUser, RemoteFile};
use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::helpers::encode_path;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Client for one repository branch, authenticated with a personal access token
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl GitHubClient {
    /// Create a client for the configured repository
    pub fn new(config: &GitHubConfig, token: &str, timeout: Duration) -> Result<Self> {
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(Error::Config(
                "github.owner and github.repo must be set in _config.yml".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitpost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: token.to_string(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            self.owner,
            self.repo,
            encode_path(path)
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::ACCEPT, ACCEPT)
    }

    /// Fetch the account the token belongs to
    pub async fn current_user(&self) -> Result<GitHubUser> {
        let resp = self
            .request(reqwest::Method::GET, &format!("{}/user", self.api_url))
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized("invalid token".to_string()));
        }
        let resp = check(resp).await?;
        Ok(resp.json().await?)
    }
}

impl ContentApi for GitHubClient {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        let resp = self
            .request(reqwest::Method::GET, &self.contents_url(path))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: ContentsResponse = check(resp).await?.json().await?;

        Ok(Some(RemoteFile {
            sha: body.sha,
            text: decode_content(&body.content)?,
        }))
    }

    async fn put_file(&self, path: &str, text: &str, message: &str, sha: Option<&str>) -> Result<String> {
        let mut body = json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(text.as_bytes()),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let resp = self
            .request(reqwest::Method::PUT, &self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        let created: PutResponse = check(resp).await?.json().await?;
        tracing::debug!("Wrote {} ({})", path, created.content.sha);
        Ok(created.content.sha)
    }

    async fn delete_file(&self, path: &str, message: &str) -> Result<()> {
        let Some(current) = self.get_file(path).await? else {
            tracing::warn!("File not found on GitHub: {}. It may have been already deleted.", path);
            return Err(Error::NotFound(path.to_string()));
        };

        let resp = self
            .request(reqwest::Method::DELETE, &self.contents_url(path))
            .json(&json!({
                "message": message,
                "sha": current.sha,
                "branch": self.branch,
            }))
            .send()
            .await?;

        check(resp).await?;
        tracing::debug!("Deleted {}", path);
        Ok(())
    }
}

/// Turn a non-success response into an error carrying the API message
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&text)
        .map(|e| e.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GitHub API error".to_string());

    Err(classify(status, message))
}

fn classify(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Error::Conflict(message),
        // A stale or missing sha on an existing file is reported as 422
        StatusCode::UNPROCESSABLE_ENTITY if message.to_lowercase().contains("sha") => {
            Error::Conflict(message)
        }
        StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
        _ => Error::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// Decode the base64 payload GitHub wraps at 60 columns
fn decode_content(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
}
