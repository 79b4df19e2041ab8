//! Minimal GitHub REST client for workflow dispatch, run polling, artifact
//! download and release publishing.

use std::path::Path;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use comfyport_core::config::GitHubConfig;
use comfyport_util::errors::PortableError;
use comfyport_util::process::CommandBuilder;

const API_VERSION: &str = "2022-11-28";

// -----------------------------------------------------------------------
// GitHub API types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GhRun {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GhRunList {
    pub workflow_runs: Vec<GhRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhArtifact {
    pub id: u64,
    pub name: String,
    pub archive_download_url: String,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub size_in_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct GhArtifactList {
    pub artifacts: Vec<GhArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhRelease {
    pub id: u64,
    pub tag_name: String,
    pub upload_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<GhAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhAsset {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    draft: bool,
    prerelease: bool,
}

// -----------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------

/// Authenticated client bound to one `owner/name` repository.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, repo: &str, token: &str) -> Result<Self, PortableError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("comfyport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PortableError::Network {
                message: format!("HTTP client error: {e}"),
            })?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    /// Build a client from configuration and the environment.
    ///
    /// The repository comes from `repo_override`, then `[github].repository`,
    /// then `GITHUB_REPOSITORY`, then the `origin` remote of `project_dir`.
    /// The token comes from `GITHUB_TOKEN` or `GH_TOKEN`.
    pub fn from_env(
        config: &GitHubConfig,
        project_dir: &Path,
        repo_override: Option<&str>,
    ) -> miette::Result<Self> {
        let token = token_from_env().ok_or_else(|| PortableError::ConfigMissing {
            what: "GitHub token (set GITHUB_TOKEN or GH_TOKEN)".to_string(),
        })?;
        let repo = resolve_repository(config, project_dir, repo_override)?;
        tracing::debug!("Using GitHub repository {repo} via {}", config.api_url);
        Ok(Self::new(&config.api_url, &repo, &token)?)
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// `{api}/repos/{owner}/{name}/{path}`
    pub fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.repo, path.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, PortableError> {
        let resp = req.send().await.map_err(|e| PortableError::Network {
            message: format!("{what}: {e}"),
        })?;
        check_status(resp, what).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortableError> {
        self.get_json_query(path, &[]).await
    }

    /// GET `path` with `query` pairs, URL-encoded.
    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PortableError> {
        let url = self.repo_url(path);
        let mut req = self.request(reqwest::Method::GET, &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = self.send(req, &format!("GET {url}")).await?;
        resp.json::<T>().await.map_err(|e| PortableError::Network {
            message: format!("Failed to parse response from {url}: {e}"),
        })
    }

    /// Like [`Self::get_json`] but maps 404 to `None`.
    pub async fn get_json_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, PortableError> {
        let url = self.repo_url(path);
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| PortableError::Network {
                message: format!("GET {url}: {e}"),
            })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp, &format!("GET {url}")).await?;
        resp.json::<T>().await.map(Some).map_err(|e| PortableError::Network {
            message: format!("Failed to parse response from {url}: {e}"),
        })
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, PortableError> {
        let url = self.repo_url(path);
        self.send(
            self.request(reqwest::Method::POST, &url).json(body),
            &format!("POST {url}"),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), PortableError> {
        let url = self.repo_url(path);
        self.send(self.request(reqwest::Method::DELETE, &url), &format!("DELETE {url}"))
            .await?;
        Ok(())
    }

    /// Dispatch `workflow` on `branch`.
    pub async fn dispatch_workflow(&self, workflow: &str, branch: &str) -> Result<(), PortableError> {
        self.post_json(
            &format!("actions/workflows/{workflow}/dispatches"),
            &DispatchBody { git_ref: branch },
        )
        .await?;
        Ok(())
    }

    /// Most recent `workflow_dispatch` runs of `workflow` on `branch`, newest first.
    pub async fn list_dispatch_runs(
        &self,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<GhRun>, PortableError> {
        let list: GhRunList = self
            .get_json_query(
                &format!("actions/workflows/{workflow}/runs"),
                &[
                    ("event", "workflow_dispatch"),
                    ("branch", branch),
                    ("per_page", "20"),
                ],
            )
            .await?;
        Ok(list.workflow_runs)
    }

    pub async fn get_run(&self, run_id: u64) -> Result<GhRun, PortableError> {
        self.get_json(&format!("actions/runs/{run_id}")).await
    }

    pub async fn list_artifacts(&self, run_id: u64) -> Result<Vec<GhArtifact>, PortableError> {
        let list: GhArtifactList = self
            .get_json_query(
                &format!("actions/runs/{run_id}/artifacts"),
                &[("per_page", "100")],
            )
            .await?;
        Ok(list.artifacts)
    }

    pub async fn release_by_tag(&self, tag: &str) -> Result<Option<GhRelease>, PortableError> {
        self.get_json_optional(&format!("releases/tags/{tag}")).await
    }

    pub async fn create_release(&self, tag: &str) -> Result<GhRelease, PortableError> {
        let resp = self
            .post_json(
                "releases",
                &CreateReleaseBody {
                    tag_name: tag,
                    name: tag,
                    draft: false,
                    prerelease: false,
                },
            )
            .await?;
        resp.json::<GhRelease>().await.map_err(|e| PortableError::Network {
            message: format!("Failed to parse created release: {e}"),
        })
    }

    pub async fn delete_asset(&self, asset_id: u64) -> Result<(), PortableError> {
        self.delete(&format!("releases/assets/{asset_id}")).await
    }

    /// Upload `file` as a release asset named after its file name.
    pub async fn upload_asset(&self, release: &GhRelease, file: &Path) -> Result<(), PortableError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let url = upload_endpoint(&release.upload_url);
        let len = tokio::fs::metadata(file).await?.len();
        let body = tokio::fs::File::open(file).await?;

        let req = self
            .request(reqwest::Method::POST, &url)
            .query(&[("name", name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, content_type_for(&name))
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(reqwest::Body::from(body));
        self.send(req, &format!("upload {name}")).await?;
        Ok(())
    }

    /// Stream `url` to `dest` with the client's credentials.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<(), PortableError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, url), &format!("GET {url}"))
            .await?;

        let pb = resp
            .content_length()
            .filter(|len| *len > 0)
            .map(comfyport_util::progress::bytes_bar);

        let mut out = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PortableError::Network {
                message: format!("Read error while downloading {url}: {e}"),
            })?;
            out.write_all(&chunk).await?;
            if let Some(ref pb) = pb {
                pb.inc(chunk.len() as u64);
            }
        }
        out.flush().await?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, PortableError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PortableError::PermissionDenied {
            message: format!("{what} returned HTTP {status}; check the token's scopes. {body}"),
        });
    }
    Err(PortableError::Network {
        message: format!("{what} returned HTTP {status}: {body}"),
    })
}

/// Strip the RFC 6570 suffix from a release `upload_url`.
pub fn upload_endpoint(upload_url: &str) -> String {
    match upload_url.find('{') {
        Some(idx) => upload_url[..idx].to_string(),
        None => upload_url.to_string(),
    }
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}

fn token_from_env() -> Option<String> {
    ["GITHUB_TOKEN", "GH_TOKEN"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

fn resolve_repository(
    config: &GitHubConfig,
    project_dir: &Path,
    repo_override: Option<&str>,
) -> Result<String, PortableError> {
    if let Some(repo) = repo_override.or(config.repository.as_deref()) {
        return parse_repo_slug(repo).ok_or_else(|| PortableError::ConfigInvalid {
            message: format!("'{repo}' is not an owner/name repository"),
        });
    }
    if let Ok(repo) = std::env::var("GITHUB_REPOSITORY") {
        if let Some(slug) = parse_repo_slug(&repo) {
            return Ok(slug);
        }
    }

    let output = CommandBuilder::new("git")
        .args(["remote", "get-url", "origin"])
        .cwd(project_dir)
        .exec()?;
    let remote = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() {
        if let Some(slug) = parse_repo_slug(&remote) {
            return Ok(slug);
        }
    }
    Err(PortableError::ConfigMissing {
        what: "GitHub repository (use --repo, [github].repository or GITHUB_REPOSITORY)"
            .to_string(),
    })
}

/// Extract `owner/name` from a slug or a GitHub remote URL.
///
/// Accepts `owner/name`, `https://github.com/owner/name(.git)`,
/// `git@github.com:owner/name.git` and `ssh://git@github.com/owner/name.git`.
pub fn parse_repo_slug(input: &str) -> Option<String> {
    let input = input.trim().trim_end_matches('/');
    let path = if let Some((_, rest)) = input.split_once("://") {
        rest.split_once('/').map(|(_, p)| p)?
    } else if let Some((host, rest)) = input.split_once(':') {
        if !host.contains('@') && !host.contains('.') {
            return None;
        }
        rest
    } else {
        input
    };
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    let (owner, name) = (parts.next()?, parts.next()?);
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if parts.next().is_some() || !valid(owner) || !valid(name) {
        return None;
    }
    Some(format!("{owner}/{name}"))
}
