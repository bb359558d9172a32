//! GitLab API gateway
//!
//! Lists projects (paginated, optionally scoped to a group) and fetches
//! repository files over the GitLab v4 REST API. The `ProjectHost` trait is
//! the seam between the scan engine and the network: the engine only ever
//! sees a page iterator and a tri-state file lookup.

use crate::retry::{RetryPolicy, retry};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PER_PAGE: u32 = 100;

#[derive(Error, Debug)]
pub enum GitLabError {
    #[error("GitLab authentication failed (HTTP {status}). Check your token.")]
    Auth { status: u16 },

    #[error("Group '{group}' not found or not accessible")]
    GroupNotFound { group: String },

    #[error("Access denied for {path} (HTTP {status})")]
    Forbidden { path: String, status: u16 },

    #[error("GitLab returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: ureq::Error },

    #[error("Failed to parse GitLab response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

impl GitLabError {
    /// Rate limits, server errors, and transport failures are worth retrying;
    /// auth and not-found conditions are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GitLabError::Transport { .. } => true,
            GitLabError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A GitLab project, as returned by the projects listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Which projects to enumerate.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// Restrict to a group path (e.g. `mycompany/backend`)
    pub group: Option<String>,
    /// Server-side name filter
    pub search: Option<String>,
    /// Include archived projects alongside active ones
    pub include_archived: bool,
}

/// Result of looking up a file in a project. A missing file is an expected
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup {
    Found(String),
    NotFound,
}

/// Capability the scan engine consumes: enumerate projects a page at a time
/// and fetch files from them. `Sync` so scans can run from worker threads.
pub trait ProjectHost: Sync {
    /// Lazy page iterator; the consumer may stop early (cancellation) without
    /// further pages being fetched.
    fn projects<'a>(
        &'a self,
        query: &ProjectQuery,
    ) -> Box<dyn Iterator<Item = Result<Vec<Project>, GitLabError>> + 'a>;

    fn fetch_file(&self, project: &Project, path: &str) -> Result<FileLookup, GitLabError>;
}

/// Authenticated GitLab API client.
pub struct GitLabClient {
    agent: ureq::Agent,
    api_url: String,
    token: String,
    retry: RetryPolicy,
}

struct ApiResponse {
    status: u16,
    next_page: Option<u32>,
    body: String,
}

impl GitLabClient {
    pub fn new(gitlab_url: &str, token: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DEFAULT_TIMEOUT))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            api_url: format!("{}/api/v4", gitlab_url.trim_end_matches('/')),
            token: token.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// GET with the auth header and transient-failure retry. Statuses are
    /// returned to the caller rather than raised, so 404s cost nothing.
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse, GitLabError> {
        retry(&self.retry, GitLabError::is_transient, || {
            let mut request = self.agent.get(url).header("PRIVATE-TOKEN", &self.token);
            for (key, value) in params {
                request = request.query(*key, value);
            }

            let response = request.call().map_err(|source| GitLabError::Transport {
                url: url.to_string(),
                source,
            })?;

            let status = response.status().as_u16();
            if status == 429 || status >= 500 {
                return Err(GitLabError::Status {
                    url: url.to_string(),
                    status,
                });
            }

            let next_page = response
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u32>().ok());

            let body = response
                .into_body()
                .read_to_string()
                .map_err(|source| GitLabError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            Ok(ApiResponse {
                status,
                next_page,
                body,
            })
        })
    }
}

impl ProjectHost for GitLabClient {
    fn projects<'a>(
        &'a self,
        query: &ProjectQuery,
    ) -> Box<dyn Iterator<Item = Result<Vec<Project>, GitLabError>> + 'a> {
        let endpoint = match &query.group {
            Some(group) => format!(
                "{}/groups/{}/projects",
                self.api_url,
                encode_path_segment(group)
            ),
            None => format!("{}/projects", self.api_url),
        };

        Box::new(ProjectPages {
            client: self,
            endpoint,
            query: query.clone(),
            page: 1,
            done: false,
        })
    }

    fn fetch_file(&self, project: &Project, path: &str) -> Result<FileLookup, GitLabError> {
        let branch = project.default_branch.as_deref().unwrap_or("main");
        // Projects that report `main` often actually live on an older
        // default; try the common fallbacks before giving up.
        let refs: Vec<&str> = if branch == "main" {
            vec![branch, "master", "develop"]
        } else {
            vec![branch]
        };

        let url = format!(
            "{}/projects/{}/repository/files/{}/raw",
            self.api_url,
            project.id,
            encode_path_segment(path)
        );

        for r in refs {
            let response = self.get(&url, &[("ref", r.to_string())])?;
            match response.status {
                200 => return Ok(FileLookup::Found(response.body)),
                404 => continue,
                401 | 403 => {
                    return Err(GitLabError::Forbidden {
                        path: format!("{}/{}", project.path_with_namespace, path),
                        status: response.status,
                    });
                }
                status => {
                    return Err(GitLabError::Status {
                        url: url.clone(),
                        status,
                    });
                }
            }
        }

        Ok(FileLookup::NotFound)
    }
}

/// One page of projects per `next()` call; stops on the first error or when
/// the API reports no further page.
struct ProjectPages<'a> {
    client: &'a GitLabClient,
    endpoint: String,
    query: ProjectQuery,
    page: u32,
    done: bool,
}

impl Iterator for ProjectPages<'_> {
    type Item = Result<Vec<Project>, GitLabError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut params: Vec<(&str, String)> = vec![
            ("page", self.page.to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("simple", "true".to_string()),
            ("membership", "true".to_string()),
        ];
        if !self.query.include_archived {
            params.push(("archived", "false".to_string()));
        }
        if let Some(search) = &self.query.search {
            params.push(("search", search.clone()));
        }

        let response = match self.client.get(&self.endpoint, &params) {
            Ok(response) => response,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        match response.status {
            200 => {}
            401 | 403 => {
                self.done = true;
                return Some(Err(GitLabError::Auth {
                    status: response.status,
                }));
            }
            404 if self.query.group.is_some() => {
                self.done = true;
                return Some(Err(GitLabError::GroupNotFound {
                    group: self.query.group.clone().unwrap_or_default(),
                }));
            }
            status => {
                self.done = true;
                return Some(Err(GitLabError::Status {
                    url: self.endpoint.clone(),
                    status,
                }));
            }
        }

        let mut projects: Vec<Project> = match serde_json::from_str(&response.body) {
            Ok(projects) => projects,
            Err(source) => {
                self.done = true;
                return Some(Err(GitLabError::Decode {
                    url: self.endpoint.clone(),
                    source,
                }));
            }
        };

        // Belt-and-braces on top of the server-side `archived` param.
        if !self.query.include_archived {
            projects.retain(|p| !p.archived);
        }

        if response.next_page.is_none() {
            self.done = true;
        } else {
            self.page += 1;
        }

        Some(Ok(projects))
    }
}

/// Percent-encode a string for use as a single URL path segment
/// (`mycompany/backend` -> `mycompany%2Fbackend`).
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("simple"), "simple");
        assert_eq!(
            encode_path_segment("mycompany/backend"),
            "mycompany%2Fbackend"
        );
        assert_eq!(encode_path_segment("a b"), "a%20b");
        assert_eq!(
            encode_path_segment("requirements-dev.txt"),
            "requirements-dev.txt"
        );
    }

    #[test]
    fn test_transient_classification() {
        let rate_limited = GitLabError::Status {
            url: "u".into(),
            status: 429,
        };
        let server_error = GitLabError::Status {
            url: "u".into(),
            status: 503,
        };
        let auth = GitLabError::Auth { status: 401 };
        let missing_group = GitLabError::GroupNotFound { group: "g".into() };

        assert!(rate_limited.is_transient());
        assert!(server_error.is_transient());
        assert!(!auth.is_transient());
        assert!(!missing_group.is_transient());
    }

    #[test]
    fn test_project_deserialization() {
        let body = r#"{
            "id": 42,
            "path_with_namespace": "a/one",
            "web_url": "https://gitlab.example.com/a/one",
            "archived": false,
            "default_branch": "main"
        }"#;
        let project: Project = serde_json::from_str(body).unwrap();
        assert_eq!(project.id, 42);
        assert_eq!(project.path_with_namespace, "a/one");
        assert!(!project.archived);
        assert_eq!(project.default_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_project_deserialization_defaults() {
        // `simple=true` listings may omit fields; missing ones default.
        let body = r#"{"id": 7, "path_with_namespace": "a/two"}"#;
        let project: Project = serde_json::from_str(body).unwrap();
        assert!(!project.archived);
        assert!(project.default_branch.is_none());
        assert_eq!(project.web_url, "");
    }
}
