//! Per-project dependency scan
//!
//! Tries each known manifest file in priority order; the first manifest whose
//! parse yields matching specifiers wins for the project, which keeps a
//! package declared in several manifest styles from being counted twice.

use crate::gitlab::{FileLookup, GitLabError, Project, ProjectHost};
use crate::manifest::{self, DependencySpecifier, ManifestKind};

/// Manifest filenames tried per project, in priority order.
pub const MANIFEST_CANDIDATES: [(&str, ManifestKind); 6] = [
    ("requirements.txt", ManifestKind::Requirements),
    ("requirements-dev.txt", ManifestKind::Requirements),
    ("requirements-test.txt", ManifestKind::Requirements),
    ("requirements-prod.txt", ManifestKind::Requirements),
    ("pyproject.toml", ManifestKind::Pyproject),
    ("setup.py", ManifestKind::SetupScript),
];

/// A project found to depend on the target package.
#[derive(Debug, Clone)]
pub struct ProjectMatch {
    pub project: Project,
    /// Manifest file the specifiers came from
    pub file: String,
    /// Specifiers in file order; never empty
    pub specifiers: Vec<DependencySpecifier>,
}

impl ProjectMatch {
    /// Browsable URL for the matched file, anchored at the first match line.
    pub fn file_url(&self) -> String {
        let branch = self.project.default_branch.as_deref().unwrap_or("main");
        let mut url = format!("{}/-/blob/{}/{}", self.project.web_url, branch, self.file);
        if let Some(spec) = self.specifiers.first() {
            url.push_str(&format!("#L{}", spec.line));
        }
        url
    }
}

/// A project that could not be scanned. Recorded in the report; never aborts
/// the run.
#[derive(Debug)]
pub struct ScanError {
    pub project: String,
    pub reason: GitLabError,
}

/// Outcome of scanning one project.
#[derive(Debug)]
pub enum ScanOutcome {
    Match(ProjectMatch),
    NoMatch,
    Error(ScanError),
}

/// Scan a single project for the target package.
///
/// Missing manifests advance to the next candidate. Any other fetch failure
/// stops the scan of this project (fail-fast per project, not per run).
pub fn scan_project(host: &dyn ProjectHost, project: &Project, package: &str) -> ScanOutcome {
    for (file, kind) in MANIFEST_CANDIDATES {
        let content = match host.fetch_file(project, file) {
            Ok(FileLookup::Found(content)) => content,
            Ok(FileLookup::NotFound) => continue,
            Err(reason) => {
                return ScanOutcome::Error(ScanError {
                    project: project.path_with_namespace.clone(),
                    reason,
                });
            }
        };

        let specifiers = manifest::parse(&content, kind, package);
        if !specifiers.is_empty() {
            return ScanOutcome::Match(ProjectMatch {
                project: project.clone(),
                file: file.to_string(),
                specifiers,
            });
        }
    }

    ScanOutcome::NoMatch
}
