//! Scan result aggregation
//!
//! Collects per-project outcomes into a deterministic report: matches sorted
//! by project path, a version-distribution summary, and the errors that were
//! recovered along the way.

use crate::scan::{ProjectMatch, ScanError, ScanOutcome};
use std::collections::{BTreeMap, BTreeSet};

/// Final result of a scan run.
#[derive(Debug)]
pub struct ScanReport {
    /// Package the scan searched for, as given by the user
    pub package: String,
    /// Projects actually scanned (match, non-match, or error)
    pub total_checked: usize,
    /// Matches sorted by project path ascending
    pub matches: Vec<ProjectMatch>,
    /// `name+constraint` string -> number of distinct projects declaring it
    pub version_distribution: BTreeMap<String, usize>,
    /// Per-project failures; recovered, never dropped
    pub errors: Vec<ScanError>,
}

impl ScanReport {
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }
}

/// Accumulates outcomes as scans complete. The runner feeds it from a single
/// collector, so no synchronization lives here.
#[derive(Debug)]
pub struct ScanAggregator {
    package: String,
    matches: Vec<ProjectMatch>,
    errors: Vec<ScanError>,
    checked: usize,
}

impl ScanAggregator {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            matches: Vec::new(),
            errors: Vec::new(),
            checked: 0,
        }
    }

    pub fn add(&mut self, outcome: ScanOutcome) {
        self.checked += 1;
        match outcome {
            ScanOutcome::Match(m) => self.matches.push(m),
            ScanOutcome::NoMatch => {}
            ScanOutcome::Error(e) => self.errors.push(e),
        }
    }

    /// Sort matches and build the version distribution.
    ///
    /// The distribution counts projects, not occurrences: a project declaring
    /// the same specifier string on several lines contributes once to that
    /// string's count.
    pub fn finalize(mut self) -> ScanReport {
        self.matches
            .sort_by(|a, b| a.project.path_with_namespace.cmp(&b.project.path_with_namespace));

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        for m in &self.matches {
            let distinct: BTreeSet<String> = m
                .specifiers
                .iter()
                .map(|s| format!("{}{}", self.package, s.constraint))
                .collect();
            for key in distinct {
                *distribution.entry(key).or_insert(0) += 1;
            }
        }

        ScanReport {
            package: self.package,
            total_checked: self.checked,
            matches: self.matches,
            version_distribution: distribution,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::{GitLabError, Project};
    use crate::manifest::DependencySpecifier;

    fn project(path: &str) -> Project {
        Project {
            id: 1,
            path_with_namespace: path.to_string(),
            web_url: String::new(),
            archived: false,
            default_branch: None,
        }
    }

    fn match_outcome(path: &str, constraints: &[(&str, usize)]) -> ScanOutcome {
        ScanOutcome::Match(ProjectMatch {
            project: project(path),
            file: "requirements.txt".to_string(),
            specifiers: constraints
                .iter()
                .map(|(c, line)| DependencySpecifier {
                    name: "httpx".to_string(),
                    constraint: c.to_string(),
                    line: *line,
                })
                .collect(),
        })
    }

    #[test]
    fn test_matches_sorted_by_project_path() {
        let mut agg = ScanAggregator::new("httpx");
        agg.add(match_outcome("b/two", &[("==1.0", 1)]));
        agg.add(match_outcome("a/one", &[("==1.0", 1)]));
        agg.add(ScanOutcome::NoMatch);

        let report = agg.finalize();
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.matched_count(), 2);
        assert_eq!(report.matches[0].project.path_with_namespace, "a/one");
        assert_eq!(report.matches[1].project.path_with_namespace, "b/two");
    }

    #[test]
    fn test_distribution_counts_projects_not_lines() {
        let mut agg = ScanAggregator::new("httpx");
        // Same specifier twice in one project (base + extras group)
        agg.add(match_outcome("a/one", &[("==1.0", 3), ("==1.0", 9)]));
        agg.add(match_outcome("b/two", &[("==1.0", 1)]));

        let report = agg.finalize();
        assert_eq!(report.version_distribution.get("httpx==1.0"), Some(&2));
    }

    #[test]
    fn test_distribution_distinct_specifiers_per_project() {
        let mut agg = ScanAggregator::new("httpx");
        agg.add(match_outcome("a/one", &[("==0.27.1", 10)]));
        agg.add(match_outcome("a/two", &[(">=0.25,<0.26", 2)]));

        let report = agg.finalize();
        assert_eq!(report.version_distribution.get("httpx==0.27.1"), Some(&1));
        assert_eq!(
            report.version_distribution.get("httpx>=0.25,<0.26"),
            Some(&1)
        );
        assert_eq!(report.version_distribution.len(), 2);
    }

    #[test]
    fn test_errors_are_retained_and_counted_as_checked() {
        let mut agg = ScanAggregator::new("httpx");
        agg.add(match_outcome("a/one", &[("==1.0", 1)]));
        agg.add(ScanOutcome::Error(ScanError {
            project: "a/broken".to_string(),
            reason: GitLabError::Status {
                url: "u".into(),
                status: 500,
            },
        }));

        let report = agg.finalize();
        assert_eq!(report.total_checked, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].project, "a/broken");
    }
}
