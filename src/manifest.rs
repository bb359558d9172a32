//! Dependency manifest parsing for Python projects
//!
//! Extracts `(name, constraint, line)` specifiers for a target package from:
//! - requirements.txt style files (line-based, `package==version`)
//! - pyproject.toml (`[project.dependencies]`, optional-dependency groups,
//!   Poetry tables, `[tool.uv.dependencies]`)
//! - setup.py (string literals in an `install_requires = [...]` list)
//!
//! Parsing is pure: no I/O, and malformed entries are skipped rather than
//! reported as errors.

/// The supported manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Line-oriented requirements file (requirements.txt and variants)
    Requirements,
    /// TOML project manifest (pyproject.toml)
    Pyproject,
    /// Python setup script (setup.py)
    SetupScript,
}

/// A dependency declaration found in a manifest.
///
/// `name` is the package name as written in the file; `constraint` is the
/// version constraint text verbatim (including extras), or `"*"` when the
/// entry carries no version. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpecifier {
    pub name: String,
    pub constraint: String,
    pub line: usize,
}

/// Parse a manifest and return every specifier matching the target package,
/// in file order.
pub fn parse(content: &str, kind: ManifestKind, target: &str) -> Vec<DependencySpecifier> {
    match kind {
        ManifestKind::Requirements => parse_requirements(content, target),
        ManifestKind::Pyproject => parse_pyproject(content, target),
        ManifestKind::SetupScript => parse_setup_script(content, target),
    }
}

/// Normalize a Python package name for comparison.
///
/// PEP 503: names are case-insensitive and runs of `-`, `_`, `.` are
/// equivalent to a single separator.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = !out.is_empty();
        } else {
            if pending_sep {
                out.push('-');
                pending_sep = false;
            }
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// A requirement entry split into its name and constraint parts.
struct Requirement {
    name: String,
    constraint: String,
}

/// Parse a single PEP 508-ish requirement line.
///
/// Strips inline comments and environment markers, preserves extras and the
/// full (possibly multi-clause) version constraint. Returns `None` for blank
/// lines, pip options (`-r`, `-e`, ...), URL-only entries, and lines with no
/// parseable name.
fn parse_requirement(raw: &str) -> Option<Requirement> {
    let line = raw.split('#').next().unwrap_or("").trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }

    // Environment markers (e.g. `; python_version >= "3.8"`) don't affect
    // the declared constraint.
    let line = line.split(';').next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with("git+")
        || line.starts_with("http://")
        || line.starts_with("https://")
        || line.starts_with("ssh://")
    {
        return None;
    }

    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut rest = line[name_end..].trim_start();

    let mut extras = String::new();
    if rest.starts_with('[') {
        let close = rest.find(']')?;
        extras = rest[..=close].chars().filter(|c| !c.is_whitespace()).collect();
        rest = rest[close + 1..].trim_start();
    }

    // Bare name, or a direct URL reference (`pkg @ https://...`): no
    // textual version constraint to report.
    if rest.is_empty() || rest.starts_with('@') {
        return Some(Requirement {
            name: name.to_string(),
            constraint: format!("{extras}*"),
        });
    }

    if !rest.starts_with(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~')) {
        return None;
    }

    let constraint: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    Some(Requirement {
        name: name.to_string(),
        constraint: format!("{extras}{constraint}"),
    })
}

fn parse_requirements(content: &str, target: &str) -> Vec<DependencySpecifier> {
    let want = normalize_name(target);
    let mut out = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let Some(req) = parse_requirement(raw) else {
            continue;
        };
        if normalize_name(&req.name) == want {
            out.push(DependencySpecifier {
                name: req.name,
                constraint: req.constraint,
                line: i + 1,
            });
        }
    }

    out
}

fn parse_pyproject(content: &str, target: &str) -> Vec<DependencySpecifier> {
    let Ok(doc) = content.parse::<toml::Value>() else {
        return Vec::new();
    };
    let want = normalize_name(target);
    let mut found = Vec::new();

    // PEP 621: [project.dependencies]
    if let Some(arr) = doc
        .get("project")
        .and_then(|v| v.get("dependencies"))
        .and_then(|v| v.as_array())
    {
        collect_pep508_entries(content, arr, &want, &mut found);
    }

    // PEP 621: [project.optional-dependencies.<group>]
    if let Some(groups) = doc
        .get("project")
        .and_then(|v| v.get("optional-dependencies"))
        .and_then(|v| v.as_table())
    {
        for deps in groups.values() {
            if let Some(arr) = deps.as_array() {
                collect_pep508_entries(content, arr, &want, &mut found);
            }
        }
    }

    // [tool.uv.dependencies]
    if let Some(arr) = doc
        .get("tool")
        .and_then(|v| v.get("uv"))
        .and_then(|v| v.get("dependencies"))
        .and_then(|v| v.as_array())
    {
        collect_pep508_entries(content, arr, &want, &mut found);
    }

    // Poetry: [tool.poetry.dependencies], dev-dependencies, and
    // [tool.poetry.group.<name>.dependencies]
    if let Some(poetry) = doc.get("tool").and_then(|v| v.get("poetry")) {
        for section in ["dependencies", "dev-dependencies"] {
            if let Some(table) = poetry.get(section).and_then(|v| v.as_table()) {
                collect_poetry_entries(content, table, &want, &mut found);
            }
        }
        if let Some(groups) = poetry.get("group").and_then(|v| v.as_table()) {
            for group in groups.values() {
                if let Some(table) = group.get("dependencies").and_then(|v| v.as_table()) {
                    collect_poetry_entries(content, table, &want, &mut found);
                }
            }
        }
    }

    // TOML traversal is section order, not file order; restore file order.
    found.sort_by_key(|s| s.line);
    found.dedup_by(|a, b| a.line == b.line && a.constraint == b.constraint);
    found
}

fn collect_pep508_entries(
    content: &str,
    entries: &[toml::Value],
    want: &str,
    out: &mut Vec<DependencySpecifier>,
) {
    for entry in entries {
        let Some(entry_str) = entry.as_str() else {
            continue;
        };
        let Some(req) = parse_requirement(entry_str) else {
            continue;
        };
        if normalize_name(&req.name) != want {
            continue;
        }
        let line = locate_entry_line(content, entry_str.trim(), &req.name);
        out.push(DependencySpecifier {
            name: req.name,
            constraint: req.constraint,
            line,
        });
    }
}

fn collect_poetry_entries(
    content: &str,
    table: &toml::map::Map<String, toml::Value>,
    want: &str,
    out: &mut Vec<DependencySpecifier>,
) {
    for (name, value) in table {
        if name == "python" || normalize_name(name) != want {
            continue;
        }
        let Some(constraint) = poetry_constraint(value) else {
            continue;
        };
        out.push(DependencySpecifier {
            name: name.clone(),
            constraint,
            line: locate_poetry_line(content, name),
        });
    }
}

/// Extract the constraint text from a Poetry dependency value.
///
/// Values are either a version string (`"^2.31.0"`) or a table with a
/// `version` key and optional `extras`. Git and path dependencies carry no
/// textual version and are skipped.
fn poetry_constraint(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.trim().to_string()),
        toml::Value::Table(t) => {
            let version = t.get("version")?.as_str()?;
            match t.get("extras").and_then(|v| v.as_array()) {
                Some(extras) => {
                    let names: Vec<&str> = extras.iter().filter_map(|e| e.as_str()).collect();
                    Some(format!("[{}]{}", names.join(","), version))
                }
                None => Some(version.to_string()),
            }
        }
        _ => None,
    }
}

/// Find the 1-based line of a dependency entry in the raw document.
///
/// The toml crate doesn't expose spans, so look for the entry text first and
/// fall back to the first non-comment line mentioning the name.
fn locate_entry_line(content: &str, entry: &str, name: &str) -> usize {
    for (i, line) in content.lines().enumerate() {
        if line.contains(entry) {
            return i + 1;
        }
    }
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') && trimmed.contains(name) {
            return i + 1;
        }
    }
    1
}

/// Find the 1-based line of a Poetry table entry (`name = ...`).
fn locate_poetry_line(content: &str, name: &str) -> usize {
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(name)
            && rest.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    1
}

/// Parse specifiers out of a setup.py `install_requires = [...]` list.
///
/// Only a literal list of strings is recognized; requirements built at
/// runtime are not resolvable from text.
fn parse_setup_script(content: &str, target: &str) -> Vec<DependencySpecifier> {
    let Some(start) = content.find("install_requires") else {
        return Vec::new();
    };
    let after = &content[start + "install_requires".len()..];
    let Some(eq) = after.find('=') else {
        return Vec::new();
    };
    let after_eq = &after[eq + 1..];
    let Some(open) = after_eq.find('[') else {
        return Vec::new();
    };
    if !after_eq[..open].trim().is_empty() {
        return Vec::new();
    }

    let list_start = start + "install_requires".len() + eq + 1 + open;
    let bytes = content.as_bytes();
    let want = normalize_name(target);
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut i = list_start;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            quote @ (b'\'' | b'"') => {
                let lit_start = i + 1;
                let mut j = lit_start;
                while j < bytes.len() && bytes[j] != quote {
                    j += 1;
                }
                if j >= bytes.len() {
                    break;
                }
                let literal = &content[lit_start..j];
                if let Some(req) = parse_requirement(literal)
                    && normalize_name(&req.name) == want
                {
                    out.push(DependencySpecifier {
                        name: req.name,
                        constraint: req.constraint,
                        line: content[..lit_start].matches('\n').count() + 1,
                    });
                }
                i = j;
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(specs: Vec<DependencySpecifier>) -> DependencySpecifier {
        assert_eq!(specs.len(), 1, "expected exactly one specifier: {specs:?}");
        specs.into_iter().next().unwrap()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Requests"), "requests");
        assert_eq!(normalize_name("typing-extensions"), "typing-extensions");
        assert_eq!(normalize_name("typing_extensions"), "typing-extensions");
        assert_eq!(normalize_name("My.Package"), "my-package");
        assert_eq!(normalize_name("a--b__c"), "a-b-c");
    }

    #[test]
    fn test_requirements_exact_pin() {
        let content = "flask==2.0\nhttpx==0.27.1\n";
        let spec = single(parse(content, ManifestKind::Requirements, "httpx"));
        assert_eq!(spec.name, "httpx");
        assert_eq!(spec.constraint, "==0.27.1");
        assert_eq!(spec.line, 2);
    }

    #[test]
    fn test_requirements_multi_clause_constraint_kept_verbatim() {
        let content = "httpx>=0.25,<0.26\n";
        let spec = single(parse(content, ManifestKind::Requirements, "httpx"));
        assert_eq!(spec.constraint, ">=0.25,<0.26");
        assert_eq!(spec.line, 1);
    }

    #[test]
    fn test_requirements_extras_and_spaces() {
        let content = "requests [security] == 2.31.0\n";
        let spec = single(parse(content, ManifestKind::Requirements, "requests"));
        assert_eq!(spec.constraint, "[security]==2.31.0");
    }

    #[test]
    fn test_requirements_comment_and_marker_stripped() {
        let content = "# deps\nrequests==2.31.0  # HTTP library\nhttpx==1.0; python_version >= '3.8'\n";
        let spec = single(parse(content, ManifestKind::Requirements, "requests"));
        assert_eq!(spec.constraint, "==2.31.0");
        assert_eq!(spec.line, 2);
        let spec = single(parse(content, ManifestKind::Requirements, "httpx"));
        assert_eq!(spec.constraint, "==1.0");
        assert_eq!(spec.line, 3);
    }

    #[test]
    fn test_requirements_bare_name_reports_star() {
        let content = "httpx\n";
        let spec = single(parse(content, ManifestKind::Requirements, "httpx"));
        assert_eq!(spec.constraint, "*");
    }

    #[test]
    fn test_requirements_name_normalization_match() {
        let content = "My.Package==1.0\n";
        let spec = single(parse(content, ManifestKind::Requirements, "my-package"));
        assert_eq!(spec.name, "My.Package");
        assert_eq!(spec.constraint, "==1.0");

        let content = "my_package==1.0\n";
        let spec = single(parse(content, ManifestKind::Requirements, "my-package"));
        assert_eq!(spec.name, "my_package");
    }

    #[test]
    fn test_requirements_skips_options_urls_and_garbage() {
        let content = "-r base.txt\n-e .\ngit+https://example.com/x.git\nhttps://example.com/pkg.whl\n???bad\nhttpx==1.0\n";
        let spec = single(parse(content, ManifestKind::Requirements, "httpx"));
        assert_eq!(spec.line, 6);
    }

    #[test]
    fn test_requirements_no_match_returns_empty() {
        assert!(parse("flask==2.0\n", ManifestKind::Requirements, "httpx").is_empty());
        assert!(parse("", ManifestKind::Requirements, "httpx").is_empty());
    }

    #[test]
    fn test_pyproject_project_dependencies() {
        let content = r#"
[project]
name = "demo"
dependencies = [
    "flask>=2.0",
    "httpx==0.27.1",
]
"#;
        let spec = single(parse(content, ManifestKind::Pyproject, "httpx"));
        assert_eq!(spec.constraint, "==0.27.1");
        assert_eq!(spec.line, 6);
    }

    #[test]
    fn test_pyproject_optional_dependencies() {
        let content = r#"
[project]
name = "demo"
dependencies = ["flask>=2.0"]

[project.optional-dependencies]
test = ["httpx>=0.25,<0.26"]
"#;
        let spec = single(parse(content, ManifestKind::Pyproject, "httpx"));
        assert_eq!(spec.constraint, ">=0.25,<0.26");
        assert_eq!(spec.line, 7);
    }

    #[test]
    fn test_pyproject_poetry_string_and_table() {
        let content = r#"
[tool.poetry.dependencies]
python = "^3.11"
requests = "^2.31.0"
kafka-client = { version = "^1.2", extras = ["kafka"] }
local = { path = "../local" }
"#;
        let spec = single(parse(content, ManifestKind::Pyproject, "requests"));
        assert_eq!(spec.constraint, "^2.31.0");
        assert_eq!(spec.line, 4);

        let spec = single(parse(content, ManifestKind::Pyproject, "kafka_client"));
        assert_eq!(spec.constraint, "[kafka]^1.2");
        assert_eq!(spec.line, 5);

        // `python` and path deps are never matches
        assert!(parse(content, ManifestKind::Pyproject, "python").is_empty());
        assert!(parse(content, ManifestKind::Pyproject, "local").is_empty());
    }

    #[test]
    fn test_pyproject_poetry_group_dependencies() {
        let content = r#"
[tool.poetry.group.dev.dependencies]
httpx = ">=0.25"
"#;
        let spec = single(parse(content, ManifestKind::Pyproject, "httpx"));
        assert_eq!(spec.constraint, ">=0.25");
        assert_eq!(spec.line, 3);
    }

    #[test]
    fn test_pyproject_uv_dependencies() {
        let content = r#"
[tool.uv]
dependencies = ["httpx~=0.27"]
"#;
        let spec = single(parse(content, ManifestKind::Pyproject, "httpx"));
        assert_eq!(spec.constraint, "~=0.27");
    }

    #[test]
    fn test_pyproject_base_and_extra_duplicate_kept_in_line_order() {
        let content = r#"
[project]
dependencies = ["httpx==0.27.1"]

[project.optional-dependencies]
http2 = ["httpx[http2]==0.27.1"]
"#;
        let specs = parse(content, ManifestKind::Pyproject, "httpx");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].constraint, "==0.27.1");
        assert_eq!(specs[1].constraint, "[http2]==0.27.1");
        assert!(specs[0].line < specs[1].line);
    }

    #[test]
    fn test_pyproject_malformed_toml_is_not_an_error() {
        assert!(parse("not [ valid toml", ManifestKind::Pyproject, "httpx").is_empty());
    }

    #[test]
    fn test_setup_script_install_requires() {
        let content = r#"
from setuptools import setup

setup(
    name="demo",
    install_requires=[
        "flask>=2.0",  # web
        'httpx==0.27.1',
    ],
)
"#;
        let spec = single(parse(content, ManifestKind::SetupScript, "httpx"));
        assert_eq!(spec.constraint, "==0.27.1");
        assert_eq!(spec.line, 8);
    }

    #[test]
    fn test_setup_script_without_install_requires() {
        assert!(parse("setup(name='demo')", ManifestKind::SetupScript, "httpx").is_empty());
    }
}
