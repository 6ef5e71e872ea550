//! Name normalization for target repositories and workflow filenames.
//!
//! Centralized so repository names and generated workflow stems behave
//! consistently across single and batch migrations.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const REPO_NAME_MAX: usize = 100;
const WORKFLOW_STEM_MAX: usize = 50;

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid pattern"))
}

fn dash_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("valid pattern"))
}

/// Sanitize a source repository name into a valid GitHub repository name.
///
/// Idempotent: applying it twice yields the same result as applying it once.
pub fn sanitize_repo_name(raw: &str) -> String {
    let name = invalid_chars().replace_all(raw.trim(), "-");
    let name = dash_runs().replace_all(&name, "-");
    let name: String = name.chars().take(REPO_NAME_MAX).collect();
    let name = name.trim_matches(|c| matches!(c, '-' | '.' | '_'));

    if name.is_empty() {
        return "repo".to_string();
    }

    name.to_string()
}

/// Derive a collision-safe workflow filename stem from a pipeline display name.
///
/// Produces a normalized, lowercase, hyphenated stem capped at 50 characters.
/// A collision within `taken` gets a numeric suffix (`-2`, `-3`, ...) rather
/// than silently overwriting an earlier pipeline's output. The chosen stem is
/// recorded in `taken`.
pub fn workflow_stem(raw: &str, taken: &mut HashSet<String>) -> String {
    let source = if raw.trim().is_empty() { "workflow" } else { raw };

    let stem = source.trim().to_lowercase();
    let stem = stem.split_whitespace().collect::<Vec<_>>().join("-");
    let stem = invalid_chars().replace_all(&stem, "-");
    let stem = dash_runs().replace_all(&stem, "-");
    let stem = stem.trim_matches(|c| matches!(c, '-' | '.' | '_'));

    let mut base: String = if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem.chars().take(WORKFLOW_STEM_MAX).collect()
    };

    if !taken.contains(&base) {
        taken.insert(base.clone());
        return base;
    }

    let untruncated = base.clone();
    let mut counter = 2usize;
    loop {
        let suffix = format!("-{counter}");
        let budget = WORKFLOW_STEM_MAX.saturating_sub(suffix.len());
        let trimmed: String = untruncated.chars().take(budget).collect();
        base = format!("{}{suffix}", trimmed.trim_end_matches('-'));
        if !taken.contains(&base) {
            taken.insert(base.clone());
            return base;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_repo_name("My Cool Repo!"), "My-Cool-Repo");
        assert_eq!(sanitize_repo_name("team/project repo"), "team-project-repo");
    }

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize_repo_name("--a---b--"), "a-b");
        assert_eq!(sanitize_repo_name("...dotfiles"), "dotfiles");
    }

    #[test]
    fn test_sanitize_empty_input() {
        assert_eq!(sanitize_repo_name(""), "repo");
        assert_eq!(sanitize_repo_name("***"), "repo");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in [
            "My Cool Repo!",
            "--weird__name..",
            "normal-name",
            "a b c d",
            "...",
            "Ünïcode Nämé",
        ] {
            let once = sanitize_repo_name(raw);
            assert_eq!(sanitize_repo_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_repo_name(&long).len(), 100);
    }

    #[test]
    fn test_workflow_stem_normalizes() {
        let mut taken = HashSet::new();
        assert_eq!(workflow_stem("CI Build (main)", &mut taken), "ci-build-main");
    }

    #[test]
    fn test_workflow_stem_collisions_get_distinct_suffixes() {
        let mut taken = HashSet::new();
        let a = workflow_stem("Deploy", &mut taken);
        let b = workflow_stem("Deploy", &mut taken);
        let c = workflow_stem("Deploy", &mut taken);
        assert_eq!(a, "deploy");
        assert_eq!(b, "deploy-2");
        assert_eq!(c, "deploy-3");
    }

    #[test]
    fn test_workflow_stem_collision_respects_length_cap() {
        let mut taken = HashSet::new();
        let long = "p".repeat(80);
        let first = workflow_stem(&long, &mut taken);
        let second = workflow_stem(&long, &mut taken);
        assert_eq!(first.len(), 50);
        assert!(second.len() <= 50);
        assert!(second.ends_with("-2"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_workflow_stem_empty_name() {
        let mut taken = HashSet::new();
        assert_eq!(workflow_stem("", &mut taken), "workflow");
        assert_eq!(workflow_stem("  ", &mut taken), "workflow-2");
    }
}
