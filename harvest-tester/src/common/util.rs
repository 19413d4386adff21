use chrono::Utc;
use std::path::{Path, PathBuf};

/// Per-run state directory: `<base>/<scenario>/seed-<seed>/<timestamp>`.
pub fn run_dir(base: &Path, scenario: &str, seed: u64) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S%3f");
    base.join(slugify(scenario))
        .join(format!("seed-{seed}"))
        .join(ts.to_string())
}

/// Lowercase, dash-separated form of a scenario name.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Full Season - Grinder"), "full-season-grinder");
        assert_eq!(slugify("smoke"), "smoke");
    }

    #[test]
    fn run_dir_includes_key_segments() {
        let dir = run_dir(Path::new("target/state"), "High Roller", 42);
        let text = dir.to_string_lossy().replace('\\', "/");
        assert!(text.contains("target/state/high-roller/seed-42/"));
    }
}
