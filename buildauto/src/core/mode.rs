//! Build modes and the literal token substitution that encodes them.
//!
//! A tracked file is "in" a mode purely by which of two tokens it references.
//! Switching modes rewrites one token into the other; nothing is parsed.

use std::borrow::Cow;
use std::fmt;

use anyhow::{Context, Result, anyhow};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

/// Which dependency reference tracked files should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Archive token → test token.
    Testing,
    /// Test token → archive token.
    Artifacts,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Testing => "testing",
            Mode::Artifacts => "artifacts",
        }
    }

    /// Returns `(from, to)`: the token this mode replaces and the token it writes.
    pub fn tokens<'a>(self, tokens: &'a ModeTokens) -> (&'a str, &'a str) {
        match self {
            Mode::Testing => (&tokens.archive, &tokens.test),
            Mode::Artifacts => (&tokens.test, &tokens.archive),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two literal substrings whose swap encodes a mode switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTokens {
    /// Reference used for release/artifacts builds.
    pub archive: String,
    /// Reference used for test builds.
    pub test: String,
}

impl Default for ModeTokens {
    fn default() -> Self {
        Self {
            archive: "dependencies-archive.gradle".to_string(),
            test: "dependencies-test.gradle".to_string(),
        }
    }
}

impl ModeTokens {
    /// Tokens must be non-empty and neither may contain the other, otherwise a
    /// switch followed by the opposite switch is not guaranteed to round-trip.
    pub fn validate(&self) -> Result<()> {
        if self.archive.is_empty() || self.test.is_empty() {
            return Err(anyhow!("mode tokens must be non-empty"));
        }
        if self.archive.contains(&self.test) || self.test.contains(&self.archive) {
            return Err(anyhow!(
                "mode tokens must not overlap (archive={:?}, test={:?})",
                self.archive,
                self.test
            ));
        }
        Ok(())
    }
}

/// A compiled, literal replacement for one mode.
#[derive(Debug, Clone)]
pub struct ModeSubstitution {
    mode: Mode,
    pattern: Regex,
    replacement: String,
}

impl ModeSubstitution {
    pub fn new(mode: Mode, tokens: &ModeTokens) -> Result<Self> {
        let (from, to) = mode.tokens(tokens);
        let pattern = Regex::new(&regex::escape(from))
            .with_context(|| format!("compile {mode} pattern for {from:?}"))?;
        Ok(Self {
            mode,
            pattern,
            replacement: to.to_string(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Replace every occurrence of the input token. Borrows when nothing matched.
    pub fn apply<'a>(&self, content: &'a str) -> Cow<'a, str> {
        self.pattern
            .replace_all(content, NoExpand(self.replacement.as_str()))
    }

    /// Number of occurrences `apply` would rewrite.
    pub fn count(&self, content: &str) -> usize {
        self.pattern.find_iter(content).count()
    }
}

/// Rewrite `content` into `mode`.
pub fn apply_mode(content: &str, mode: Mode, tokens: &ModeTokens) -> Result<String> {
    let substitution = ModeSubstitution::new(mode, tokens)?;
    Ok(substitution.apply(content).into_owned())
}

/// Which mode a file's content currently references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedMode {
    Testing,
    Artifacts,
    /// Both tokens present.
    Mixed,
    /// Neither token present.
    Untracked,
}

impl fmt::Display for DetectedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DetectedMode::Testing => "testing",
            DetectedMode::Artifacts => "artifacts",
            DetectedMode::Mixed => "mixed",
            DetectedMode::Untracked => "no mode token",
        };
        f.write_str(label)
    }
}

pub fn detect_mode(content: &str, tokens: &ModeTokens) -> DetectedMode {
    match (
        content.contains(&tokens.archive),
        content.contains(&tokens.test),
    ) {
        (true, true) => DetectedMode::Mixed,
        (true, false) => DetectedMode::Artifacts,
        (false, true) => DetectedMode::Testing,
        (false, false) => DetectedMode::Untracked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRADLE: &str = "apply plugin: 'java'\n\
        apply from: 'dependencies-archive.gradle'\n\
        // see dependencies-archive.gradle for pins\n";

    #[test]
    fn testing_rewrites_every_archive_reference() {
        let out = apply_mode(GRADLE, Mode::Testing, &ModeTokens::default()).expect("apply");
        assert!(!out.contains("dependencies-archive.gradle"));
        assert_eq!(out.matches("dependencies-test.gradle").count(), 2);
    }

    #[test]
    fn testing_then_artifacts_round_trips() {
        let tokens = ModeTokens::default();
        let testing = apply_mode(GRADLE, Mode::Testing, &tokens).expect("testing");
        let back = apply_mode(&testing, Mode::Artifacts, &tokens).expect("artifacts");
        assert_eq!(back, GRADLE);
    }

    #[test]
    fn artifacts_then_testing_round_trips() {
        let tokens = ModeTokens::default();
        let original = "apply from: 'dependencies-test.gradle'\n";
        let artifacts = apply_mode(original, Mode::Artifacts, &tokens).expect("artifacts");
        assert_eq!(artifacts, "apply from: 'dependencies-archive.gradle'\n");
        let back = apply_mode(&artifacts, Mode::Testing, &tokens).expect("testing");
        assert_eq!(back, original);
    }

    #[test]
    fn tokens_match_literally() {
        let tokens = ModeTokens::default();
        let content = "apply from: 'dependencies-archiveXgradle'\n";
        let out = apply_mode(content, Mode::Testing, &tokens).expect("apply");
        assert_eq!(out, content);
    }

    #[test]
    fn replacement_is_not_expanded() {
        let tokens = ModeTokens {
            archive: "deps-archive".to_string(),
            test: "$1-test".to_string(),
        };
        let out = apply_mode("a deps-archive b", Mode::Testing, &tokens).expect("apply");
        assert_eq!(out, "a $1-test b");
    }

    #[test]
    fn substitution_borrows_when_nothing_matches() {
        let sub = ModeSubstitution::new(Mode::Artifacts, &ModeTokens::default()).expect("sub");
        assert_eq!(sub.count(GRADLE), 0);
        assert!(matches!(sub.apply(GRADLE), Cow::Borrowed(_)));
    }

    #[test]
    fn detect_mode_classifies_content() {
        let tokens = ModeTokens::default();
        assert_eq!(detect_mode(GRADLE, &tokens), DetectedMode::Artifacts);
        assert_eq!(
            detect_mode("dependencies-test.gradle", &tokens),
            DetectedMode::Testing
        );
        assert_eq!(
            detect_mode("dependencies-test.gradle dependencies-archive.gradle", &tokens),
            DetectedMode::Mixed
        );
        assert_eq!(detect_mode("", &tokens), DetectedMode::Untracked);
    }

    #[test]
    fn validate_rejects_overlapping_tokens() {
        let tokens = ModeTokens {
            archive: "deps".to_string(),
            test: "deps-test".to_string(),
        };
        assert!(tokens.validate().is_err());
        assert!(ModeTokens::default().validate().is_ok());
    }

    #[test]
    fn modes_swap_tokens() {
        let tokens = ModeTokens::default();
        let (from, to) = Mode::Testing.tokens(&tokens);
        assert_eq!(Mode::Artifacts.tokens(&tokens), (to, from));
    }
}
