//! The gate every change passes before it reaches its target file.

use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;
use treadle_config::ConflictPolicy;

use super::APPLY_TARGET;
use crate::storage::Storage;

/// Bytes of a new file shown by the interactive prompt.
pub const PREVIEW_BYTES: usize = 500;

/// Whether a change creates a file or modifies an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// The target did not exist.
    Create,
    /// The target existed and is being replaced.
    Modify,
}

impl ChangeAction {
    /// Returns `create` or `modify`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed change, handed to the resolver once per apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Create or modify.
    pub action: ChangeAction,
    /// Target file.
    pub file_name: PathBuf,
    /// Content before the change; empty for new files.
    pub old_content: String,
    /// Content after the change.
    pub new_content: String,
    /// Advisory diff between the two.
    pub diff: String,
}

/// Decides whether a staged change is persisted.
///
/// `target` is the file being changed and `staged` the temporary file that
/// already holds the new content.
pub trait ConflictResolver: Send + Sync {
    /// Returns `true` to accept the change.
    fn resolve(
        &self,
        storage: &dyn Storage,
        target: &Path,
        staged: &Path,
        change: &ChangeRecord,
    ) -> bool;
}

impl<F> ConflictResolver for F
where
    F: Fn(&dyn Storage, &Path, &Path, &ChangeRecord) -> bool + Send + Sync,
{
    fn resolve(
        &self,
        storage: &dyn Storage,
        target: &Path,
        staged: &Path,
        change: &ChangeRecord,
    ) -> bool {
        self(storage, target, staged, change)
    }
}

/// Accepts every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ConflictResolver for AcceptAll {
    fn resolve(&self, _: &dyn Storage, _: &Path, _: &Path, _: &ChangeRecord) -> bool {
        true
    }
}

/// Rejects every change; useful as a dry run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl ConflictResolver for RejectAll {
    fn resolve(&self, _: &dyn Storage, _: &Path, _: &Path, _: &ChangeRecord) -> bool {
        false
    }
}

/// Shows each change and asks for confirmation.
///
/// Anything other than `y` or `yes` rejects, including empty input, end of
/// input and read errors.
#[derive(Debug)]
pub struct Prompt<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> Prompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    /// Creates a prompt reading answers from `input` and writing to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    /// Returns the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        self.io
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Prompt<BufReader<io::Stdin>, io::Stdout> {
    /// Creates a prompt on the process's standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

fn preview(content: &str) -> String {
    if content.len() <= PREVIEW_BYTES {
        return content.to_owned();
    }
    let mut end = PREVIEW_BYTES;
    while !content.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    format!(
        "{}\n... (truncated, {} bytes total)",
        content.get(..end).unwrap_or_default(),
        content.len()
    )
}

fn describe(output: &mut impl Write, change: &ChangeRecord) -> io::Result<()> {
    writeln!(output, "\n=== File: {} ===", change.file_name.display())?;
    writeln!(output, "Action: {}", change.action)?;
    match change.action {
        ChangeAction::Modify => {
            writeln!(output, "\nChanges to be applied:")?;
            writeln!(output, "{}", change.diff)?;
        }
        ChangeAction::Create => {
            writeln!(output, "\nNew file will be created with content:")?;
            writeln!(output, "{}", preview(&change.new_content))?;
        }
    }
    write!(output, "\nApply these changes? [y/N]: ")?;
    output.flush()
}

/// Returns whether `answer` accepts.
fn accepts(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl<R, W> ConflictResolver for Prompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn resolve(&self, _: &dyn Storage, _: &Path, _: &Path, change: &ChangeRecord) -> bool {
        let Ok(mut guard) = self.io.lock() else {
            return false;
        };
        let (input, output) = &mut *guard;
        if let Err(err) = describe(output, change) {
            warn!(
                target: APPLY_TARGET,
                file = %change.file_name.display(),
                error = %err,
                "could not write conflict prompt"
            );
            return false;
        }
        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => accepts(&answer),
        }
    }
}

/// Builds the resolver a configured policy names.
#[must_use]
pub fn resolver_for(policy: ConflictPolicy) -> Box<dyn ConflictResolver> {
    match policy {
        ConflictPolicy::Accept => Box::new(AcceptAll),
        ConflictPolicy::Reject => Box::new(RejectAll),
        ConflictPolicy::Ask => Box::new(Prompt::stdio()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;
    use crate::storage::MemoryStorage;

    fn change(action: ChangeAction, new_content: &str) -> ChangeRecord {
        ChangeRecord {
            action,
            file_name: PathBuf::from("models/user.go"),
            old_content: String::new(),
            new_content: new_content.to_owned(),
            diff: "--- models/user.go\n+++ models/user.go\n@@ -1,1 +1,1 @@\n-a\n+b\n".to_owned(),
        }
    }

    fn ask(answer: &str, change: &ChangeRecord) -> (bool, String) {
        let prompt = Prompt::new(Cursor::new(answer.as_bytes().to_vec()), Vec::new());
        let accepted = prompt.resolve(
            &MemoryStorage::new(),
            Path::new("models/user.go"),
            Path::new("models/.tmp"),
            change,
        );
        let (_, output) = prompt.into_inner();
        (accepted, String::from_utf8(output).expect("utf8"))
    }

    #[rstest]
    #[case("y\n", true)]
    #[case("YES\n", true)]
    #[case("  yes  \n", true)]
    #[case("\n", false)]
    #[case("no\n", false)]
    #[case("sure\n", false)]
    #[case("", false)]
    fn only_yes_accepts(#[case] answer: &str, #[case] expected: bool) {
        let (accepted, _) = ask(answer, &change(ChangeAction::Modify, "b\n"));
        assert_eq!(accepted, expected);
    }

    #[test]
    fn modify_prompt_shows_diff() {
        let (_, output) = ask("n\n", &change(ChangeAction::Modify, "b\n"));
        assert!(output.contains("=== File: models/user.go ==="));
        assert!(output.contains("Action: modify"));
        assert!(output.contains("-a\n+b\n"));
        assert!(output.ends_with("Apply these changes? [y/N]: "));
    }

    #[test]
    fn create_prompt_truncates_long_content() {
        let content = "x".repeat(PREVIEW_BYTES + 20);
        let (_, output) = ask("n\n", &change(ChangeAction::Create, &content));
        assert!(output.contains("Action: create"));
        assert!(output.contains(&format!("{}\n... (truncated", "x".repeat(PREVIEW_BYTES))));
        assert!(!output.contains(&"x".repeat(PREVIEW_BYTES + 1)));
    }

    #[test]
    fn closures_are_resolvers() {
        let only_go = |_: &dyn Storage, target: &Path, _: &Path, _: &ChangeRecord| {
            target.extension().is_some_and(|ext| ext == "go")
        };
        let storage = MemoryStorage::new();
        let record = change(ChangeAction::Create, "");
        assert!(only_go.resolve(&storage, Path::new("a.go"), Path::new("t"), &record));
        assert!(!only_go.resolve(&storage, Path::new("a.txt"), Path::new("t"), &record));
    }

    #[rstest]
    #[case(ConflictPolicy::Accept, true)]
    #[case(ConflictPolicy::Reject, false)]
    fn canned_policies(#[case] policy: ConflictPolicy, #[case] expected: bool) {
        let resolver = resolver_for(policy);
        let record = change(ChangeAction::Create, "");
        assert_eq!(
            resolver.resolve(&MemoryStorage::new(), Path::new("a.go"), Path::new("t"), &record),
            expected
        );
    }
}
