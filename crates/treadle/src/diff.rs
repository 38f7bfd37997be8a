//! Advisory unified-style diffs for reviewing a change before it is applied.
//!
//! Lines are compared by position, not by edit distance: an inserted line
//! shows every following line as changed until the texts line up again.
//! The output is meant for people and is never parsed back.

/// Lines of context kept around each hunk.
pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Default)]
struct Hunk {
    start: usize,
    old_count: usize,
    new_count: usize,
    lines: Vec<String>,
}

impl Hunk {
    fn open(start: usize, context: &[&str]) -> Self {
        let mut hunk = Self {
            start,
            ..Self::default()
        };
        for line in context {
            hunk.context(line);
        }
        hunk
    }

    fn context(&mut self, line: &str) {
        self.lines.push(format!(" {line}"));
        self.old_count += 1;
        self.new_count += 1;
    }

    fn removed(&mut self, line: &str) {
        self.lines.push(format!("-{line}"));
        self.old_count += 1;
    }

    fn added(&mut self, line: &str) {
        self.lines.push(format!("+{line}"));
        self.new_count += 1;
    }

    fn write_to(&self, out: &mut String) {
        let line = self.start.saturating_add(1);
        out.push_str(&format!(
            "@@ -{line},{} +{line},{} @@\n",
            self.old_count, self.new_count
        ));
        for text in &self.lines {
            out.push_str(text);
            out.push('\n');
        }
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines
}

/// Renders the change from `old` to `new` for the file `name`.
///
/// An empty `old` is reported as a new file: every line of `new` is added
/// against `/dev/null`.
#[must_use]
pub fn unified(old: &str, new: &str, name: &str) -> String {
    let new_lines = split_lines(new);
    if old.is_empty() {
        let mut out = format!("--- /dev/null\n+++ {name}\n");
        for line in new_lines {
            out.push('+');
            out.push_str(line);
            out.push('\n');
        }
        return out;
    }

    let old_lines = split_lines(old);
    let mut out = format!("--- {name}\n+++ {name}\n");
    let total = old_lines.len().max(new_lines.len());
    let same = |index: usize| match (old_lines.get(index), new_lines.get(index)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    let mut hunk: Option<Hunk> = None;
    let mut matching_run = 0;
    for index in 0..total {
        if same(index) {
            let Some(open) = hunk.as_mut() else {
                continue;
            };
            open.context(old_lines.get(index).copied().unwrap_or_default());
            matching_run += 1;
            let next = index.saturating_add(1);
            if matching_run >= CONTEXT_LINES && (next >= total || same(next)) {
                if let Some(done) = hunk.take() {
                    done.write_to(&mut out);
                }
            }
            continue;
        }
        matching_run = 0;
        let open = hunk.get_or_insert_with(|| {
            let start = index.saturating_sub(CONTEXT_LINES);
            Hunk::open(start, old_lines.get(start..index).unwrap_or_default())
        });
        if let Some(line) = old_lines.get(index) {
            open.removed(line);
        }
        if let Some(line) = new_lines.get(index) {
            open.added(line);
        }
    }
    if let Some(done) = hunk {
        done.write_to(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_files_add_every_line() {
        assert_eq!(
            unified("", "package main\n\nfunc main() {}\n", "main.go"),
            "--- /dev/null\n+++ main.go\n+package main\n+\n+func main() {}\n"
        );
    }

    #[test]
    fn single_change_has_context_on_both_sides() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let new = "a\nb\nc\nd\nE\nf\ng\nh\n";
        assert_eq!(
            unified(old, new, "x.go"),
            "--- x.go\n+++ x.go\n@@ -2,7 +2,7 @@\n b\n c\n d\n-e\n+E\n f\n g\n h\n"
        );
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n";
        let new = "one\n2\n3\n4\n5\n6\n7\n8\n9\nten\n";
        let diff = unified(old, new, "n.txt");
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("@@ -1,4 +1,4 @@\n-1\n+one\n 2\n 3\n 4\n"));
        assert!(diff.contains("@@ -7,4 +7,4 @@\n 7\n 8\n 9\n-10\n+ten\n"));
    }

    #[test]
    fn close_changes_share_a_hunk() {
        let old = "a\nb\nc\nd\ne\n";
        let new = "A\nb\nc\nd\nE\n";
        let diff = unified(old, new, "x");
        assert_eq!(diff.matches("@@ -").count(), 1);
    }

    #[test]
    fn appended_lines_only_add() {
        let diff = unified("a\n", "a\nb\n", "x");
        assert_eq!(diff, "--- x\n+++ x\n@@ -1,1 +1,2 @@\n a\n+b\n");
    }

    #[test]
    fn identical_content_has_no_hunks() {
        assert_eq!(unified("a\nb\n", "a\nb\n", "x"), "--- x\n+++ x\n");
    }
}
