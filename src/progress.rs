//! Tree-style progress lines for completed captures.

use std::sync::Arc;

use crate::types::CaptureResult;

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

const BRANCH: &str = "├─";
const LAST_BRANCH: &str = "└─";

/// Emits one line per completed capture through a [`ProgressCallback`].
pub struct ProgressReporter {
    total: usize,
    completed: usize,
    colorize: bool,
    sink: ProgressCallback,
}

impl ProgressReporter {
    pub fn new(total: usize, colorize: bool, sink: ProgressCallback) -> Self {
        Self {
            total,
            completed: 0,
            colorize,
            sink,
        }
    }

    /// Callback printing to stderr.
    pub fn stderr_sink() -> ProgressCallback {
        Arc::new(|line: &str| eprintln!("{line}"))
    }

    pub fn header(&self, origin: &str) {
        (self.sink)(&format!(
            "Generating {} preview image{} from {origin}",
            self.total,
            if self.total == 1 { "" } else { "s" }
        ));
    }

    pub fn report(&mut self, result: &CaptureResult) {
        let line = format_line(result, self.completed, self.total, self.colorize);
        self.completed += 1;
        (self.sink)(&line);
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

/// Render the line for the `index`-th (zero-based) of `total` results.
pub fn format_line(result: &CaptureResult, index: usize, total: usize, colorize: bool) -> String {
    let glyph = if index + 1 >= total { LAST_BRANCH } else { BRANCH };
    let percent = if total == 0 {
        100
    } else {
        ((index + 1) * 100) / total
    };
    let path = result.output_path.display().to_string();
    let elapsed = format!("({}ms)", result.elapsed.as_millis());
    let (marker, path) = match &result.error {
        None => (color("✔", "32", colorize), color(&path, "32", colorize)),
        Some(_) => (color("✘", "31", colorize), color(&path, "31", colorize)),
    };
    let mut line = format!(
        "  {} {} {} {} {}",
        color(glyph, "90", colorize),
        marker,
        path,
        color(&elapsed, "90", colorize),
        color(&format!("{percent}%"), "90", colorize)
    );
    if let Some(err) = &result.error {
        line.push_str(&format!(" {}", color(err, "31", colorize)));
    }
    line
}

/// Apply ANSI color if colorize is enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    fn result(path: &str, error: Option<&str>) -> CaptureResult {
        CaptureResult {
            route: "/".to_string(),
            output_path: PathBuf::from(path),
            elapsed: Duration::from_millis(120),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn last_line_uses_terminal_glyph_and_full_percentage() {
        let first = format_line(&result("a/__og_image__/og.png", None), 0, 3, false);
        let last = format_line(&result("c/__og_image__/og.png", None), 2, 3, false);
        assert_eq!(first, "  ├─ ✔ a/__og_image__/og.png (120ms) 33%");
        assert_eq!(last, "  └─ ✔ c/__og_image__/og.png (120ms) 100%");
    }

    #[test]
    fn failures_are_marked_and_carry_the_error() {
        let line = format_line(&result("b/__og_image__/og.png", Some("boom")), 1, 3, false);
        assert!(line.starts_with("  ├─ ✘ b/__og_image__/og.png"));
        assert!(line.ends_with("66% boom"));
    }

    #[test]
    fn colorized_lines_differ_by_outcome() {
        let ok = format_line(&result("x.png", None), 0, 1, true);
        let failed = format_line(&result("x.png", Some("e")), 0, 1, true);
        assert!(ok.contains("\x1b[32mx.png"));
        assert!(failed.contains("\x1b[31mx.png"));
    }

    #[test]
    fn reporter_emits_lines_in_order() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let sink: ProgressCallback = Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_string());
        });
        let mut reporter = ProgressReporter::new(2, false, sink);
        reporter.header("http://localhost:3000");
        reporter.report(&result("one.png", None));
        reporter.report(&result("two.png", Some("bad")));

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Generating 2 preview images from http://localhost:3000");
        assert!(lines[1].contains("├─") && lines[1].contains("one.png"));
        assert!(lines[2].contains("└─") && lines[2].contains("two.png"));
        assert_eq!(reporter.completed(), 2);
    }
}
