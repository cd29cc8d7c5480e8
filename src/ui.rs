use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a structured diagnostic: a short title, then indented detail lines
pub fn diagnostic(title: &str, detail: &str) {
    eprintln!("{} {}", "✗".red(), title.red().bold());
    for line in detail.lines() {
        eprintln!("    {}", line.dimmed());
    }
}

/// Render an `anyhow` chain as a diagnostic.
///
/// A `hostkit::Error` anywhere in the chain supplies the title and detail;
/// otherwise the outermost message is the title.
pub fn report_error(err: &anyhow::Error) {
    match err.chain().find_map(|e| e.downcast_ref::<hostkit::Error>()) {
        Some(host_err) => {
            let mut detail = host_err.detail();
            let context = err.to_string();
            if context != host_err.to_string() {
                detail = format!("{context}\n{detail}");
            }
            diagnostic(&host_err.title(), &detail);
            dim(host_err.category().advice());
        }
        None => {
            let mut chain = err.chain();
            let title = chain.next().map(ToString::to_string).unwrap_or_default();
            let detail: Vec<String> = chain.map(ToString::to_string).collect();
            diagnostic(&title, &detail.join("\n"));
        }
    }
}

/// Truncate text for single-line display, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_len && !text.contains('\n') {
        first_line.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = first_line.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("command failed badly", 10), "command...");
    }

    #[test]
    fn test_truncate_multiline_keeps_first_line() {
        assert_eq!(truncate("first\nsecond", 20), "first...");
    }

    #[test]
    fn test_truncate_edge_cases() {
        assert_eq!(truncate("test", 3), "...");
        assert_eq!(truncate("", 10), "");
    }
}
