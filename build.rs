use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Words that may not appear in comments. Comments describe the code as it is, not the
// history of how it got there.
const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED", "CORRECTED", "FIX", "FIXES", "NEW", "CHANGED", "CHANGES", "CHANGE", "MODIFIED",
    "MODIFIES", "MODIFY", "UPDATED", "UPDATES", "UPDATE",
];

// One source-hygiene rule: a line pattern, a filter that decides whether a matching
// line really violates it, and the explanation printed on failure.
struct Rule {
    what: &'static str,
    pattern: String,
    violates: fn(&str) -> bool,
    advice: &'static str,
    include_build_script: bool,
}

// Collects every violating line of one file so the report can list them all at once.
struct LineCollector {
    violates: fn(&str) -> bool,
    violations: Vec<String>,
}

impl Sink for LineCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.violates)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

// An underscore-prefixed name counts unless the line is a comment or the name only
// appears inside a string literal.
fn underscore_binding(line: &str) -> bool {
    let pure_comment = line.trim_start().starts_with("//")
        || (line.contains("/*") && !line.contains("*/match") && !line.contains("*/let"));
    let in_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !pure_comment && !in_string
}

fn always(line: &str) -> bool {
    !line.is_empty()
}

// Doc comments may use `**` for emphasis; plain comments may not.
fn stars_outside_doc_comment(line: &str) -> bool {
    !is_doc_comment(line)
}

// The text of a comment with its marker removed, when the line is a comment.
fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    let start = line.find("/*")? + 2;
    let rest = &line[start..];
    Some(rest.find("*/").map_or(rest, |end| &rest[..end]).trim())
}

fn shouting_comment(line: &str) -> bool {
    let Some(text) = comment_text(line) else {
        return false;
    };
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            what: "underscore-prefixed variables",
            pattern: r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            violates: underscore_binding,
            advice: "Underscore-prefixed variable names are not allowed in this project.\n   \
                     Either use the binding or remove it completely.",
            include_build_script: true,
        },
        Rule {
            what: "comments with forbidden words",
            pattern: format!(r"(//|/\*|///).*(?:{})", FORBIDDEN_WORDS.join("|")),
            violates: always,
            advice: "Comments may not narrate edits. Describe what the code does instead.",
            include_build_script: false,
        },
        Rule {
            what: "comments using '**'",
            pattern: r"(//|/\*).*\*\*".to_string(),
            violates: stars_outside_doc_comment,
            advice: "The '**' pattern is not allowed in regular comments (but is allowed in doc comments).",
            include_build_script: false,
        },
        Rule {
            what: "comments with all uppercase alphabetic characters",
            pattern: r"(//|/\*|///).*".to_string(),
            violates: shouting_comment,
            advice: "Comments where all alphabetic characters are uppercase are not allowed.",
            include_build_script: false,
        },
        Rule {
            what: "#[allow(dead_code)] attributes",
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
            violates: always,
            advice: "Either use the code (removing the attribute) or remove it completely.",
            include_build_script: false,
        },
    ]
}

// Every Rust file of the package. The read-only reference pack under `examples/` and
// build output under `target/` are not part of the package and are skipped.
fn rust_sources(include_build_script: bool) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(".")
        .into_iter()
        .filter_entry(|e| {
            let path = e.path();
            !path.starts_with("./target") && !path.starts_with("./examples")
        })
        .filter_map(|e| e.ok())
        .filter(move |e| include_build_script || e.file_name() != "build.rs")
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
}

fn report(rule: &Rule, path: &Path, violations: &[String]) -> String {
    let file_name = path.to_str().unwrap_or("?");
    let mut error_msg = format!(
        "\n❌ ERROR: Found {} {} in {}:\n",
        violations.len(),
        rule.what,
        file_name
    );
    for violation in violations {
        error_msg.push_str(&format!("   {violation}\n"));
    }
    error_msg.push_str(&format!("\n⚠️ {}\n", rule.advice));
    error_msg
}

fn scan(rule: &Rule) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(&rule.pattern)?;
    let mut searcher = Searcher::new();

    for entry in rust_sources(rule.include_build_script) {
        let path: PathBuf = entry.path().to_path_buf();
        let mut collector = LineCollector {
            violates: rule.violates,
            violations: Vec::new(),
        };
        searcher.search_path(&matcher, &path, &mut collector)?;
        if !collector.violations.is_empty() {
            return Err(report(rule, &path, &collector.violations).into());
        }
    }
    Ok(())
}

fn main() {
    // Always rerun this script if the build script itself changes.
    println!("cargo:rerun-if-changed=build.rs");

    // Stamp the build so `causa version` can report its age.
    let build_timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!("cargo:rustc-env=CAUSA_BUILD_TIMESTAMP={build_timestamp}");

    for rule in rules() {
        if let Err(e) = scan(&rule) {
            // The `eprintln!` is what makes the report visible in cargo's output.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
