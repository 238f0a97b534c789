//! Code blocks and execution results

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Exit code reported by coreutils `timeout` when the limit is hit
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Language assumed for a fence without a tag
pub const DEFAULT_LANGUAGE: &str = "python";

/// A fenced code block proposed by the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
        }
    }

    pub fn python(code: impl Into<String>) -> Self {
        Self::new("python", code)
    }

    pub fn shell(code: impl Into<String>) -> Self {
        Self::new("sh", code)
    }

    /// Resolved interpreter, `None` when the language is not supported
    pub fn interpreter(&self) -> Option<Language> {
        Language::from_tag(&self.language)
    }
}

/// Languages the sandboxes can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Shell,
}

impl Language {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "python" | "py" | "python3" => Some(Language::Python),
            "bash" | "sh" | "shell" => Some(Language::Shell),
            _ => None,
        }
    }

    pub fn interpreter(&self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::Shell => "sh",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Shell => "sh",
        }
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+#.-]*)[^\n]*\n(.*?)```")
            .unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
    })
}

/// Extract fenced code blocks in order of appearance
///
/// A fence without a language tag is treated as python.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    fence_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let code = caps.get(2)?.as_str();
            if code.trim().is_empty() {
                return None;
            }
            let language = match caps.get(1).map(|m| m.as_str()) {
                Some(tag) if !tag.is_empty() => tag.to_ascii_lowercase(),
                _ => DEFAULT_LANGUAGE.to_string(),
            };
            Some(CodeBlock::new(language, code))
        })
        .collect()
}

/// How an execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,

    /// Program exited non-zero
    RuntimeError { exit_code: i32 },

    /// Program was killed after exceeding the sandbox timeout
    Timeout { after: Duration },

    /// No interpreter for the block's language
    Unsupported { language: String },
}

impl ExecutionOutcome {
    /// Short label used in executor messages
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success => "succeeded",
            ExecutionOutcome::RuntimeError { .. } => "ExecutionRuntimeError",
            ExecutionOutcome::Timeout { .. } => "ExecutionTimeoutError",
            ExecutionOutcome::Unsupported { .. } => "UnsupportedLanguage",
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success => write!(f, "succeeded"),
            ExecutionOutcome::RuntimeError { exit_code } => {
                write!(f, "ExecutionRuntimeError (exit code {})", exit_code)
            }
            ExecutionOutcome::Timeout { after } => {
                write!(f, "ExecutionTimeoutError (killed after {}s)", after.as_secs())
            }
            ExecutionOutcome::Unsupported { language } => {
                write!(f, "unsupported language '{}'", language)
            }
        }
    }
}

/// Result of running one code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Combined stdout and stderr
    pub output: String,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    /// Classify a process that ran directly by its exit code
    ///
    /// Exit code 124 is an ordinary runtime error here; only a command run
    /// under coreutils `timeout` uses it as a timeout marker.
    pub fn from_exit(exit_code: i32, output: impl Into<String>) -> Self {
        let outcome = match exit_code {
            0 => ExecutionOutcome::Success,
            code => ExecutionOutcome::RuntimeError { exit_code: code },
        };
        Self {
            exit_code,
            output: output.into(),
            outcome,
        }
    }

    /// Classify a process that ran under `timeout <limit>`
    pub fn from_timeout_wrapped_exit(
        exit_code: i32,
        output: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        if exit_code == TIMEOUT_EXIT_CODE {
            Self::timed_out(output, timeout)
        } else {
            Self::from_exit(exit_code, output)
        }
    }

    pub fn timed_out(output: impl Into<String>, timeout: Duration) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            output: output.into(),
            outcome: ExecutionOutcome::Timeout { after: timeout },
        }
    }

    pub fn unsupported(language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            exit_code: 1,
            output: format!("unknown language {}", language),
            outcome: ExecutionOutcome::Unsupported { language },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }
}

/// Join stdout and stderr the way executor messages show them
pub(crate) fn combine_output(stdout: &str, stderr: &str) -> String {
    let mut content = stdout.to_string();
    if !stderr.is_empty() {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(stderr);
    }
    content
}
