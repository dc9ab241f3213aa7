//! 外部格式化工具：依次尝试 clang-format、astyle、indent，全部失败时退回内置缩进

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::builtin::{reindent, BUILTIN_TOOL};
use crate::kernel::services::ports::formatter::{FormatError, FormatRequest, Formatted, Formatter};
use crate::kernel::services::ports::runtime::BoxFuture;
use crate::kernel::services::ports::settings::FormatterSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTool {
    ClangFormat,
    Astyle,
    Indent,
}

impl FormatTool {
    pub const ALL: [FormatTool; 3] = [FormatTool::ClangFormat, FormatTool::Astyle, FormatTool::Indent];

    pub fn program(self) -> &'static str {
        match self {
            FormatTool::ClangFormat => "clang-format",
            FormatTool::Astyle => "astyle",
            FormatTool::Indent => "indent",
        }
    }

    pub fn args(self, style: &str, source: &Path) -> Vec<String> {
        let source = source.display().to_string();
        match self {
            FormatTool::ClangFormat => vec![format!("-style={style}"), source],
            FormatTool::Astyle => vec![
                format!("--style={}", style.to_ascii_lowercase()),
                "--suffix=none".to_string(),
                "--quiet".to_string(),
                source,
            ],
            FormatTool::Indent => vec![source],
        }
    }

    /// clang-format prints to stdout; astyle and indent rewrite the file in place.
    fn writes_stdout(self) -> bool {
        self == FormatTool::ClangFormat
    }
}

#[derive(Debug, Clone)]
pub struct SystemFormatter {
    tools: Vec<FormatTool>,
    style: String,
    timeout: Duration,
    fallback_indent: Option<usize>,
}

impl SystemFormatter {
    pub fn new(settings: &FormatterSettings, indent_width: usize) -> Self {
        Self {
            tools: FormatTool::ALL.to_vec(),
            style: settings.style.clone(),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
            fallback_indent: settings.fallback.then_some(indent_width.max(1)),
        }
    }

    pub fn with_tools(mut self, tools: Vec<FormatTool>) -> Self {
        self.tools = tools;
        self
    }
}

impl Formatter for SystemFormatter {
    fn name(&self) -> String {
        let names: Vec<&str> = self.tools.iter().map(|t| t.program()).collect();
        names.join(",")
    }

    fn format(&self, request: FormatRequest) -> BoxFuture<Result<Formatted, FormatError>> {
        let this = self.clone();
        Box::pin(async move { this.run(request).await })
    }
}

impl SystemFormatter {
    async fn run(self, request: FormatRequest) -> Result<Formatted, FormatError> {
        let workdir = tempfile::Builder::new().prefix("chix-fmt-").tempdir()?;
        let source = workdir.path().join(&request.file_name);

        let mut last_error = None;
        for tool in &self.tools {
            match self.try_tool(*tool, &source, &request.text).await {
                Ok(text) => {
                    tracing::info!(buffer = %request.buffer, tool = tool.program(), "formatted");
                    return Ok(Formatted {
                        text,
                        tool: tool.program().to_string(),
                    });
                }
                Err(FormatError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(tool = tool.program(), "formatter not installed");
                }
                Err(e) => {
                    tracing::warn!(tool = tool.program(), error = %e, "formatter failed");
                    last_error = Some(e);
                }
            }
        }

        match self.fallback_indent {
            Some(width) => Ok(Formatted {
                text: reindent(&request.text, width),
                tool: BUILTIN_TOOL.to_string(),
            }),
            None => Err(last_error.unwrap_or(FormatError::Unavailable)),
        }
    }

    async fn try_tool(
        &self,
        tool: FormatTool,
        source: &Path,
        text: &str,
    ) -> Result<String, FormatError> {
        tokio::fs::write(source, text).await?;

        let mut cmd = Command::new(tool.program());
        cmd.args(tool.args(&self.style, source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(FormatError::Timeout {
                    tool: tool.program().to_string(),
                    timeout: self.timeout,
                })
            }
            Ok(result) => result?,
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FormatError::Failed {
                tool: tool.program().to_string(),
                message: stderr.lines().next().unwrap_or("non-zero exit").to_string(),
            });
        }

        if tool.writes_stdout() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Ok(tokio::fs::read_to_string(source).await?)
        }
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/formatter/system.rs"]
mod tests;
