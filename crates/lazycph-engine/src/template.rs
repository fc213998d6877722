//! Command templates: `python3 {file}`, `g++ {file} -o {temp} -std=c++17`, ...
//!
//! Plain templates are split on whitespace into an argument vector and run
//! without a shell, so substituted paths can never change the command's
//! structure. Templates that need shell syntax (pipes, redirection, quoting)
//! run through `sh -c`; each substituted path is escaped for the quoting it
//! sits in (bare paths are single-quoted, `'{file}'` and `"{file}"` keep the
//! template's own quotes).

use crate::error::TemplateError;
use std::fmt;
use std::path::Path;
use std::process::Command;

pub const FILE_PLACEHOLDER: &str = "file";
pub const TEMP_PLACEHOLDER: &str = "temp";

/// Characters that force a template through the shell.
const SHELL_CHARS: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '"', '\'', '\\', '*', '?', '~',
];

/// A parsed, validated command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
    uses_temp: bool,
    needs_shell: bool,
}

/// A fully substituted command, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedCommand {
    /// Program plus argument vector, no shell involved.
    Direct { program: String, args: Vec<String> },
    /// Script for the platform shell (`sh -c` / `cmd /C`).
    Shell { script: String },
}

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut uses_file = false;
        let mut uses_temp = false;
        for name in placeholders(raw) {
            match name {
                FILE_PLACEHOLDER => uses_file = true,
                TEMP_PLACEHOLDER => uses_temp = true,
                other => {
                    return Err(TemplateError::UnknownPlaceholder {
                        template: raw.to_string(),
                        name: other.to_string(),
                    })
                }
            }
        }
        if !uses_file {
            return Err(TemplateError::MissingFile(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            uses_temp,
            needs_shell: raw.contains(SHELL_CHARS),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn uses_temp(&self) -> bool {
        self.uses_temp
    }

    pub fn needs_shell(&self) -> bool {
        self.needs_shell
    }

    /// First word of the template, i.e. the toolchain program.
    pub fn program(&self) -> &str {
        self.raw.split_whitespace().next().unwrap_or_default()
    }

    /// Substitute `{file}` and `{temp}`. Substitution is a single pass, so a
    /// path that itself contains `{temp}` is inserted literally.
    pub fn render(&self, file: &Path, temp: Option<&Path>) -> Result<RenderedCommand, TemplateError> {
        if self.uses_temp && temp.is_none() {
            return Err(TemplateError::MissingTemp(self.raw.clone()));
        }
        let file = file.to_string_lossy();
        let temp = temp.map(|t| t.to_string_lossy());

        if self.needs_shell {
            let script = substitute_shell(&self.raw, |name| match name {
                FILE_PLACEHOLDER => Some(file.to_string()),
                TEMP_PLACEHOLDER => temp.as_ref().map(|t| t.to_string()),
                _ => None,
            });
            return Ok(RenderedCommand::Shell { script });
        }

        let mut words = self.raw.split_whitespace().map(|word| {
            substitute(word, |name| match name {
                FILE_PLACEHOLDER => Some(file.to_string()),
                TEMP_PLACEHOLDER => temp.as_ref().map(|t| t.to_string()),
                _ => None,
            })
        });
        let program = words.next().ok_or(TemplateError::Empty)?;
        Ok(RenderedCommand::Direct {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl RenderedCommand {
    /// Name reported in launch errors.
    pub fn program(&self) -> &str {
        match self {
            RenderedCommand::Direct { program, .. } => program,
            RenderedCommand::Shell { .. } => SHELL_PROGRAM,
        }
    }

    pub fn to_command(&self) -> Command {
        match self {
            RenderedCommand::Direct { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            RenderedCommand::Shell { script } => {
                let mut cmd = Command::new(SHELL_PROGRAM);
                cmd.arg(SHELL_FLAG).arg(script);
                cmd
            }
        }
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedCommand::Direct { program, args } => {
                write!(f, "{}", program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            RenderedCommand::Shell { script } => write!(f, "{} {} {}", SHELL_PROGRAM, SHELL_FLAG, script),
        }
    }
}

#[cfg(not(windows))]
const SHELL_PROGRAM: &str = "sh";
#[cfg(not(windows))]
const SHELL_FLAG: &str = "-c";

#[cfg(windows)]
const SHELL_PROGRAM: &str = "cmd";
#[cfg(windows)]
const SHELL_FLAG: &str = "/C";

/// POSIX single-quote escaping: `it's` → `'it'\''s'`.
#[cfg(not(windows))]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(windows)]
pub fn shell_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Names of all `{name}` placeholders in `raw`. Braces around anything other
/// than an identifier (e.g. `{}`) are literal text.
fn placeholders(raw: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            _ => rest = after,
        }
    }
    names
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quoting context of a placeholder inside a shell template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Bare,
    Single,
    Double,
}

/// Escape `value` for the quoting context it is inserted into, so
/// `sh {file}`, `sh '{file}'` and `sh "{file}"` all pass the path as one word.
#[cfg(not(windows))]
fn quote_in(quoting: Quoting, value: &str) -> String {
    match quoting {
        Quoting::Bare => shell_quote(value),
        Quoting::Single => value.replace('\'', r"'\''"),
        Quoting::Double => {
            let mut out = String::with_capacity(value.len());
            for c in value.chars() {
                if matches!(c, '\\' | '"' | '$' | '`') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
    }
}

#[cfg(windows)]
fn quote_in(quoting: Quoting, value: &str) -> String {
    match quoting {
        Quoting::Double => value.replace('"', "\"\""),
        Quoting::Bare | Quoting::Single => shell_quote(value),
    }
}

/// Like [`substitute`], but tracks shell quoting while scanning. Single
/// quotes and backslash escapes only exist for POSIX shells.
fn substitute_shell<F>(input: &str, value: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let posix = cfg!(not(windows));
    let mut out = String::with_capacity(input.len());
    let mut quoting = Quoting::Bare;
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match (quoting, c) {
            (Quoting::Bare, '\'') if posix => quoting = Quoting::Single,
            (Quoting::Single, '\'') => quoting = Quoting::Bare,
            (Quoting::Bare, '"') => quoting = Quoting::Double,
            (Quoting::Double, '"') => quoting = Quoting::Bare,
            (Quoting::Bare | Quoting::Double, '\\') if posix => {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            (_, '{') => {
                let after = &input[i + 1..];
                let replacement = after
                    .find('}')
                    .filter(|close| is_identifier(&after[..*close]))
                    .and_then(|close| value(&after[..close]).map(|v| (close, v)));
                if let Some((close, v)) = replacement {
                    out.push_str(&quote_in(quoting, &v));
                    let end = i + 1 + close;
                    while chars.next_if(|(j, _)| *j <= end).is_some() {}
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Single-pass replacement of `{name}` with `value(name)`; placeholders with
/// no value are kept as written.
fn substitute<F>(input: &str, value: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                let name = &after[..close];
                match value(name) {
                    Some(v) => out.push_str(&v),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
