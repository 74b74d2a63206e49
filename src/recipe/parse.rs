//! Recipe grammar.
//!
//! Lines are processed after joining backslash continuations. Block headers
//! (`prefix:` or a `--flag:` token) expand the `- ` and `--` lines that follow
//! them; indented `--` lines continue the previous command's prefix.

use super::CommandChunk;
use crate::error::EngineError;

/// Chunks and comments parsed from recipe text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecipe {
    pub chunks: Vec<CommandChunk>,
    pub comments: Vec<String>,
}

/// Normalize a section heading: `# ` + collapsed whitespace, case-folded.
pub fn normalize_heading(text: &str) -> String {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('#').unwrap_or(trimmed).trim_start();
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "#".to_string()
    } else {
        format!("# {}", collapsed).to_lowercase()
    }
}

/// A heading is a comment with exactly one leading `#`.
fn is_heading(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('#') && !text[1..].starts_with('#')
}

/// Split off an inline comment: a `#` preceded by whitespace.
fn split_inline_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return (&line[..i], Some(line[i..].trim()));
        }
    }
    (line, None)
}

fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut continuation: Option<String> = None;
    for raw in text.lines() {
        let line = match continuation.take() {
            Some(head) => head + raw.trim_start(),
            None => raw.to_string(),
        };
        match line.strip_suffix('\\') {
            Some(body) => continuation = Some(format!("{} ", body.trim_end())),
            None => lines.push(line),
        }
    }
    if let Some(rest) = continuation {
        lines.push(rest.trim_end().to_string());
    }
    lines
}

#[derive(Debug)]
struct Block {
    prefix: String,
    suffix: String,
}

impl Block {
    fn expand(&self, addition: &str) -> String {
        let mut line = format!("{} {}", self.prefix, addition);
        if !self.suffix.is_empty() {
            line.push(' ');
            line.push_str(&self.suffix);
        }
        line
    }
}

#[derive(Debug, Default)]
struct Parser {
    chunks: Vec<CommandChunk>,
    comments: Vec<String>,
    headings: Vec<String>,
    pending: Vec<String>,
    last_prefix: String,
    block: Option<Block>,
    section: Option<String>,
}

impl Parser {
    fn line(&mut self, line: &str) {
        let stripped = line.trim_start();
        if stripped.is_empty() {
            self.block = None;
            return;
        }
        if stripped.starts_with('#') {
            self.comment(stripped.trim_end());
            self.block = None;
            return;
        }

        let (command, inline) = split_inline_comment(line);
        let command = command.trim_end();
        let stripped = command.trim_start();
        if let Some(comment) = inline {
            self.comments.push(comment.to_string());
        }

        if let Some(block) = &self.block {
            if let Some(rest) = stripped.strip_prefix("- ") {
                let expanded = block.expand(rest.trim_start());
                self.command(&expanded, inline);
                return;
            }
            if stripped.starts_with("--") {
                let expanded = block.expand(stripped);
                self.command(&expanded, inline);
                return;
            }
            self.block = None;
        }

        if let Some(head) = stripped.strip_suffix(':') {
            let prefix = head.trim_end().to_string();
            self.last_prefix = prefix.clone();
            self.block = Some(Block {
                prefix,
                suffix: String::new(),
            });
            return;
        }

        let tokens: Vec<&str> = stripped.split_whitespace().collect();
        let flag_header = tokens
            .iter()
            .position(|t| t.starts_with("--") && t.len() > 3 && t.ends_with(':'));
        if let Some(idx) = flag_header {
            let mut head: Vec<&str> = tokens[..=idx].to_vec();
            let flag = head[idx].trim_end_matches(':');
            head[idx] = flag;
            let prefix = head.join(" ");
            let suffix = tokens[idx + 1..].join(" ");
            self.last_prefix = if suffix.is_empty() {
                prefix.clone()
            } else {
                format!("{} {}", prefix, suffix)
            };
            self.block = Some(Block { prefix, suffix });
            return;
        }

        let indented = command.starts_with(char::is_whitespace);
        if indented && stripped.starts_with("--") {
            if self.last_prefix.is_empty() {
                self.command(stripped, inline);
            } else {
                let expanded = format!("{} {}", self.last_prefix, stripped);
                self.command(&expanded, inline);
            }
            return;
        }

        self.last_prefix = tokens
            .iter()
            .take_while(|t| !t.starts_with("--"))
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        self.command(stripped, inline);
    }

    fn comment(&mut self, text: &str) {
        self.comments.push(text.to_string());
        if is_heading(text) {
            let heading = normalize_heading(text);
            self.headings.push(heading.clone());
            self.section = Some(heading);
        }
        self.pending.push(text.to_string());
    }

    fn command(&mut self, text: &str, inline: Option<&str>) {
        let tokens: Vec<String> = text.split_whitespace().map(String::from).collect();
        if tokens.is_empty() {
            return;
        }
        let mut notes = std::mem::take(&mut self.pending);
        if let Some(comment) = inline {
            notes.push(comment.to_string());
        }
        let comment = (!notes.is_empty()).then(|| notes.join("\n"));
        self.chunks.push(
            CommandChunk::new(tokens)
                .with_comment(comment)
                .with_section(self.section.clone()),
        );
    }

    fn finish(mut self) -> (Vec<CommandChunk>, Vec<String>, Vec<String>) {
        if !self.pending.is_empty() {
            let comment = self.pending.join("\n");
            self.chunks.push(
                CommandChunk::new(Vec::new())
                    .with_comment(Some(comment))
                    .with_section(self.section.clone()),
            );
        }
        (self.chunks, self.comments, self.headings)
    }
}

/// Parse recipe `text`. `label` names the recipe in errors.
///
/// With `section`, only prelude chunks (before the first heading) and the
/// chunks under a heading equal to `section` after normalization are kept.
pub fn parse_recipe(
    text: &str,
    label: &str,
    section: Option<&str>,
) -> Result<ParsedRecipe, EngineError> {
    let mut parser = Parser::default();
    for line in logical_lines(text) {
        parser.line(&line);
    }
    let (mut chunks, comments, headings) = parser.finish();

    if let Some(section) = section {
        let target = normalize_heading(section);
        if !headings.contains(&target) {
            return Err(EngineError::RecipeSectionNotFound {
                section: section.to_string(),
                recipe: label.to_string(),
            });
        }
        chunks.retain(|chunk| match chunk.section() {
            None => true,
            Some(heading) => heading == target,
        });
    }

    Ok(ParsedRecipe { chunks, comments })
}
