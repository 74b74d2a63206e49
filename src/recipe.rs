//! Recipe Loader
//!
//! Recipes are plain-text scripts of command lines. This module owns the chunk
//! type handed to the executor, recipe lookup on disk, and the helpers that
//! turn raw token lists into chunks or context entries.

mod locate;
mod parse;

pub use parse::{normalize_heading, parse_recipe, ParsedRecipe};

use crate::config::RecipeConfig;
use crate::error::EngineError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One command line's tokens plus optional comment and section metadata.
///
/// Chunks are never modified after parsing; callers that need different
/// tokens build a new chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandChunk {
    tokens: Vec<String>,
    comment: Option<String>,
    section: Option<String>,
}

impl CommandChunk {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            comment: None,
            section: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.section = section;
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Normalized heading of the section this chunk belongs to.
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<String>> for CommandChunk {
    fn from(tokens: Vec<String>) -> Self {
        Self::new(tokens)
    }
}

/// A loaded recipe file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub path: PathBuf,
    pub chunks: Vec<CommandChunk>,
    pub comments: Vec<String>,
}

impl Recipe {
    pub fn into_parts(self) -> (Vec<CommandChunk>, Vec<String>) {
        (self.chunks, self.comments)
    }
}

/// Finds recipe files by name in a list of search directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLoader {
    search_paths: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl Default for RecipeLoader {
    fn default() -> Self {
        Self::new(
            vec![PathBuf::from("recipes")],
            vec!["recipe".to_string(), "txt".to_string()],
        )
    }
}

impl RecipeLoader {
    pub fn new(search_paths: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            search_paths,
            extensions,
        }
    }

    /// Build from configuration; relative search paths are joined to `workspace`.
    pub fn from_config(config: &RecipeConfig, workspace: &Path) -> Self {
        let search_paths = config
            .paths
            .iter()
            .map(|path| {
                if path.is_absolute() {
                    path.clone()
                } else {
                    workspace.join(path)
                }
            })
            .collect();
        Self::new(search_paths, config.extensions.clone())
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Every path `locate` would try for `name`, in order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return vec![direct.to_path_buf()];
        }

        let names = locate::candidate_names(name, &self.extensions);
        let mut candidates = Vec::new();
        if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
            candidates.push(direct.to_path_buf());
        }
        for dir in &self.search_paths {
            for candidate in &names {
                candidates.push(dir.join(candidate));
            }
        }
        candidates
    }

    /// First existing candidate for `name`.
    pub fn locate(&self, name: &str) -> Result<PathBuf, EngineError> {
        let candidates = self.candidates(name);
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(EngineError::RecipeNotFound {
                tried: candidates
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            }),
        }
    }

    /// Locate, read and parse a recipe, optionally keeping only one section.
    pub fn load(&self, name: &str, section: Option<&str>) -> Result<Recipe, EngineError> {
        let path = self.locate(name)?;
        info!(recipe = %path.display(), "Loading commands from recipe");
        let text = fs::read_to_string(&path)?;
        let parsed = parse_recipe(&text, &path.display().to_string(), section)?;
        debug!(chunks = parsed.chunks.len(), "Parsed recipe");
        Ok(Recipe {
            path,
            chunks: parsed.chunks,
            comments: parsed.comments,
        })
    }
}

/// Split a flat token list into chunks on standalone `-` or `;` tokens.
pub fn split_line_chunks(tokens: &[String]) -> Vec<CommandChunk> {
    tokens
        .split(|token| token == "-" || token == ";")
        .filter(|part| !part.is_empty())
        .map(|part| CommandChunk::new(part.to_vec()))
        .collect()
}

/// Parse `--key value` / `--key` tokens into context entries; a bare flag is
/// `true`. Keys use `_` in place of `-`.
pub fn parse_recipe_context(tokens: &[String]) -> Result<IndexMap<String, Value>, EngineError> {
    let mut context = IndexMap::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let Some(key) = token.strip_prefix("--") else {
            return Err(EngineError::InvalidArgument(format!(
                "Unexpected argument: {}",
                token
            )));
        };
        if key.is_empty() {
            return Err(EngineError::InvalidArgument(
                "Expected a key after `--`".to_string(),
            ));
        }
        let key = key.replace('-', "_");
        match tokens.get(i + 1) {
            Some(next) if !next.starts_with("--") => {
                context.insert(key, Value::String(next.clone()));
                i += 2;
            }
            _ => {
                context.insert(key, Value::Bool(true));
                i += 1;
            }
        }
    }
    Ok(context)
}

/// True when `tokens` are entirely `--key [value]` pairs.
pub fn looks_like_context(tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if !token.starts_with("--") || token.len() <= 2 {
            return false;
        }
        i += 1;
        if i < tokens.len() && !tokens[i].starts_with("--") {
            i += 1;
        }
    }
    true
}
