//! Command Resolver
//!
//! Walks a token path through the capability tree: direct lookups one token
//! at a time, then a compound-name attempt over the remaining tokens, then
//! (in wizard mode only) a confirmed fuzzy match against sibling names.

use crate::capability::{normalize_name, Command, Entry, Namespace, Registry};
use crate::error::EngineError;
use crate::prompt::Prompter;
use std::sync::Arc;
use tracing::debug;

/// Minimum similarity for a fuzzy suggestion.
const FUZZY_CUTOFF: f64 = 0.6;

/// Normalize a token for lookup: separators become `_`, `%` becomes `mod`.
pub fn normalize_token(token: &str) -> String {
    if token == "%" {
        return "mod".to_string();
    }
    normalize_name(token)
}

/// Where resolution currently stands.
#[derive(Clone)]
pub enum Target {
    Root,
    Namespace(Arc<Namespace>),
    Command(Arc<Command>),
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Root => write!(f, "Root"),
            Target::Namespace(ns) => write!(f, "Namespace({})", ns.name()),
            Target::Command(cmd) => write!(f, "Command({})", cmd.name()),
        }
    }
}

impl From<Entry> for Target {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Namespace(ns) => Target::Namespace(ns),
            Entry::Command(cmd) => Target::Command(cmd),
        }
    }
}

impl Target {
    pub fn command(&self) -> Option<&Arc<Command>> {
        match self {
            Target::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Result of walking a token path.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Object reached.
    pub target: Target,
    /// Tokens left for the binder.
    pub remaining: Vec<String>,
    /// Normalized names consumed, in order.
    pub path: Vec<String>,
    /// First lookup failure encountered, if any.
    pub error: Option<String>,
}

impl Resolution {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Resolves token paths against a [`Registry`].
pub struct Resolver<'a> {
    registry: &'a Registry,
    prompter: Option<&'a dyn Prompter>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            prompter: None,
        }
    }

    /// Enable fuzzy recovery, confirming each suggestion through `prompter`.
    pub fn with_fuzzy(mut self, prompter: &'a dyn Prompter) -> Self {
        self.prompter = Some(prompter);
        self
    }

    fn lookup(&self, at: &Target, name: &str) -> Result<Entry, String> {
        match at {
            Target::Root => self.registry.lookup(name),
            Target::Namespace(ns) => ns
                .get(name)
                .ok_or_else(|| format!("'{}' has no attribute '{}'", ns.name(), name)),
            Target::Command(cmd) => Err(format!("'{}' is a command", cmd.name())),
        }
    }

    fn siblings(&self, at: &Target) -> Vec<String> {
        match at {
            Target::Root => self.registry.names(),
            Target::Namespace(ns) => ns.names(),
            Target::Command(_) => Vec::new(),
        }
    }

    /// Resolve `tokens` starting from `start`.
    ///
    /// Only a declined fuzzy suggestion (or a failed prompt) is an error;
    /// an unmatched token ends resolution with `error` set.
    pub fn resolve(&self, start: Target, tokens: &[String]) -> Result<Resolution, EngineError> {
        let mut target = start;
        let mut remaining: Vec<String> = tokens.to_vec();
        let mut path = Vec::new();
        let mut error: Option<String> = None;

        while !remaining.is_empty() && !matches!(target, Target::Command(_)) {
            let normalized = normalize_token(&remaining[0]);
            match self.lookup(&target, &normalized) {
                Ok(entry) => {
                    target = entry.into();
                    path.push(normalized);
                    remaining.remove(0);
                    continue;
                }
                Err(e) => {
                    error.get_or_insert(e);
                }
            }

            if let Some((entry, size, joined)) = self.compound(&target, &remaining) {
                debug!(name = %joined, tokens = size, "Resolved compound name");
                path.push(joined);
                remaining.drain(..size);
                target = entry.into();
                return Ok(Resolution {
                    target,
                    remaining,
                    path,
                    error,
                });
            }

            match self.fuzzy(&target, &remaining[0], &normalized)? {
                Some((entry, name)) => {
                    target = entry.into();
                    path.push(name);
                    remaining.remove(0);
                }
                None => break,
            }
        }

        Ok(Resolution {
            target,
            remaining,
            path,
            error,
        })
    }

    /// Longest-first join of the leading tokens into a single name.
    fn compound(&self, at: &Target, tokens: &[String]) -> Option<(Entry, usize, String)> {
        for size in (2..=tokens.len()).rev() {
            let joined = tokens[..size]
                .iter()
                .map(|t| normalize_token(t))
                .collect::<Vec<_>>()
                .join("_");
            if let Ok(entry) = self.lookup(at, &joined) {
                return Some((entry, size, joined));
            }
        }
        None
    }

    fn fuzzy(
        &self,
        at: &Target,
        original: &str,
        normalized: &str,
    ) -> Result<Option<(Entry, String)>, EngineError> {
        let Some(prompter) = self.prompter else {
            return Ok(None);
        };
        let Some(guess) = closest_match(normalized, &self.siblings(at)) else {
            return Ok(None);
        };
        let question = format!("Unrecognized name '{}'. Did you mean '{}'?", original, guess);
        if !prompter.confirm(&question, true)? {
            return Err(EngineError::Aborted(format!(
                "uncertain name '{}'. Please be more specific.",
                original
            )));
        }
        match self.lookup(at, &guess) {
            Ok(entry) => Ok(Some((entry, guess))),
            Err(_) => Ok(None),
        }
    }
}

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Similarity in `[0, 1]` from the insert/delete edit distance of the
/// case- and punctuation-folded strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = fold(a);
    let b = fold(b);
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Substitution costs 2, so the distance counts inserts and deletes.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + if ca == cb { 0 } else { 2 };
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let distance = prev[b.len()];
    (total - distance) as f64 / total as f64
}

/// Best candidate at or above the cutoff; ties keep the earlier candidate.
pub fn closest_match(name: &str, candidates: &[String]) -> Option<String> {
    let mut best: Option<(f64, &String)> = None;
    for candidate in candidates {
        let score = similarity(name, candidate);
        if score >= FUZZY_CUTOFF && best.map_or(true, |(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, name)| name.clone())
}
