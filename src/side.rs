//! Side-Queue Scheduler
//!
//! Background commands wait on one or more named FIFO queues and start on a
//! dedicated thread once they are at the head of every queue they belong to
//! and none of those queues has a running command. Queue bookkeeping happens
//! under a single lock that is never held while a command runs.

use crate::binder::join_unquoted_kwargs;
use crate::engine::Engine;
use crate::resolver::{Resolver, Target};
use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Queue used when a command names none.
pub const DEFAULT_QUEUE: &str = "__side_default__";

const FALSEY: &[&str] = &[
    "", "0", "false", "f", "no", "n", "off", "none", "null", "nil", "undefined",
];

/// Permissive truthiness used for `--when` conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !FALSEY.contains(&s.trim().to_lowercase().as_str()),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Outcome of an enqueue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideState {
    /// The `when` condition was false; nothing was queued.
    Skipped,
    /// Queues were created but no command was given.
    Ready,
    /// Waiting behind other commands.
    Queued,
    /// Launched immediately.
    Started,
}

/// Status record returned to the enqueuing caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub queues: Vec<String>,
    pub command: Option<String>,
    pub status: SideState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// RFC 3339 time the request was handled.
    pub at: String,
}

#[derive(Debug)]
struct SideCommand {
    id: u64,
    tokens: Vec<String>,
    queues: Vec<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<u64>,
    current: Option<u64>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    queues: HashMap<String, QueueState>,
    pending: Vec<Arc<SideCommand>>,
    running: usize,
    next_id: u64,
}

impl SchedulerState {
    fn is_ready(&self, command: &SideCommand) -> bool {
        command.queues.iter().all(|name| match self.queues.get(name) {
            Some(queue) => queue.current.is_none() && queue.pending.front() == Some(&command.id),
            None => false,
        })
    }

    /// Move every ready pending command into the running slots of its queues.
    fn collect_ready(&mut self) -> Vec<Arc<SideCommand>> {
        let mut ready = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if !self.is_ready(&self.pending[index]) {
                index += 1;
                continue;
            }
            let command = self.pending.remove(index);
            for name in &command.queues {
                if let Some(queue) = self.queues.get_mut(name) {
                    queue.pending.pop_front();
                    queue.current = Some(command.id);
                }
            }
            self.running += 1;
            ready.push(command);
        }
        ready
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running == 0
    }
}

/// Named background queues shared by an engine.
#[derive(Debug)]
pub struct SideScheduler {
    default_queue: String,
    state: Mutex<SchedulerState>,
    idle: Condvar,
}

impl Default for SideScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE)
    }
}

impl SideScheduler {
    pub fn new(default_queue: &str) -> Self {
        Self {
            default_queue: default_queue.to_string(),
            state: Mutex::new(SchedulerState {
                next_id: 1,
                ..Default::default()
            }),
            idle: Condvar::new(),
        }
    }

    pub fn default_queue(&self) -> &str {
        &self.default_queue
    }

    /// Names of every queue created so far, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.queues.keys().cloned().collect();
        names.sort();
        names
    }

    fn queue_list(&self, queues: &[String]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for token in queues {
            let name = token.trim_end_matches(':');
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            names.push(self.default_queue.clone());
        }
        names
    }

    /// Schedule `tokens` on `queues`, unless `when` resolves to a false value.
    pub fn enqueue(
        &self,
        engine: &Arc<Engine>,
        queues: &[String],
        tokens: &[String],
        when: Option<&str>,
    ) -> SideStatus {
        let queues = self.queue_list(queues);
        let command_text = tokens.join(" ");

        if let Some(condition) = when {
            let resolved = match engine.store().resolve(condition) {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(e) => {
                    debug!(condition, error = %e, "Failed to resolve --when, using raw text");
                    Value::String(condition.to_string())
                }
            };
            if !is_truthy(&resolved) {
                debug!(
                    command = %command_text,
                    ?queues,
                    condition,
                    "Skipped side command"
                );
                return SideStatus {
                    id: None,
                    queues,
                    command: (!command_text.is_empty()).then_some(command_text),
                    status: SideState::Skipped,
                    when: Some(condition.to_string()),
                    at: Utc::now().to_rfc3339(),
                };
            }
        }

        let mut state = self.state.lock();
        for name in &queues {
            state.queues.entry(name.clone()).or_default();
        }

        if tokens.is_empty() {
            debug!(?queues, "Initialized side queues");
            return SideStatus {
                id: None,
                queues,
                command: None,
                status: SideState::Ready,
                when: when.map(String::from),
                at: Utc::now().to_rfc3339(),
            };
        }

        let id = state.next_id;
        state.next_id += 1;
        let command = Arc::new(SideCommand {
            id,
            tokens: tokens.to_vec(),
            queues: queues.clone(),
        });
        for name in &queues {
            if let Some(queue) = state.queues.get_mut(name) {
                queue.pending.push_back(id);
            }
        }
        state.pending.push(command);
        let ready = state.collect_ready();
        drop(state);

        let started = ready.iter().any(|c| c.id == id);
        for next in ready {
            launch(engine, next);
        }

        let status = if started {
            SideState::Started
        } else {
            SideState::Queued
        };
        info!(id, ?queues, command = %command_text, ?status, "Side command scheduled");
        SideStatus {
            id: Some(id),
            queues,
            command: Some(command_text),
            status,
            when: when.map(String::from),
            at: Utc::now().to_rfc3339(),
        }
    }

    /// Release `command`'s queues and return the commands that became ready.
    fn finish(&self, command: &SideCommand) -> Vec<Arc<SideCommand>> {
        let mut state = self.state.lock();
        for name in &command.queues {
            if let Some(queue) = state.queues.get_mut(name) {
                if queue.current == Some(command.id) {
                    queue.current = None;
                }
            }
        }
        state.running = state.running.saturating_sub(1);
        let ready = state.collect_ready();
        self.idle.notify_all();
        ready
    }

    /// Block until nothing is pending or running, or `timeout` passes.
    /// Returns whether the scheduler is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.is_idle() {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return state.is_idle();
            }
        }
        true
    }

    /// Block until every pending and running side command has finished.
    pub fn wait_all(&self) {
        let mut state = self.state.lock();
        while !state.is_idle() {
            self.idle.wait(&mut state);
        }
    }
}

fn launch(engine: &Arc<Engine>, command: Arc<SideCommand>) {
    let worker_engine = Arc::clone(engine);
    let worker_command = Arc::clone(&command);
    debug!(id = command.id, tokens = ?command.tokens, queues = ?command.queues, "Starting side command");

    let spawned = thread::Builder::new()
        .name(format!("side-{}", command.id))
        .spawn(move || run_worker(worker_engine, worker_command));

    if let Err(e) = spawned {
        error!(id = command.id, error = %e, "Failed to spawn side worker");
        for next in engine.side().finish(&command) {
            launch(engine, next);
        }
    }
}

fn run_worker(engine: Arc<Engine>, command: Arc<SideCommand>) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.run_side(&command.tokens)));
    match outcome {
        Ok(Ok(report)) => {
            debug!(id = command.id, results = report.results.len(), "Side command finished")
        }
        Ok(Err(e)) => error!(id = command.id, error = %e, "Side command failed"),
        Err(_) => error!(id = command.id, "Side command panicked"),
    }
    for next in engine.side().finish(&command) {
        launch(&engine, next);
    }
}

/// Split `side` arguments into queue names and command tokens.
///
/// Leading `name:` tokens are queues. Of the rest, everything before the first
/// position where the tokens resolve to a command (or name a recipe) is also
/// treated as queue names; with no such position there is no command.
pub fn split_side_args(engine: &Engine, tokens: &[String]) -> (Vec<String>, Vec<String>) {
    let explicit = tokens.iter().take_while(|t| t.ends_with(':')).count();
    let mut queues: Vec<String> = tokens[..explicit]
        .iter()
        .map(|t| t.trim_end_matches(':').to_string())
        .collect();
    let remaining = &tokens[explicit..];

    match (0..remaining.len()).find(|&i| looks_like_command(engine, &remaining[i..])) {
        Some(start) => {
            queues.extend(remaining[..start].iter().cloned());
            (queues, remaining[start..].to_vec())
        }
        None => {
            queues.extend(remaining.iter().cloned());
            (queues, Vec::new())
        }
    }
}

fn looks_like_command(engine: &Engine, tokens: &[String]) -> bool {
    let joined = join_unquoted_kwargs(tokens);
    let Some(first) = joined.first() else {
        return false;
    };
    if let Ok(resolution) = Resolver::new(engine.registry()).resolve(Target::Root, &joined) {
        if matches!(resolution.target, Target::Command(_)) && !resolution.path.is_empty() {
            return true;
        }
    }
    engine.recipes().locate(first).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsey in ["", "0", "False", " no ", "OFF", "none", "null", "nil", "undefined", "f", "n"] {
            assert!(!is_truthy(&json!(falsey)), "{falsey:?} should be false");
        }
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!("anything")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(2)));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!([])));
    }

    #[test]
    fn test_queue_list_defaults_and_dedupes() {
        let scheduler = SideScheduler::new("main");
        assert_eq!(scheduler.queue_list(&[]), vec!["main".to_string()]);
        let names = scheduler.queue_list(&["a:".into(), "b".into(), "a".into()]);
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_readiness_requires_head_of_every_queue() {
        let mut state = SchedulerState::default();
        let first = Arc::new(SideCommand {
            id: 1,
            tokens: vec![],
            queues: vec!["a".into()],
        });
        let second = Arc::new(SideCommand {
            id: 2,
            tokens: vec![],
            queues: vec!["a".into(), "b".into()],
        });
        let third = Arc::new(SideCommand {
            id: 3,
            tokens: vec![],
            queues: vec!["b".into()],
        });
        for cmd in [&first, &second, &third] {
            for q in &cmd.queues {
                state.queues.entry(q.clone()).or_default().pending.push_back(cmd.id);
            }
            state.pending.push(Arc::clone(cmd));
        }

        let ready: Vec<u64> = state.collect_ready().iter().map(|c| c.id).collect();
        assert_eq!(ready, vec![1]);
        assert_eq!(state.running, 1);

        state.queues.get_mut("a").unwrap().current = None;
        state.running -= 1;
        let ready: Vec<u64> = state.collect_ready().iter().map(|c| c.id).collect();
        assert_eq!(ready, vec![2]);

        state.queues.get_mut("a").unwrap().current = None;
        state.queues.get_mut("b").unwrap().current = None;
        state.running -= 1;
        let ready: Vec<u64> = state.collect_ready().iter().map(|c| c.id).collect();
        assert_eq!(ready, vec![3]);
        assert!(state.pending.is_empty());
    }
}
