//! Shared helpers: token splitting and a recording capability.

use gantry::capability::{Command, Param, ParameterSchema};
use gantry::sigil::value_to_text;
use serde_json::Value;
use parking_lot::Mutex;
use std::sync::Arc;

pub fn toks(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

/// Log of recorded invocations shared with the test body.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }
}

/// `record <label>...` appends the joined labels to `log` and returns them.
pub fn record_command(log: &CallLog) -> Command {
    let log = log.clone();
    let schema = ParameterSchema::new().param(Param::var_positional("labels"));
    Command::new("record", schema, move |call| {
        let label = call
            .rest()
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(" ");
        log.push(label.clone());
        Ok(Value::String(label).into())
    })
}
