//! Built-in capabilities available at the root of every engine.

use crate::capability::{Command, Namespace, Outcome, Param, ParamType, ParameterSchema};
use crate::executor::RepeatDirective;
use crate::side::split_side_args;
use crate::sigil::value_to_text;
use anyhow::bail;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Root namespace holding the built-in commands.
pub fn builtins() -> Namespace {
    Namespace::new("builtins")
        .with_command(hello_world())
        .with_command(repeat())
        .with_command(side())
        .with_command(run_recipe())
        .with_command(sigils())
        .with_command(discard())
}

fn hello_world() -> Command {
    let schema = ParameterSchema::new()
        .param(Param::positional("name").default("World"))
        .param(Param::keyword("greeting").default("Hello"))
        .param(Param::var_keyword("extra"));
    Command::new("hello_world", schema, |call| {
        let name = call.text("name").unwrap_or_default();
        let greeting = call.text("greeting").unwrap_or_default();
        let message = format!("{}, {}!", greeting, name);
        info!(%message, "Hello world");
        Ok(json!({
            "greeting": greeting,
            "name": name,
            "message": message,
        })
        .into())
    })
    .with_summary("Smoke test returning a greeting")
}

fn repeat() -> Command {
    let schema = ParameterSchema::new()
        .param(
            Param::keyword("rest")
                .ty(ParamType::Float)
                .default(0.0)
                .help("Seconds to wait before each replay"),
        )
        .param(
            Param::keyword("times")
                .ty(ParamType::Int)
                .default(Value::Null)
                .help("Number of replays; omit to repeat until cancelled"),
        );
    Command::new("repeat", schema, |call| {
        let rest = call.get("rest").and_then(Value::as_f64).unwrap_or(0.0);
        let times = match call.get("times") {
            None => None,
            Some(value) => match value.as_i64() {
                Some(n) if n >= 0 => Some(n as u64),
                _ => bail!("times must be a non-negative integer, got {}", value),
            },
        };
        let directive = RepeatDirective::from_secs(rest, times).map_err(anyhow::Error::msg)?;
        Ok(Outcome::Repeat(directive))
    })
    .with_summary("Replay the commands executed so far")
}

fn side() -> Command {
    let schema = ParameterSchema::new()
        .param(Param::var_positional("args"))
        .param(
            Param::keyword("when")
                .default(Value::Null)
                .help("Only schedule when this resolves to a true value"),
        );
    Command::new("side", schema, |call| {
        let tokens: Vec<String> = call.rest().iter().map(value_to_text).collect();
        let (queues, command) = split_side_args(call.engine(), &tokens);
        let when = call
            .given("when")
            .then(|| call.text("when").unwrap_or_default());
        let status = call
            .engine()
            .enqueue_side(&queues, &command, when.as_deref());
        Ok(serde_json::to_value(status)?.into())
    })
    .with_summary("Run a command in the background on named queues")
}

fn run_recipe() -> Command {
    let schema = ParameterSchema::new()
        .param(Param::var_positional("names"))
        .param(Param::var_keyword("context"));
    Command::new("run_recipe", schema, |call| {
        if call.rest().is_empty() {
            bail!("At least one recipe name must be provided");
        }
        let engine = call.engine();
        let mut results = Vec::new();
        for name in call.rest().iter().map(value_to_text) {
            debug!(recipe = %name, "run_recipe");
            let report = engine.run_nested_recipe(&name, call.extra().clone(), engine.options())?;
            results.push(report.last.unwrap_or(Value::Null));
        }
        let value = if results.len() == 1 {
            results.remove(0)
        } else {
            Value::Array(results)
        };
        Ok(value.into())
    })
    .with_summary("Execute one or more recipes")
}

fn sigils() -> Command {
    let schema = ParameterSchema::new().param(Param::var_positional("texts"));
    Command::new("sigils", schema, |call| {
        // Arguments arrive already resolved.
        let mut values: Vec<Value> = call.rest().to_vec();
        let value = match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Array(values),
        };
        Ok(value.into())
    })
    .with_summary("Resolve sigils in the given texts")
}

fn discard() -> Command {
    let schema = ParameterSchema::new().param(Param::var_positional("keys"));
    Command::new("discard", schema, |call| {
        let store = call.engine().store();
        let mut removed = Vec::new();
        for key in call.rest().iter().map(value_to_text) {
            if store.remove(&key).is_some() {
                removed.push(Value::String(key));
            } else {
                debug!(%key, "Nothing to discard");
            }
        }
        Ok(Value::Array(removed).into())
    })
    .with_summary("Remove keys from the context map")
}
