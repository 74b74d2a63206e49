//! Unit conversions backing unit-aliased flags.
//!
//! A conversion registered as `yards -> meters` makes every parameter named
//! `meters` accept an extra `--yards` flag whose value is converted before
//! being cast to the parameter's declared type.

use std::sync::Arc;

/// Converts a raw flag value from one unit to another.
pub type Conversion = Arc<dyn Fn(&str) -> anyhow::Result<f64> + Send + Sync>;

#[derive(Clone)]
struct UnitPair {
    from: String,
    to: String,
    convert: Conversion,
}

/// Registry of per-unit-pair conversion functions.
#[derive(Clone, Default)]
pub struct UnitRegistry {
    pairs: Vec<UnitPair>,
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.pairs.iter().map(|p| format!("{}_to_{}", p.from, p.to)))
            .finish()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in length conversions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("yards", "meters", |v| Ok(parse_number(v)? * 0.9144));
        registry.register("meters", "yards", |v| Ok(parse_number(v)? / 0.9144));
        registry
    }

    /// Register (or replace) the conversion `from -> to`.
    pub fn register<F>(&mut self, from: &str, to: &str, convert: F)
    where
        F: Fn(&str) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        self.pairs.retain(|p| !(p.from == from && p.to == to));
        self.pairs.push(UnitPair {
            from: from.to_string(),
            to: to.to_string(),
            convert: Arc::new(convert),
        });
    }

    /// Alternate unit names (and their conversions) that can feed `param`.
    pub fn aliases_for(&self, param: &str) -> Vec<(String, Conversion)> {
        self.pairs
            .iter()
            .filter(|p| p.to == param && p.from != param)
            .map(|p| (p.from.clone(), Arc::clone(&p.convert)))
            .collect()
    }

    pub fn convert(&self, from: &str, to: &str, value: &str) -> Option<anyhow::Result<f64>> {
        self.pairs
            .iter()
            .find(|p| p.from == from && p.to == to)
            .map(|p| (p.convert)(value))
    }
}

fn parse_number(value: &str) -> anyhow::Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("'{}' is not a number: {}", value, e))
}
