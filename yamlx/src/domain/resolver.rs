//! Tree walker: rebuilds a document with expression leaves computed

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::detect::Detection;
use crate::domain::error::DomainResult;
use crate::domain::evaluator::Evaluator;
use crate::domain::parser::parse;
use crate::domain::value::{Mapping, Value};

/// Default limit for chained variable references.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default number of referenced expressions one leaf may expand.
pub const DEFAULT_MAX_EXPANSIONS: usize = 10_000;

/// Knobs for a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Which string leaves count as expressions
    pub detection: Detection,
    /// Walk into sequence elements (off: sequences are copied as-is)
    pub resolve_sequences: bool,
    /// How many references deep a chain of expressions may go
    pub max_depth: usize,
    /// How many referenced expressions a single leaf may expand in total
    pub max_expansions: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            detection: Detection::default(),
            resolve_sequences: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

/// Resolves expressions in a document. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Build a new tree with every expression leaf replaced by its value.
    ///
    /// Key order and nesting are preserved. Variables are looked up in
    /// `document` as given, so one leaf never sees another's result.
    /// The first failure aborts the pass; the error carries the dotted
    /// location of the offending leaf.
    #[instrument(level = "debug", skip_all)]
    pub fn resolve(&self, document: &Value) -> DomainResult<Value> {
        let evaluator = Evaluator::new(document, &self.options);
        let mut location = Vec::new();
        self.walk(&evaluator, document, &mut location)
    }

    /// Parse and evaluate a single expression against `context`.
    #[instrument(level = "debug", skip(self, context))]
    pub fn evaluate(&self, text: &str, context: &Value) -> DomainResult<f64> {
        Evaluator::new(context, &self.options).evaluate(&parse(text)?)
    }

    fn walk(
        &self,
        evaluator: &Evaluator<'_>,
        value: &Value,
        location: &mut Vec<String>,
    ) -> DomainResult<Value> {
        match value {
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, child) in map {
                    location.push(key.clone());
                    let resolved = self.walk(evaluator, child, location);
                    location.pop();
                    out.insert(key.clone(), resolved?);
                }
                Ok(Value::Mapping(out))
            }
            Value::Sequence(items) if self.options.resolve_sequences => {
                let mut out = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    location.push(index.to_string());
                    let resolved = self.walk(evaluator, child, location);
                    location.pop();
                    out.push(resolved?);
                }
                Ok(Value::Sequence(out))
            }
            Value::String(text) if self.options.detection.is_expression(text) => {
                let result = parse(text)
                    .and_then(|expr| evaluator.evaluate(&expr))
                    .map_err(|e| e.at(location))?;
                debug!("{} = {:?} -> {}", location.join("."), text, result);
                Ok(Value::Float(result))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Resolve `document` with default options.
pub fn resolve(document: &Value) -> DomainResult<Value> {
    Resolver::default().resolve(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    #[test]
    fn given_expression_leaf_when_resolving_then_location_attached_to_error() {
        let root: Value = serde_yaml::from_str("outer:\n  inner: ${nope}\n").unwrap();

        let err = resolve(&root).unwrap_err();

        assert_eq!(err.to_string(), "outer.inner: invalid key: nope");
        assert_eq!(
            err.root_cause(),
            &DomainError::MissingKey {
                path: "nope".to_string()
            }
        );
    }

    #[test]
    fn given_root_expression_when_resolving_then_evaluates_without_location() {
        let root = Value::from("1 + 1");

        assert_eq!(resolve(&root).unwrap(), Value::Float(2.0));
        assert!(matches!(
            resolve(&Value::from("1 +")),
            Err(DomainError::Syntax { .. })
        ));
    }

    #[test]
    fn given_single_expression_when_evaluating_then_uses_context() {
        let context: Value = serde_yaml::from_str("a: 4\n").unwrap();

        let result = Resolver::default().evaluate("${a} ** 2 // 3", &context).unwrap();

        assert_eq!(result, 5.0);
    }
}
