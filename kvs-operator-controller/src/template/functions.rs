// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use kvs_operator_common::telemetry::warn;

use crate::secretstore::SecretStore;
use crate::template::parser::{Action, Node, Template};
use crate::template::{TemplateError, TemplateResult};

/// Functions callable from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `secretValue name`
    SecretValue,
    /// `secretValueForVersion name version`
    SecretValueForVersion,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::SecretValue => "secretValue",
            Function::SecretValueForVersion => "secretValueForVersion",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::SecretValue => 1,
            Function::SecretValueForVersion => 2,
        }
    }

    /// Call the function against a store
    ///
    /// A lookup failure does not fail the call, the error text becomes the value.
    async fn call(&self, store: &dyn SecretStore, args: &[String]) -> String {
        let result = match self {
            Function::SecretValue => store.get_secret_value(&args[0]).await,
            Function::SecretValueForVersion => store.get_secret_value_for_version(&args[0], &args[1]).await,
        };

        result.unwrap_or_else(|e| {
            warn!(
                event = "TemplateLookupFailed",
                function = self.name(),
                secret = args[0].as_str(),
                error = %e,
            );
            e.to_string()
        })
    }
}

/// Names visible to a template during one evaluation
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: Vec<Function>,
}

impl FunctionTable {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }

    /// The vault lookup functions
    pub fn secret_functions() -> Self {
        Self::new(vec![Function::SecretValue, Function::SecretValueForVersion])
    }

    pub fn lookup(&self, name: &str) -> Option<Function> {
        self.functions.iter().copied().find(|function| function.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BoundNode {
    Text(String),
    Call { function: Function, args: Vec<String> },
}

/// A template whose calls all resolve to known functions with the right arity
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTemplate {
    nodes: Vec<BoundNode>,
}

impl Template {
    /// Resolve every call against `table` before anything is executed
    pub fn bind(self, table: &FunctionTable) -> TemplateResult<BoundTemplate> {
        let nodes = self.nodes
            .into_iter()
            .map(|node| match node {
                Node::Text(text) => Ok(BoundNode::Text(text)),
                Node::Action(Action::Literal(value)) => Ok(BoundNode::Text(value)),
                Node::Action(Action::Call { name, args, .. }) => {
                    let function = table
                        .lookup(&name)
                        .ok_or_else(|| TemplateError::UnknownFunction(name.clone()))?;

                    if args.len() != function.arity() {
                        return Err(TemplateError::WrongArgumentCount {
                            name,
                            expected: function.arity(),
                            got: args.len(),
                        });
                    }

                    Ok(BoundNode::Call { function, args })
                }
            })
            .collect::<TemplateResult<Vec<_>>>()?;

        Ok(BoundTemplate { nodes })
    }
}

impl BoundTemplate {
    /// Evaluate the template, calling functions in order of appearance
    pub async fn execute(&self, store: &dyn SecretStore) -> String {
        let mut out = String::new();

        for node in &self.nodes {
            match node {
                BoundNode::Text(text) => out.push_str(text),
                BoundNode::Call { function, args } => out.push_str(&function.call(store, args).await),
            }
        }

        out
    }
}
