//! Placeholder compilation.
//!
//! The wire protocol never sees attribute names or values inline. Every name
//! becomes a `#nK` placeholder and every value a `:vK` placeholder, and the
//! two maps travel next to the expression text. One [`ExpressionCompiler`]
//! can compile several expressions of the same request (condition, filter,
//! key condition, update) so they share one placeholder namespace.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use dynaform_types::WireValue;

use crate::condition::Condition;
use crate::error::{ConditionCompilationError, ExprResult};
use crate::key::{KeyCondition, SortCondition};
use crate::path::{AttributePath, PathSegment};
use crate::update::{UpdateAction, UpdateExpression};

/// Placeholder bindings of one or more compiled expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionAttributes {
    /// `#nK` placeholder to attribute name.
    pub names: BTreeMap<String, String>,
    /// `:vK` placeholder to value.
    pub values: BTreeMap<String, WireValue>,
}

impl ExpressionAttributes {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Fold `other` into `self`. A placeholder already bound to a different
    /// target is a [`ConditionCompilationError::PlaceholderConflict`].
    pub fn merge(&mut self, other: ExpressionAttributes) -> ExprResult<()> {
        for (placeholder, name) in other.names {
            bind(&mut self.names, placeholder, name, |name| name.clone())?;
        }
        for (placeholder, value) in other.values {
            bind(&mut self.values, placeholder, value, |value| format!("{value:?}"))?;
        }
        Ok(())
    }
}

fn bind<V: PartialEq>(
    map: &mut BTreeMap<String, V>,
    placeholder: String,
    target: V,
    render: impl Fn(&V) -> String,
) -> ExprResult<()> {
    match map.get(&placeholder) {
        Some(existing) if *existing != target => Err(ConditionCompilationError::PlaceholderConflict {
            existing: render(existing),
            conflicting: render(&target),
            placeholder,
        }),
        Some(_) => Ok(()),
        None => {
            map.insert(placeholder, target);
            Ok(())
        }
    }
}

/// One expression string and the placeholders it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpression {
    pub expression: String,
    pub attributes: ExpressionAttributes,
}

/// Allocates placeholders and renders expression text.
///
/// Placeholders are numbered in allocation order and reused for repeated
/// names and values, so the same input always compiles to the same text and
/// both maps stay injective.
#[derive(Debug, Default)]
pub struct ExpressionCompiler {
    attributes: ExpressionAttributes,
    name_slots: HashMap<String, String>,
    value_slots: HashMap<WireValue, String>,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for an attribute name.
    pub fn name(&mut self, name: &str) -> ExprResult<String> {
        if name.is_empty() {
            return Err(ConditionCompilationError::EmptyPath);
        }
        if let Some(placeholder) = self.name_slots.get(name) {
            return Ok(placeholder.clone());
        }
        let placeholder = format!("#n{}", self.name_slots.len());
        bind(
            &mut self.attributes.names,
            placeholder.clone(),
            name.to_string(),
            |name| name.clone(),
        )?;
        self.name_slots.insert(name.to_string(), placeholder.clone());
        Ok(placeholder)
    }

    /// Placeholder for a value.
    pub fn value(&mut self, value: &WireValue) -> ExprResult<String> {
        if let Some(placeholder) = self.value_slots.get(value) {
            return Ok(placeholder.clone());
        }
        let placeholder = format!(":v{}", self.value_slots.len());
        bind(
            &mut self.attributes.values,
            placeholder.clone(),
            value.clone(),
            |value| format!("{value:?}"),
        )?;
        self.value_slots.insert(value.clone(), placeholder.clone());
        Ok(placeholder)
    }

    /// Render a path with every name segment replaced by its placeholder.
    pub fn path(&mut self, path: &AttributePath) -> ExprResult<String> {
        path.validate()?;
        let mut out = String::new();
        for segment in path.segments() {
            match segment {
                PathSegment::Name(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    let placeholder = self.name(name)?;
                    out.push_str(&placeholder);
                }
                PathSegment::Index(index) => {
                    let _ = write!(out, "[{index}]");
                }
            }
        }
        Ok(out)
    }

    pub fn condition(&mut self, condition: &Condition) -> ExprResult<String> {
        Ok(match condition {
            Condition::Compare { path, op, value } => {
                format!("{} {} {}", self.path(path)?, op.symbol(), self.value(value)?)
            }
            Condition::Between { path, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.path(path)?,
                self.value(low)?,
                self.value(high)?
            ),
            Condition::BeginsWith { path, prefix } => {
                format!("begins_with({}, {})", self.path(path)?, self.value(prefix)?)
            }
            Condition::Contains { path, operand } => {
                format!("contains({}, {})", self.path(path)?, self.value(operand)?)
            }
            Condition::AttributeExists(path) => format!("attribute_exists({})", self.path(path)?),
            Condition::AttributeNotExists(path) => {
                format!("attribute_not_exists({})", self.path(path)?)
            }
            Condition::In { path, values } => {
                if values.is_empty() {
                    return Err(ConditionCompilationError::EmptyMembership(path.to_string()));
                }
                let subject = self.path(path)?;
                let candidates = values
                    .iter()
                    .map(|value| self.value(value))
                    .collect::<ExprResult<Vec<_>>>()?;
                format!("{subject} IN ({})", candidates.join(", "))
            }
            Condition::And(left, right) => {
                format!("({} AND {})", self.condition(left)?, self.condition(right)?)
            }
            Condition::Or(left, right) => {
                format!("({} OR {})", self.condition(left)?, self.condition(right)?)
            }
            Condition::Not(inner) => format!("(NOT {})", self.condition(inner)?),
        })
    }

    pub fn key_condition(&mut self, key: &KeyCondition) -> ExprResult<String> {
        let mut out = format!(
            "{} = {}",
            self.name(key.partition_key())?,
            self.value(key.partition_value())?
        );
        if let Some(sort) = key.sort() {
            let rendered = match sort {
                SortCondition::Compare { name, op, value } => {
                    format!("{} {} {}", self.name(name)?, op.symbol(), self.value(value)?)
                }
                SortCondition::Between { name, low, high } => format!(
                    "{} BETWEEN {} AND {}",
                    self.name(name)?,
                    self.value(low)?,
                    self.value(high)?
                ),
                SortCondition::BeginsWith { name, prefix } => {
                    format!("begins_with({}, {})", self.name(name)?, self.value(prefix)?)
                }
            };
            out.push_str(" AND ");
            out.push_str(&rendered);
        }
        Ok(out)
    }

    /// Render `SET … REMOVE … ADD … DELETE …`, omitting empty clauses.
    pub fn update(&mut self, update: &UpdateExpression) -> ExprResult<String> {
        if update.is_empty() {
            return Err(ConditionCompilationError::EmptyUpdate);
        }
        let mut set = Vec::new();
        let mut remove = Vec::new();
        let mut add = Vec::new();
        let mut delete = Vec::new();
        for action in update.actions() {
            match action {
                UpdateAction::Set { path, value } => {
                    set.push(format!("{} = {}", self.path(path)?, self.value(value)?));
                }
                UpdateAction::SetIfNotExists { path, value } => {
                    let path = self.path(path)?;
                    set.push(format!("{path} = if_not_exists({path}, {})", self.value(value)?));
                }
                UpdateAction::Append { path, values } => {
                    let path = self.path(path)?;
                    let empty = self.value(&WireValue::List(Vec::new()))?;
                    let tail = self.value(&WireValue::List(values.clone()))?;
                    set.push(format!(
                        "{path} = list_append(if_not_exists({path}, {empty}), {tail})"
                    ));
                }
                UpdateAction::Add { path, value } => {
                    add.push(format!("{} {}", self.path(path)?, self.value(value)?));
                }
                UpdateAction::Remove(path) => remove.push(self.path(path)?),
                UpdateAction::Delete { path, value } => {
                    delete.push(format!("{} {}", self.path(path)?, self.value(value)?));
                }
            }
        }
        let clauses: Vec<String> = [("SET", set), ("REMOVE", remove), ("ADD", add), ("DELETE", delete)]
            .into_iter()
            .filter(|(_, parts)| !parts.is_empty())
            .map(|(keyword, parts)| format!("{keyword} {}", parts.join(", ")))
            .collect();
        Ok(clauses.join(" "))
    }

    pub fn attributes(&self) -> &ExpressionAttributes {
        &self.attributes
    }

    pub fn finish(self) -> ExpressionAttributes {
        self.attributes
    }
}

impl Condition {
    /// Compile this condition on its own placeholder namespace.
    pub fn compile(&self) -> ExprResult<CompiledExpression> {
        let mut compiler = ExpressionCompiler::new();
        let expression = compiler.condition(self)?;
        Ok(CompiledExpression {
            expression,
            attributes: compiler.finish(),
        })
    }
}

impl KeyCondition {
    pub fn compile(&self) -> ExprResult<CompiledExpression> {
        let mut compiler = ExpressionCompiler::new();
        let expression = compiler.key_condition(self)?;
        Ok(CompiledExpression {
            expression,
            attributes: compiler.finish(),
        })
    }
}

impl UpdateExpression {
    pub fn compile(&self) -> ExprResult<CompiledExpression> {
        let mut compiler = ExpressionCompiler::new();
        let expression = compiler.update(self)?;
        Ok(CompiledExpression {
            expression,
            attributes: compiler.finish(),
        })
    }
}
