//! Attribute paths: a top-level name followed by map fields and list indexes.

use std::collections::BTreeMap;
use std::fmt;

use dynaform_types::{Item, WireValue};

use crate::error::{ConditionCompilationError, EvalError, EvalResult, ExprResult};

/// One step of an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Name(String),
    Index(usize),
}

/// A document path such as `owner.pets[2].name`.
///
/// Names are kept verbatim, so an attribute whose name contains a dot can
/// still be addressed with [`AttributePath::name`]. Only
/// [`AttributePath::parse`] gives `.` and `[n]` their path meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath {
    segments: Vec<PathSegment>,
}

impl AttributePath {
    /// A top-level attribute.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Name(name.into())],
        }
    }

    /// Parse `a.b[2].c` notation.
    pub fn parse(text: &str) -> ExprResult<Self> {
        if text.is_empty() {
            return Err(ConditionCompilationError::EmptyPath);
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(open) => (&part[..open], &part[open..]),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err(ConditionCompilationError::invalid_path(text, "empty attribute name"));
            }
            if name.contains(']') {
                return Err(ConditionCompilationError::invalid_path(text, "unbalanced ']'"));
            }
            segments.push(PathSegment::Name(name.to_string()));
            while !rest.is_empty() {
                let inner = rest.strip_prefix('[').ok_or_else(|| {
                    ConditionCompilationError::invalid_path(text, "expected '[' after index")
                })?;
                let close = inner
                    .find(']')
                    .ok_or_else(|| ConditionCompilationError::invalid_path(text, "unclosed '['"))?;
                let digits = &inner[..close];
                let index = digits.parse::<usize>().map_err(|_| {
                    ConditionCompilationError::invalid_path(
                        text,
                        format!("{digits:?} is not a list index"),
                    )
                })?;
                segments.push(PathSegment::Index(index));
                rest = &inner[close + 1..];
            }
        }
        Ok(Self { segments })
    }

    /// Descend into a map field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Name(name.into()));
        self
    }

    /// Descend into a list element.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The top-level attribute name.
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Name(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    /// A path must start with a name and every name must be non-empty.
    pub fn validate(&self) -> ExprResult<()> {
        match self.segments.first() {
            Some(PathSegment::Name(_)) => {}
            _ => return Err(ConditionCompilationError::EmptyPath),
        }
        let empty_name = self
            .segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::Name(name) if name.is_empty()));
        if empty_name {
            return Err(ConditionCompilationError::EmptyPath);
        }
        Ok(())
    }

    /// The value at this path, if every step exists.
    pub fn resolve<'a>(&self, item: &'a Item) -> Option<&'a WireValue> {
        let mut segments = self.segments.iter();
        let mut current = match segments.next()? {
            PathSegment::Name(name) => item.get(name)?,
            PathSegment::Index(_) => return None,
        };
        for segment in segments {
            current = match (segment, current) {
                (PathSegment::Name(name), WireValue::Map(map)) => map.get(name)?,
                (PathSegment::Index(index), WireValue::List(list)) => list.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at this path. Intermediate steps must already exist.
    /// An index past the end of a list appends.
    pub fn assign(&self, item: &mut Item, value: WireValue) -> EvalResult<()> {
        let (slot, last) = self.parent_mut(item)?;
        match (slot, last) {
            (Slot::Map(map), PathSegment::Name(name)) => {
                map.insert(name.clone(), value);
                Ok(())
            }
            (Slot::List(list), PathSegment::Index(index)) => {
                match list.get_mut(*index) {
                    Some(existing) => *existing = value,
                    None => list.push(value),
                }
                Ok(())
            }
            _ => Err(EvalError::MissingPath(self.to_string())),
        }
    }

    /// Remove the value at this path, returning it if it existed.
    pub fn remove(&self, item: &mut Item) -> EvalResult<Option<WireValue>> {
        let (slot, last) = match self.parent_mut(item) {
            Ok(found) => found,
            Err(EvalError::MissingPath(_)) => return Ok(None),
            Err(other) => return Err(other),
        };
        Ok(match (slot, last) {
            (Slot::Map(map), PathSegment::Name(name)) => map.remove(name),
            (Slot::List(list), PathSegment::Index(index)) if *index < list.len() => {
                Some(list.remove(*index))
            }
            _ => None,
        })
    }

    fn parent_mut<'a, 'p>(&'p self, item: &'a mut Item) -> EvalResult<(Slot<'a>, &'p PathSegment)> {
        self.validate()?;
        let (last, init) = self
            .segments
            .split_last()
            .ok_or(ConditionCompilationError::EmptyPath)?;
        let mut slot = Slot::Map(item);
        for segment in init {
            let child = match (slot, segment) {
                (Slot::Map(map), PathSegment::Name(name)) => map.get_mut(name),
                (Slot::List(list), PathSegment::Index(index)) => list.get_mut(*index),
                _ => None,
            }
            .ok_or_else(|| EvalError::MissingPath(self.to_string()))?;
            slot = match child {
                WireValue::Map(map) => Slot::Map(map),
                WireValue::List(list) => Slot::List(list),
                _ => return Err(EvalError::MissingPath(self.to_string())),
            };
        }
        Ok((slot, last))
    }
}

enum Slot<'a> {
    Map(&'a mut BTreeMap<String, WireValue>),
    List(&'a mut Vec<WireValue>),
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Name(name) if position == 0 => write!(f, "{name}")?,
                PathSegment::Name(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for AttributePath {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for AttributePath {
    fn from(name: String) -> Self {
        Self::name(name)
    }
}
