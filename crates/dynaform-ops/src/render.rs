//! Rendering operations into the request record a network interpreter sends.

use std::collections::BTreeMap;

use dynaform_expr::{ExprResult, ExpressionCompiler};
use dynaform_types::{Item, Key, WireValue};
use serde::Serialize;

use crate::operation::{Operation, QueryOptions, WriteRequest};

/// A backend-agnostic request: every field the store protocol needs, with all
/// expressions compiled into one shared placeholder namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderedRequest {
    #[serde(skip)]
    pub action: &'static str,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<WriteRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, WireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,
    pub consistent_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
}

impl Operation {
    /// Compile the operation into its request record.
    pub fn render(&self) -> ExprResult<RenderedRequest> {
        let mut compiler = ExpressionCompiler::new();
        let mut request = RenderedRequest {
            action: self.name(),
            table_name: self.table().to_string(),
            ..RenderedRequest::default()
        };
        match self {
            Self::GetItem { key, consistent, .. } => {
                request.key = Some(key.clone());
                request.consistent_read = *consistent;
            }
            Self::PutItem { item, condition, .. } => {
                request.item = Some(item.clone());
                request.condition_expression =
                    condition.as_ref().map(|c| compiler.condition(c)).transpose()?;
            }
            Self::DeleteItem { key, condition, .. } => {
                request.key = Some(key.clone());
                request.condition_expression =
                    condition.as_ref().map(|c| compiler.condition(c)).transpose()?;
            }
            Self::UpdateItem {
                key,
                update,
                condition,
                ..
            } => {
                request.key = Some(key.clone());
                request.update_expression = Some(compiler.update(update)?);
                request.condition_expression =
                    condition.as_ref().map(|c| compiler.condition(c)).transpose()?;
            }
            Self::Scan { index, options, .. } => {
                request.index_name = index.clone();
                render_options(&mut request, &mut compiler, options)?;
            }
            Self::Query {
                index,
                key_condition,
                options,
                ..
            } => {
                request.index_name = index.clone();
                request.key_condition_expression = Some(compiler.key_condition(key_condition)?);
                render_options(&mut request, &mut compiler, options)?;
                request.scan_index_forward = Some(options.ascending);
            }
            Self::BatchGet {
                keys, consistent, ..
            } => {
                request.keys = keys.clone();
                request.consistent_read = *consistent;
            }
            Self::BatchWrite { writes, .. } => {
                request.writes = writes.clone();
            }
        }
        let attributes = compiler.finish();
        request.expression_attribute_names = attributes.names;
        request.expression_attribute_values = attributes.values;
        Ok(request)
    }
}

fn render_options(
    request: &mut RenderedRequest,
    compiler: &mut ExpressionCompiler,
    options: &QueryOptions,
) -> ExprResult<()> {
    request.filter_expression = options
        .filter
        .as_ref()
        .map(|filter| compiler.condition(filter))
        .transpose()?;
    request.limit = options.limit;
    request.exclusive_start_key = options.exclusive_start_key.clone();
    request.consistent_read = options.consistent;
    Ok(())
}

#[cfg(test)]
mod tests {
    use dynaform_expr::{attr, partition, set, sort_key, ConditionCompilationError};

    use super::*;

    fn key() -> Key {
        Key::from([("id".to_string(), WireValue::string("p1"))])
    }

    #[test]
    fn query_expressions_share_one_namespace() {
        let op = Operation::Query {
            table: "events".into(),
            index: Some("by_kind".into()),
            key_condition: partition("kind", "click").and(sort_key("at").gt(100)),
            options: QueryOptions {
                limit: Some(10),
                filter: Some(attr("kind").ne("bot").and(attr("at").lt(500))),
                ascending: false,
                ..QueryOptions::default()
            },
        };
        let request = op.render().unwrap();
        assert_eq!(request.action, "Query");
        assert_eq!(
            request.key_condition_expression.as_deref(),
            Some("#n0 = :v0 AND #n1 > :v1")
        );
        assert_eq!(
            request.filter_expression.as_deref(),
            Some("(#n0 <> :v2 AND #n1 < :v3)")
        );
        assert_eq!(request.expression_attribute_names.len(), 2);
        assert_eq!(request.expression_attribute_values.len(), 4);
        assert_eq!(request.scan_index_forward, Some(false));
        assert_eq!(request.index_name.as_deref(), Some("by_kind"));
        assert_eq!(request.limit, Some(10));
    }

    #[test]
    fn update_and_condition_share_placeholders() {
        let op = Operation::UpdateItem {
            table: "pets".into(),
            key: key(),
            update: set("name", "Bo"),
            condition: Some(attr("name").eq("Amy")),
        };
        let request = op.render().unwrap();
        assert_eq!(request.update_expression.as_deref(), Some("SET #n0 = :v0"));
        assert_eq!(request.condition_expression.as_deref(), Some("#n0 = :v1"));
        assert_eq!(request.key, Some(key()));
    }

    #[test]
    fn plain_get_has_no_expressions() {
        let op = Operation::GetItem {
            table: "pets".into(),
            key: key(),
            consistent: true,
        };
        let request = op.render().unwrap();
        assert!(request.expression_attribute_names.is_empty());
        assert!(request.consistent_read);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "TableName": "pets",
                "Key": {"id": {"S": "p1"}},
                "ConsistentRead": true
            })
        );
    }

    #[test]
    fn compilation_errors_surface() {
        let op = Operation::PutItem {
            table: "pets".into(),
            item: key(),
            condition: Some(attr("tags").is_in(Vec::<String>::new())),
        };
        assert_eq!(
            op.render(),
            Err(ConditionCompilationError::EmptyMembership("tags".into()))
        );
    }
}
