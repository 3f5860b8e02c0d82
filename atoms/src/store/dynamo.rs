//! DynamoDB single-table document store.
//!
//! Layout: `PK = <COLLECTION>`, `SK = <document id>`. Ids are UUIDv7 so a
//! partition query returns documents in creation order.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Value};

use super::{new_document_id, Document, DocumentStore, Fields, Predicate, Query};
use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone)]
pub struct DynamoDocumentStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoDocumentStore {
    pub fn new(client: DynamoClient, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    fn key(collection: &str, id: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(partition_key(collection))),
            ("SK".to_string(), AttributeValue::S(id.to_string())),
        ])
    }

    fn item(collection: &str, id: &str, fields: &Fields) -> HashMap<String, AttributeValue> {
        let mut item = Self::key(collection, id);
        for (name, value) in fields {
            item.insert(name.clone(), to_attribute(value));
        }
        item
    }
}

fn partition_key(collection: &str) -> String {
    collection.to_uppercase()
}

/// FilterExpression plus its placeholder maps.
#[derive(Debug, Default, PartialEq)]
struct FilterParts {
    expression: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

fn filter_parts(predicates: &[Predicate]) -> FilterParts {
    let mut clauses = vec![];
    let mut parts = FilterParts::default();

    for (i, predicate) in predicates.iter().enumerate() {
        let name = format!("#f{}", i);
        let value = format!(":v{}", i);
        match predicate {
            Predicate::Contains { field, value: v } => {
                // contains() on a String attribute is a substring test
                let string_type = format!(":v{}t", i);
                clauses.push(format!(
                    "(contains({name}, {value}) AND NOT attribute_type({name}, {string_type}))"
                ));
                parts.names.insert(name, field.clone());
                parts.values.insert(value, AttributeValue::S(v.clone()));
                parts.values.insert(string_type, AttributeValue::S("S".to_string()));
            }
            Predicate::Range { field, start, end } => {
                let upper = format!(":v{}e", i);
                clauses.push(format!("{name} >= {value} AND {name} < {upper}"));
                parts.names.insert(name, field.clone());
                parts.values.insert(value, AttributeValue::S(start.clone()));
                parts.values.insert(upper, AttributeValue::S(end.clone()));
            }
            Predicate::Equals { field, value: v } => {
                clauses.push(format!("{} = {}", name, value));
                parts.names.insert(name, field.clone());
                parts.values.insert(value, AttributeValue::S(v.clone()));
            }
        }
    }

    if !clauses.is_empty() {
        parts.expression = Some(clauses.join(" AND "));
    }
    parts
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| n.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn to_document(item: &HashMap<String, AttributeValue>) -> CatalogResult<Document> {
    let id = item
        .get("SK")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| CatalogError::Decode("item without SK".to_string()))?
        .to_string();

    let fields: Map<String, Value> = item
        .iter()
        .filter(|(k, _)| k.as_str() != "PK" && k.as_str() != "SK")
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect();

    Ok(Document { id, fields })
}

#[async_trait]
impl DocumentStore for DynamoDocumentStore {
    async fn execute(&self, query: &Query) -> CatalogResult<Vec<Document>> {
        let filter = filter_parts(&query.predicates);
        let mut values = filter.values.clone();
        values.insert(
            ":pk".to_string(),
            AttributeValue::S(partition_key(&query.collection)),
        );
        let names = (!filter.names.is_empty()).then(|| filter.names.clone());

        let mut start_key = query
            .start_after
            .as_ref()
            .map(|cursor| Self::key(&query.collection, cursor.document_id()));
        let mut documents = Vec::new();

        // A FilterExpression is applied after the read, so keep reading
        // until the page is full or the partition runs out.
        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk")
                .set_filter_expression(filter.expression.clone())
                .set_expression_attribute_names(names.clone())
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key.take())
                .limit(i32::try_from(query.limit).unwrap_or(i32::MAX))
                .send()
                .await
                .map_err(|e| CatalogError::StoreRead(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                documents.push(to_document(item)?);
                if documents.len() >= query.limit {
                    return Ok(documents);
                }
            }

            match result.last_evaluated_key() {
                Some(key) => start_key = Some(key.clone()),
                None => return Ok(documents),
            }
        }
    }

    async fn get(&self, collection: &str, id: &str) -> CatalogResult<Option<Document>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(collection, id)))
            .send()
            .await
            .map_err(|e| CatalogError::StoreRead(format!("DynamoDB get_item error: {}", e)))?;

        result.item().map(to_document).transpose()
    }

    async fn insert(&self, collection: &str, fields: Fields) -> CatalogResult<Document> {
        let id = new_document_id();
        self.put(collection, &id, fields.clone()).await?;
        Ok(Document { id, fields })
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(Self::item(collection, id, &fields)))
            .send()
            .await
            .map_err(|e| CatalogError::StoreWrite(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> CatalogResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut update_expr = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        for (i, (name, value)) in fields.iter().enumerate() {
            update_expr.push(format!("#u{i} = :u{i}"));
            expr_names.insert(format!("#u{}", i), name.clone());
            expr_values.insert(format!(":u{}", i), to_attribute(value));
        }

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(collection, id)))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(PK)")
            .set_expression_attribute_names(Some(expr_names))
            .set_expression_attribute_values(Some(expr_values))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Err(CatalogError::NotFound(format!("{} not found", id)))
            }
            Err(e) => Err(CatalogError::StoreWrite(format!(
                "DynamoDB update_item error: {}",
                e
            ))),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> CatalogResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(collection, id)))
            .send()
            .await
            .map_err(|e| CatalogError::StoreWrite(format!("DynamoDB delete_item error: {}", e)))?;
        Ok(())
    }
}
