use std::sync::Arc;

use serde_json::{Map, Value, json};
use treewright_core::{Attribute, Segment};
use treewright_storage::traits::CatalogStore;
use treewright_storage::{AttributeOrder, StorageBackend};

use crate::error::ServiceError;

/// Read access to the mirrored segment and attribute catalog.
pub struct CatalogService {
    storage: Arc<StorageBackend>,
}

impl CatalogService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn segments(&self) -> Result<Vec<Segment>, ServiceError> {
        Ok(self.storage.list_segments().await?)
    }

    pub async fn segment_names(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.segments().await?.into_iter().map(|s| s.name).collect())
    }

    pub async fn attributes(&self) -> Result<Vec<Attribute>, ServiceError> {
        Ok(self.storage.list_attributes(AttributeOrder::Id).await?)
    }

    pub async fn attribute_count(&self) -> Result<i64, ServiceError> {
        Ok(self.storage.count_attributes().await?)
    }

    /// Attributes shaped for the model, ordered by name. Optional metadata
    /// is only present when set.
    pub async fn attributes_for_agent(&self) -> Result<Vec<Value>, ServiceError> {
        let attributes = self.storage.list_attributes(AttributeOrder::Name).await?;
        Ok(attributes.into_iter().map(agent_attribute).collect())
    }
}

fn agent_attribute(attr: Attribute) -> Value {
    let mut out = Map::new();
    out.insert("id".into(), json!(attr.id));
    out.insert("name".into(), json!(attr.name));
    out.insert("type".into(), json!(attr.attr_type));
    out.insert("operations".into(), json!(attr.ops));
    out.insert("description".into(), json!(attr.description));
    let optional = [
        ("enumValues", attr.enum_values),
        ("min", attr.min.map(Value::from)),
        ("max", attr.max.map(Value::from)),
        ("itemType", attr.item_type.map(Value::from)),
        ("schema", attr.schema),
    ];
    for (key, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            out.insert(key.into(), value);
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treewright_core::AttributeInput;

    fn input(id: &str, name: &str) -> AttributeInput {
        AttributeInput {
            id: id.into(),
            name: name.into(),
            attr_type: "string".into(),
            ops: vec!["==".into()],
            description: None,
            enum_values: None,
            min: None,
            max: None,
            item_type: None,
            schema: None,
        }
    }

    #[tokio::test]
    async fn agent_listing_sorts_by_name_and_omits_nulls() {
        let storage = Arc::new(StorageBackend::new_memory());
        let mut age = input("a_age", "Age");
        age.min = Some(0.0);
        age.attr_type = "number".into();
        storage.upsert_attributes(&[input("z_city", "City"), age]).await.unwrap();

        let svc = CatalogService::new(storage);
        let listed = svc.attributes_for_agent().await.unwrap();
        assert_eq!(listed[0]["name"], "Age");
        assert_eq!(listed[0]["min"], 0.0);
        assert!(listed[0].get("max").is_none());
        assert_eq!(listed[1]["operations"], json!(["=="]));
        assert!(listed[1].get("enumValues").is_none());
        assert!(listed[1]["description"].is_null());

        let by_id: Vec<_> = svc.attributes().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(by_id, vec!["a_age", "z_city"]);
        assert_eq!(svc.attribute_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn segment_names_are_sorted() {
        let storage = Arc::new(StorageBackend::new_memory());
        storage.upsert_segments(&["vip".into(), "churned".into()]).await.unwrap();
        let svc = CatalogService::new(storage);
        assert_eq!(svc.segment_names().await.unwrap(), vec!["churned", "vip"]);
    }
}
