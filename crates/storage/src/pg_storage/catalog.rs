//! CatalogStore implementation for PgStorage.

use super::*;

use std::collections::BTreeSet;

use crate::traits::CatalogStore;
use crate::types::AttributeOrder;
use async_trait::async_trait;
use treewright_core::AttributeInput;

#[async_trait]
impl CatalogStore for PgStorage {
    async fn upsert_segments(&self, names: &[String]) -> Result<usize, StorageError> {
        // A batch may not hit the same conflict row twice.
        let unique: Vec<&str> =
            names.iter().map(String::as_str).collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO segments (name, updated_at)
             SELECT name, NOW() FROM UNNEST($1::text[]) AS t(name)
             ON CONFLICT (name) DO UPDATE SET updated_at = NOW()",
        )
        .bind(&unique)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(unique.len())
    }

    async fn list_segments(&self) -> Result<Vec<Segment>, StorageError> {
        let rows = sqlx::query("SELECT name, updated_at FROM segments ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_segment).collect()
    }

    async fn count_segments(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn upsert_attributes(&self, attributes: &[AttributeInput]) -> Result<usize, StorageError> {
        if attributes.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for attr in attributes {
            let ops = serde_json::to_value(&attr.ops).map_err(|e| StorageError::DataCorruption {
                context: format!("attribute {} ops", attr.id),
                source: Box::new(e),
            })?;
            sqlx::query(
                "INSERT INTO attributes
                   (id, name, attr_type, ops, description, enum_values, min, max, item_type, schema, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
                 ON CONFLICT (id) DO UPDATE SET
                   name = EXCLUDED.name,
                   attr_type = EXCLUDED.attr_type,
                   ops = EXCLUDED.ops,
                   description = EXCLUDED.description,
                   enum_values = EXCLUDED.enum_values,
                   min = EXCLUDED.min,
                   max = EXCLUDED.max,
                   item_type = EXCLUDED.item_type,
                   schema = EXCLUDED.schema,
                   updated_at = NOW()",
            )
            .bind(&attr.id)
            .bind(&attr.name)
            .bind(&attr.attr_type)
            .bind(ops)
            .bind(&attr.description)
            .bind(&attr.enum_values)
            .bind(attr.min)
            .bind(attr.max)
            .bind(&attr.item_type)
            .bind(&attr.schema)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(attributes.len())
    }

    async fn list_attributes(&self, order: AttributeOrder) -> Result<Vec<Attribute>, StorageError> {
        let order_by = match order {
            AttributeOrder::Id => "id",
            AttributeOrder::Name => "name",
        };
        let rows = sqlx::query(&format!(
            "SELECT {ATTRIBUTE_COLUMNS} FROM attributes ORDER BY {order_by} ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_attribute).collect()
    }

    async fn count_attributes(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attributes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
