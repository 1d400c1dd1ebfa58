use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named user cohort mirrored from the user directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// A typed user property that tree attribute nodes compare against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    /// Operators the validator accepts for this attribute.
    pub ops: Vec<String>,
    pub description: Option<String>,
    pub enum_values: Option<serde_json::Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub item_type: Option<String>,
    pub schema: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Attribute detail as served by the directory API (`/v1/attributes/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeInput {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    #[serde(default)]
    pub ops: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enum_values: Option<serde_json::Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

impl AttributeInput {
    #[must_use]
    pub fn into_attribute(self, updated_at: DateTime<Utc>) -> Attribute {
        Attribute {
            id: self.id,
            name: self.name,
            attr_type: self.attr_type,
            ops: self.ops,
            description: self.description,
            enum_values: self.enum_values,
            min: self.min,
            max: self.max,
            item_type: self.item_type,
            schema: self.schema,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_input_accepts_sparse_detail() {
        let input: AttributeInput = serde_json::from_value(serde_json::json!({
            "id": "country",
            "name": "Country",
            "type": "enum",
            "ops": ["==", "!="],
            "enum_values": ["US", "CA"]
        }))
        .unwrap();
        assert_eq!(input.attr_type, "enum");
        assert_eq!(input.ops, vec!["==", "!="]);
        assert!(input.min.is_none());

        let attr = input.into_attribute(Utc::now());
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["type"], "enum");
        assert_eq!(json["enumValues"], serde_json::json!(["US", "CA"]));
        assert!(json["itemType"].is_null());
    }
}
