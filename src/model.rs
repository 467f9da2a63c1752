use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_SHEET_NAME: &str = "New Sheet";
pub const DEFAULT_TAG_COLOR: &str = "#000000";

/// Creation time in milliseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SheetId(pub i64);

impl SheetId {
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }
}

// Sheets written by the Firefox upload page carry string ids.
impl<'de> Deserialize<'de> for SheetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Float(f64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(SheetId(n)),
            RawId::Float(f) if f.fract() == 0.0 => Ok(SheetId(f as i64)),
            RawId::Float(f) => Err(serde::de::Error::custom(format!(
                "sheet id is not an integer: {f}"
            ))),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map(SheetId)
                .map_err(|_| serde::de::Error::custom(format!("sheet id is not numeric: {s}"))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    /// Editor markup.
    #[serde(default)]
    pub content: String,
    /// Tag names; may reference tags that no longer exist.
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sheet {
    pub fn new(
        id: SheetId,
        name: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            content: content.into(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag == name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Most recently updated first.
    #[default]
    Date,
    Name,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn sheet_uses_camel_case_wire_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sheet = Sheet::new(SheetId::from_timestamp(at), "Groceries", "", at);
        let value = serde_json::to_value(&sheet).unwrap();

        assert_eq!(value["id"], json!(1709294400000i64));
        assert_eq!(value["createdAt"], json!("2024-03-01T12:00:00Z"));
        assert_eq!(value["updatedAt"], value["createdAt"]);
        assert_eq!(value["tags"], json!([]));
    }

    #[test]
    fn accepts_string_ids_and_missing_optional_fields() {
        let sheet: Sheet = serde_json::from_value(json!({
            "id": "1709294400000",
            "name": "Imported",
            "createdAt": "2024-03-01T12:00:00.000Z",
            "updatedAt": "2024-03-01T12:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(sheet.id, SheetId(1709294400000));
        assert!(sheet.content.is_empty());
        assert!(sheet.tags.is_empty());
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let result = serde_json::from_value::<SheetId>(json!("abc"));
        assert!(result.is_err());
        let result = serde_json::from_value::<SheetId>(json!(1.5));
        assert!(result.is_err());
    }
}
