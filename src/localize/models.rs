use crate::catalog::ParsedListing;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{DefaultOnNull, serde_as, skip_serializing_none};

/// Generator output for one listing. `title` and `description` are always
/// present; a failed or malformed generation leaves them empty.
#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedListing {
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub title: String,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub description: String,
    #[serde(default)]
    pub bullet_points: Option<Vec<String>>,
    #[serde(default, deserialize_with = "keywords_text_or_list")]
    pub keywords: Option<String>,
    #[serde(default)]
    pub seo_meta_title: Option<String>,
    #[serde(default)]
    pub seo_meta_description: Option<String>,
}

impl LocalizedListing {
    pub fn bullet_count(&self) -> usize {
        self.bullet_points.as_ref().map(Vec::len).unwrap_or(0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordsField {
    Text(String),
    List(Vec<String>),
}

fn keywords_text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<KeywordsField>::deserialize(deserializer)?;
    Ok(field.map(|field| match field {
        KeywordsField::Text(text) => text,
        KeywordsField::List(items) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    Empty,
    ExceededLimit,
    SuspiciouslyShort,
}

impl QualityIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityIssue::Empty => "empty",
            QualityIssue::ExceededLimit => "exceeded_limit",
            QualityIssue::SuspiciouslyShort => "suspiciously_short",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlag {
    pub field: String,
    pub issue: QualityIssue,
    pub detail: String,
}

impl QualityFlag {
    pub fn new(field: impl Into<String>, issue: QualityIssue, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            issue,
            detail: detail.into(),
        }
    }
}

/// One exported unit: the source listing, what the generator made of it,
/// and the advisory flags raised against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationResultItem {
    pub source_row: usize,
    pub original: ParsedListing,
    pub localized: LocalizedListing,
    #[serde(default)]
    pub quality_flags: Vec<QualityFlag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_null_text_fields_default_to_empty() {
        let listing: LocalizedListing =
            serde_json::from_value(json!({"title": null, "keywords": "a b"})).unwrap();
        assert_eq!(listing.title, "");
        assert_eq!(listing.description, "");
        assert_eq!(listing.keywords.as_deref(), Some("a b"));
        assert!(listing.bullet_points.is_none());
    }

    #[test]
    fn keyword_arrays_are_joined() {
        let listing: LocalizedListing = serde_json::from_value(json!({
            "title": "Lampe",
            "description": "Warm",
            "keywords": ["Messinglampe", " Schreibtischlampe ", ""]
        }))
        .unwrap();
        assert_eq!(
            listing.keywords.as_deref(),
            Some("Messinglampe, Schreibtischlampe")
        );
    }

    #[test]
    fn issue_wire_names() {
        assert_eq!(
            serde_json::to_value(QualityIssue::ExceededLimit).unwrap(),
            json!("exceeded_limit")
        );
        assert_eq!(QualityIssue::SuspiciouslyShort.as_str(), "suspiciously_short");
    }
}
