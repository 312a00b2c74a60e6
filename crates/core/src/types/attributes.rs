//! Typed key/value maps for variant attributes and category specifications.
//!
//! These used to be free-form JSON blobs parsed ad hoc wherever they were
//! read. They are now validated once when deserialised (request bodies and
//! `JSONB` columns alike) and carried as concrete types afterwards.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Maximum number of attributes on one variant.
pub const MAX_VARIANT_ATTRIBUTES: usize = 16;
/// Maximum number of fields in a category spec template.
pub const MAX_SPEC_FIELDS: usize = 64;
const MAX_KEY_LEN: usize = 64;
const MAX_VALUE_LEN: usize = 256;

/// Errors raised while validating attribute maps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("attribute keys cannot be empty")]
    EmptyKey,
    #[error("value for '{0}' cannot be empty")]
    EmptyValue(String),
    #[error("'{0}' is too long")]
    TooLong(String),
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
    #[error("at most {0} entries are allowed")]
    TooMany(usize),
    #[error("'{0}' is not part of this category's specification template")]
    UnknownSpecKey(String),
}

fn clean_pair(key: &str, value: &str) -> Result<(String, String), AttributeError> {
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(AttributeError::EmptyKey);
    }
    if value.is_empty() {
        return Err(AttributeError::EmptyValue(key.to_owned()));
    }
    if key.len() > MAX_KEY_LEN || value.len() > MAX_VALUE_LEN {
        return Err(AttributeError::TooLong(key.to_owned()));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn clean_map(
    raw: BTreeMap<String, String>,
    limit: usize,
) -> Result<BTreeMap<String, String>, AttributeError> {
    if raw.len() > limit {
        return Err(AttributeError::TooMany(limit));
    }
    let mut seen = HashSet::with_capacity(raw.len());
    let mut cleaned = BTreeMap::new();
    for (key, value) in &raw {
        let (key, value) = clean_pair(key, value)?;
        if !seen.insert(key.to_lowercase()) {
            return Err(AttributeError::DuplicateKey(key));
        }
        cleaned.insert(key, value);
    }
    Ok(cleaned)
}

/// Attributes distinguishing one variant of a product, e.g. color and storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct VariantAttributes(BTreeMap<String, String>);

impl VariantAttributes {
    /// Validate and normalise a raw map.
    ///
    /// # Errors
    ///
    /// Returns an [`AttributeError`] for empty, oversized or duplicate entries.
    pub fn new(raw: BTreeMap<String, String>) -> Result<Self, AttributeError> {
        clean_map(raw, MAX_VARIANT_ATTRIBUTES).map(Self)
    }

    /// Look up one attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human-readable label such as `"Black / 256GB"` (values in key order).
    #[must_use]
    pub fn label(&self) -> String {
        self.0.values().map(String::as_str).collect::<Vec<_>>().join(" / ")
    }
}

impl TryFrom<BTreeMap<String, String>> for VariantAttributes {
    type Error = AttributeError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// One field of a category's specification template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecField {
    /// Machine key, e.g. `screen_size`.
    pub key: String,
    /// Display label, e.g. `Screen size`.
    pub label: String,
    /// Optional unit, e.g. `inch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// The list of specification fields products in a category may fill in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SpecField>")]
pub struct SpecTemplate(Vec<SpecField>);

impl SpecTemplate {
    /// Validate a list of fields.
    ///
    /// # Errors
    ///
    /// Returns an [`AttributeError`] for empty or duplicate keys.
    pub fn new(fields: Vec<SpecField>) -> Result<Self, AttributeError> {
        if fields.len() > MAX_SPEC_FIELDS {
            return Err(AttributeError::TooMany(MAX_SPEC_FIELDS));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        let mut cleaned = Vec::with_capacity(fields.len());
        for field in fields {
            let (key, label) = clean_pair(&field.key, &field.label)?;
            if !seen.insert(key.to_lowercase()) {
                return Err(AttributeError::DuplicateKey(key));
            }
            let unit = field
                .unit
                .map(|u| u.trim().to_owned())
                .filter(|u| !u.is_empty());
            cleaned.push(SpecField { key, label, unit });
        }
        Ok(Self(cleaned))
    }

    #[must_use]
    pub fn fields(&self) -> &[SpecField] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is declared by this template.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|f| f.key == key)
    }
}

impl TryFrom<Vec<SpecField>> for SpecTemplate {
    type Error = AttributeError;

    fn try_from(fields: Vec<SpecField>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

/// A product's filled-in specification values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct ProductSpecs(BTreeMap<String, String>);

impl ProductSpecs {
    /// Validate and normalise a raw map.
    ///
    /// # Errors
    ///
    /// Returns an [`AttributeError`] for empty, oversized or duplicate entries.
    pub fn new(raw: BTreeMap<String, String>) -> Result<Self, AttributeError> {
        clean_map(raw, MAX_SPEC_FIELDS).map(Self)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check every key against the category template.
    ///
    /// An empty template accepts anything; categories without a template
    /// have not been curated yet.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::UnknownSpecKey`] for the first undeclared key.
    pub fn validate_against(&self, template: &SpecTemplate) -> Result<(), AttributeError> {
        if template.is_empty() {
            return Ok(());
        }
        match self.0.keys().find(|key| !template.contains(key)) {
            Some(key) => Err(AttributeError::UnknownSpecKey(key.clone())),
            None => Ok(()),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for ProductSpecs {
    type Error = AttributeError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// Store a serde type in a `JSONB` column.
macro_rules! impl_jsonb_column {
    ($name:ty) => {
        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <::sqlx::types::Json<Self> as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <::sqlx::types::Json<Self> as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, ::sqlx::error::BoxDynError> {
                let ::sqlx::types::Json(inner) =
                    <::sqlx::types::Json<Self> as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(inner)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <::sqlx::types::Json<&Self> as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(
                    &::sqlx::types::Json(self),
                    buf,
                )
            }
        }
    };
}

impl_jsonb_column!(VariantAttributes);
impl_jsonb_column!(SpecTemplate);
impl_jsonb_column!(ProductSpecs);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_variant_attributes_trim_and_label() {
        let attrs =
            VariantAttributes::new(map(&[(" color ", " Black "), ("storage", "256GB")])).unwrap();
        assert_eq!(attrs.get("color"), Some("Black"));
        assert_eq!(attrs.label(), "Black / 256GB");
    }

    #[test]
    fn test_variant_attributes_reject_case_duplicates() {
        let err = VariantAttributes::new(map(&[("Color", "Red"), ("color", "Blue")])).unwrap_err();
        assert!(matches!(err, AttributeError::DuplicateKey(_)));
    }

    #[test]
    fn test_variant_attributes_reject_empty_value() {
        let err = VariantAttributes::new(map(&[("color", "  ")])).unwrap_err();
        assert_eq!(err, AttributeError::EmptyValue("color".to_owned()));
    }

    #[test]
    fn test_variant_attributes_deserialize_validates() {
        let ok: VariantAttributes = serde_json::from_str(r#"{"ram":"8GB"}"#).unwrap();
        assert_eq!(ok.get("ram"), Some("8GB"));
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"ram":"8GB"}"#);
        assert!(serde_json::from_str::<VariantAttributes>(r#"{"":"x"}"#).is_err());
    }

    #[test]
    fn test_spec_template_duplicate_keys() {
        let fields = vec![
            SpecField {
                key: "screen".into(),
                label: "Screen".into(),
                unit: Some("inch".into()),
            },
            SpecField {
                key: "Screen".into(),
                label: "Screen again".into(),
                unit: None,
            },
        ];
        assert!(matches!(
            SpecTemplate::new(fields),
            Err(AttributeError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_spec_template_drops_blank_unit() {
        let template: SpecTemplate =
            serde_json::from_str(r#"[{"key":"battery","label":"Battery","unit":" "}]"#).unwrap();
        assert_eq!(template.fields().first().and_then(|f| f.unit.clone()), None);
    }

    #[test]
    fn test_specs_validate_against_template() {
        let template: SpecTemplate = serde_json::from_str(
            r#"[{"key":"screen","label":"Screen"},{"key":"chip","label":"Chip"}]"#,
        )
        .unwrap();
        let good = ProductSpecs::new(map(&[("screen", "6.1 inch")])).unwrap();
        assert!(good.validate_against(&template).is_ok());

        let bad = ProductSpecs::new(map(&[("weight", "170g")])).unwrap();
        assert_eq!(
            bad.validate_against(&template),
            Err(AttributeError::UnknownSpecKey("weight".to_owned()))
        );

        assert!(bad.validate_against(&SpecTemplate::default()).is_ok());
    }
}
