use bson::Bson;
use quarry_doc::FlatRow;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::date::DatePattern;
use crate::error::TransformError;

/// One declared output field.
///
/// `mongo_field` names the row key to read (a flattened path such as
/// `customer.address.city`); `column` is the key the value is written
/// under. Rules without a `mongo_field` are ignored by the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub column: String,
    #[serde(default, alias = "mongoField")]
    pub mongo_field: Option<String>,
    #[serde(default, alias = "dateFormat")]
    pub date_format: Option<String>,
}

impl FieldRule {
    pub fn new(mongo_field: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mongo_field: Some(mongo_field.into()),
            date_format: None,
        }
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

/// A date value that could not be parsed and was replaced with null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWarning {
    pub column: String,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    source: String,
    column: String,
    date: Option<DatePattern>,
}

/// Post-processes flattened rows: stringifies object ids and copies (and
/// optionally reformats) declared fields under their output column names.
#[derive(Debug, Clone, Default)]
pub struct FieldTransformer {
    rules: Vec<CompiledRule>,
}

impl FieldTransformer {
    /// Compile a rule set. Date patterns are validated here, so a bad
    /// pattern fails the setup rather than every row.
    pub fn new(rules: &[FieldRule]) -> Result<Self, TransformError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let Some(source) = &rule.mongo_field else {
                continue;
            };
            let date = match rule.date_format.as_deref() {
                None => None,
                Some(p) if p.trim().is_empty() => {
                    return Err(TransformError::EmptyPattern {
                        column: rule.column.clone(),
                    });
                }
                Some(p) => Some(DatePattern::new(p)?),
            };
            compiled.push(CompiledRule {
                source: source.clone(),
                column: rule.column.clone(),
                date,
            });
        }
        Ok(Self { rules: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the rule set to `row` in place.
    ///
    /// Top-level object id values become their 24-character hex string,
    /// whether or not a rule mentions them. Then, per rule in order, the
    /// source value is read, reformatted if the rule has a date pattern and
    /// the value is a string, and written under `column`. The source key is
    /// left as it was. A missing source writes null.
    ///
    /// Unparseable dates null the column and are reported back (and logged);
    /// they never fail the row.
    pub fn transform(&self, row: &mut FlatRow) -> Vec<DateWarning> {
        for value in row.values_mut() {
            if let Bson::ObjectId(oid) = value {
                *value = Bson::String(oid.to_hex());
            }
        }

        let mut warnings = Vec::new();
        for rule in &self.rules {
            let mut value = row.get(&rule.source).cloned().unwrap_or(Bson::Null);

            let reformatted = match (&rule.date, &value) {
                (Some(pattern), Bson::String(text)) => Some(match pattern.reformat(text) {
                    Ok(canonical) => Bson::String(canonical),
                    Err(e) => {
                        warn!(
                            column = %rule.column,
                            value = %text,
                            format = pattern.format(),
                            error = %e,
                            "date conversion error"
                        );
                        warnings.push(DateWarning {
                            column: rule.column.clone(),
                            value: text.clone(),
                            message: e.to_string(),
                        });
                        Bson::Null
                    }
                }),
                _ => None,
            };
            if let Some(reformatted) = reformatted {
                value = reformatted;
            }

            row.insert(rule.column.clone(), value);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};

    use super::*;

    fn row(d: bson::Document) -> FlatRow {
        FlatRow::from(d)
    }

    #[test]
    fn object_ids_become_hex() {
        let oid = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let mut r = row(doc! { "_id": oid, "name": "Acme" });
        let warnings = FieldTransformer::default().transform(&mut r);
        assert!(warnings.is_empty());
        assert_eq!(r.get("_id"), Some(&Bson::String("64b7f0c2a1b2c3d4e5f60718".into())));
        assert_eq!(r.get("name"), Some(&Bson::String("Acme".into())));
    }

    #[test]
    fn copies_under_column_and_keeps_source() {
        let t = FieldTransformer::new(&[FieldRule::new("customer.name", "customer_name")]).unwrap();
        let mut r = row(doc! { "customer.name": "Acme" });
        t.transform(&mut r);
        assert_eq!(r.get("customer.name"), Some(&Bson::String("Acme".into())));
        assert_eq!(r.get("customer_name"), Some(&Bson::String("Acme".into())));
    }

    #[test]
    fn copied_id_is_already_hex() {
        let oid = ObjectId::new();
        let t = FieldTransformer::new(&[FieldRule::new("_id", "id")]).unwrap();
        let mut r = row(doc! { "_id": oid });
        t.transform(&mut r);
        assert_eq!(r.get("id"), Some(&Bson::String(oid.to_hex())));
    }

    #[test]
    fn missing_source_writes_null() {
        let t = FieldTransformer::new(&[FieldRule::new("absent", "out")]).unwrap();
        let mut r = row(doc! {});
        t.transform(&mut r);
        assert_eq!(r.get("out"), Some(&Bson::Null));
    }

    #[test]
    fn rules_without_source_are_skipped() {
        let rule = FieldRule {
            column: "computed".into(),
            mongo_field: None,
            date_format: Some("yyyy".into()),
        };
        let t = FieldTransformer::new(&[rule]).unwrap();
        assert!(t.is_empty());
        let mut r = row(doc! { "a": 1 });
        t.transform(&mut r);
        assert!(!r.contains_key("computed"));
    }

    #[test]
    fn reformats_date_strings() {
        let t = FieldTransformer::new(&[
            FieldRule::new("created", "created_at").with_date_format("dd/MM/yyyy HH:mm")
        ])
        .unwrap();
        let mut r = row(doc! { "created": "05/03/2021 17:04" });
        assert!(t.transform(&mut r).is_empty());
        assert_eq!(
            r.get("created_at"),
            Some(&Bson::String("2021-03-05T17:04:00Z".into()))
        );
        assert_eq!(r.get("created"), Some(&Bson::String("05/03/2021 17:04".into())));
    }

    #[test]
    fn non_string_dates_pass_through() {
        let when = bson::DateTime::from_millis(1_600_000_000_000);
        let t = FieldTransformer::new(&[
            FieldRule::new("when", "when_at").with_date_format("yyyy-MM-dd")
        ])
        .unwrap();
        let mut r = row(doc! { "when": when });
        t.transform(&mut r);
        assert_eq!(r.get("when_at"), Some(&Bson::DateTime(when)));
    }

    #[test]
    fn bad_date_nulls_column_and_warns() {
        let t = FieldTransformer::new(&[
            FieldRule::new("created", "created_at").with_date_format("yyyy-MM-dd"),
            FieldRule::new("name", "title"),
        ])
        .unwrap();
        let mut r = row(doc! { "created": "yesterday", "name": "Acme" });
        let warnings = t.transform(&mut r);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "created_at");
        assert_eq!(warnings[0].value, "yesterday");
        assert_eq!(r.get("created_at"), Some(&Bson::Null));
        assert_eq!(r.get("title"), Some(&Bson::String("Acme".into())));
        assert_eq!(r.get("created"), Some(&Bson::String("yesterday".into())));
    }

    #[test]
    fn bad_pattern_fails_setup() {
        let err = FieldTransformer::new(&[
            FieldRule::new("created", "created_at").with_date_format("yyyy-ww")
        ])
        .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedLetter { letter: 'w', .. }));

        let err = FieldTransformer::new(&[
            FieldRule::new("created", "created_at").with_date_format(" ")
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TransformError::EmptyPattern {
                column: "created_at".into()
            }
        );
    }
}
