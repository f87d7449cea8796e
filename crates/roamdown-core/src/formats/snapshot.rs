//! # Snapshot Decoder
//!
//! Decodes a `#datascript/DB` export into a schema table and a typed datom
//! sequence.
//!
//! Format: `#datascript/DB {:schema {...} :datoms [[e :attr v tx] ...]}`.
//! The type tag is optional. Any malformed record fails the whole decode;
//! no partial snapshot is ever returned.

use super::edn::{self, Value};
use crate::primitives::DATASCRIPT_TAG;
use crate::types::{Datom, EntityId, FactValue, Keyword, RoamError, SchemaEntry, TransactionId};
use std::collections::BTreeMap;

/// A decoded snapshot: schema table plus datoms in export order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Attribute keyword -> schema declaration.
    pub schema: BTreeMap<Keyword, SchemaEntry>,
    /// Datoms in the order they appear in the export.
    pub datoms: Vec<Datom>,
}

impl Snapshot {
    /// Number of decoded datoms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datoms.len()
    }

    /// Check if the snapshot carries no datoms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datoms.is_empty()
    }
}

/// Decode snapshot text.
pub fn decode_snapshot(text: &str) -> Result<Snapshot, RoamError> {
    let form = match edn::parse(text)? {
        Value::TaggedElement(tag, inner) if edn::symbol_name(&tag) == DATASCRIPT_TAG => *inner,
        Value::TaggedElement(tag, _) => {
            return Err(RoamError::InvalidSchema(format!(
                "unexpected type tag #{}",
                edn::symbol_name(&tag)
            )));
        }
        other => other,
    };

    if !matches!(form, Value::Map(_)) {
        return Err(RoamError::InvalidSchema(format!(
            "expected a map at top level, found {}",
            edn::type_name(&form)
        )));
    }

    let schema = match edn::get(&form, "schema") {
        Some(table) => decode_schema(table)?,
        None => BTreeMap::new(),
    };

    let records = edn::get(&form, "datoms")
        .ok_or_else(|| RoamError::InvalidSchema("missing :datoms".to_string()))?;
    let records = edn::as_seq(records).ok_or_else(|| {
        RoamError::InvalidSchema(format!(
            ":datoms must be a vector, found {}",
            edn::type_name(records)
        ))
    })?;

    let datoms = records
        .iter()
        .enumerate()
        .map(|(index, record)| decode_datom(index, record))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot { schema, datoms })
}

fn decode_schema(table: &Value) -> Result<BTreeMap<Keyword, SchemaEntry>, RoamError> {
    let Value::Map(entries) = table else {
        return Err(RoamError::InvalidSchema(format!(
            ":schema must be a map, found {}",
            edn::type_name(table)
        )));
    };

    let mut schema = BTreeMap::new();
    for (key, decl) in entries {
        let Value::Keyword(attribute) = key else {
            return Err(RoamError::InvalidSchema(format!(
                "schema key {} is not a keyword",
                edn::display(key)
            )));
        };
        let attribute = edn::keyword(attribute);
        if !matches!(decl, Value::Map(_)) {
            return Err(RoamError::InvalidSchema(format!(
                "schema for {} must be a map, found {}",
                attribute,
                edn::type_name(decl)
            )));
        }

        let entry = SchemaEntry {
            cardinality: schema_keyword(&attribute, decl, "db/cardinality")?,
            value_type: schema_keyword(&attribute, decl, "db/valueType")?,
            unique: schema_keyword(&attribute, decl, "db/unique")?,
        };
        schema.insert(attribute, entry);
    }

    Ok(schema)
}

fn schema_keyword(
    attribute: &Keyword,
    decl: &Value,
    field: &str,
) -> Result<Option<Keyword>, RoamError> {
    match edn::get(decl, field) {
        None => Ok(None),
        Some(Value::Keyword(k)) => Ok(Some(edn::keyword(k))),
        Some(other) => Err(RoamError::InvalidSchema(format!(
            "{} of {} must be a keyword, found {}",
            field,
            attribute,
            edn::type_name(other)
        ))),
    }
}

fn decode_datom(index: usize, record: &Value) -> Result<Datom, RoamError> {
    let malformed = |reason: String| RoamError::MalformedDatom {
        index,
        record: edn::display(record),
        reason,
    };

    let fields = edn::as_seq(record).ok_or_else(|| {
        malformed(format!(
            "expected a vector, found {}",
            edn::type_name(record)
        ))
    })?;

    let [entity, attribute, value, transaction] = fields else {
        return Err(malformed(format!(
            "expected 4 elements, found {}",
            fields.len()
        )));
    };

    let Value::Integer(entity) = entity else {
        return Err(malformed(format!(
            "entity id must be an integer, found {}",
            edn::type_name(entity)
        )));
    };
    let Value::Keyword(attribute) = attribute else {
        return Err(malformed(format!(
            "attribute must be a keyword, found {}",
            edn::type_name(attribute)
        )));
    };
    let value = match value {
        Value::Integer(i) => FactValue::Int(*i),
        Value::String(s) => FactValue::Str(s.clone()),
        Value::Keyword(k) => FactValue::Keyword(edn::keyword(k)),
        Value::Boolean(b) => FactValue::Bool(*b),
        other => {
            return Err(malformed(format!(
                "unsupported value type {}",
                edn::type_name(other)
            )));
        }
    };
    let Value::Integer(transaction) = transaction else {
        return Err(malformed(format!(
            "transaction id must be an integer, found {}",
            edn::type_name(transaction)
        )));
    };

    Ok(Datom::new(
        EntityId(*entity),
        edn::keyword(attribute),
        value,
        TransactionId(*transaction),
    ))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"#datascript/DB {
        :schema {:block/uid {:db/unique :db.unique/identity},
                 :block/parents {:db/cardinality :db.cardinality/many,
                                 :db/valueType :db.type/ref}}
        :datoms [[1 :block/uid "abc" 536870913]
                 [1 :node/title "publish" 536870913]
                 [2 :block/open true 536870914]
                 [2 :children/view-type :bullet 536870914]]}"#;

    #[test]
    fn decodes_schema_and_datoms() {
        let snapshot = decode_snapshot(SAMPLE).expect("decode");

        assert_eq!(snapshot.len(), 4);
        let uid = snapshot
            .schema
            .get(&Keyword::new("block/uid"))
            .expect("uid schema");
        assert_eq!(
            uid.unique.as_ref().map(Keyword::as_str),
            Some("db.unique/identity")
        );
        assert!(
            snapshot
                .schema
                .get(&Keyword::new("block/parents"))
                .is_some_and(SchemaEntry::is_ref)
        );

        let first = &snapshot.datoms[0];
        assert_eq!(first.entity, EntityId(1));
        assert_eq!(first.attribute.as_str(), "block/uid");
        assert_eq!(first.value, FactValue::Str("abc".into()));
        assert_eq!(first.transaction, TransactionId(536_870_913));

        assert_eq!(snapshot.datoms[2].value, FactValue::Bool(true));
        assert_eq!(
            snapshot.datoms[3].value,
            FactValue::Keyword(Keyword::new("bullet"))
        );
    }

    #[test]
    fn accepts_untagged_map() {
        let snapshot = decode_snapshot("{:datoms [[1 :block/order 0 1]]}").expect("decode");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.schema.is_empty());
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = decode_snapshot("{:datoms [[1 :block/uid \"a\" 1] [2 :block/uid \"b\"]]}")
            .expect_err("arity");
        assert!(matches!(err, RoamError::MalformedDatom { index: 1, .. }), "{err}");
        let message = err.to_string();
        assert!(message.contains(":block/uid") && message.contains("\"b\""), "{message}");
    }

    #[test]
    fn rejects_non_integer_entity() {
        let err = decode_snapshot("{:datoms [[\"1\" :block/uid \"a\" 1]]}").expect_err("entity");
        assert!(matches!(err, RoamError::MalformedDatom { index: 0, .. }));
    }

    #[test]
    fn rejects_non_keyword_attribute() {
        let err = decode_snapshot("{:datoms [[1 block/uid \"a\" 1]]}").expect_err("attribute");
        assert!(err.to_string().contains("attribute must be a keyword"));
    }

    #[test]
    fn rejects_non_integer_transaction() {
        assert!(decode_snapshot("{:datoms [[1 :block/uid \"a\" :tx]]}").is_err());
    }

    #[test]
    fn rejects_unsupported_value() {
        let err = decode_snapshot("{:datoms [[1 :block/props {:a 1} 1]]}").expect_err("value");
        assert!(err.to_string().contains("unsupported value type map"));
    }

    #[test]
    fn rejects_missing_datoms_and_foreign_tags() {
        assert!(matches!(
            decode_snapshot("{:schema {}}"),
            Err(RoamError::InvalidSchema(_))
        ));
        assert!(matches!(
            decode_snapshot("#other/DB {:datoms []}"),
            Err(RoamError::InvalidSchema(_))
        ));
        assert!(matches!(
            decode_snapshot("[1 2 3]"),
            Err(RoamError::InvalidSchema(_))
        ));
    }

    #[test]
    fn rejects_deep_discard_chains() {
        let text = "#_ ".repeat(200_000) + "1 {:datoms []}";
        assert!(matches!(decode_snapshot(&text), Err(RoamError::Syntax(_))));
    }

    #[test]
    fn rejects_malformed_schema() {
        assert!(decode_snapshot("{:schema {:a 1} :datoms []}").is_err());
        assert!(decode_snapshot("{:schema {:a {:db/unique \"x\"}} :datoms []}").is_err());
    }
}
