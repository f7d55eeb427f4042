//! Schema validation: turns an untyped candidate (model output) into a
//! typed [`StructuredRecord`], or names the first field that breaks the
//! schema.
//!
//! Validation walks the [`FieldSpec`] tables in declaration order and
//! builds a normalized JSON value (ISO dates, decimal strings, canonical
//! enum spellings, unknown keys dropped) which is then deserialized into
//! the record type.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{SchemaViolation, Violation};
use crate::kind::StatementKind;
use crate::parse::{parse_date, parse_decimal, parse_period};
use crate::record::{ChequingStatement, CreditCardStatement, StructuredRecord};
use crate::schema::{schema_for, Constraint, FieldSpec, FieldType};

const ROOT: &str = "$";

/// Validate a candidate against the schema for `kind`.
pub fn validate(kind: StatementKind, candidate: &Value) -> Result<StructuredRecord, SchemaViolation> {
    let normalized = normalize_object(schema_for(kind), candidate, "")?;
    match kind {
        StatementKind::CreditCard => typed::<CreditCardStatement>(normalized).map(StructuredRecord::CreditCard),
        StatementKind::Chequing => typed::<ChequingStatement>(normalized).map(StructuredRecord::Chequing),
    }
}

fn typed<T: DeserializeOwned>(value: Value) -> Result<T, SchemaViolation> {
    serde_json::from_value(value).map_err(|e| SchemaViolation::new(ROOT, Violation::Malformed(e.to_string())))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn wrong_type(path: &str, expected: &'static str, found: &Value) -> SchemaViolation {
    SchemaViolation::new(
        path,
        Violation::WrongType {
            expected,
            found: json_type(found),
        },
    )
}

fn normalize_object(fields: &[FieldSpec], value: &Value, prefix: &str) -> Result<Value, SchemaViolation> {
    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            let at = if prefix.is_empty() { ROOT } else { prefix };
            return Err(wrong_type(at, "object", other));
        }
    };

    let mut out = Map::new();
    for field in fields {
        let path = join(prefix, field.name);
        let normalized = match obj.get(field.name) {
            None | Some(Value::Null) => None,
            Some(v) => normalize_field(field, v, &path)?,
        };
        match normalized {
            Some(v) => {
                out.insert(field.name.to_string(), v);
            }
            None if field.required => return Err(SchemaViolation::missing(path)),
            None => {
                out.insert(field.name.to_string(), Value::Null);
            }
        }
    }
    Ok(Value::Object(out))
}

/// Normalize one present, non-null value. `Ok(None)` means the value is
/// blank and should be treated as absent.
fn normalize_field(field: &FieldSpec, value: &Value, path: &str) -> Result<Option<Value>, SchemaViolation> {
    match field.ty {
        FieldType::String => normalize_string(field, value, path),
        FieldType::Decimal => {
            let raw = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                other => return Err(wrong_type(path, "decimal", other)),
            };
            let amount = parse_decimal(&raw).ok_or_else(|| SchemaViolation::new(path, Violation::InvalidDecimal(raw)))?;
            Ok(Some(Value::String(amount.to_string())))
        }
        FieldType::Date => {
            let raw = match value {
                Value::String(s) => s,
                other => return Err(wrong_type(path, "date", other)),
            };
            let date = parse_date(raw).ok_or_else(|| SchemaViolation::new(path, Violation::InvalidDate(raw.clone())))?;
            Ok(Some(Value::String(date.format("%Y-%m-%d").to_string())))
        }
        FieldType::Object(inner) => {
            let normalized = match (value, field.constraint) {
                (Value::String(s), Constraint::StartNotAfterEnd) => {
                    let (start, end) = parse_period(s).ok_or_else(|| SchemaViolation::new(path, Violation::InvalidDate(s.clone())))?;
                    let mut map = Map::new();
                    map.insert("start".to_string(), Value::String(start.format("%Y-%m-%d").to_string()));
                    map.insert("end".to_string(), Value::String(end.format("%Y-%m-%d").to_string()));
                    Value::Object(map)
                }
                _ => normalize_object(inner, value, path)?,
            };
            if field.constraint == Constraint::StartNotAfterEnd {
                check_period(&normalized, path)?;
            }
            Ok(Some(normalized))
        }
        FieldType::List(inner) => {
            let items = match value {
                Value::Array(items) => items,
                other => return Err(wrong_type(path, "list", other)),
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(normalize_object(inner, item, &format!("{path}[{i}]"))?);
            }
            Ok(Some(Value::Array(out)))
        }
    }
}

fn normalize_string(field: &FieldSpec, value: &Value, path: &str) -> Result<Option<Value>, SchemaViolation> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        // Account numbers occasionally come back unquoted
        Value::Number(n) => n.to_string(),
        other => return Err(wrong_type(path, "string", other)),
    };

    if raw.is_empty() {
        return match (field.required, field.constraint) {
            (true, Constraint::NonEmpty) => Err(SchemaViolation::new(path, Violation::Empty)),
            (true, _) => Err(SchemaViolation::missing(path)),
            (false, _) => Ok(None),
        };
    }

    if let Constraint::OneOf(allowed) = field.constraint {
        let lower = raw.to_lowercase();
        return match allowed.iter().find(|a| **a == lower) {
            Some(canonical) => Ok(Some(Value::String(canonical.to_string()))),
            None => Err(SchemaViolation::new(path, Violation::NotOneOf { value: raw, allowed })),
        };
    }

    Ok(Some(Value::String(raw)))
}

fn check_period(period: &Value, path: &str) -> Result<(), SchemaViolation> {
    // Both dates are already ISO strings, which order lexically.
    let start = period.get("start").and_then(Value::as_str).unwrap_or_default();
    let end = period.get("end").and_then(Value::as_str).unwrap_or_default();
    if start > end {
        return Err(SchemaViolation::new(
            path,
            Violation::PeriodReversed {
                start: start.to_string(),
                end: end.to_string(),
            },
        ));
    }
    Ok(())
}
