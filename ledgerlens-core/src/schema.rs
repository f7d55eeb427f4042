//! Schema registry: the declared record shapes as plain static data.
//!
//! The same `FieldSpec` tables drive both the model instruction (see
//! [`describe`] and [`skeleton`]) and the validator in [`crate::validate`],
//! so the two cannot drift apart.

use serde_json::{json, Map, Value};

use crate::kind::StatementKind;
use crate::record::TransactionType;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Decimal,
    Date,
    /// Nested object with its own fields
    Object(&'static [FieldSpec]),
    /// Ordered list of objects
    List(&'static [FieldSpec]),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::Object(_) => "object",
            FieldType::List(_) => "list",
        }
    }
}

/// Extra value constraint checked after the type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    None,
    NonEmpty,
    OneOf(&'static [&'static str]),
    /// Object with `start` and `end` dates where start <= end
    StartNotAfterEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub constraint: Constraint,
    pub description: &'static str,
}

const fn required(
    name: &'static str,
    ty: FieldType,
    constraint: Constraint,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: true,
        constraint,
        description,
    }
}

const fn optional(name: &'static str, ty: FieldType, description: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
        constraint: Constraint::None,
        description,
    }
}

pub const PERIOD_FIELDS: &[FieldSpec] = &[
    required("start", FieldType::Date, Constraint::None, "first day covered by the statement"),
    required("end", FieldType::Date, Constraint::None, "last day covered by the statement"),
];

pub const CARD_TRANSACTION_FIELDS: &[FieldSpec] = &[
    required("date", FieldType::Date, Constraint::None, "transaction date"),
    required("description", FieldType::String, Constraint::NonEmpty, "merchant or description as printed"),
    required(
        "amount",
        FieldType::Decimal,
        Constraint::None,
        "signed amount; charges positive, payments and credits negative",
    ),
];

pub const CHEQUING_TRANSACTION_FIELDS: &[FieldSpec] = &[
    required("date", FieldType::Date, Constraint::None, "transaction date"),
    required("description", FieldType::String, Constraint::NonEmpty, "description as printed"),
    required(
        "type",
        FieldType::String,
        Constraint::OneOf(TransactionType::ALL),
        "debit for money out, credit for money in",
    ),
    required(
        "amount",
        FieldType::Decimal,
        Constraint::None,
        "signed amount; withdrawals negative, deposits positive",
    ),
    required("running_balance", FieldType::Decimal, Constraint::None, "balance after this transaction"),
];

pub const CREDIT_CARD_FIELDS: &[FieldSpec] = &[
    required("customer_first_name", FieldType::String, Constraint::NonEmpty, "cardholder first name"),
    optional("customer_middle_name", FieldType::String, "cardholder middle name or initial, if printed"),
    required("customer_last_name", FieldType::String, Constraint::NonEmpty, "cardholder last name"),
    required("account_number", FieldType::String, Constraint::NonEmpty, "account or card number as printed (may be masked)"),
    required("card_type", FieldType::String, Constraint::NonEmpty, "card network or product, e.g. Visa, Mastercard"),
    required("credit_limit", FieldType::Decimal, Constraint::None, "credit limit"),
    required(
        "statement_period",
        FieldType::Object(PERIOD_FIELDS),
        Constraint::StartNotAfterEnd,
        "period covered by the statement",
    ),
    required(
        "transactions",
        FieldType::List(CARD_TRANSACTION_FIELDS),
        Constraint::None,
        "every transaction line, in the order printed",
    ),
];

pub const CHEQUING_FIELDS: &[FieldSpec] = &[
    required("bank_name", FieldType::String, Constraint::NonEmpty, "name of the issuing bank"),
    required("account_number", FieldType::String, Constraint::NonEmpty, "account number as printed (may be masked)"),
    required("opening_balance", FieldType::Decimal, Constraint::None, "balance at the start of the period"),
    required("closing_balance", FieldType::Decimal, Constraint::None, "balance at the end of the period"),
    required(
        "statement_period",
        FieldType::Object(PERIOD_FIELDS),
        Constraint::StartNotAfterEnd,
        "period covered by the statement",
    ),
    required(
        "transactions",
        FieldType::List(CHEQUING_TRANSACTION_FIELDS),
        Constraint::None,
        "every transaction line, in the order printed",
    ),
];

/// Field specs for a statement kind.
pub fn schema_for(kind: StatementKind) -> &'static [FieldSpec] {
    match kind {
        StatementKind::CreditCard => CREDIT_CARD_FIELDS,
        StatementKind::Chequing => CHEQUING_FIELDS,
    }
}

/// Example JSON skeleton with type placeholders, e.g. `"<date YYYY-MM-DD>"`.
pub fn skeleton(kind: StatementKind) -> Value {
    object_skeleton(schema_for(kind))
}

fn object_skeleton(fields: &[FieldSpec]) -> Value {
    let mut map = Map::new();
    for f in fields {
        map.insert(f.name.to_string(), field_skeleton(f));
    }
    Value::Object(map)
}

fn field_skeleton(f: &FieldSpec) -> Value {
    match (f.ty, f.constraint) {
        (FieldType::String, Constraint::OneOf(allowed)) => json!(allowed.join(" | ")),
        (FieldType::String, _) if f.required => json!("<string>"),
        (FieldType::String, _) => json!("<string or null>"),
        (FieldType::Decimal, _) => json!("<decimal, e.g. -1234.56>"),
        (FieldType::Date, _) => json!("<date YYYY-MM-DD>"),
        (FieldType::Object(inner), _) => object_skeleton(inner),
        (FieldType::List(inner), _) => Value::Array(vec![object_skeleton(inner)]),
    }
}

/// Plain-text field listing for model instructions.
pub fn describe(kind: StatementKind) -> String {
    let mut out = String::new();
    describe_fields(schema_for(kind), "", &mut out);
    out
}

fn describe_fields(fields: &[FieldSpec], prefix: &str, out: &mut String) {
    for f in fields {
        let path = format!("{prefix}{}", f.name);
        let need = if f.required { "required" } else { "optional" };
        out.push_str(&format!("- {path} ({}, {need}): {}", f.ty.name(), f.description));
        match f.constraint {
            Constraint::None => {}
            Constraint::NonEmpty => out.push_str("; must not be empty"),
            Constraint::OneOf(allowed) => out.push_str(&format!("; one of {}", allowed.join(", "))),
            Constraint::StartNotAfterEnd => out.push_str("; start must not be after end"),
        }
        out.push('\n');
        match f.ty {
            FieldType::Object(inner) => describe_fields(inner, &format!("{path}."), out),
            FieldType::List(inner) => describe_fields(inner, &format!("{path}[]."), out),
            _ => {}
        }
    }
}
