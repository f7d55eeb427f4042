//! ledgerlens-core: statement kinds, structured record types, the schema
//! registry and the validator that enforces it.

pub mod error;
pub mod kind;
pub mod parse;
pub mod record;
pub mod schema;
pub mod validate;

pub use error::{SchemaViolation, UnsupportedKind, Violation};
pub use kind::StatementKind;
pub use record::{
    CardTransaction, ChequingStatement, ChequingTransaction, CreditCardStatement, StatementPeriod,
    StructuredRecord, TransactionType,
};
pub use schema::{schema_for, skeleton, Constraint, FieldSpec, FieldType};
pub use validate::validate;
