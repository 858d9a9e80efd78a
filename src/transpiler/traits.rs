use crate::error::{UpgradeError, UpgradeResult};
use crate::ops::*;
use crate::provider::Provider;

/// Renders operations as SQL for one provider.
///
/// Each method returns the statements of one operation, newline-joined and
/// each terminated by `;`. A generator lives for one `translate` call and
/// may remember what it already emitted.
pub trait SqlGenerator {
    fn provider(&self) -> Provider;

    /// Quote an identifier (table, column or type name).
    fn quote_identifier(&self, name: &str) -> String;

    /// Quote a name, schema-qualified where the provider supports it.
    fn qualify(&self, schema: Option<&str>, name: &str) -> String;

    fn set_default(&mut self, op: &SetDefaultOp) -> UpgradeResult<String>;
    fn set_created_at(&mut self, op: &SetCreatedAtOp) -> UpgradeResult<String>;
    fn set_json_type(&mut self, op: &SetJsonTypeOp) -> UpgradeResult<String>;
    fn set_enum_type(&mut self, op: &SetEnumTypeOp) -> UpgradeResult<String>;
    fn add_unique_constraint(&mut self, op: &AddUniqueConstraintOp) -> UpgradeResult<String>;
    fn migrate_has_many(&mut self, op: &MigrateHasManyOp) -> UpgradeResult<String>;
    fn migrate_one_to_one_table(&mut self, op: &MigrateOneToOneTableOp) -> UpgradeResult<String>;
    fn migrate_required_has_many(&mut self, op: &MigrateRequiredHasManyOp) -> UpgradeResult<String>;
    fn alter_id_width(&mut self, op: &AlterIdWidthOp) -> UpgradeResult<String>;
    fn migrate_scalar_list(&mut self, op: &MigrateScalarListOp) -> UpgradeResult<String>;
    fn migrate_enum_list(&mut self, op: &MigrateEnumListOp) -> UpgradeResult<String>;

    /// Render one operation.
    fn generate(&mut self, op: &Operation) -> UpgradeResult<String> {
        match op {
            Operation::SetDefault(op) => self.set_default(op),
            Operation::SetCreatedAt(op) => self.set_created_at(op),
            Operation::SetJsonType(op) => self.set_json_type(op),
            Operation::SetEnumType(op) => self.set_enum_type(op),
            Operation::AddUniqueConstraint(op) => self.add_unique_constraint(op),
            Operation::MigrateHasMany(op) => self.migrate_has_many(op),
            Operation::MigrateOneToOneTable(op) => self.migrate_one_to_one_table(op),
            Operation::MigrateRequiredHasMany(op) => self.migrate_required_has_many(op),
            Operation::AlterIdWidth(op) => self.alter_id_width(op),
            Operation::MigrateScalarList(op) => self.migrate_scalar_list(op),
            Operation::MigrateEnumList(op) => self.migrate_enum_list(op),
        }
    }

    /// Error for an operation this provider cannot express.
    fn unsupported(&self, operation: &'static str) -> UpgradeError {
        UpgradeError::UnsupportedOperation {
            provider: self.provider().name(),
            operation,
        }
    }
}

/// Quote a string literal, doubling single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Join table columns `(one, other)` for a relation between two models.
///
/// Column `A` references the model whose name sorts first. In a
/// self-relation the side receiving the foreign key is `A`.
pub fn join_columns(one_model: &str, other_model: &str) -> (&'static str, &'static str) {
    if one_model <= other_model {
        ("A", "B")
    } else {
        ("B", "A")
    }
}
