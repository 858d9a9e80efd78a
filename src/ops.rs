//! Repair operations.
//!
//! Every operation carries owned, already-resolved names so the SQL
//! generators never look back at either schema.

use serde::Serialize;

/// Column type family, taken from the legacy field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScalarKind {
    Id,
    Uuid,
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    Json,
    Enum { name: String, values: Vec<String> },
}

impl ScalarKind {
    /// Scalar kind of a legacy built-in type name.
    pub fn from_scalar(name: &str) -> Option<Self> {
        Some(match name {
            "ID" => ScalarKind::Id,
            "UUID" => ScalarKind::Uuid,
            "String" => ScalarKind::String,
            "Int" => ScalarKind::Int,
            "Float" => ScalarKind::Float,
            "Boolean" => ScalarKind::Boolean,
            "DateTime" => ScalarKind::DateTime,
            "Json" => ScalarKind::Json,
            _ => return None,
        })
    }
}

/// A literal column default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
}

/// `ALTER ... SET DEFAULT` for a legacy `@default(value: ...)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetDefaultOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub scalar: ScalarKind,
    pub required: bool,
    pub value: DefaultValue,
}

/// Default the column of a legacy `@createdAt` field to the current time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetCreatedAtOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub required: bool,
}

/// Convert a text column holding JSON into a JSON column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetJsonTypeOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub required: bool,
}

/// Convert a text column into an enum column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetEnumTypeOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub required: bool,
    pub enum_name: String,
    pub values: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddUniqueConstraintOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
}

/// One model taking part in a join table migration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationSide {
    pub model: String,
    pub table: String,
    pub id_column: String,
    pub id_kind: ScalarKind,
}

/// Replace a join table with a foreign key column on the `one` side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateHasManyOp {
    pub schema: Option<String>,
    /// Receives the column.
    pub one: RelationSide,
    /// Referenced by the column.
    pub many: RelationSide,
    pub column: String,
    pub required: bool,
    pub join_table: String,
}

/// Replace a one-to-one join table with a unique foreign key column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateOneToOneTableOp {
    pub schema: Option<String>,
    /// Receives the column.
    pub one: RelationSide,
    /// Referenced by the column.
    pub other: RelationSide,
    pub column: String,
    pub required: bool,
    pub join_table: String,
}

/// Make an optional foreign key column required.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateRequiredHasManyOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdColumn {
    pub table: String,
    pub column: String,
    pub required: bool,
}

/// Widen every string id and foreign key column at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlterIdWidthOp {
    pub schema: Option<String>,
    pub columns: Vec<IdColumn>,
    pub width: u32,
}

/// Move a `Model_field(nodeId, position, value)` table into an array column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateScalarListOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub id_column: String,
    pub scalar: ScalarKind,
    pub list_table: String,
}

/// Like [`MigrateScalarListOp`] for enum values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrateEnumListOp {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub id_column: String,
    pub enum_name: String,
    pub values: Vec<String>,
    pub list_table: String,
}

/// A single repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Operation {
    SetDefault(SetDefaultOp),
    SetCreatedAt(SetCreatedAtOp),
    SetJsonType(SetJsonTypeOp),
    SetEnumType(SetEnumTypeOp),
    AddUniqueConstraint(AddUniqueConstraintOp),
    MigrateHasMany(MigrateHasManyOp),
    MigrateOneToOneTable(MigrateOneToOneTableOp),
    MigrateRequiredHasMany(MigrateRequiredHasManyOp),
    AlterIdWidth(AlterIdWidthOp),
    MigrateScalarList(MigrateScalarListOp),
    MigrateEnumList(MigrateEnumListOp),
}

impl Operation {
    /// Breaking operations drop or restructure existing storage.
    pub fn is_breaking(&self) -> bool {
        match self {
            Operation::SetDefault(_)
            | Operation::SetCreatedAt(_)
            | Operation::SetJsonType(_)
            | Operation::SetEnumType(_)
            | Operation::AddUniqueConstraint(_)
            | Operation::AlterIdWidth(_) => false,
            Operation::MigrateHasMany(_)
            | Operation::MigrateOneToOneTable(_)
            | Operation::MigrateRequiredHasMany(_)
            | Operation::MigrateScalarList(_)
            | Operation::MigrateEnumList(_) => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::SetDefault(_) => "SetDefaultOp",
            Operation::SetCreatedAt(_) => "SetCreatedAtOp",
            Operation::SetJsonType(_) => "SetJsonTypeOp",
            Operation::SetEnumType(_) => "SetEnumTypeOp",
            Operation::AddUniqueConstraint(_) => "AddUniqueConstraintOp",
            Operation::MigrateHasMany(_) => "MigrateHasManyOp",
            Operation::MigrateOneToOneTable(_) => "MigrateOneToOneTableOp",
            Operation::MigrateRequiredHasMany(_) => "MigrateRequiredHasManyOp",
            Operation::AlterIdWidth(_) => "AlterIdWidthOp",
            Operation::MigrateScalarList(_) => "MigrateScalarListOp",
            Operation::MigrateEnumList(_) => "MigrateEnumListOp",
        }
    }
}
