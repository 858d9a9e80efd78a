use std::collections::HashSet;

use crate::error::UpgradeResult;
use crate::ops::*;
use crate::provider::Provider;
use crate::transpiler::traits::{join_columns, quote_literal, SqlGenerator};

/// PostgreSQL Generator.
///
/// Remembers which enum types it created so each `CREATE TYPE` is emitted
/// once per translation.
#[derive(Debug, Default)]
pub struct PostgresGenerator {
    created_enums: HashSet<String>,
}

impl PostgresGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn literal(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::String(s) | DefaultValue::Enum(s) => quote_literal(s),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Boolean(b) => b.to_string(),
        }
    }

    fn alter_column(&self, schema: Option<&str>, table: &str, column: &str, action: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {};",
            self.qualify(schema, table),
            self.quote_identifier(column),
            action
        )
    }

    /// `CREATE TYPE ... AS ENUM`, or nothing when already emitted.
    fn create_enum(&mut self, schema: Option<&str>, name: &str, values: &[String]) -> Option<String> {
        let qualified = self.qualify(schema, name);
        if !self.created_enums.insert(qualified.clone()) {
            return None;
        }
        let values: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
        Some(format!("CREATE TYPE {} AS ENUM ({});", qualified, values.join(", ")))
    }

    fn foreign_key_type(&self, kind: &ScalarKind) -> &'static str {
        match kind {
            ScalarKind::Id => "VARCHAR(25)",
            ScalarKind::Uuid => "UUID",
            ScalarKind::Int => "INTEGER",
            _ => "TEXT",
        }
    }

    fn element_type(&self, kind: &ScalarKind, schema: Option<&str>) -> String {
        match kind {
            ScalarKind::Id | ScalarKind::String => "TEXT".to_string(),
            ScalarKind::Uuid => "UUID".to_string(),
            ScalarKind::Int => "INTEGER".to_string(),
            ScalarKind::Float => "DECIMAL(65,30)".to_string(),
            ScalarKind::Boolean => "BOOLEAN".to_string(),
            ScalarKind::DateTime => "TIMESTAMP(3)".to_string(),
            ScalarKind::Json => "JSONB".to_string(),
            ScalarKind::Enum { name, .. } => self.qualify(schema, name),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn migrate_join_table(
        &self,
        schema: Option<&str>,
        one: &RelationSide,
        other: &RelationSide,
        column: &str,
        required: bool,
        join_table: &str,
        unique: bool,
    ) -> String {
        let table = self.qualify(schema, &one.table);
        let join = self.qualify(schema, join_table);
        let col = self.quote_identifier(column);
        let (one_letter, other_letter) = join_columns(&one.model, &other.model);

        let mut stmts = vec![format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            table,
            col,
            self.foreign_key_type(&other.id_kind)
        )];
        stmts.push(format!(
            "UPDATE {table} SET {col} = {join}.{other_letter} FROM {join} WHERE {join}.{one_letter} = {table}.{id};",
            table = table,
            join = join,
            col = col,
            other_letter = self.quote_identifier(other_letter),
            one_letter = self.quote_identifier(one_letter),
            id = self.quote_identifier(&one.id_column),
        ));
        if required {
            stmts.push(format!("ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;", table, col));
        }
        if unique {
            stmts.push(format!("ALTER TABLE {} ADD UNIQUE ({});", table, col));
        }
        stmts.push(format!(
            "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({});",
            table,
            col,
            self.qualify(schema, &other.table),
            self.quote_identifier(&other.id_column)
        ));
        stmts.push(format!("DROP TABLE {};", join));
        stmts.join("\n")
    }

    /// Add an array column and fill it from a `nodeId/position/value` table.
    fn migrate_list(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        id_column: &str,
        element: &str,
        list_table: &str,
    ) -> Vec<String> {
        let qualified = self.qualify(schema, table);
        let col = self.quote_identifier(column);
        let list = self.qualify(schema, list_table);
        vec![
            format!("ALTER TABLE {} ADD COLUMN {} {}[];", qualified, col, element),
            format!(
                "UPDATE {table} SET {col} = l.\"values\"::{element}[] FROM (SELECT \"nodeId\", array_agg(\"value\" ORDER BY \"position\") AS \"values\" FROM {list} GROUP BY \"nodeId\") AS l WHERE l.\"nodeId\" = {table}.{id};",
                table = qualified,
                col = col,
                element = element,
                list = list,
                id = self.quote_identifier(id_column),
            ),
            format!("DROP TABLE {};", list),
        ]
    }
}

impl SqlGenerator for PostgresGenerator {
    fn provider(&self) -> Provider {
        Provider::Postgres
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote_identifier(schema), self.quote_identifier(name)),
            None => self.quote_identifier(name),
        }
    }

    fn set_default(&mut self, op: &SetDefaultOp) -> UpgradeResult<String> {
        let action = format!("SET DEFAULT {}", self.literal(&op.value));
        Ok(self.alter_column(op.schema.as_deref(), &op.table, &op.column, &action))
    }

    fn set_created_at(&mut self, op: &SetCreatedAtOp) -> UpgradeResult<String> {
        Ok(self.alter_column(
            op.schema.as_deref(),
            &op.table,
            &op.column,
            "SET DEFAULT CURRENT_TIMESTAMP",
        ))
    }

    fn set_json_type(&mut self, op: &SetJsonTypeOp) -> UpgradeResult<String> {
        let action = format!(
            "SET DATA TYPE JSONB USING {}::TEXT::JSONB",
            self.quote_identifier(&op.column)
        );
        Ok(self.alter_column(op.schema.as_deref(), &op.table, &op.column, &action))
    }

    fn set_enum_type(&mut self, op: &SetEnumTypeOp) -> UpgradeResult<String> {
        let schema = op.schema.as_deref();
        let enum_type = self.qualify(schema, &op.enum_name);
        let mut stmts: Vec<String> = self
            .create_enum(schema, &op.enum_name, &op.values)
            .into_iter()
            .collect();
        stmts.push(self.alter_column(schema, &op.table, &op.column, "DROP DEFAULT"));
        let action = format!(
            "SET DATA TYPE {} USING {}::text::{}",
            enum_type,
            self.quote_identifier(&op.column),
            enum_type
        );
        stmts.push(self.alter_column(schema, &op.table, &op.column, &action));
        if let Some(default) = &op.default {
            let action = format!("SET DEFAULT {}", quote_literal(default));
            stmts.push(self.alter_column(schema, &op.table, &op.column, &action));
        }
        Ok(stmts.join("\n"))
    }

    fn add_unique_constraint(&mut self, op: &AddUniqueConstraintOp) -> UpgradeResult<String> {
        Ok(format!(
            "ALTER TABLE {} ADD UNIQUE ({});",
            self.qualify(op.schema.as_deref(), &op.table),
            self.quote_identifier(&op.column)
        ))
    }

    fn migrate_has_many(&mut self, op: &MigrateHasManyOp) -> UpgradeResult<String> {
        Ok(self.migrate_join_table(
            op.schema.as_deref(),
            &op.one,
            &op.many,
            &op.column,
            op.required,
            &op.join_table,
            false,
        ))
    }

    fn migrate_one_to_one_table(&mut self, op: &MigrateOneToOneTableOp) -> UpgradeResult<String> {
        Ok(self.migrate_join_table(
            op.schema.as_deref(),
            &op.one,
            &op.other,
            &op.column,
            op.required,
            &op.join_table,
            true,
        ))
    }

    fn migrate_required_has_many(&mut self, op: &MigrateRequiredHasManyOp) -> UpgradeResult<String> {
        Ok(self.alter_column(op.schema.as_deref(), &op.table, &op.column, "SET NOT NULL"))
    }

    fn alter_id_width(&mut self, op: &AlterIdWidthOp) -> UpgradeResult<String> {
        let action = format!("SET DATA TYPE VARCHAR({})", op.width);
        let stmts: Vec<String> = op
            .columns
            .iter()
            .map(|id| self.alter_column(op.schema.as_deref(), &id.table, &id.column, &action))
            .collect();
        Ok(stmts.join("\n"))
    }

    fn migrate_scalar_list(&mut self, op: &MigrateScalarListOp) -> UpgradeResult<String> {
        let schema = op.schema.as_deref();
        let element = self.element_type(&op.scalar, schema);
        let stmts = self.migrate_list(schema, &op.table, &op.column, &op.id_column, &element, &op.list_table);
        Ok(stmts.join("\n"))
    }

    fn migrate_enum_list(&mut self, op: &MigrateEnumListOp) -> UpgradeResult<String> {
        let schema = op.schema.as_deref();
        let element = self.qualify(schema, &op.enum_name);
        let mut stmts: Vec<String> = self
            .create_enum(schema, &op.enum_name, &op.values)
            .into_iter()
            .collect();
        stmts.extend(self.migrate_list(schema, &op.table, &op.column, &op.id_column, &element, &op.list_table));
        Ok(stmts.join("\n"))
    }
}
