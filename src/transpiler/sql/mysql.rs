use crate::error::UpgradeResult;
use crate::ops::*;
use crate::provider::Provider;
use crate::transpiler::traits::{join_columns, quote_literal, SqlGenerator};

const ID_CHARSET: &str = "CHARACTER SET utf8 COLLATE utf8_general_ci";

/// MySQL Generator.
#[derive(Debug, Default)]
pub struct MysqlGenerator;

impl MysqlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn column_type(&self, kind: &ScalarKind) -> String {
        match kind {
            ScalarKind::Id => format!("CHAR(25) {}", ID_CHARSET),
            ScalarKind::Uuid => format!("CHAR(36) {}", ID_CHARSET),
            ScalarKind::String => "MEDIUMTEXT".to_string(),
            ScalarKind::Int => "INT".to_string(),
            ScalarKind::Float => "DECIMAL(65,30)".to_string(),
            ScalarKind::Boolean => "TINYINT(1)".to_string(),
            ScalarKind::DateTime => "DATETIME(3)".to_string(),
            ScalarKind::Json => "JSON".to_string(),
            ScalarKind::Enum { values, .. } => self.enum_type(values),
        }
    }

    /// Foreign key column type matching the referenced id.
    fn foreign_key_type(&self, kind: &ScalarKind) -> String {
        match kind {
            ScalarKind::Id | ScalarKind::Uuid | ScalarKind::Int => self.column_type(kind),
            _ => format!("VARCHAR(191) {}", ID_CHARSET),
        }
    }

    fn enum_type(&self, values: &[String]) -> String {
        let values: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
        format!("ENUM({})", values.join(", "))
    }

    fn literal(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::String(s) | DefaultValue::Enum(s) => quote_literal(s),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Boolean(b) => if *b { "1".to_string() } else { "0".to_string() },
        }
    }

    /// `ALTER TABLE t CHANGE c c <definition>;`
    fn change_column(&self, table: &str, column: &str, definition: &str) -> String {
        let column = self.quote_identifier(column);
        format!(
            "ALTER TABLE {} CHANGE {} {} {};",
            self.quote_identifier(table),
            column,
            column,
            definition
        )
    }

    fn migrate_join_table(
        &self,
        one: &RelationSide,
        other: &RelationSide,
        column: &str,
        required: bool,
        join_table: &str,
        unique: bool,
    ) -> String {
        let table = self.quote_identifier(&one.table);
        let join = self.quote_identifier(join_table);
        let col = self.quote_identifier(column);
        let ty = self.foreign_key_type(&other.id_kind);
        let (one_letter, other_letter) = join_columns(&one.model, &other.model);

        let mut stmts = vec![format!("ALTER TABLE {} ADD COLUMN {} {};", table, col, ty)];
        stmts.push(format!(
            "UPDATE {table}, {join} SET {table}.{col} = {join}.{other_letter} WHERE {join}.{one_letter} = {table}.{id};",
            table = table,
            join = join,
            col = col,
            other_letter = self.quote_identifier(other_letter),
            one_letter = self.quote_identifier(one_letter),
            id = self.quote_identifier(&one.id_column),
        ));
        if required {
            stmts.push(format!("ALTER TABLE {} MODIFY {} {} NOT NULL;", table, col, ty));
        }
        if unique {
            stmts.push(format!("ALTER TABLE {} ADD UNIQUE ({});", table, col));
        }
        stmts.push(format!(
            "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({});",
            table,
            col,
            self.quote_identifier(&other.table),
            self.quote_identifier(&other.id_column)
        ));
        stmts.push(format!("DROP TABLE {};", join));
        stmts.join("\n")
    }
}

fn not_null(required: bool) -> &'static str {
    if required { " NOT NULL" } else { "" }
}

impl SqlGenerator for MysqlGenerator {
    fn provider(&self) -> Provider {
        Provider::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    /// MySQL tables are never schema-qualified.
    fn qualify(&self, _schema: Option<&str>, name: &str) -> String {
        self.quote_identifier(name)
    }

    fn set_default(&mut self, op: &SetDefaultOp) -> UpgradeResult<String> {
        let definition = format!(
            "{}{} DEFAULT {}",
            self.column_type(&op.scalar),
            not_null(op.required),
            self.literal(&op.value)
        );
        Ok(self.change_column(&op.table, &op.column, &definition))
    }

    fn set_created_at(&mut self, op: &SetCreatedAtOp) -> UpgradeResult<String> {
        let definition = format!("DATETIME(3){} DEFAULT CURRENT_TIMESTAMP(3)", not_null(op.required));
        Ok(self.change_column(&op.table, &op.column, &definition))
    }

    fn set_json_type(&mut self, op: &SetJsonTypeOp) -> UpgradeResult<String> {
        let definition = format!("JSON{}", not_null(op.required));
        Ok(self.change_column(&op.table, &op.column, &definition))
    }

    fn set_enum_type(&mut self, op: &SetEnumTypeOp) -> UpgradeResult<String> {
        let mut definition = format!("{}{}", self.enum_type(&op.values), not_null(op.required));
        if let Some(default) = &op.default {
            definition.push_str(&format!(" DEFAULT {}", quote_literal(default)));
        }
        Ok(self.change_column(&op.table, &op.column, &definition))
    }

    fn add_unique_constraint(&mut self, op: &AddUniqueConstraintOp) -> UpgradeResult<String> {
        Ok(format!(
            "ALTER TABLE {} ADD UNIQUE ({});",
            self.quote_identifier(&op.table),
            self.quote_identifier(&op.column)
        ))
    }

    fn migrate_has_many(&mut self, op: &MigrateHasManyOp) -> UpgradeResult<String> {
        Ok(self.migrate_join_table(&op.one, &op.many, &op.column, op.required, &op.join_table, false))
    }

    fn migrate_one_to_one_table(&mut self, op: &MigrateOneToOneTableOp) -> UpgradeResult<String> {
        Ok(self.migrate_join_table(&op.one, &op.other, &op.column, op.required, &op.join_table, true))
    }

    fn migrate_required_has_many(&mut self, _op: &MigrateRequiredHasManyOp) -> UpgradeResult<String> {
        Err(self.unsupported("MigrateRequiredHasManyOp"))
    }

    fn alter_id_width(&mut self, op: &AlterIdWidthOp) -> UpgradeResult<String> {
        let mut stmts = vec!["SET FOREIGN_KEY_CHECKS=0;".to_string()];
        for id in &op.columns {
            stmts.push(format!(
                "ALTER TABLE {} MODIFY {} VARCHAR({}) {}{};",
                self.quote_identifier(&id.table),
                self.quote_identifier(&id.column),
                op.width,
                ID_CHARSET,
                not_null(id.required)
            ));
        }
        stmts.push("SET FOREIGN_KEY_CHECKS=1;".to_string());
        Ok(stmts.join("\n"))
    }

    fn migrate_scalar_list(&mut self, _op: &MigrateScalarListOp) -> UpgradeResult<String> {
        Err(self.unsupported("MigrateScalarListOp"))
    }

    fn migrate_enum_list(&mut self, _op: &MigrateEnumListOp) -> UpgradeResult<String> {
        Err(self.unsupported("MigrateEnumListOp"))
    }
}
