//! Column phases: naming, per-field operations, scalar lists and id width.

use std::collections::BTreeSet;
use std::mem;

use tracing::{debug, trace};

use super::{matched, Context, Warning};
use crate::error::UpgradeResult;
use crate::legacy::{self, EnumType, FieldDef, FieldKind, ObjectType};
use crate::ops::*;
use crate::provider::Provider;
use crate::target::{self, Attribute, Field, Model, Patch};

/// Width of the widened id columns.
pub const ID_WIDTH: u32 = 30;

/// A target column field backing a legacy field.
struct Site<'t> {
    model: &'t Model,
    column: &'t Field,
}

impl<'t> Site<'t> {
    fn find(target: &'t target::Schema, model: &'t Model, field: &FieldDef) -> Option<Self> {
        let column = target.find_column(model, field.dbname())?;
        Some(Self { model, column })
    }

    fn upsert(&self, attribute: Attribute) -> Patch {
        Patch::UpsertAttribute {
            model: self.model.name.clone(),
            field: self.column.name.clone(),
            attribute,
        }
    }

    fn set_innermost(&self, name: &str) -> Patch {
        Patch::SetInnermostType {
            model: self.model.name.clone(),
            field: self.column.name.clone(),
            name: name.to_string(),
        }
    }

    fn table(&self) -> String {
        self.model.db_name().to_string()
    }

    fn column_name(&self) -> String {
        self.column.column_name().to_string()
    }

    fn has_default_call(&self, function: &str) -> bool {
        self.column
            .find_attribute("default")
            .and_then(Attribute::first_argument)
            .is_some_and(|value| value.is_call(function))
    }
}

/// Names and schema-only attributes.
///
/// Model renames come last so the field patches of this phase still
/// address models by their introspected names.
pub(super) fn naming(ctx: &mut Context<'_>, target: &target::Schema) -> UpgradeResult<Vec<Patch>> {
    let mut patches = Vec::new();
    let mut renames = Vec::new();

    let datamodel = ctx.legacy;
    for (object, model) in matched(datamodel, target) {
        for field in &object.fields {
            if let FieldKind::Relation(_) = datamodel.field_kind(object, field)? {
                continue;
            }
            let Some(site) = Site::find(target, model, field) else {
                trace!(model = %object.name, field = %field.name, "no column");
                continue;
            };

            match field.ty.named() {
                "ID" if !site.has_default_call("cuid") => {
                    patches.push(site.upsert(Attribute::default_function("cuid")))
                }
                "UUID" if !site.has_default_call("uuid") => {
                    patches.push(site.upsert(Attribute::default_function("uuid")))
                }
                _ => {}
            }
            if field.has_directive("updatedAt") && !site.column.has_attribute("updatedAt") {
                patches.push(site.upsert(Attribute::new("updatedAt", Vec::new())));
            }
            if ctx.provider == Provider::MySql
                && field.ty.named() == "Json"
                && field.default_value().is_some()
            {
                ctx.warn(Warning::JsonDefault {
                    model: object.name.clone(),
                    field: field.name.clone(),
                });
            }
            if site.column.name != field.name {
                patches.push(Patch::RenameField {
                    model: model.name.clone(),
                    field: site.column.name.clone(),
                    to: field.name.clone(),
                });
            }
        }

        if model.name != object.name {
            renames.push(Patch::RenameModel {
                model: model.name.clone(),
                to: object.name.clone(),
            });
        }
    }

    patches.extend(renames);
    Ok(patches)
}

/// JSON and enum column types, defaults and `@createdAt`.
pub(super) fn field_operations(
    ctx: &mut Context<'_>,
    target: &target::Schema,
) -> UpgradeResult<Vec<Patch>> {
    let mut patches = Vec::new();

    let datamodel = ctx.legacy;
    for (object, model) in matched(datamodel, target) {
        for field in object.fields.iter().filter(|f| !f.ty.is_list()) {
            let kind = datamodel.field_kind(object, field)?;
            if let FieldKind::Relation(_) = kind {
                continue;
            }
            let Some(site) = Site::find(target, model, field) else {
                continue;
            };
            let required = !field.is_optional();
            let innermost = site.column.ty.innermost();

            if field.ty.named() == "Json" && innermost != "Json" {
                ctx.push(Operation::SetJsonType(SetJsonTypeOp {
                    schema: ctx.schema.clone(),
                    table: site.table(),
                    column: site.column_name(),
                    required,
                }));
                patches.push(site.set_innermost("Json"));
            }

            let mut enum_retyped = false;
            if let FieldKind::Enum(e) = kind {
                if !target.is_enum(innermost) {
                    let name = target_enum(target, e, &mut patches);
                    ctx.push(Operation::SetEnumType(SetEnumTypeOp {
                        schema: ctx.schema.clone(),
                        table: site.table(),
                        column: site.column_name(),
                        required,
                        enum_name: e.dbname().to_string(),
                        values: e.values.clone(),
                        default: match field.default_value() {
                            Some(legacy::Value::Enum(value)) => Some(value.clone()),
                            _ => None,
                        },
                    }));
                    patches.push(site.set_innermost(&name));
                    enum_retyped = true;
                }
            }

            if let Some(value) = field.default_value() {
                carry_default(ctx, object, field, kind, &site, value, enum_retyped, &mut patches);
            }

            if field.has_directive("createdAt") && !site.has_default_call("now") {
                ctx.push(Operation::SetCreatedAt(SetCreatedAtOp {
                    schema: ctx.schema.clone(),
                    table: site.table(),
                    column: site.column_name(),
                    required,
                }));
                patches.push(site.upsert(Attribute::default_function("now")));
            }
        }
    }
    Ok(patches)
}

/// Carry a legacy `@default(value: ...)` over to the column.
#[allow(clippy::too_many_arguments)]
fn carry_default(
    ctx: &mut Context<'_>,
    object: &ObjectType,
    field: &FieldDef,
    kind: FieldKind<'_>,
    site: &Site<'_>,
    value: &legacy::Value,
    enum_retyped: bool,
    patches: &mut Vec<Patch>,
) {
    let json = field.ty.named() == "Json";
    if json && ctx.provider == Provider::MySql {
        return;
    }
    let Some((attribute_value, literal)) = convert_default(value) else {
        ctx.warn(Warning::UnsupportedDefault {
            model: object.name.clone(),
            field: field.name.clone(),
            kind: value.kind().to_string(),
        });
        return;
    };

    let current = site
        .column
        .find_attribute("default")
        .and_then(Attribute::first_argument);
    if current.is_some_and(|current| mem::discriminant(current) == mem::discriminant(&attribute_value)) {
        trace!(model = %object.name, field = %field.name, "default already set");
        return;
    }
    patches.push(site.upsert(Attribute::default_value(attribute_value)));

    // The ORM applies text defaults on MySQL and enum retypes carry their own.
    if enum_retyped || (ctx.provider == Provider::MySql && field.ty.named() == "String") {
        return;
    }
    let scalar = match kind {
        FieldKind::Enum(e) => ScalarKind::Enum {
            name: e.dbname().to_string(),
            values: e.values.clone(),
        },
        _ => match ScalarKind::from_scalar(field.ty.named()) {
            Some(scalar) => scalar,
            None => return,
        },
    };
    ctx.push(Operation::SetDefault(SetDefaultOp {
        schema: ctx.schema.clone(),
        table: site.table(),
        column: site.column_name(),
        scalar,
        required: !field.is_optional(),
        value: literal,
    }));
}

fn convert_default(value: &legacy::Value) -> Option<(target::Value, DefaultValue)> {
    use legacy::Value as V;
    Some(match value {
        V::String(s) => (target::Value::String(s.clone()), DefaultValue::String(s.clone())),
        V::Int(i) => (target::Value::Int(*i), DefaultValue::Int(*i)),
        V::Float(f) => (target::Value::Float(*f), DefaultValue::Float(*f)),
        V::Boolean(b) => (target::Value::Boolean(*b), DefaultValue::Boolean(*b)),
        V::Enum(e) => (target::Value::Reference(e.clone()), DefaultValue::Enum(e.clone())),
        V::Variable(_) | V::Null | V::List(_) | V::Object(_) => return None,
    })
}

/// Name of the target enum backing a legacy enum. Adds the block when the
/// target has none.
fn target_enum(target: &target::Schema, e: &EnumType, patches: &mut Vec<Patch>) -> String {
    if let Some(existing) = target.enums().find(|t| t.db_name() == e.dbname()) {
        return existing.name.clone();
    }
    let mut block = target::Enum::new(e.name.clone(), &e.values);
    if e.dbname() != e.name {
        block.attributes.push(Attribute::map(e.dbname()));
    }
    patches.push(Patch::AddEnum(block));
    e.name.clone()
}

/// Legacy scalar lists live in `Model_field(nodeId, position, value)` tables.
pub(super) fn scalar_lists(ctx: &mut Context<'_>, target: &target::Schema) -> UpgradeResult<Vec<Patch>> {
    let mut patches = Vec::new();

    let datamodel = ctx.legacy;
    for (object, model) in matched(datamodel, target) {
        for field in object.fields.iter().filter(|f| f.ty.is_list()) {
            let kind = datamodel.field_kind(object, field)?;
            if let FieldKind::Relation(_) = kind {
                continue;
            }
            if model.find_field(&field.name).is_some() || target.find_column(model, field.dbname()).is_some() {
                continue;
            }
            if ctx.provider == Provider::MySql {
                ctx.warn(Warning::ScalarListUnsupported {
                    model: object.name.clone(),
                    field: field.name.clone(),
                });
                continue;
            }
            let Some(id) = object.primary_key(ctx.version) else {
                debug!(model = %object.name, "no primary key for scalar list");
                continue;
            };

            let table = model.db_name().to_string();
            let column = field.dbname().to_string();
            let id_column = id.dbname().to_string();
            let list_table = format!("{}_{}", object.name, field.name);
            let op = match kind {
                FieldKind::Enum(e) => {
                    target_enum(target, e, &mut patches);
                    Operation::MigrateEnumList(MigrateEnumListOp {
                        schema: ctx.schema.clone(),
                        table,
                        column,
                        id_column,
                        enum_name: e.dbname().to_string(),
                        values: e.values.clone(),
                        list_table,
                    })
                }
                _ => {
                    let Some(scalar) = ScalarKind::from_scalar(field.ty.named()) else {
                        continue;
                    };
                    Operation::MigrateScalarList(MigrateScalarListOp {
                        schema: ctx.schema.clone(),
                        table,
                        column,
                        id_column,
                        scalar,
                        list_table,
                    })
                }
            };
            ctx.push(op);
        }
    }
    Ok(patches)
}

/// Collect string id and foreign key columns narrower than [`ID_WIDTH`].
///
/// Covers every target model, join and list tables included. Produces a
/// single operation and leaves the schema as it is.
pub(super) fn id_width(ctx: &mut Context<'_>, target: &target::Schema) -> UpgradeResult<Vec<Patch>> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();

    for model in target.models() {
        let foreign_keys = foreign_keys(target, model);
        for field in &model.fields {
            if field.ty.innermost() != "String" || field.name == "nodeId" || wide_enough(field) {
                continue;
            }
            let is_id = field.has_attribute("id");
            if !is_id && !foreign_keys.contains(&field.name.as_str()) {
                continue;
            }
            let column = IdColumn {
                table: model.db_name().to_string(),
                column: field.column_name().to_string(),
                required: !field.is_optional(),
            };
            if seen.insert((column.table.clone(), column.column.clone())) {
                columns.push(column);
            }
        }
    }

    if !columns.is_empty() {
        ctx.push_id(Operation::AlterIdWidth(AlterIdWidthOp {
            schema: ctx.schema.clone(),
            columns,
            width: ID_WIDTH,
        }));
    }
    Ok(Vec::new())
}

/// Fields of `model` holding foreign keys.
///
/// Either named by its own `@relation(fields: ...)`, or by the `references`
/// of a relation on the other side whose `fields` are that side's ids.
fn foreign_keys<'t>(target: &'t target::Schema, model: &'t Model) -> Vec<&'t str> {
    let mut keys: Vec<&str> = model
        .fields
        .iter()
        .flat_map(|f| f.relation_argument("fields"))
        .collect();
    for other in target.models() {
        for field in other.fields.iter().filter(|f| f.ty.innermost() == model.name) {
            let fields = field.relation_argument("fields");
            let by_id = !fields.is_empty()
                && fields
                    .iter()
                    .all(|name| other.find_field(name).is_some_and(|f| f.has_attribute("id")));
            if by_id {
                keys.extend(field.relation_argument("references"));
            }
        }
    }
    keys
}

fn wide_enough(field: &Field) -> bool {
    field
        .find_grouped("db", "VarChar")
        .and_then(Attribute::first_argument)
        .and_then(target::Value::as_int)
        .is_some_and(|width| width >= i64::from(ID_WIDTH))
}
