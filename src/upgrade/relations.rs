//! Relation phases.
//!
//! [`relations`] turns classified relation pairs into operations.
//! [`relation_sides`] puts the foreign key arguments of a one-to-one on its
//! required side.
//! [`relation_names`] then gives target relation fields their legacy names.

use tracing::{debug, trace};

use super::{Context, Warning};
use crate::error::UpgradeResult;
use crate::graph::{self, Edge};
use crate::legacy::{self, FieldDef, FieldKind, ObjectType};
use crate::ops::*;
use crate::relations::{classify, match_pairs, Category};
use crate::target::{self, Argument, Attribute, DataType, Field, Model, Patch};

pub(super) fn relations(ctx: &mut Context<'_>, target: &target::Schema) -> UpgradeResult<Vec<Patch>> {
    let datamodel = ctx.legacy;
    let graph = graph::build(datamodel, ctx.version)?;
    let matching = match_pairs(graph.edges().copied());

    for ambiguity in &matching.ambiguities {
        ctx.warn(Warning::AmbiguousRelation {
            key: ambiguity.key.clone(),
            fields: ambiguity.edges.iter().map(Edge::from_key).collect(),
        });
    }

    let mut patches = Vec::new();
    for pair in &matching.pairs {
        match classify(pair, ctx.version) {
            Category::InlineOneToOne { unique, other } => {
                inline_one_to_one(ctx, target, unique, &mut patches);
                propagate_types(target, &[unique, other], &mut patches);
            }
            Category::TableOneToOne { unique, other } => {
                table_one_to_one(ctx, target, unique, other, &mut patches)
            }
            Category::TableOneToMany { one, many } => table_one_to_many(ctx, target, one, many),
            Category::RequiredInlineOneToMany { one, .. } => {
                required_one_to_many(ctx, target, one, &mut patches)
            }
            Category::Untouched => {}
        }
    }
    Ok(patches)
}

/// Move `@relation(fields, references)` of an inline one-to-one from the
/// optional relation field to the required one.
///
/// The moved attribute has its `fields` and `references` lists swapped.
pub(super) fn relation_sides(ctx: &mut Context<'_>, target: &target::Schema) -> UpgradeResult<Vec<Patch>> {
    let datamodel = ctx.legacy;
    let graph = graph::build(datamodel, ctx.version)?;
    let matching = match_pairs(graph.edges().copied());

    let mut patches = Vec::new();
    for pair in &matching.pairs {
        let Category::InlineOneToOne { unique, other } = classify(pair, ctx.version) else {
            continue;
        };
        let (Some((a_model, a)), Some((b_model, b))) = (located(target, &unique), located(target, &other)) else {
            continue;
        };
        if a.is_optional() == b.is_optional() {
            continue;
        }
        let ((from_model, from), (to_model, to)) = if a.is_optional() {
            ((a_model, a), (b_model, b))
        } else {
            ((b_model, b), (a_model, a))
        };
        let Some(relation) = from.find_attribute("relation") else {
            continue;
        };
        debug!(model = %from_model.name, field = %from.name, to = %to.name, "relation moved to required side");
        patches.push(Patch::RemoveAttribute {
            model: from_model.name.clone(),
            field: from.name.clone(),
            name: "relation".into(),
        });
        patches.push(Patch::UpsertAttribute {
            model: to_model.name.clone(),
            field: to.name.clone(),
            attribute: swap_relation(relation),
        });
    }
    Ok(patches)
}

fn located<'t>(target: &'t target::Schema, edge: &Edge<'_>) -> Option<(&'t Model, &'t Field)> {
    let model = target.find_model_by_db(edge.from.dbname())?;
    Some((model, relation_field(target, model, edge)?))
}

/// `@relation(fields: [a], references: [b])` becomes
/// `@relation(fields: [b], references: [a])`. Other arguments keep their place.
fn swap_relation(relation: &Attribute) -> Attribute {
    let (Some(fields), Some(references)) = (relation.argument("fields"), relation.argument("references")) else {
        return relation.clone();
    };
    let mut arguments: Vec<Argument> = relation
        .arguments
        .iter()
        .filter(|arg| !matches!(arg.name.as_deref(), Some("fields" | "references")))
        .cloned()
        .collect();
    arguments.push(Argument::keyed("fields", references.clone()));
    arguments.push(Argument::keyed("references", fields.clone()));
    Attribute::new("relation", arguments)
}

/// Make sure the column behind the unique side carries a unique constraint.
fn inline_one_to_one(ctx: &mut Context<'_>, target: &target::Schema, unique: Edge<'_>, patches: &mut Vec<Patch>) {
    let Some(model) = target.find_model_by_db(unique.from.dbname()) else {
        return;
    };
    match backing_column(target, model, &unique) {
        None => ctx.warn(Warning::MissingColumn {
            model: unique.from.name.clone(),
            field: unique.from_field.name.clone(),
        }),
        Some(column) if column.has_attribute("unique") || column.has_attribute("id") => {
            trace!(column = %column.name, "already unique");
        }
        Some(column) => {
            ctx.push(Operation::AddUniqueConstraint(AddUniqueConstraintOp {
                schema: ctx.schema.clone(),
                table: model.db_name().to_string(),
                column: column.column_name().to_string(),
            }));
            patches.push(Patch::UpsertAttribute {
                model: model.name.clone(),
                field: column.name.clone(),
                attribute: Attribute::new("unique", Vec::new()),
            });
        }
    }
}

fn table_one_to_one(
    ctx: &mut Context<'_>,
    target: &target::Schema,
    unique: Edge<'_>,
    other: Edge<'_>,
    patches: &mut Vec<Patch>,
) {
    let collapsed = [unique, other].iter().all(|edge| {
        target
            .find_model_by_db(edge.from.dbname())
            .and_then(|model| relation_field(target, model, edge))
            .is_some_and(|field| !field.is_list())
    });
    if collapsed {
        propagate_types(target, &[unique, other], patches);
        return;
    }
    ctx.push(Operation::MigrateOneToOneTable(MigrateOneToOneTableOp {
        schema: ctx.schema.clone(),
        one: side(&unique, &other),
        other: side(&other, &unique),
        column: unique.from_field.dbname().to_string(),
        required: !unique.from_field.is_optional(),
        join_table: join_table(&unique, &other),
    }));
}

fn table_one_to_many(ctx: &mut Context<'_>, target: &target::Schema, one: Edge<'_>, many: Edge<'_>) {
    let Some(model) = target.find_model_by_db(one.from.dbname()) else {
        return;
    };
    if backing_column(target, model, &one).is_some() {
        trace!(field = %one.from_key(), "already a foreign key");
        return;
    }
    ctx.push(Operation::MigrateHasMany(MigrateHasManyOp {
        schema: ctx.schema.clone(),
        one: side(&one, &many),
        many: side(&many, &one),
        column: one.from_field.dbname().to_string(),
        required: !one.from_field.is_optional(),
        join_table: join_table(&one, &many),
    }));
}

/// Require the foreign key of a non-null legacy relation.
fn required_one_to_many(ctx: &mut Context<'_>, target: &target::Schema, one: Edge<'_>, patches: &mut Vec<Patch>) {
    let Some(model) = target.find_model_by_db(one.from.dbname()) else {
        return;
    };
    let Some(field) = relation_field(target, model, &one) else {
        return;
    };
    if !field.is_optional() {
        return;
    }
    let column = backing_column(target, model, &one);
    ctx.push(Operation::MigrateRequiredHasMany(MigrateRequiredHasManyOp {
        schema: ctx.schema.clone(),
        table: model.db_name().to_string(),
        column: column.map_or_else(|| one.from_field.dbname(), Field::column_name).to_string(),
        referenced_table: one.to.dbname().to_string(),
        referenced_column: one.to_field.dbname().to_string(),
    }));
    if let Some(column) = column.filter(|c| c.is_optional()) {
        patches.push(Patch::SetType {
            model: model.name.clone(),
            field: column.name.clone(),
            ty: required(&column.ty),
        });
    }
    propagate_types(target, &[one], patches);
}

fn required(ty: &DataType) -> DataType {
    match ty {
        DataType::Optional(inner) => inner.as_ref().clone(),
        other => other.clone(),
    }
}

/// Give relation fields the wrapping of their legacy counterparts.
fn propagate_types(target: &target::Schema, edges: &[Edge<'_>], patches: &mut Vec<Patch>) {
    for edge in edges {
        let Some(model) = target.find_model_by_db(edge.from.dbname()) else {
            continue;
        };
        let Some(field) = relation_field(target, model, edge) else {
            continue;
        };
        let ty = DataType::from_legacy(&edge.from_field.ty).with_innermost(field.ty.innermost());
        if field.ty != ty {
            patches.push(Patch::SetType {
                model: model.name.clone(),
                field: field.name.clone(),
                ty,
            });
        }
    }
}

/// The target relation field standing for the legacy field of `edge`.
///
/// Tries the legacy name, then a field named after the referenced model,
/// then the only field of that type.
fn relation_field<'t>(target: &'t target::Schema, model: &'t Model, edge: &Edge<'_>) -> Option<&'t Field> {
    let to = target.find_model_by_db(edge.to.dbname())?;
    let of_type = |field: &&Field| field.ty.innermost() == to.name;

    if let Some(field) = model
        .fields
        .iter()
        .filter(of_type)
        .find(|f| f.name == edge.from_field.name || f.name == to.name)
    {
        return Some(field);
    }
    let mut candidates = model.fields.iter().filter(of_type);
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// The column holding the foreign key of `edge`, if the target has one.
fn backing_column<'t>(target: &'t target::Schema, model: &'t Model, edge: &Edge<'_>) -> Option<&'t Field> {
    target.find_column(model, edge.from_field.dbname()).or_else(|| {
        let relation = relation_field(target, model, edge)?;
        let name = relation.relation_argument("fields").into_iter().next()?;
        model.find_field(name)
    })
}

/// The model owning `edge`. Its primary key is the one `back` points at.
fn side(edge: &Edge<'_>, back: &Edge<'_>) -> RelationSide {
    RelationSide {
        model: edge.from.name.clone(),
        table: edge.from.dbname().to_string(),
        id_column: back.to_field.dbname().to_string(),
        id_kind: ScalarKind::from_scalar(back.to_field.ty.named()).unwrap_or(ScalarKind::String),
    }
}

/// `_<Relation>` for a named relation, `_<A>To<B>` otherwise.
fn join_table(a: &Edge<'_>, b: &Edge<'_>) -> String {
    match (a.relation_name, b.relation_name) {
        (Some(x), Some(y)) if x == y => format!("_{}", x),
        _ => {
            let (first, second) = if a.from.name <= a.to.name {
                (&a.from.name, &a.to.name)
            } else {
                (&a.to.name, &a.from.name)
            };
            format!("_{}To{}", first, second)
        }
    }
}

/// Rename target relation fields after their legacy counterparts.
///
/// Works one field at a time on the owned schema, so a rename is visible
/// to the next lookup.
pub(super) fn relation_names(ctx: &mut Context<'_>, mut schema: target::Schema) -> UpgradeResult<target::Schema> {
    let datamodel = ctx.legacy;
    for object in datamodel.objects() {
        let Some(model) = schema.find_model_by_db(object.dbname()) else {
            continue;
        };
        let model_name = model.name.clone();
        let fields: Vec<String> = model
            .fields
            .iter()
            .filter(|f| schema.is_relation_field(f))
            .map(|f| f.name.clone())
            .collect();

        let mut taken = Vec::new();
        for name in fields {
            let patches = sync_name(datamodel, object, &schema, &model_name, &name, &mut taken)?;
            if !patches.is_empty() {
                schema = schema.apply(&patches);
            }
        }
    }
    Ok(schema)
}

fn sync_name<'a>(
    datamodel: &'a legacy::Schema,
    object: &'a ObjectType,
    schema: &target::Schema,
    model_name: &str,
    field_name: &str,
    taken: &mut Vec<&'a str>,
) -> UpgradeResult<Vec<Patch>> {
    let Some(model) = schema.find_model(model_name) else {
        return Ok(Vec::new());
    };
    let Some(field) = model.find_field(field_name) else {
        return Ok(Vec::new());
    };
    let Some(to) = schema.find_model(field.ty.innermost()) else {
        return Ok(Vec::new());
    };

    let mut candidates: Vec<&'a FieldDef> = Vec::new();
    for candidate in &object.fields {
        if let FieldKind::Relation(other) = datamodel.field_kind(object, candidate)? {
            if other.dbname() == to.db_name() && !taken.contains(&candidate.name.as_str()) {
                candidates.push(candidate);
            }
        }
    }
    let chosen = match candidates.as_slice() {
        [only] => Some(*only),
        _ => candidates.iter().copied().find(|c| names_match(c, field)),
    };
    let Some(chosen) = chosen else {
        trace!(model = %model.name, field = %field.name, "no legacy relation field");
        return Ok(Vec::new());
    };
    taken.push(&chosen.name);
    if chosen.name == field.name {
        return Ok(Vec::new());
    }

    let mut patches = Vec::new();
    if let Some(conflict) = model.find_field(&chosen.name) {
        if schema.is_relation_field(conflict) {
            debug!(model = %model.name, field = %chosen.name, "name held by another relation field");
            return Ok(patches);
        }
        patches.push(Patch::RenameField {
            model: model.name.clone(),
            field: conflict.name.clone(),
            to: format!("{}Id", conflict.name),
        });
    }
    patches.push(Patch::SetFieldName {
        model: model.name.clone(),
        field: field.name.clone(),
        to: chosen.name.clone(),
    });
    Ok(patches)
}

fn names_match(legacy_field: &FieldDef, field: &Field) -> bool {
    field.name.ends_with(&legacy_field.name)
        || field
            .name
            .ends_with(&format!("{}To{}", legacy_field.name, legacy_field.ty.named()))
}

#[cfg(test)]
mod tests {
    use super::super::{upgrade, Input, Output};
    use super::*;
    use pretty_assertions::assert_eq;

    const DATASOURCE: &str = "datasource db {\n  provider = \"postgresql\"\n}\n";

    fn run(legacy: &str, target: &str) -> Output {
        let legacy = legacy::parse(legacy).unwrap();
        let target = target::parse(&format!("{}{}", DATASOURCE, target)).unwrap();
        upgrade(Input::new(&legacy, &target)).unwrap()
    }

    #[test]
    fn test_join_table_names() {
        let schema = legacy::parse(
            r#"
            type User {
              id: ID! @id
              posts: [Post!]! @relation(name: "Authored", link: TABLE)
              likes: [Like!]! @relation(link: TABLE)
            }
            type Post { id: ID! @id  author: User! @relation(name: "Authored") }
            type Like { id: ID! @id  user: User! }
            "#,
        )
        .unwrap();
        let graph = graph::build(&schema, schema.version()).unwrap();
        let edge = |from: &str, to: &str| *graph.edge(from, to).unwrap();

        let author = edge("Post.author", "User.id");
        let posts = edge("User.posts", "Post.id");
        assert_eq!(join_table(&author, &posts), "_Authored");

        let user = edge("Like.user", "User.id");
        let likes = edge("User.likes", "Like.id");
        assert_eq!(join_table(&user, &likes), "_LikeToUser");
        assert_eq!(join_table(&likes, &user), "_LikeToUser");
    }

    #[test]
    fn test_relation_field_takes_legacy_name() {
        let output = run(
            r#"
            type User { id: ID! @id  posts: [Post!]! }
            type Post { id: ID! @id  author: User! @relation(link: INLINE) }
            "#,
            "model User {\n  id String @id\n  Post Post[]\n}\n\
             model Post {\n  id String @id\n  author String\n  User User @relation(fields: [author], references: [id])\n}",
        );
        let post = output.schema.find_model("Post").unwrap();
        let author = post.find_field("author").unwrap();
        assert_eq!(author.ty.to_string(), "User");
        assert_eq!(author.relation_argument("fields"), vec!["authorId"]);

        let column = post.find_field("authorId").unwrap();
        assert_eq!(column.column_name(), "author");

        let user = output.schema.find_model("User").unwrap();
        assert!(user.find_field("posts").is_some());
        assert!(output.safe_ops.is_empty());
        assert!(output.breaking_ops.is_empty());
    }

    #[test]
    fn test_names_match_suffixes() {
        let legacy = legacy::parse("type A { id: ID! @id  owner: B } type B { id: ID! @id }").unwrap();
        let owner = legacy.find_object("A").unwrap().find_field("owner").unwrap();
        let field = |name: &str| Field::new(name, DataType::named("B"));
        assert!(names_match(owner, &field("B_owner")));
        assert!(names_match(owner, &field("A_ownerToB")));
        assert!(!names_match(owner, &field("editor")));
    }
}
