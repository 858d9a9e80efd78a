//! Patches over the target schema.
//!
//! The upgrade never mutates the caller's schema. It clones it once and
//! advances the copy by applying patch lists with [`Schema::apply`].
//! A patch addressing a model or field that does not exist is skipped.

use tracing::trace;

use super::{Attribute, Block, DataType, Enum, Field, Model, Schema, Value};

/// One edit to the target schema. Models and fields are addressed by their
/// current name.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Rename a model, keeping its table through `@@map`, and retarget
    /// every relation field that points at it.
    RenameModel { model: String, to: String },
    /// Rename a column field, keeping its column through `@map`, and
    /// rewrite `fields:`/`references:` and block attribute lists naming it.
    RenameField {
        model: String,
        field: String,
        to: String,
    },
    /// Rename a relation field. Relation fields have no column to map.
    SetFieldName {
        model: String,
        field: String,
        to: String,
    },
    /// Replace the attribute of the same group and name, or append it.
    UpsertAttribute {
        model: String,
        field: String,
        attribute: Attribute,
    },
    /// Drop every ungrouped attribute with this name.
    RemoveAttribute {
        model: String,
        field: String,
        name: String,
    },
    SetType {
        model: String,
        field: String,
        ty: DataType,
    },
    /// Replace the innermost type name, keeping optional/list wrappers.
    SetInnermostType {
        model: String,
        field: String,
        name: String,
    },
    /// Add an enum block unless one with that name exists.
    AddEnum(Enum),
}

impl Schema {
    /// Apply patches in order and return the patched schema.
    pub fn apply(mut self, patches: &[Patch]) -> Schema {
        for patch in patches {
            self.apply_patch(patch);
        }
        self
    }

    fn apply_patch(&mut self, patch: &Patch) {
        match patch {
            Patch::RenameModel { model, to } => self.rename_model(model, to),
            Patch::RenameField { model, field, to } => {
                let Some(target) = self.field_mut(model, field) else {
                    trace!(model = %model, field = %field, "rename: no such field");
                    return;
                };
                if target.map_name().is_none() {
                    target.attributes.push(Attribute::map(field));
                }
                target.name = to.clone();
                self.rename_references(model, field, to);
            }
            Patch::SetFieldName { model, field, to } => {
                if let Some(target) = self.field_mut(model, field) {
                    target.name = to.clone();
                }
            }
            Patch::UpsertAttribute {
                model,
                field,
                attribute,
            } => {
                let Some(target) = self.field_mut(model, field) else {
                    trace!(model = %model, field = %field, "upsert: no such field");
                    return;
                };
                match target.attributes.iter_mut().find(|a| a.same_kind(attribute)) {
                    Some(existing) => *existing = attribute.clone(),
                    None => target.attributes.push(attribute.clone()),
                }
            }
            Patch::RemoveAttribute { model, field, name } => {
                if let Some(target) = self.field_mut(model, field) {
                    target.attributes.retain(|a| a.group.is_some() || &a.name != name);
                }
            }
            Patch::SetType { model, field, ty } => {
                if let Some(target) = self.field_mut(model, field) {
                    target.ty = ty.clone();
                }
            }
            Patch::SetInnermostType { model, field, name } => {
                if let Some(target) = self.field_mut(model, field) {
                    target.ty = target.ty.with_innermost(name);
                }
            }
            Patch::AddEnum(e) => {
                if !self.is_enum(&e.name) {
                    self.blocks.push(Block::Enum(e.clone()));
                }
            }
        }
    }

    fn models_mut(&mut self) -> impl Iterator<Item = &mut Model> + '_ {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Model(model) => Some(model),
            _ => None,
        })
    }

    fn field_mut(&mut self, model: &str, field: &str) -> Option<&mut Field> {
        self.models_mut()
            .find(|m| m.name == model)?
            .fields
            .iter_mut()
            .find(|f| f.name == field)
    }

    fn rename_model(&mut self, from: &str, to: &str) {
        let Some(model) = self.models_mut().find(|m| m.name == from) else {
            trace!(model = %from, "rename: no such model");
            return;
        };
        if model.find_attribute("map").is_none() {
            model.attributes.push(Attribute::map(from));
        }
        model.name = to.to_string();

        for model in self.models_mut() {
            for field in &mut model.fields {
                if field.ty.innermost() == from {
                    field.ty = field.ty.with_innermost(to);
                }
            }
        }
    }

    /// Rewrite references to a renamed field of `model`.
    fn rename_references(&mut self, model: &str, from: &str, to: &str) {
        for m in self.models_mut() {
            let own = m.name == model;
            if own {
                for attr in &mut m.attributes {
                    for arg in &mut attr.arguments {
                        rename_reference(&mut arg.value, from, to);
                    }
                }
            }
            for field in &mut m.fields {
                let points_here = field.ty.innermost() == model;
                let Some(relation) = field
                    .attributes
                    .iter_mut()
                    .find(|a| a.group.is_none() && a.name == "relation")
                else {
                    continue;
                };
                for arg in &mut relation.arguments {
                    match arg.name.as_deref() {
                        Some("fields") if own => rename_reference(&mut arg.value, from, to),
                        Some("references") if points_here => {
                            rename_reference(&mut arg.value, from, to)
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

fn rename_reference(value: &mut Value, from: &str, to: &str) {
    match value {
        Value::Reference(name) if name == from => *name = to.to_string(),
        Value::List(values) => {
            for v in values {
                rename_reference(v, from, to);
            }
        }
        _ => {}
    }
}
