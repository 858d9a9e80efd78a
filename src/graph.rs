//! Relation graph over the legacy datamodel.
//!
//! Nodes are `Model.field` keys, one per field. Every relation field adds a
//! directed edge from its own node to the primary-key node of the model it
//! references. Edges live in a map keyed by endpoint pair; a second map holds
//! the edges incident to each node.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{UpgradeError, UpgradeResult};
use crate::legacy::{FieldDef, FieldKind, ObjectType, Schema, SchemaVersion, Type, Value};

/// `"Model.field"`
pub type NodeKey = String;

pub fn node_key(model: &ObjectType, field: &FieldDef) -> NodeKey {
    format!("{}.{}", model.name, field.name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinality {
    HasOne,
    HasMany,
}

/// How the legacy datamodel stores a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Link {
    /// Foreign key column (`@relation` without `link: TABLE`).
    Inline,
    /// Join table (`@relation(link: TABLE)`).
    Table,
    /// No `@relation` directive.
    Unspecified,
}

/// A directed relation edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<'a> {
    pub from: &'a ObjectType,
    pub from_field: &'a FieldDef,
    pub to: &'a ObjectType,
    pub to_field: &'a FieldDef,
    pub cardinality: Cardinality,
    pub link: Link,
    pub relation_name: Option<&'a str>,
}

impl<'a> Edge<'a> {
    pub fn from_key(&self) -> NodeKey {
        node_key(self.from, self.from_field)
    }

    pub fn to_key(&self) -> NodeKey {
        node_key(self.to, self.to_field)
    }

    /// Stored in a join table. Version 1.0 treats unspecified links as tables.
    pub fn is_table(&self, version: SchemaVersion) -> bool {
        match self.link {
            Link::Table => true,
            Link::Unspecified => version == SchemaVersion::V1_0,
            Link::Inline => false,
        }
    }

    pub fn is_self_relation(&self) -> bool {
        self.from.name == self.to.name
    }

    /// Sort key: owning model, then owning field.
    pub fn owner(&self) -> (&'a str, &'a str) {
        (&self.from.name, &self.from_field.name)
    }
}

/// Directed graph of relation edges.
#[derive(Debug, Default)]
pub struct Graph<'a> {
    nodes: BTreeSet<NodeKey>,
    edges: BTreeMap<(NodeKey, NodeKey), Edge<'a>>,
    incident: BTreeMap<NodeKey, Vec<(NodeKey, NodeKey)>>,
}

impl<'a> Graph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, key: NodeKey) {
        self.nodes.insert(key);
    }

    pub fn contains_node(&self, key: &str) -> bool {
        self.nodes.contains(key)
    }

    /// Insert an edge. Both endpoints must already be nodes.
    pub fn add_edge(&mut self, edge: Edge<'a>) -> UpgradeResult<()> {
        let from = edge.from_key();
        let to = edge.to_key();
        for endpoint in [&from, &to] {
            if !self.nodes.contains(endpoint) {
                return Err(UpgradeError::graph(
                    endpoint.clone(),
                    "edge endpoint is not a node of the graph",
                ));
            }
        }
        let key = (from.clone(), to.clone());
        self.incident.entry(from).or_default().push(key.clone());
        if key.0 != to {
            self.incident.entry(to).or_default().push(key.clone());
        }
        self.edges.insert(key, edge);
        Ok(())
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge<'a>> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    /// All edges, ordered by endpoint keys.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<'a>> + '_ {
        self.edges.values()
    }

    pub fn outgoing<'g>(&'g self, node: &'g str) -> impl Iterator<Item = &'g Edge<'a>> + 'g {
        self.incident_edges(node).filter(move |e| e.from_key() == node)
    }

    pub fn incoming<'g>(&'g self, node: &'g str) -> impl Iterator<Item = &'g Edge<'a>> + 'g {
        self.incident_edges(node).filter(move |e| e.to_key() == node)
    }

    fn incident_edges<'g>(&'g self, node: &str) -> impl Iterator<Item = &'g Edge<'a>> + 'g {
        self.incident
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|key| self.edges.get(key))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Build the relation graph of a legacy datamodel.
///
/// Fails on a field whose type names nothing in the schema, and on a
/// relation type that is neither a list nor a single reference.
pub fn build(schema: &Schema, version: SchemaVersion) -> UpgradeResult<Graph<'_>> {
    let mut graph = Graph::new();
    for object in schema.objects() {
        for field in &object.fields {
            graph.add_node(node_key(object, field));
        }
    }

    for object in schema.objects() {
        for field in &object.fields {
            let to = match schema.field_kind(object, field)? {
                FieldKind::Relation(to) => to,
                FieldKind::Scalar | FieldKind::Enum(_) => continue,
            };
            let Some(to_field) = to.primary_key(version) else {
                debug!(
                    field = %node_key(object, field),
                    target = %to.name,
                    "referenced model has no primary key, skipping"
                );
                continue;
            };
            let cardinality = cardinality(&field.ty).ok_or_else(|| {
                UpgradeError::graph(
                    node_key(object, field),
                    format!("cannot derive a cardinality from type {}", field.ty),
                )
            })?;

            let edge = Edge {
                from: object,
                from_field: field,
                to,
                to_field,
                cardinality,
                link: link(field),
                relation_name: field.relation_name(),
            };
            trace!(from = %edge.from_key(), to = %edge.to_key(), ?cardinality, link = ?edge.link, "edge");
            graph.add_edge(edge)?;
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built relation graph"
    );
    Ok(graph)
}

/// Unwrap one non-null wrapper: a list has many, a name has one.
fn cardinality(ty: &Type) -> Option<Cardinality> {
    let inner = match ty {
        Type::NonNull(inner) => inner.as_ref(),
        other => other,
    };
    match inner {
        Type::List(_) => Some(Cardinality::HasMany),
        Type::Named(_) => Some(Cardinality::HasOne),
        Type::NonNull(_) => None,
    }
}

fn link(field: &FieldDef) -> Link {
    let Some(relation) = field.find_directive("relation") else {
        return Link::Unspecified;
    };
    match relation.argument("link") {
        Some(Value::Enum(link)) | Some(Value::String(link)) if link == "TABLE" => Link::Table,
        _ => Link::Inline,
    }
}
