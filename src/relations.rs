//! Relation pair matching and classification.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::graph::{Cardinality, Edge, Link};
use crate::legacy::SchemaVersion;

/// Both directions of one relationship, stored in key order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationPair<'a> {
    pub first: Edge<'a>,
    pub second: Edge<'a>,
}

impl<'a> RelationPair<'a> {
    fn new(a: Edge<'a>, b: Edge<'a>) -> Self {
        if (a.from_key(), a.to_key()) <= (b.from_key(), b.to_key()) {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }
}

/// More than two edges claim the same relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Ambiguity<'a> {
    /// Relation name, or the sorted model pair joined by a space.
    pub key: String,
    pub edges: Vec<Edge<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matching<'a> {
    pub pairs: Vec<RelationPair<'a>>,
    pub ambiguities: Vec<Ambiguity<'a>>,
}

/// Pair up edges into relationships.
///
/// Named edges are grouped by relation name, unnamed ones by their sorted
/// pair of model names. A group of two is a pair, a group of one is a
/// one-sided relation and larger groups are reported as ambiguous.
pub fn match_pairs<'a>(edges: impl IntoIterator<Item = Edge<'a>>) -> Matching<'a> {
    let mut edges: Vec<Edge<'a>> = edges.into_iter().collect();
    edges.sort_by_key(|e| (e.from_key(), e.to_key()));

    let mut named: BTreeMap<&'a str, Vec<Edge<'a>>> = BTreeMap::new();
    let mut unnamed: BTreeMap<(&'a str, &'a str), Vec<Edge<'a>>> = BTreeMap::new();
    for edge in edges {
        match edge.relation_name {
            Some(name) => named.entry(name).or_default().push(edge),
            None => {
                let (a, b) = (edge.from.name.as_str(), edge.to.name.as_str());
                let key = if a <= b { (a, b) } else { (b, a) };
                unnamed.entry(key).or_default().push(edge);
            }
        }
    }

    let mut matching = Matching::default();
    let groups = named
        .into_iter()
        .map(|(name, group)| (name.to_string(), group))
        .chain(
            unnamed
                .into_iter()
                .map(|((a, b), group)| (format!("{} {}", a, b), group)),
        );
    for (key, group) in groups {
        match group.len() {
            2 => {
                trace!(relation = %key, "matched pair");
                matching.pairs.push(RelationPair::new(group[0], group[1]));
            }
            1 => trace!(relation = %key, "one-sided relation"),
            _ => {
                debug!(relation = %key, edges = group.len(), "ambiguous relation");
                matching.ambiguities.push(Ambiguity { key, edges: group });
            }
        }
    }
    matching
}

/// Structural category of a relation pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Category<'a> {
    /// Both sides have one, stored as a foreign key. `unique` owns the column.
    InlineOneToOne { unique: Edge<'a>, other: Edge<'a> },
    /// Both sides have one, stored in a join table. `unique` receives the column.
    TableOneToOne { unique: Edge<'a>, other: Edge<'a> },
    /// One side has many, stored in a join table.
    TableOneToMany { one: Edge<'a>, many: Edge<'a> },
    /// Required foreign key on the `one` side, across two models.
    RequiredInlineOneToMany { one: Edge<'a>, many: Edge<'a> },
    Untouched,
}

pub fn classify<'a>(pair: &RelationPair<'a>, version: SchemaVersion) -> Category<'a> {
    let (a, b) = (pair.first, pair.second);
    let table = a.is_table(version) || b.is_table(version);

    let category = match (a.cardinality, b.cardinality) {
        (Cardinality::HasOne, Cardinality::HasOne) => {
            let (unique, other) = unique_edge(a, b);
            if table {
                Category::TableOneToOne { unique, other }
            } else {
                Category::InlineOneToOne { unique, other }
            }
        }
        (Cardinality::HasOne, Cardinality::HasMany) | (Cardinality::HasMany, Cardinality::HasOne) => {
            let (one, many) = if a.cardinality == Cardinality::HasOne {
                (a, b)
            } else {
                (b, a)
            };
            if table {
                Category::TableOneToMany { one, many }
            } else if !one.from_field.is_optional() && !one.is_self_relation() {
                Category::RequiredInlineOneToMany { one, many }
            } else {
                Category::Untouched
            }
        }
        (Cardinality::HasMany, Cardinality::HasMany) => Category::Untouched,
    };
    trace!(first = %a.from_key(), second = %b.from_key(), ?category, "classified");
    category
}

/// Pick the side of a one-to-one relation that owns the column.
///
/// An edge with an explicit inline `@relation` wins over one without.
/// Otherwise the edge whose `(model, field)` sorts greater wins.
pub fn unique_edge<'a>(a: Edge<'a>, b: Edge<'a>) -> (Edge<'a>, Edge<'a>) {
    match (a.link == Link::Inline, b.link == Link::Inline) {
        (true, false) => (a, b),
        (false, true) => (b, a),
        _ if a.owner() > b.owner() => (a, b),
        _ => (b, a),
    }
}
