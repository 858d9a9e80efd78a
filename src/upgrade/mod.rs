//! Operation synthesis.
//!
//! [`upgrade`] clones the target schema once and runs a fixed sequence of
//! phases over the copy. Each phase reads the copy as the previous phase
//! left it, returns [`Patch`]es for it and records operations and warnings
//! on the shared [`Context`].

mod columns;
mod relations;
mod warning;

pub use warning::Warning;

use tracing::debug;

use crate::error::UpgradeResult;
use crate::legacy::{self, ObjectType, SchemaVersion};
use crate::ops::Operation;
use crate::provider::{postgres_schema, Provider};
use crate::target::{self, Model, Patch};

/// Both schemas and the connection URL used to name the Postgres schema.
#[derive(Debug, Clone, Copy)]
pub struct Input<'a> {
    pub legacy: &'a legacy::Schema,
    pub target: &'a target::Schema,
    /// Falls back to the datasource `url` when it is a literal.
    pub url: Option<&'a str>,
}

impl<'a> Input<'a> {
    pub fn new(legacy: &'a legacy::Schema, target: &'a target::Schema) -> Self {
        Self {
            legacy,
            target,
            url: None,
        }
    }

    pub fn with_url(mut self, url: &'a str) -> Self {
        self.url = Some(url);
        self
    }
}

/// The corrected schema and everything needed to bring the database in line.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub schema: target::Schema,
    pub provider: Provider,
    pub warnings: Vec<Warning>,
    pub safe_ops: Vec<Operation>,
    pub breaking_ops: Vec<Operation>,
    /// Id column widening, safe but kept apart from `safe_ops`.
    pub id_ops: Vec<Operation>,
}

/// State shared by the phases of one run.
pub(crate) struct Context<'a> {
    pub legacy: &'a legacy::Schema,
    pub version: SchemaVersion,
    pub provider: Provider,
    /// Postgres schema carried by every operation.
    pub schema: Option<String>,
    warnings: Vec<Warning>,
    ops: Vec<Operation>,
    id_ops: Vec<Operation>,
}

impl Context<'_> {
    pub fn push(&mut self, op: Operation) {
        debug!(op = op.name(), breaking = op.is_breaking(), "operation");
        self.ops.push(op);
    }

    pub fn push_id(&mut self, op: Operation) {
        debug!(op = op.name(), "id operation");
        self.id_ops.push(op);
    }

    pub fn warn(&mut self, warning: Warning) {
        debug!(%warning, "warning");
        self.warnings.push(warning);
    }
}

type Phase = fn(&mut Context<'_>, &target::Schema) -> UpgradeResult<Vec<Patch>>;

const PHASES: [(&str, Phase); 6] = [
    ("naming", columns::naming),
    ("fields", columns::field_operations),
    ("scalar lists", columns::scalar_lists),
    ("relations", relations::relations),
    ("relation sides", relations::relation_sides),
    ("id width", columns::id_width),
];

/// Reconcile a legacy datamodel with its re-introspected target schema.
///
/// The target must declare a datasource with a supported provider. The
/// caller's schemas are left untouched.
pub fn upgrade(input: Input<'_>) -> UpgradeResult<Output> {
    let provider = Provider::from_schema(input.target)?;
    let schema = match (provider, input.url.or_else(|| input.target.url())) {
        (Provider::Postgres, Some(url)) => Some(postgres_schema(url)?),
        _ => None,
    };
    let version = input.legacy.version();
    debug!(%provider, ?version, ?schema, "starting upgrade");

    let mut ctx = Context {
        legacy: input.legacy,
        version,
        provider,
        schema,
        warnings: Vec::new(),
        ops: Vec::new(),
        id_ops: Vec::new(),
    };

    let mut corrected = input.target.clone();
    for (name, phase) in PHASES {
        let patches = phase(&mut ctx, &corrected)?;
        debug!(phase = name, patches = patches.len(), "phase done");
        corrected = corrected.apply(&patches);
    }
    corrected = relations::relation_names(&mut ctx, corrected)?;

    let (breaking_ops, safe_ops): (Vec<_>, Vec<_>) =
        ctx.ops.into_iter().partition(Operation::is_breaking);
    debug!(
        safe = safe_ops.len(),
        breaking = breaking_ops.len(),
        id = ctx.id_ops.len(),
        warnings = ctx.warnings.len(),
        "upgrade done"
    );

    Ok(Output {
        schema: corrected,
        provider,
        warnings: ctx.warnings,
        safe_ops,
        breaking_ops,
        id_ops: ctx.id_ops,
    })
}

/// Legacy objects paired with the target model backed by the same table.
pub(crate) fn matched<'a, 't>(
    legacy: &'a legacy::Schema,
    target: &'t target::Schema,
) -> Vec<(&'a ObjectType, &'t Model)> {
    legacy
        .objects()
        .filter_map(|object| match target.find_model_by_db(object.dbname()) {
            Some(model) => Some((object, model)),
            None => {
                debug!(model = %object.name, table = %object.dbname(), "no target model");
                None
            }
        })
        .collect()
}
