//! SQL transpiler for repair operations.
//!
//! Converts operations into SQL text for the target provider.

pub mod sql;
pub mod traits;


pub use traits::{quote_literal, SqlGenerator};

use tracing::debug;

use crate::error::UpgradeResult;
use crate::ops::Operation;
use crate::provider::Provider;

/// Renders batches of operations with a single generator.
///
/// Postgres enum types are created at most once across every batch, so the
/// safe, id and breaking lists of one upgrade share a translator.
pub struct Translator {
    provider: Provider,
    generator: Box<dyn SqlGenerator>,
}

impl Translator {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            generator: provider.generator(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// One string per operation, in input order.
    pub fn translate(&mut self, ops: &[Operation]) -> UpgradeResult<Vec<String>> {
        let provider = self.provider;
        ops.iter()
            .map(|op| {
                debug!(provider = %provider, op = op.name(), "translate");
                self.generator.generate(op)
            })
            .collect()
    }
}

/// Render one batch of operations as SQL, one string per operation.
///
/// Use a [`Translator`] when several batches run against the same database.
pub fn translate(provider: Provider, ops: &[Operation]) -> UpgradeResult<Vec<String>> {
    Translator::new(provider).translate(ops)
}
