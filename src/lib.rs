//! # schema-upgrade
//!
//! Reconciles a legacy graph-style datamodel with the block schema
//! re-introspected from the same database, and generates the SQL that
//! closes the gap.
//!
//! ## Quick Example
//!
//! ```rust
//! use schema_upgrade::prelude::*;
//!
//! let legacy = legacy::parse(r#"
//!     type User {
//!       id: ID! @id
//!       isActive: Boolean! @default(value: false)
//!     }
//! "#)?;
//! let target = target::parse(r#"
//! datasource db {
//!   provider = "postgresql"
//! }
//!
//! model User {
//!   id       String  @id
//!   isActive Boolean
//! }
//! "#)?;
//!
//! let output = upgrade(Input::new(&legacy, &target))?;
//! let sql = translate(output.provider, &output.safe_ops)?;
//! assert_eq!(sql, vec![r#"ALTER TABLE "User" ALTER COLUMN "isActive" SET DEFAULT false;"#]);
//! # Ok::<(), UpgradeError>(())
//! ```
//!
//! ## Pipeline
//!
//! | Stage       | Module          | Produces                          |
//! |-------------|-----------------|-----------------------------------|
//! | Parse       | [`legacy`], [`target`] | ASTs                       |
//! | Graph       | [`graph`]       | `Model.field` nodes, typed edges  |
//! | Match       | [`relations`]   | relation pairs and categories     |
//! | Synthesize  | [`upgrade`]     | corrected schema and operations   |
//! | Translate   | [`transpiler`]  | MySQL or Postgres SQL             |

pub mod config;
pub mod error;
pub mod graph;
pub mod legacy;
pub mod ops;
pub mod provider;
pub mod relations;
pub mod target;
pub mod transpiler;
pub mod upgrade;

mod tokens;

pub use error::{UpgradeError, UpgradeResult};
pub use transpiler::{translate, Translator};
pub use upgrade::{upgrade, Input, Output, Warning};

pub mod prelude {
    pub use crate::config::{Config, Format};
    pub use crate::error::*;
    pub use crate::ops::Operation;
    pub use crate::provider::Provider;
    pub use crate::transpiler::{translate, Translator};
    pub use crate::upgrade::{upgrade, Input, Output, Warning};
    pub use crate::{legacy, target};
}
