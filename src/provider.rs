//! Database providers and connection URL handling.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::error::{UpgradeError, UpgradeResult};
use crate::target;
use crate::transpiler::sql::mysql::MysqlGenerator;
use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::SqlGenerator;

/// Supported database providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    MySql,
    Postgres,
}

impl Provider {
    /// Read the provider from the schema's datasource block.
    pub fn from_schema(schema: &target::Schema) -> UpgradeResult<Self> {
        let datasource = schema.datasource().ok_or(UpgradeError::MissingDatasource)?;
        let provider = datasource
            .get("provider")
            .and_then(target::Value::as_str)
            .ok_or(UpgradeError::MissingProvider)?;
        provider.parse()
    }

    /// A fresh SQL generator for this provider.
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Provider::MySql => Box::new(MysqlGenerator::new()),
            Provider::Postgres => Box::new(PostgresGenerator::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::MySql => "MySQL",
            Provider::Postgres => "Postgres",
        }
    }
}

impl FromStr for Provider {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Provider::MySql),
            "postgres" | "postgresql" => Ok(Provider::Postgres),
            other => Err(UpgradeError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derive the Postgres schema name from a connection URL.
///
/// The `schema` query parameter wins. Otherwise the path without its leading
/// slash, with remaining slashes replaced by `$`; an empty path gives
/// `default$default`.
pub fn postgres_schema(url: &str) -> UpgradeResult<String> {
    let parsed = Url::parse(url).map_err(|e| UpgradeError::InvalidUrl(format!("{}: {}", url, e)))?;

    if let Some((_, schema)) = parsed.query_pairs().find(|(key, _)| key == "schema") {
        if !schema.is_empty() {
            return Ok(schema.into_owned());
        }
    }

    let path = parsed.path().trim_start_matches('/');
    if path.is_empty() {
        Ok("default$default".to_string())
    } else {
        Ok(path.replace('/', "$"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("mysql".parse::<Provider>().unwrap(), Provider::MySql);
        assert_eq!("postgres".parse::<Provider>().unwrap(), Provider::Postgres);
        assert_eq!("postgresql".parse::<Provider>().unwrap(), Provider::Postgres);
        assert!(matches!(
            "sqlite".parse::<Provider>(),
            Err(UpgradeError::UnsupportedProvider(p)) if p == "sqlite"
        ));
    }

    #[test]
    fn test_provider_from_schema() {
        let schema = target::parse("datasource db {\n  provider = \"postgresql\"\n}").unwrap();
        assert_eq!(Provider::from_schema(&schema).unwrap(), Provider::Postgres);

        let none = target::parse("model A {\n  id Int @id\n}").unwrap();
        assert!(matches!(
            Provider::from_schema(&none),
            Err(UpgradeError::MissingDatasource)
        ));

        let env = target::parse("datasource db {\n  provider = env(\"P\")\n}").unwrap();
        assert!(matches!(
            Provider::from_schema(&env),
            Err(UpgradeError::MissingProvider)
        ));
    }

    #[test]
    fn test_postgres_schema_from_query() {
        assert_eq!(
            postgres_schema("postgres://u:p@localhost:5432/db?schema=tenant").unwrap(),
            "tenant"
        );
    }

    #[test]
    fn test_postgres_schema_from_path() {
        assert_eq!(
            postgres_schema("postgres://localhost:5432/service/stage").unwrap(),
            "service$stage"
        );
        assert_eq!(
            postgres_schema("postgres://localhost:5432").unwrap(),
            "default$default"
        );
    }

    #[test]
    fn test_postgres_schema_invalid_url() {
        assert!(matches!(
            postgres_schema("not a url"),
            Err(UpgradeError::InvalidUrl(_))
        ));
    }
}
