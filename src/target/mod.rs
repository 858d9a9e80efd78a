//! Target schema AST.
//!
//! The target schema is the block-style document produced by introspecting
//! the live database:
//!
//! ```text
//! datasource db {
//!   provider = "postgresql"
//!   url      = env("DATABASE_URL")
//! }
//!
//! model User {
//!   id    String @id @default(cuid())
//!   posts Post[]
//!
//!   @@map("users")
//! }
//! ```
//!
//! Accessors here are read-only. The corrected schema is derived through
//! [`Patch`] values applied to an owned copy.

pub mod parser;
pub mod patch;
pub mod printer;

pub use parser::parse;
pub use patch::Patch;

/// A parsed target schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub blocks: Vec<Block>,
}

/// Top-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Datasource(Source),
    Generator(Source),
    Model(Model),
    Enum(Enum),
}

/// `datasource` or `generator` block: a name and `key = value` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub fields: Vec<Field>,
    /// Block attributes (`@@map`, `@@unique`, ...).
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub values: Vec<EnumValue>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: DataType,
    pub attributes: Vec<Attribute>,
}

/// Field type: `Name`, `Name?` or `Name[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Named(String),
    Optional(Box<DataType>),
    List(Box<DataType>),
}

/// `@name(args)`, `@group.name(args)` or the block form `@@name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub group: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// Keyed (`fields: [a]`) or positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    /// `now()`, `env("DATABASE_URL")`
    Function { name: String, args: Vec<Value> },
    /// Bare identifier: enum value or field reference.
    Reference(String),
    List(Vec<Value>),
}

impl Schema {
    /// The first datasource block.
    pub fn datasource(&self) -> Option<&Source> {
        self.blocks.iter().find_map(|b| match b {
            Block::Datasource(source) => Some(source),
            _ => None,
        })
    }

    /// The datasource `provider`, when it is a string literal.
    pub fn provider(&self) -> Option<&str> {
        self.datasource()?.get("provider")?.as_str()
    }

    /// The datasource `url`, when it is a string literal rather than `env(...)`.
    pub fn url(&self) -> Option<&str> {
        self.datasource()?.get("url")?.as_str()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> + '_ {
        self.blocks.iter().filter_map(|b| match b {
            Block::Model(model) => Some(model),
            _ => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &Enum> + '_ {
        self.blocks.iter().filter_map(|b| match b {
            Block::Enum(e) => Some(e),
            _ => None,
        })
    }

    pub fn find_model(&self, name: &str) -> Option<&Model> {
        self.models().find(|m| m.name == name)
    }

    /// Find the model backed by the given table.
    pub fn find_model_by_db(&self, table: &str) -> Option<&Model> {
        self.models().find(|m| m.db_name() == table)
    }

    pub fn find_enum(&self, name: &str) -> Option<&Enum> {
        self.enums().find(|e| e.name == name)
    }

    pub fn is_model(&self, name: &str) -> bool {
        self.find_model(name).is_some()
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.find_enum(name).is_some()
    }

    /// A field whose type names a model has no column of its own.
    pub fn is_relation_field(&self, field: &Field) -> bool {
        self.is_model(field.ty.innermost())
    }

    /// Find the column field of `model` stored in `column`.
    pub fn find_column<'s>(&'s self, model: &'s Model, column: &str) -> Option<&'s Field> {
        model
            .fields
            .iter()
            .find(|f| !self.is_relation_field(f) && f.column_name() == column)
    }
}

impl Source {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.assignments
            .iter()
            .find(|a| a.key == key)
            .map(|a| &a.value)
    }
}

/// The first argument of a `@map`/`@@map` attribute.
fn map_argument<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.group.is_none() && a.name == name)
        .and_then(|a| a.argument("name").or_else(|| a.first_argument()))
        .and_then(Value::as_str)
}

impl Model {
    /// Table name: `@@map("...")` or the model name.
    pub fn db_name(&self) -> &str {
        map_argument(&self.attributes, "map").unwrap_or(&self.name)
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.group.is_none() && a.name == name)
    }
}

impl Enum {
    pub fn new(name: impl Into<String>, values: &[String]) -> Self {
        Self {
            name: name.into(),
            values: values
                .iter()
                .map(|v| EnumValue {
                    name: v.clone(),
                    attributes: Vec::new(),
                })
                .collect(),
            attributes: Vec::new(),
        }
    }

    pub fn db_name(&self) -> &str {
        map_argument(&self.attributes, "map").unwrap_or(&self.name)
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            attributes: Vec::new(),
        }
    }

    /// The `@map("...")` argument, if any.
    pub fn map_name(&self) -> Option<&str> {
        map_argument(&self.attributes, "map")
    }

    /// Column name: the map name, else the field name.
    pub fn column_name(&self) -> &str {
        self.map_name().unwrap_or(&self.name)
    }

    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }

    pub fn is_list(&self) -> bool {
        self.ty.is_list()
    }

    /// Find an ungrouped attribute (`@default`, not `@db.Default`).
    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.group.is_none() && a.name == name)
    }

    /// Find a grouped attribute such as `@db.VarChar`.
    pub fn find_grouped(&self, group: &str, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.group.as_deref() == Some(group) && a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.find_attribute(name).is_some()
    }

    /// Names listed in `@relation(<key>: [...])`.
    pub fn relation_argument(&self, key: &str) -> Vec<&str> {
        let Some(Value::List(values)) = self
            .find_attribute("relation")
            .and_then(|a| a.argument(key))
        else {
            return Vec::new();
        };
        values.iter().filter_map(Value::as_reference).collect()
    }
}

impl DataType {
    pub fn named(name: impl Into<String>) -> Self {
        DataType::Named(name.into())
    }

    pub fn optional(inner: DataType) -> Self {
        DataType::Optional(Box::new(inner))
    }

    pub fn list(inner: DataType) -> Self {
        DataType::List(Box::new(inner))
    }

    /// Convert a legacy field type.
    ///
    /// Non-null types become required, everything else optional. Lists are
    /// never optional here since the target has no optional lists.
    pub fn from_legacy(ty: &crate::legacy::Type) -> Self {
        use crate::legacy::Type;
        match ty {
            Type::NonNull(inner) => match inner.as_ref() {
                Type::List(_) => DataType::list(DataType::named(inner.named())),
                _ => DataType::named(inner.named()),
            },
            Type::List(_) => DataType::list(DataType::named(ty.named())),
            Type::Named(name) => DataType::optional(DataType::named(name.clone())),
        }
    }

    /// Innermost type name.
    pub fn innermost(&self) -> &str {
        match self {
            DataType::Named(name) => name,
            DataType::Optional(inner) | DataType::List(inner) => inner.innermost(),
        }
    }

    /// Same wrappers, different innermost name.
    pub fn with_innermost(&self, name: &str) -> DataType {
        match self {
            DataType::Named(_) => DataType::named(name),
            DataType::Optional(inner) => DataType::optional(inner.with_innermost(name)),
            DataType::List(inner) => DataType::list(inner.with_innermost(name)),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, DataType::Optional(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            DataType::List(_) => true,
            DataType::Optional(inner) => inner.is_list(),
            DataType::Named(_) => false,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Named(name) => write!(f, "{}", name),
            DataType::Optional(inner) => write!(f, "{}?", inner),
            DataType::List(inner) => write!(f, "{}[]", inner),
        }
    }
}

impl Attribute {
    pub fn new(name: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            group: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn grouped(group: impl Into<String>, name: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            group: Some(group.into()),
            name: name.into(),
            arguments,
        }
    }

    /// `@default(<value>)`
    pub fn default_value(value: Value) -> Self {
        Self::new("default", vec![Argument::positional(value)])
    }

    /// `@default(<name>())`
    pub fn default_function(name: &str) -> Self {
        Self::default_value(Value::Function {
            name: name.to_string(),
            args: Vec::new(),
        })
    }

    /// `@map("<name>")`
    pub fn map(name: &str) -> Self {
        Self::new("map", vec![Argument::positional(Value::String(name.to_string()))])
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }

    pub fn first_argument(&self) -> Option<&Value> {
        self.arguments.first().map(|a| &a.value)
    }

    /// Attributes with the same group and name replace each other on upsert.
    pub fn same_kind(&self, other: &Attribute) -> bool {
        self.group == other.group && self.name == other.name
    }
}

impl Argument {
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }

    pub fn keyed(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Value::Reference(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// `name()` with no arguments.
    pub fn is_call(&self, function: &str) -> bool {
        matches!(self, Value::Function { name, args } if name == function && args.is_empty())
    }
}
