//! Legacy datamodel AST.
//!
//! The legacy datamodel is an SDL document of object types and enums:
//!
//! ```text
//! type User @db(name: "users") {
//!   id: ID! @id
//!   posts: [Post!]! @relation(name: "UserPosts", link: TABLE)
//! }
//!
//! enum Role { ADMIN USER }
//! ```

pub mod parser;

pub use parser::parse;

use crate::error::{UpgradeError, UpgradeResult};

/// Scalar types built into the legacy datamodel.
pub const SCALARS: [&str; 8] = [
    "ID", "UUID", "String", "Int", "Float", "Boolean", "DateTime", "Json",
];

/// A parsed legacy datamodel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub definitions: Vec<Definition>,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Object(ObjectType),
    Enum(EnumType),
}

/// `type Name @directives { fields }`
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDef>,
}

/// `enum Name @directives { VALUES }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub directives: Vec<Directive>,
    pub values: Vec<String>,
}

/// `name: Type @directives`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub directives: Vec<Directive>,
}

/// A field type, composed of named, list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Named(String),
    List(Box<Type>),
    NonNull(Box<Type>),
}

/// `@name(arg: value, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// `name: value`
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

/// Directive argument values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

/// Datamodel version, which decides the primary-key directive and link defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SchemaVersion {
    /// `id: ID! @unique`, relations stored in join tables unless stated otherwise.
    #[serde(rename = "1.0")]
    V1_0,
    /// `id: ID! @id`, explicit `@relation(link: ...)`.
    #[serde(rename = "1.1")]
    V1_1,
}

impl SchemaVersion {
    /// Directive marking the primary key in this version.
    pub fn primary_key_directive(&self) -> &'static str {
        match self {
            SchemaVersion::V1_0 => "unique",
            SchemaVersion::V1_1 => "id",
        }
    }
}

/// What a field's innermost type resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind<'a> {
    Scalar,
    Enum(&'a EnumType),
    Relation(&'a ObjectType),
}

impl Schema {
    /// All object types, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectType> + '_ {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Object(obj) => Some(obj),
            Definition::Enum(_) => None,
        })
    }

    /// All enums, in declaration order.
    pub fn enums(&self) -> impl Iterator<Item = &EnumType> + '_ {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Enum(e) => Some(e),
            Definition::Object(_) => None,
        })
    }

    pub fn find_object(&self, name: &str) -> Option<&ObjectType> {
        self.objects().find(|obj| obj.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumType> {
        self.enums().find(|e| e.name == name)
    }

    /// Resolve a field's innermost type against this schema.
    ///
    /// Fails with [`UpgradeError::UnknownType`] when the type names nothing.
    pub fn field_kind(&self, model: &ObjectType, field: &FieldDef) -> UpgradeResult<FieldKind<'_>> {
        let name = field.ty.named();
        if !field.ty.is_reference() {
            return Ok(FieldKind::Scalar);
        }
        if let Some(e) = self.find_enum(name) {
            return Ok(FieldKind::Enum(e));
        }
        if let Some(obj) = self.find_object(name) {
            return Ok(FieldKind::Relation(obj));
        }
        Err(UpgradeError::UnknownType {
            model: model.name.clone(),
            field: field.name.clone(),
            type_name: name.to_string(),
        })
    }

    /// Detect the datamodel version.
    ///
    /// The first `ID` field decides: `@id` means 1.1, anything else 1.0.
    /// Without any `ID` field we assume 1.1.
    pub fn version(&self) -> SchemaVersion {
        for obj in self.objects() {
            for field in &obj.fields {
                if field.ty.named() != "ID" {
                    continue;
                }
                if field.has_directive("id") {
                    return SchemaVersion::V1_1;
                }
                return SchemaVersion::V1_0;
            }
        }
        SchemaVersion::V1_1
    }
}

/// Read the `name` argument of a `@db` directive.
fn db_name(directives: &[Directive]) -> Option<&str> {
    directives
        .iter()
        .find(|d| d.name == "db")
        .and_then(|d| d.argument("name"))
        .and_then(Value::as_str)
}

impl ObjectType {
    /// Table name: `@db(name: ...)` or the type name.
    pub fn dbname(&self) -> &str {
        db_name(&self.directives).unwrap_or(&self.name)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary-key field for the given datamodel version.
    ///
    /// Version 1.0 marks every unique field with `@unique`, so an `ID` typed
    /// one wins over the rest.
    pub fn primary_key(&self, version: SchemaVersion) -> Option<&FieldDef> {
        let directive = version.primary_key_directive();
        let mut candidates = self.fields.iter().filter(|f| f.has_directive(directive));
        match version {
            SchemaVersion::V1_1 => candidates.next(),
            SchemaVersion::V1_0 => {
                let all: Vec<&FieldDef> = candidates.collect();
                all.iter()
                    .find(|f| f.ty.named() == "ID")
                    .or_else(|| all.first())
                    .copied()
            }
        }
    }
}

impl EnumType {
    pub fn dbname(&self) -> &str {
        db_name(&self.directives).unwrap_or(&self.name)
    }
}

impl FieldDef {
    /// Column name: `@db(name: ...)` or the field name.
    pub fn dbname(&self) -> &str {
        db_name(&self.directives).unwrap_or(&self.name)
    }

    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }

    pub fn find_directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.find_directive(name).is_some()
    }

    /// The `value` argument of a `@default` directive.
    pub fn default_value(&self) -> Option<&Value> {
        self.find_directive("default").and_then(|d| d.argument("value"))
    }

    /// The `name` argument of a `@relation` directive.
    pub fn relation_name(&self) -> Option<&str> {
        self.find_directive("relation")
            .and_then(|d| d.argument("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

impl Type {
    /// Innermost type name.
    pub fn named(&self) -> &str {
        match self {
            Type::Named(name) => name,
            Type::List(inner) | Type::NonNull(inner) => inner.named(),
        }
    }

    /// Only a non-null wrapper makes a type required.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Type::NonNull(_))
    }

    /// A list, possibly wrapped in non-null.
    pub fn is_list(&self) -> bool {
        match self {
            Type::List(_) => true,
            Type::NonNull(inner) => inner.is_list(),
            Type::Named(_) => false,
        }
    }

    /// Anything but a built-in scalar.
    pub fn is_reference(&self) -> bool {
        !SCALARS.contains(&self.named())
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Named(name) => write!(f, "{}", name),
            Type::List(inner) => write!(f, "[{}]", inner),
            Type::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

impl Directive {
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}

impl Value {
    /// String contents, for string values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Variable(_) => "variable",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_predicates() {
        let ty = Type::NonNull(Box::new(Type::List(Box::new(Type::NonNull(Box::new(
            Type::Named("Post".into()),
        ))))));
        assert_eq!(ty.named(), "Post");
        assert!(ty.is_list());
        assert!(!ty.is_optional());
        assert!(ty.is_reference());
        assert_eq!(ty.to_string(), "[Post!]!");

        let ty = Type::Named("String".into());
        assert!(ty.is_optional());
        assert!(!ty.is_reference());
    }

    #[test]
    fn test_version_detection() {
        let v11 = parse("type User { id: ID! @id }").unwrap();
        assert_eq!(v11.version(), SchemaVersion::V1_1);

        let v10 = parse("type User { id: ID! @unique }").unwrap();
        assert_eq!(v10.version(), SchemaVersion::V1_0);

        let none = parse("type Tag { name: String }").unwrap();
        assert_eq!(none.version(), SchemaVersion::V1_1);
    }

    #[test]
    fn test_dbname() {
        let schema = parse(
            r#"type User @db(name: "users") { id: ID! @id  first: String @db(name: "first_name") }"#,
        )
        .unwrap();
        let user = schema.find_object("User").unwrap();
        assert_eq!(user.dbname(), "users");
        assert_eq!(user.find_field("first").unwrap().dbname(), "first_name");
        assert_eq!(user.find_field("id").unwrap().dbname(), "id");
    }

    #[test]
    fn test_primary_key_v10_prefers_id() {
        let schema = parse("type User { email: String! @unique  id: ID! @unique }").unwrap();
        let user = schema.find_object("User").unwrap();
        assert_eq!(user.primary_key(SchemaVersion::V1_0).unwrap().name, "id");
        assert!(user.primary_key(SchemaVersion::V1_1).is_none());
    }

    #[test]
    fn test_field_kind() {
        let schema = parse(
            "type User { id: ID! @id role: Role post: Post ghost: Ghost } type Post { id: ID! @id } enum Role { A B }",
        )
        .unwrap();
        let user = schema.find_object("User").unwrap();
        let kind = |name| schema.field_kind(user, user.find_field(name).unwrap());
        assert_eq!(kind("id").unwrap(), FieldKind::Scalar);
        assert!(matches!(kind("role").unwrap(), FieldKind::Enum(e) if e.name == "Role"));
        assert!(matches!(kind("post").unwrap(), FieldKind::Relation(o) if o.name == "Post"));
        assert!(matches!(
            kind("ghost"),
            Err(UpgradeError::UnknownType { type_name, .. }) if type_name == "Ghost"
        ));
    }
}
