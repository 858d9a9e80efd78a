//! Target schema parser using nom.
//!
//! # Grammar
//!
//! ```text
//! schema     = block*
//! block      = ("datasource" | "generator") NAME "{" (NAME "=" value)* "}"
//!            | "model" NAME "{" (field | block_attr)* "}"
//!            | "enum" NAME "{" (NAME attribute* | block_attr)* "}"
//! field      = NAME type attribute*
//! type       = NAME ["[]"] ["?"]
//! attribute  = "@" [NAME "."] NAME [ "(" [argument ("," argument)*] ")" ]
//! block_attr = "@" attribute
//! argument   = NAME ":" value | value
//! value      = STRING | NUMBER | "true" | "false" | NAME "(" values ")" | NAME | "[" values "]"
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace1, not_line_ending},
    combinator::{map, not, opt, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{
    Argument, Assignment, Attribute, Block, DataType, Enum, EnumValue, Field, Model, Schema,
    Source, Value,
};
use crate::error::UpgradeResult;
use crate::tokens::{finish, identifier, keyword, number, quoted_string, Number};

/// Parse a complete target schema.
pub fn parse(input: &str) -> UpgradeResult<Schema> {
    finish(input, parse_schema(input))
}

/// Skip whitespace and `//` comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), not_line_ending)),
        ))),
    )(input)
}

fn parse_schema(input: &str) -> IResult<&str, Schema> {
    let (input, _) = ws(input)?;
    let (input, blocks) = many0(terminated(parse_block, ws))(input)?;
    Ok((input, Schema { blocks }))
}

fn parse_block(input: &str) -> IResult<&str, Block> {
    alt((
        map(preceded(keyword("datasource"), parse_source), Block::Datasource),
        map(preceded(keyword("generator"), parse_source), Block::Generator),
        map(parse_model, Block::Model),
        map(parse_enum, Block::Enum),
    ))(input)
}

/// `{ key = value ... }` after the block keyword.
fn parse_source(input: &str) -> IResult<&str, Source> {
    let (input, _) = ws(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, assignments) = many0(terminated(parse_assignment, ws))(input)?;
    let (input, _) = char('}')(input)?;

    Ok((
        input,
        Source {
            name: name.to_string(),
            assignments,
        },
    ))
}

fn parse_assignment(input: &str) -> IResult<&str, Assignment> {
    let (input, key) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = ws(input)?;
    let (input, value) = parse_value(input)?;

    Ok((
        input,
        Assignment {
            key: key.to_string(),
            value,
        },
    ))
}

/// Model members are either fields or block attributes.
enum Member {
    Field(Field),
    Attribute(Attribute),
}

fn parse_model(input: &str) -> IResult<&str, Model> {
    let (input, _) = keyword("model")(input)?;
    let (input, _) = ws(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, members) = many0(terminated(
        alt((
            map(parse_block_attribute, Member::Attribute),
            map(parse_field, Member::Field),
        )),
        ws,
    ))(input)?;
    let (input, _) = char('}')(input)?;

    let mut model = Model {
        name: name.to_string(),
        fields: Vec::new(),
        attributes: Vec::new(),
    };
    for member in members {
        match member {
            Member::Field(field) => model.fields.push(field),
            Member::Attribute(attr) => model.attributes.push(attr),
        }
    }
    Ok((input, model))
}

/// Enum members are values (with optional attributes) or block attributes.
enum EnumMember {
    Value(EnumValue),
    Attribute(Attribute),
}

fn parse_enum(input: &str) -> IResult<&str, Enum> {
    let (input, _) = keyword("enum")(input)?;
    let (input, _) = ws(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, members) = many0(terminated(
        alt((
            map(parse_block_attribute, EnumMember::Attribute),
            map(pair(identifier, parse_field_attributes), |(name, attributes)| {
                EnumMember::Value(EnumValue {
                    name: name.to_string(),
                    attributes,
                })
            }),
        )),
        ws,
    ))(input)?;
    let (input, _) = char('}')(input)?;

    let mut e = Enum {
        name: name.to_string(),
        values: Vec::new(),
        attributes: Vec::new(),
    };
    for member in members {
        match member {
            EnumMember::Value(v) => e.values.push(v),
            EnumMember::Attribute(attr) => e.attributes.push(attr),
        }
    }
    Ok((input, e))
}

/// Parse `name Type @attributes`.
fn parse_field(input: &str) -> IResult<&str, Field> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, ty) = parse_type(input)?;
    let (input, attributes) = parse_field_attributes(input)?;

    Ok((
        input,
        Field {
            name: name.to_string(),
            ty,
            attributes,
        },
    ))
}

/// Parse `Name`, `Name[]`, `Name?` (and the older `Name[]?`).
fn parse_type(input: &str) -> IResult<&str, DataType> {
    let (input, name) = identifier(input)?;
    let (input, list) = opt(tag("[]"))(input)?;
    let (input, optional) = opt(char('?'))(input)?;

    let mut ty = DataType::named(name);
    if list.is_some() {
        ty = DataType::list(ty);
    }
    if optional.is_some() {
        ty = DataType::optional(ty);
    }
    Ok((input, ty))
}

fn parse_field_attributes(input: &str) -> IResult<&str, Vec<Attribute>> {
    many0(preceded(ws, parse_field_attribute))(input)
}

/// `@name(...)`, but not `@@name`.
fn parse_field_attribute(input: &str) -> IResult<&str, Attribute> {
    let (input, _) = char('@')(input)?;
    let (input, _) = not(char('@'))(input)?;
    parse_attribute_body(input)
}

/// `@@name(...)`
fn parse_block_attribute(input: &str) -> IResult<&str, Attribute> {
    preceded(tag("@@"), parse_attribute_body)(input)
}

fn parse_attribute_body(input: &str) -> IResult<&str, Attribute> {
    let (input, first) = identifier(input)?;
    let (input, second) = opt(preceded(char('.'), identifier))(input)?;
    let (input, arguments) = opt(delimited(
        pair(char('('), ws),
        separated_list0(tuple((ws, char(','), ws)), parse_argument),
        pair(ws, char(')')),
    ))(input)?;

    let (group, name) = match second {
        Some(name) => (Some(first.to_string()), name.to_string()),
        None => (None, first.to_string()),
    };
    Ok((
        input,
        Attribute {
            group,
            name,
            arguments: arguments.unwrap_or_default(),
        },
    ))
}

fn parse_argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(
            pair(terminated(identifier, tuple((ws, char(':'), ws))), parse_value),
            |(name, value)| Argument::keyed(name, value),
        ),
        map(parse_value, Argument::positional),
    ))(input)
}

fn parse_values(input: &str) -> IResult<&str, Vec<Value>> {
    separated_list0(tuple((ws, char(','), ws)), parse_value)(input)
}

/// Parse an attribute argument or assignment value.
fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(quoted_string, Value::String),
        map(number, |n| match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }),
        map(
            delimited(pair(char('['), ws), parse_values, pair(ws, char(']'))),
            Value::List,
        ),
        parse_function,
        map(identifier, |s| match s {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            other => Value::Reference(other.to_string()),
        }),
    ))(input)
}

/// `name(args)`
fn parse_function(input: &str) -> IResult<&str, Value> {
    let (input, name) = identifier(input)?;
    let (input, args) = delimited(pair(char('('), ws), parse_values, pair(ws, char(')')))(input)?;
    Ok((
        input,
        Value::Function {
            name: name.to_string(),
            args,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpgradeError;

    #[test]
    fn test_datasource_and_generator() {
        let schema = parse(
            r#"
            // introspected
            generator client {
              provider = "prisma-client-js"
            }

            datasource db {
              provider = "mysql"
              url      = env("DATABASE_URL")
            }
            "#,
        )
        .unwrap();
        assert_eq!(schema.blocks.len(), 2);
        let Block::Datasource(db) = &schema.blocks[1] else {
            panic!("expected datasource");
        };
        assert_eq!(db.name, "db");
        assert_eq!(
            db.get("url"),
            Some(&Value::Function {
                name: "env".into(),
                args: vec![Value::String("DATABASE_URL".into())],
            })
        );
    }

    #[test]
    fn test_model_fields() {
        let schema = parse(
            r#"
            model User {
              id        String   @id @default(cuid()) @db.VarChar(25)
              email     String?  @unique
              posts     Post[]
              createdAt DateTime @default(now())
              score     Float    @default(1.5)

              @@map("users")
            }
            "#,
        )
        .unwrap();
        let user = schema.find_model("User").unwrap();
        assert_eq!(user.fields.len(), 5);
        assert_eq!(user.db_name(), "users");

        let id = user.find_field("id").unwrap();
        assert_eq!(id.ty, DataType::named("String"));
        assert!(id.find_attribute("id").is_some());
        assert!(id.find_attribute("default").unwrap().first_argument().unwrap().is_call("cuid"));
        let varchar = id.find_grouped("db", "VarChar").unwrap();
        assert_eq!(varchar.first_argument(), Some(&Value::Int(25)));

        assert!(user.find_field("email").unwrap().is_optional());
        assert!(user.find_field("posts").unwrap().is_list());
        assert_eq!(
            user.find_field("score").unwrap().find_attribute("default").unwrap().first_argument(),
            Some(&Value::Float(1.5))
        );
    }

    #[test]
    fn test_relation_attribute() {
        let schema = parse(
            r#"
            model Post {
              id       String @id
              authorId String
              author   User   @relation(name: "UserPosts", fields: [authorId], references: [id])
              @@unique([id, authorId])
            }
            "#,
        )
        .unwrap();
        let post = schema.find_model("Post").unwrap();
        let relation = post.find_field("author").unwrap().find_attribute("relation").unwrap();
        assert_eq!(relation.argument("name"), Some(&Value::String("UserPosts".into())));
        assert_eq!(
            relation.argument("fields"),
            Some(&Value::List(vec![Value::Reference("authorId".into())]))
        );
        assert_eq!(post.attributes[0].name, "unique");
    }

    #[test]
    fn test_enum_block() {
        let schema = parse("enum Role {\n  ADMIN\n  USER @map(\"user\")\n  @@map(\"roles\")\n}").unwrap();
        let role = schema.find_enum("Role").unwrap();
        assert_eq!(role.values.len(), 2);
        assert_eq!(role.values[1].attributes[0].name, "map");
        assert_eq!(role.db_name(), "roles");
    }

    #[test]
    fn test_unknown_block_is_error() {
        let err = parse("model A {\n  id Int @id\n}\ntype B = String").unwrap_err();
        assert!(matches!(err, UpgradeError::Parse { position: 25, .. }));
    }
}
