//! Legacy datamodel parser using nom.
//!
//! # Grammar
//!
//! ```text
//! document   = { object | enum }*
//! object     = [description] "type" NAME directive* "{" field* "}"
//! field      = [description] NAME ":" type directive*
//! type       = ( NAME | "[" type "]" ) ["!"]
//! enum       = [description] "enum" NAME directive* "{" ( [description] NAME directive* )* "}"
//! directive  = "@" NAME [ "(" ( NAME ":" value )* ")" ]
//! value      = "$" NAME | NUMBER | STRING | "true" | "false" | "null" | NAME
//!            | "[" value* "]" | "{" ( NAME ":" value )* "}"
//! ```
//!
//! Commas are insignificant and `#` starts a comment, as in SDL.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{map, opt, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use super::{Argument, Definition, Directive, EnumType, FieldDef, ObjectType, Schema, Type, Value};
use crate::error::UpgradeResult;
use crate::tokens::{finish, identifier, keyword, number, quoted_string, Number};

/// Parse a complete legacy datamodel.
pub fn parse(input: &str) -> UpgradeResult<Schema> {
    finish(input, parse_document(input))
}

/// Skip whitespace, commas and comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), char(',')),
            value((), pair(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn parse_document(input: &str) -> IResult<&str, Schema> {
    let (input, _) = ws(input)?;
    let (input, definitions) = many0(terminated(parse_definition, ws))(input)?;
    Ok((input, Schema { definitions }))
}

fn parse_definition(input: &str) -> IResult<&str, Definition> {
    let (input, _) = parse_description(input)?;
    alt((
        map(parse_object, Definition::Object),
        map(parse_enum, Definition::Enum),
    ))(input)
}

/// Descriptions are accepted and dropped.
fn parse_description(input: &str) -> IResult<&str, ()> {
    value((), opt(terminated(alt((parse_block_string, quoted_string)), ws)))(input)
}

fn parse_block_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")),
        |s: &str| s.trim().to_string(),
    )(input)
}

/// Parse `type Name @directives { fields }`.
fn parse_object(input: &str) -> IResult<&str, ObjectType> {
    let (input, _) = keyword("type")(input)?;
    let (input, _) = ws(input)?;
    let (input, name) = identifier(input)?;
    let (input, directives) = parse_directives(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, fields) = many0(terminated(parse_field, ws))(input)?;
    let (input, _) = char('}')(input)?;

    Ok((
        input,
        ObjectType {
            name: name.to_string(),
            directives,
            fields,
        },
    ))
}

/// Parse `name: Type @directives`.
fn parse_field(input: &str) -> IResult<&str, FieldDef> {
    let (input, _) = parse_description(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = ws(input)?;
    let (input, ty) = parse_type(input)?;
    let (input, directives) = parse_directives(input)?;

    Ok((
        input,
        FieldDef {
            name: name.to_string(),
            ty,
            directives,
        },
    ))
}

/// Parse a type: `Name`, `[Type]`, either optionally followed by `!`.
fn parse_type(input: &str) -> IResult<&str, Type> {
    let (input, base) = alt((
        map(
            delimited(pair(char('['), ws), parse_type, pair(ws, char(']'))),
            |inner| Type::List(Box::new(inner)),
        ),
        map(identifier, |name| Type::Named(name.to_string())),
    ))(input)?;
    let (input, bang) = opt(preceded(ws, char('!')))(input)?;

    let ty = match bang {
        Some(_) => Type::NonNull(Box::new(base)),
        None => base,
    };
    Ok((input, ty))
}

/// Parse `enum Name @directives { VALUES }`.
fn parse_enum(input: &str) -> IResult<&str, EnumType> {
    let (input, _) = keyword("enum")(input)?;
    let (input, _) = ws(input)?;
    let (input, name) = identifier(input)?;
    let (input, directives) = parse_directives(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('{')(input)?;
    let (input, _) = ws(input)?;
    let (input, values) = many0(terminated(
        map(
            preceded(parse_description, pair(identifier, parse_directives)),
            |(value, _)| value.to_string(),
        ),
        ws,
    ))(input)?;
    let (input, _) = char('}')(input)?;

    Ok((
        input,
        EnumType {
            name: name.to_string(),
            directives,
            values,
        },
    ))
}

/// Parse zero or more directives, each preceded by optional whitespace.
fn parse_directives(input: &str) -> IResult<&str, Vec<Directive>> {
    many0(preceded(ws, parse_directive))(input)
}

/// Parse `@name` or `@name(arg: value, ...)`.
fn parse_directive(input: &str) -> IResult<&str, Directive> {
    let (input, _) = char('@')(input)?;
    let (input, name) = identifier(input)?;
    let (input, arguments) = opt(preceded(
        ws,
        delimited(
            pair(char('('), ws),
            many0(terminated(parse_argument, ws)),
            char(')'),
        ),
    ))(input)?;

    Ok((
        input,
        Directive {
            name: name.to_string(),
            arguments: arguments.unwrap_or_default(),
        },
    ))
}

/// Parse `name: value`.
fn parse_argument(input: &str) -> IResult<&str, Argument> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = ws(input)?;
    let (input, value) = parse_value(input)?;

    Ok((
        input,
        Argument {
            name: name.to_string(),
            value,
        },
    ))
}

/// Parse a directive argument value.
fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        // Variable: $name
        map(preceded(char('$'), identifier), |s| Value::Variable(s.to_string())),
        // Number (float or int)
        map(number, |n| match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }),
        // Quoted string
        map(alt((parse_block_string, quoted_string)), Value::String),
        // List: [a b c]
        map(
            delimited(
                pair(char('['), ws),
                many0(terminated(parse_value, ws)),
                char(']'),
            ),
            Value::List,
        ),
        // Object: { key: value }
        map(
            delimited(
                pair(char('{'), ws),
                many0(terminated(parse_object_entry, ws)),
                char('}'),
            ),
            Value::Object,
        ),
        // true, false, null or a bare enum value
        map(identifier, |s| match s {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "null" => Value::Null,
            other => Value::Enum(other.to_string()),
        }),
    ))(input)
}

fn parse_object_entry(input: &str) -> IResult<&str, (String, Value)> {
    let (input, key) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = ws(input)?;
    let (input, value) = parse_value(input)?;
    Ok((input, (key.to_string(), value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpgradeError;

    #[test]
    fn test_simple_type() {
        let schema = parse("type User { id: ID! @id }").unwrap();
        assert_eq!(schema.definitions.len(), 1);
        let user = schema.find_object("User").unwrap();
        assert_eq!(user.fields.len(), 1);
        assert_eq!(user.fields[0].name, "id");
        assert_eq!(
            user.fields[0].ty,
            Type::NonNull(Box::new(Type::Named("ID".into())))
        );
        assert_eq!(user.fields[0].directives[0].name, "id");
    }

    #[test]
    fn test_default_values() {
        let schema = parse(
            r#"
            type User {
              isActive: Boolean! @default(value: false)
              name: String @default(value: "alice")
              age: Int @default(value: 42)
              score: Float @default(value: 1.5)
              role: Role @default(value: ADMIN)
            }
            enum Role { ADMIN USER }
            "#,
        )
        .unwrap();
        let user = schema.find_object("User").unwrap();
        let default = |name| user.find_field(name).unwrap().default_value().cloned();
        assert_eq!(default("isActive"), Some(Value::Boolean(false)));
        assert_eq!(default("name"), Some(Value::String("alice".into())));
        assert_eq!(default("age"), Some(Value::Int(42)));
        assert_eq!(default("score"), Some(Value::Float(1.5)));
        assert_eq!(default("role"), Some(Value::Enum("ADMIN".into())));
        assert_eq!(schema.find_enum("Role").unwrap().values, vec!["ADMIN", "USER"]);
    }

    #[test]
    fn test_relations_and_lists() {
        let schema = parse(
            r#"
            # authors and their posts
            type User @db(name: "users") {
              id: ID! @id
              posts: [Post!]! @relation(name: "UserPosts", link: TABLE)
            }

            type Post {
              id: ID! @id
              author: User! @relation(name: "UserPosts")
              tags: [String] @scalarList(strategy: RELATION)
            }
            "#,
        )
        .unwrap();
        let user = schema.find_object("User").unwrap();
        assert_eq!(user.dbname(), "users");
        let posts = user.find_field("posts").unwrap();
        assert!(posts.ty.is_list());
        assert_eq!(posts.relation_name(), Some("UserPosts"));
        let relation = posts.find_directive("relation").unwrap();
        assert_eq!(relation.argument("link"), Some(&Value::Enum("TABLE".into())));

        let post = schema.find_object("Post").unwrap();
        assert_eq!(post.find_field("tags").unwrap().ty.to_string(), "[String]");
    }

    #[test]
    fn test_descriptions_and_commas() {
        let schema = parse(
            r#"
            """
            A user of the system
            """
            type User {
              "primary key"
              id: ID! @id,
              emails: [String!]! @default(value: ["a", "b"])
              meta: Json @default(value: { theme: "dark", size: 2 })
            }
            "#,
        )
        .unwrap();
        let user = schema.find_object("User").unwrap();
        assert_eq!(user.fields.len(), 3);
        assert_eq!(
            user.find_field("emails").unwrap().default_value(),
            Some(&Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
        assert!(matches!(
            user.find_field("meta").unwrap().default_value(),
            Some(Value::Object(entries)) if entries.len() == 2
        ));
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("type User { id: ID! }\ninput Foo { a: Int }").unwrap_err();
        match err {
            UpgradeError::Parse { position, message } => {
                assert_eq!(position, 22);
                assert!(message.contains("input Foo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
