use pretty_assertions::assert_eq;
use schema_upgrade::ops::*;
use schema_upgrade::prelude::*;

fn datasource(provider: &str) -> String {
    format!("datasource db {{\n  provider = \"{}\"\n}}\n\n", provider)
}

fn run(provider: &str, legacy: &str, target: &str) -> (legacy::Schema, Output) {
    let legacy = legacy::parse(legacy).unwrap();
    let target = target::parse(&format!("{}{}", datasource(provider), target)).unwrap();
    let output = upgrade(Input::new(&legacy, &target)).unwrap();
    (legacy, output)
}

fn names(ops: &[Operation]) -> Vec<&'static str> {
    ops.iter().map(Operation::name).collect()
}

const USER_LEGACY: &str = r#"
type User {
  id: ID! @id
  isActive: Boolean! @default(value: false)
}
"#;

const USER_TARGET: &str = "model User {\n  id       String  @id\n  isActive Boolean\n}\n";

#[test]
fn test_user_scenario() {
    let (_, output) = run("postgresql", USER_LEGACY, USER_TARGET);

    assert_eq!(
        output.safe_ops,
        vec![Operation::SetDefault(SetDefaultOp {
            schema: None,
            table: "User".into(),
            column: "isActive".into(),
            scalar: ScalarKind::Boolean,
            required: true,
            value: DefaultValue::Boolean(false),
        })]
    );
    assert!(output.breaking_ops.is_empty());
    assert!(output.warnings.is_empty());

    let user = output.schema.find_model("User").unwrap();
    let id = user.find_field("id").unwrap();
    let default = id.find_attribute("default").unwrap();
    assert!(default.first_argument().unwrap().is_call("cuid"));

    assert_eq!(
        output.schema.to_string(),
        "datasource db {\n  provider = \"postgresql\"\n}\n\n\
         model User {\n  id       String  @id @default(cuid())\n  isActive Boolean @default(false)\n}\n"
    );
}

#[test]
fn test_user_scenario_sql() {
    let (_, output) = run("mysql", USER_LEGACY, USER_TARGET);
    assert_eq!(
        translate(output.provider, &output.safe_ops).unwrap(),
        vec!["ALTER TABLE `User` CHANGE `isActive` `isActive` TINYINT(1) NOT NULL DEFAULT 0;"]
    );

    let (_, output) = run("postgresql", USER_LEGACY, USER_TARGET);
    assert_eq!(
        translate(output.provider, &output.safe_ops).unwrap(),
        vec!["ALTER TABLE \"User\" ALTER COLUMN \"isActive\" SET DEFAULT false;"]
    );
}

const BLOG_LEGACY: &str = r#"
enum Role { ADMIN USER }

type User @db(name: "users") {
  id: ID! @id
  email: String! @unique
  isActive: Boolean! @default(value: true)
  role: Role! @default(value: USER)
  meta: Json
  createdAt: DateTime! @createdAt
  updatedAt: DateTime! @updatedAt
  profile: Profile @relation(link: INLINE)
  posts: [Post!]!
}

type Profile {
  id: ID! @id
  bio: String
  user: User
}

type Post {
  id: ID! @id
  title: String!
  author: User! @relation(link: INLINE)
}
"#;

const BLOG_TARGET: &str = r#"
model users {
  id        String   @id
  email     String   @unique
  isActive  Boolean
  role      String
  meta      String?
  createdAt DateTime
  updatedAt DateTime
  profile   String?
  Profile   Profile? @relation(fields: [profile], references: [id])
  Post      Post[]
}

model Profile {
  id    String  @id
  bio   String?
  users users?
}

model Post {
  id     String @id
  title  String
  author String
  users  users  @relation(fields: [author], references: [id])
}
"#;

#[test]
fn test_blog_first_run() {
    let (_, output) = run("postgresql", BLOG_LEGACY, BLOG_TARGET);

    assert_eq!(
        names(&output.safe_ops),
        vec![
            "SetDefaultOp",
            "SetEnumTypeOp",
            "SetJsonTypeOp",
            "SetCreatedAtOp",
            "AddUniqueConstraintOp",
        ]
    );
    assert!(output.breaking_ops.is_empty());
    assert!(output.warnings.is_empty());

    let Operation::AddUniqueConstraint(unique) = &output.safe_ops[4] else {
        panic!("expected AddUniqueConstraint");
    };
    assert_eq!((unique.table.as_str(), unique.column.as_str()), ("users", "profile"));

    let Operation::AlterIdWidth(ids) = &output.id_ops[0] else {
        panic!("expected AlterIdWidth");
    };
    let columns: Vec<(&str, &str)> = ids
        .columns
        .iter()
        .map(|c| (c.table.as_str(), c.column.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("users", "id"),
            ("users", "profile"),
            ("Profile", "id"),
            ("Post", "id"),
            ("Post", "author"),
        ]
    );

    let user = output.schema.find_model("User").unwrap();
    assert_eq!(user.db_name(), "users");
    assert_eq!(user.find_field("role").unwrap().ty.to_string(), "Role");
    assert_eq!(user.find_field("meta").unwrap().ty.to_string(), "Json?");
    assert!(user.find_field("updatedAt").unwrap().has_attribute("updatedAt"));
    assert!(user.find_field("posts").is_some());

    let profile = user.find_field("profile").unwrap();
    assert_eq!(profile.ty.to_string(), "Profile?");
    assert_eq!(profile.relation_argument("fields"), vec!["profileId"]);
    let profile_id = user.find_field("profileId").unwrap();
    assert_eq!(profile_id.column_name(), "profile");
    assert!(profile_id.has_attribute("unique"));

    let post = output.schema.find_model("Post").unwrap();
    assert_eq!(post.find_field("author").unwrap().ty.to_string(), "User");
    assert_eq!(post.find_field("authorId").unwrap().column_name(), "author");
    assert!(output.schema.find_model("Profile").unwrap().find_field("user").is_some());
    assert!(output.schema.is_enum("Role"));
}

#[test]
fn test_idempotence() {
    let (legacy, first) = run("postgresql", BLOG_LEGACY, BLOG_TARGET);

    let corrected = target::parse(&first.schema.to_string()).unwrap();
    let second = upgrade(Input::new(&legacy, &corrected)).unwrap();

    assert!(second.safe_ops.is_empty(), "{:?}", second.safe_ops);
    assert!(second.breaking_ops.is_empty());
    assert!(second.warnings.is_empty());
    assert_eq!(second.schema, corrected);
}

#[test]
fn test_determinism() {
    let (_, first) = run("postgresql", BLOG_LEGACY, BLOG_TARGET);
    let (_, second) = run("postgresql", BLOG_LEGACY, BLOG_TARGET);
    assert_eq!(first, second);
}

#[test]
fn test_tie_break_picks_same_column() {
    let target = "model A {\n  id String @id\n  b  B?\n}\n\n\
                  model B {\n  id String  @id\n  a  String?\n  A  A?      @relation(fields: [a], references: [id])\n}\n";
    let forward = "type A { id: ID! @id  b: B } type B { id: ID! @id  a: A }";
    let backward = "type B { id: ID! @id  a: A } type A { id: ID! @id  b: B }";

    for legacy in [forward, backward] {
        let (_, output) = run("postgresql", legacy, target);
        assert_eq!(
            output.safe_ops,
            vec![Operation::AddUniqueConstraint(AddUniqueConstraintOp {
                schema: None,
                table: "B".into(),
                column: "a".into(),
            })]
        );
    }
}

#[test]
fn test_dangling_reference_fails() {
    let legacy = legacy::parse("type Post { id: ID! @id  author: Ghost }").unwrap();
    let target = target::parse(&format!(
        "{}model Post {{\n  id String @id\n}}",
        datasource("postgresql")
    ))
    .unwrap();
    let err = upgrade(Input::new(&legacy, &target)).unwrap_err();
    assert!(matches!(
        err,
        UpgradeError::UnknownType { ref type_name, .. } if type_name == "Ghost"
    ));
}

#[test]
fn test_table_one_to_many_is_breaking() {
    let (_, output) = run(
        "postgresql",
        r#"
        type User {
          id: ID! @id
          posts: [Post!]! @relation(name: "PostAuthor", link: TABLE)
        }
        type Post {
          id: ID! @id
          author: User! @relation(name: "PostAuthor")
        }
        "#,
        "model User {\n  id   String @id\n  Post Post[] @relation(\"PostAuthor\")\n}\n\n\
         model Post {\n  id   String @id\n  User User[] @relation(\"PostAuthor\")\n}\n",
    );

    assert!(output.safe_ops.iter().all(|op| !op.is_breaking()));
    assert_eq!(
        output.breaking_ops,
        vec![Operation::MigrateHasMany(MigrateHasManyOp {
            schema: None,
            one: RelationSide {
                model: "Post".into(),
                table: "Post".into(),
                id_column: "id".into(),
                id_kind: ScalarKind::Id,
            },
            many: RelationSide {
                model: "User".into(),
                table: "User".into(),
                id_column: "id".into(),
                id_kind: ScalarKind::Id,
            },
            column: "author".into(),
            required: true,
            join_table: "_PostAuthor".into(),
        })]
    );

    let sql = translate(output.provider, &output.breaking_ops).unwrap();
    let statements: Vec<&str> = sql[0].lines().collect();
    assert_eq!(statements.first(), Some(&"ALTER TABLE \"Post\" ADD COLUMN \"author\" VARCHAR(25);"));
    assert_eq!(statements.last(), Some(&"DROP TABLE \"_PostAuthor\";"));
}

#[test]
fn test_table_one_to_one_on_version_one_zero() {
    let (_, output) = run(
        "postgresql",
        r#"
        type User { id: ID! @unique  profile: Profile }
        type Profile { id: ID! @unique  user: User! }
        "#,
        "model User {\n  id      String @id\n  Profile Profile[]\n}\n\n\
         model Profile {\n  id   String @id\n  User User[]\n}\n",
    );
    match output.breaking_ops.as_slice() {
        [Operation::MigrateOneToOneTable(op)] => {
            assert_eq!(op.one.model, "User");
            assert_eq!(op.other.model, "Profile");
            assert_eq!(op.column, "profile");
            assert!(!op.required);
            assert_eq!(op.join_table, "_ProfileToUser");
        }
        other => panic!("unexpected breaking ops {:?}", other),
    }
}

#[test]
fn test_required_has_many() {
    let legacy = r#"
        type User { id: ID! @id  posts: [Post!]! }
        type Post { id: ID! @id  author: User! @relation(link: INLINE) }
    "#;
    let target = "model User {\n  id   String @id\n  Post Post[]\n}\n\n\
                  model Post {\n  id     String  @id\n  author String?\n  User   User?   @relation(fields: [author], references: [id])\n}\n";

    let (_, output) = run("postgresql", legacy, target);
    assert_eq!(
        output.breaking_ops,
        vec![Operation::MigrateRequiredHasMany(MigrateRequiredHasManyOp {
            schema: None,
            table: "Post".into(),
            column: "author".into(),
            referenced_table: "User".into(),
            referenced_column: "id".into(),
        })]
    );
    let post = output.schema.find_model("Post").unwrap();
    assert_eq!(post.find_field("author").unwrap().ty.to_string(), "User");
    assert_eq!(post.find_field("authorId").unwrap().ty.to_string(), "String");

    let (_, output) = run("mysql", legacy, target);
    assert!(matches!(
        translate(output.provider, &output.breaking_ops),
        Err(UpgradeError::UnsupportedOperation { provider: "MySQL", .. })
    ));
}

#[test]
fn test_ambiguous_relation_warns() {
    let (_, output) = run(
        "postgresql",
        r#"
        type User { id: ID! @id  written: [Post]  edited: [Post] }
        type Post { id: ID! @id  author: User }
        "#,
        "model User {\n  id String @id\n}\n\nmodel Post {\n  id String @id\n}\n",
    );
    assert_eq!(
        output.warnings,
        vec![Warning::AmbiguousRelation {
            key: "Post User".into(),
            fields: vec!["Post.author".into(), "User.edited".into(), "User.written".into()],
        }]
    );
    assert!(output.breaking_ops.is_empty());
}

const ONE_TO_ONE_LEGACY: &str = r#"
type User {
  id: ID! @id
  profile: Profile @relation(link: INLINE)
}

type Profile {
  id: ID! @id
  user: User!
}
"#;

const ONE_TO_ONE_TARGET: &str = r#"
model User {
  id      String   @id
  profile String?  @unique
  Profile Profile? @relation(fields: [profile], references: [id])
}

model Profile {
  id   String @id
  User User?
}
"#;

#[test]
fn test_relation_moves_to_required_side() {
    let (legacy, output) = run("postgresql", ONE_TO_ONE_LEGACY, ONE_TO_ONE_TARGET);
    assert!(output.safe_ops.is_empty());
    assert!(output.breaking_ops.is_empty());

    let user = output.schema.find_model("User").unwrap();
    let profile = user.find_field("profile").unwrap();
    assert_eq!(profile.ty.to_string(), "Profile?");
    assert!(profile.find_attribute("relation").is_none());
    assert_eq!(user.find_field("profileId").unwrap().column_name(), "profile");

    let back = output.schema.find_model("Profile").unwrap().find_field("user").unwrap();
    assert_eq!(back.ty.to_string(), "User");
    assert_eq!(back.relation_argument("fields"), vec!["id"]);
    assert_eq!(back.relation_argument("references"), vec!["profileId"]);

    let Operation::AlterIdWidth(ids) = &output.id_ops[0] else {
        panic!("expected AlterIdWidth");
    };
    assert!(ids.columns.iter().any(|c| c.table == "User" && c.column == "profile"));

    let corrected = target::parse(&output.schema.to_string()).unwrap();
    let second = upgrade(Input::new(&legacy, &corrected)).unwrap();
    assert!(second.safe_ops.is_empty());
    assert_eq!(second.schema, corrected);
}

#[test]
fn test_unique_side_without_column_warns() {
    let (_, output) = run(
        "postgresql",
        "type A { id: ID! @id  b: B } type B { id: ID! @id  a: A }",
        "model A {\n  id String  @id\n  b  String?\n  B  B?      @relation(fields: [b], references: [id])\n}\n\n\
         model B {\n  id String @id\n  A  A?\n}\n",
    );
    assert_eq!(
        output.warnings,
        vec![Warning::MissingColumn {
            model: "B".into(),
            field: "a".into(),
        }]
    );
    assert!(
        !output
            .safe_ops
            .iter()
            .any(|op| matches!(op, Operation::AddUniqueConstraint(_)))
    );
}
