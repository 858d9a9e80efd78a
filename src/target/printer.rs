//! Render a target schema back to text.
//!
//! Fields inside a block are aligned in three columns (name, type,
//! attributes) and assignments align on `=`. Comments are not preserved.

use std::fmt::{self, Display, Formatter, Write};

use super::{Argument, Assignment, Attribute, Block, Enum, Field, Model, Schema, Source, Value};

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", block)?;
        }
        Ok(())
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Block::Datasource(source) => write_source(f, "datasource", source),
            Block::Generator(source) => write_source(f, "generator", source),
            Block::Model(model) => Display::fmt(model, f),
            Block::Enum(e) => Display::fmt(e, f),
        }
    }
}

fn write_source(f: &mut Formatter<'_>, keyword: &str, source: &Source) -> fmt::Result {
    writeln!(f, "{} {} {{", keyword, source.name)?;
    let width = source
        .assignments
        .iter()
        .map(|a| a.key.len())
        .max()
        .unwrap_or(0);
    for Assignment { key, value } in &source.assignments {
        writeln!(f, "  {:width$} = {}", key, value, width = width)?;
    }
    write!(f, "}}")
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "model {} {{", self.name)?;
        for line in field_lines(&self.fields) {
            writeln!(f, "  {}", line)?;
        }
        if !self.attributes.is_empty() {
            if !self.fields.is_empty() {
                writeln!(f)?;
            }
            for attr in &self.attributes {
                writeln!(f, "  @{}", attr)?;
            }
        }
        write!(f, "}}")
    }
}

/// Render fields as aligned `name type @attrs` lines without trailing spaces.
fn field_lines(fields: &[Field]) -> Vec<String> {
    let types: Vec<String> = fields.iter().map(|field| field.ty.to_string()).collect();
    let name_width = fields.iter().map(|field| field.name.len()).max().unwrap_or(0);
    let type_width = types.iter().map(String::len).max().unwrap_or(0);

    fields
        .iter()
        .zip(&types)
        .map(|(field, ty)| {
            let mut line = format!("{:nw$} {:tw$}", field.name, ty, nw = name_width, tw = type_width);
            for attr in &field.attributes {
                let _ = write!(line, " {}", attr);
            }
            line.trim_end().to_string()
        })
        .collect()
}

impl Display for Enum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "enum {} {{", self.name)?;
        for value in &self.values {
            write!(f, "  {}", value.name)?;
            for attr in &value.attributes {
                write!(f, " {}", attr)?;
            }
            writeln!(f)?;
        }
        if !self.attributes.is_empty() {
            writeln!(f)?;
            for attr in &self.attributes {
                writeln!(f, "  @{}", attr)?;
            }
        }
        write!(f, "}}")
    }
}

/// Field form (`@name`). Block attributes prepend one more `@`.
impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@")?;
        if let Some(group) = &self.group {
            write!(f, "{}.", group)?;
        }
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "(")?;
            write_joined(f, &self.arguments)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        other => f.write_char(other)?,
                    }
                }
                write!(f, "\"")
            }
            Value::Int(i) => write!(f, "{}", i),
            // Keep a fractional part so the value reads back as a float.
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_joined(f, args)?;
                write!(f, ")")
            }
            Value::Reference(name) => write!(f, "{}", name),
            Value::List(values) => {
                write!(f, "[")?;
                write_joined(f, values)?;
                write!(f, "]")
            }
        }
    }
}

fn write_joined<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

model User {
  id       String  @id @default(cuid())
  isActive Boolean @default(false)
  posts    Post[]
  score    Float   @default(2.0)

  @@map("users")
}

enum Role {
  ADMIN
  USER
}
"#;

    #[test]
    fn test_print_is_stable() {
        let schema = parse(SCHEMA).unwrap();
        assert_eq!(schema.to_string(), SCHEMA);
    }

    #[test]
    fn test_print_then_parse() {
        let schema = parse(
            r#"model Post { id Int @id  title String? @db.VarChar(200)  author User @relation(fields: [authorId], references: [id])  authorId Int  note String @default("say \"hi\"") }"#,
        )
        .unwrap();
        let printed = schema.to_string();
        assert_eq!(parse(&printed).unwrap(), schema);
    }

    #[test]
    fn test_fields_are_aligned() {
        let schema = parse("model A {\n id Int @id\n longName String\n}").unwrap();
        assert_eq!(
            schema.to_string(),
            "model A {\n  id       Int    @id\n  longName String\n}\n"
        );
    }
}
