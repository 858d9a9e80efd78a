//! Lexical primitives shared by the legacy and target parsers.

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{map_res, not, opt, recognize, verify},
    sequence::{pair, terminated, tuple},
    IResult,
};

use crate::error::{UpgradeError, UpgradeResult};

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse an identifier (type, field, directive or enum value name).
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_ident_char), |s: &str| {
        !s.starts_with(|c: char| c.is_ascii_digit())
    })(input)
}

/// Match a keyword that is not the prefix of a longer identifier.
pub(crate) fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(satisfy(is_ident_char)))
}

/// Parse a double-quoted string with backslash escapes.
pub(crate) fn quoted_string(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Char,
                )));
            }
            Some('"') => return Ok((&rest[1..], out)),
            Some('\\') => {
                let Some(c) = chars.next() else {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        rest,
                        nom::error::ErrorKind::Escaped,
                    )));
                };
                out.push(match c {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                rest = &rest[1 + c.len_utf8()..];
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// Numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

/// Parse an integer or float literal (`-12`, `3.5`, `1e6`).
pub(crate) fn number(input: &str) -> IResult<&str, Number> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| {
            if s.contains(['.', 'e', 'E']) {
                s.parse::<f64>().map(Number::Float).map_err(|_| ())
            } else {
                s.parse::<i64>().map(Number::Int).map_err(|_| ())
            }
        },
    )(input)
}

/// First line of the remaining input, for error messages.
pub(crate) fn snippet(rest: &str) -> &str {
    let line = rest.lines().next().unwrap_or("");
    match line.char_indices().nth(40) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Turn a nom result over the whole document into an [`UpgradeResult`].
pub(crate) fn finish<T>(input: &str, result: IResult<&str, T>) -> UpgradeResult<T> {
    match result {
        Ok(("", value)) => Ok(value),
        Ok((remaining, _)) => Err(UpgradeError::parse(
            input.len() - remaining.len(),
            format!("Unexpected content: '{}'", snippet(remaining)),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(UpgradeError::parse(
            input.len() - e.input.len(),
            format!("Parse failed near '{}': {:?}", snippet(e.input), e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(UpgradeError::parse(input.len(), "Incomplete input")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("user_id: ID"), Ok((": ID", "user_id")));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_keyword_boundary() {
        assert!(keyword("type")("type User").is_ok());
        assert!(keyword("type")("typeName").is_err());
    }

    #[test]
    fn test_quoted_string_escapes() {
        assert_eq!(
            quoted_string(r#""say \"hi\"" rest"#),
            Ok((" rest", "say \"hi\"".to_string()))
        );
        assert_eq!(quoted_string(r#""""#), Ok(("", String::new())));
        assert!(quoted_string(r#""open"#).is_err());
    }

    #[test]
    fn test_number() {
        assert_eq!(number("42)"), Ok((")", Number::Int(42))));
        assert_eq!(number("-1.5"), Ok(("", Number::Float(-1.5))));
        assert_eq!(number("2e3"), Ok(("", Number::Float(2000.0))));
    }
}
