//! Column definition grammar.
//!
//! `` `name` dtype [[not] null] [default value] [[in]visible] [[auto_]increment]
//! [unique [key]] [[primary] key] [comment value] ``

use crate::column::Column;
use crate::constraints::KeyKind;
use crate::error::{Error, Result};

const KEYWORDS: &[&str] = &[
    "not",
    "null",
    "default",
    "visible",
    "invisible",
    "increment",
    "auto_increment",
    "unique",
    "primary",
    "key",
    "comment",
];

const TYPE_SUFFIXES: &[&str] = &["unsigned", "signed", "zerofill"];

pub(crate) fn parse(definition: &str) -> Result<Column> {
    let tokens = tokenize(definition)?;
    let mut tokens = tokens.into_iter().peekable();

    let name = tokens
        .next()
        .map(|token| unquote(&token, '`'))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::InvalidDefinition(format!("missing column name in `{definition}`")))?;
    let mut dtype = tokens
        .next()
        .ok_or_else(|| Error::InvalidDefinition(format!("missing type for column `{name}`")))?;
    while let Some(suffix) = tokens.next_if(|token| TYPE_SUFFIXES.contains(&lower(token).as_str())) {
        dtype.push(' ');
        dtype.push_str(&suffix);
    }

    let mut column = Column::new(name, dtype);
    let mut key = None;

    while let Some(token) = tokens.next() {
        match lower(&token).as_str() {
            "not" => {
                match tokens.next().map(|next| lower(&next)) {
                    Some(next) if next == "null" => column.nullable = false,
                    _ => {
                        return Err(Error::InvalidDefinition(format!(
                            "expected `null` after `not` in `{definition}`"
                        )));
                    }
                }
            }
            "null" => column.nullable = true,
            "default" => {
                let first = tokens.next().ok_or_else(|| {
                    Error::InvalidDefinition(format!("missing value after `default` in `{definition}`"))
                })?;
                let mut parts = vec![first];
                while let Some(part) = tokens.next_if(|token| !is_keyword(token)) {
                    parts.push(part);
                }
                column.default = Some(parts.join(" "));
            }
            "visible" => column.visible = true,
            "invisible" => column.visible = false,
            "increment" | "auto_increment" => column.auto_increment = true,
            "unique" => {
                tokens.next_if(|token| lower(token) == "key");
                key = Some(KeyKind::Unique);
            }
            "primary" => {
                tokens.next_if(|token| lower(token) == "key");
                key = Some(KeyKind::Primary);
            }
            "key" => key = Some(KeyKind::Index),
            "comment" => {
                let rest: Vec<String> = tokens.by_ref().collect();
                column.comment = match rest.as_slice() {
                    [single] => unquote(single, '\''),
                    _ => rest.join(" "),
                };
            }
            _ => {
                return Err(Error::InvalidDefinition(format!(
                    "unexpected token `{token}` in `{definition}`"
                )));
            }
        }
    }

    if let Some(kind) = key {
        column = column.with_key(kind);
    }
    Ok(column)
}

pub(crate) fn render(column: &Column) -> String {
    let mut out = if needs_quoting(&column.name) {
        quote(&column.name, '`')
    } else {
        column.name.clone()
    };
    out.push(' ');
    out.push_str(&column.dtype);
    out.push_str(if column.nullable { " null" } else { " not null" });
    if let Some(default) = &column.default {
        out.push_str(" default ");
        out.push_str(default);
    }
    if !column.visible {
        out.push_str(" invisible");
    }
    if column.auto_increment {
        out.push_str(" auto_increment");
    }
    match column.key_kind() {
        Some(KeyKind::Unique) => out.push_str(" unique"),
        Some(KeyKind::Primary) => out.push_str(" primary key"),
        Some(KeyKind::Index) => out.push_str(" key"),
        None => {}
    }
    if !column.comment.is_empty() {
        out.push_str(" comment ");
        out.push_str(&quote(&column.comment, '\''));
    }
    out
}

/// Split a comma-separated list of definitions (`a int, b decimal(10, 2)`).
pub(crate) fn split_definitions(text: &str) -> Result<Vec<String>> {
    split_top_level(text, |ch| ch == ',')
}

fn tokenize(definition: &str) -> Result<Vec<String>> {
    split_top_level(definition, char::is_whitespace)
}

/// Split on `separator` outside of quotes and brackets.
///
/// Pieces are trimmed and empty ones dropped. Inside quotes a backslash
/// escapes the next character.
fn split_top_level(text: &str, separator: impl Fn(char) -> bool) -> Result<Vec<String>> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut open_quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    let mut flush = |current: &mut String| {
        let piece = current.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        current.clear();
    };

    for ch in text.chars() {
        match open_quote {
            Some(open) => {
                current.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == open {
                    open_quote = None;
                }
            }
            None => match ch {
                '`' | '\'' | '"' => {
                    open_quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        Error::InvalidDefinition(format!("unbalanced `)` in `{text}`"))
                    })?;
                    current.push(ch);
                }
                ch if depth == 0 && separator(ch) => flush(&mut current),
                _ => current.push(ch),
            },
        }
    }

    if open_quote.is_some() || depth > 0 {
        return Err(Error::InvalidDefinition(format!(
            "unterminated quote or bracket in `{text}`"
        )));
    }
    flush(&mut current);
    Ok(pieces)
}

fn lower(token: &str) -> String {
    token.to_ascii_lowercase()
}

fn is_keyword(token: &str) -> bool {
    KEYWORDS.contains(&lower(token).as_str())
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '`' | '\'' | '"' | '(' | ')' | ','))
}

/// Wrap in `mark`, doubling inner marks and escaping backslashes.
fn quote(text: &str, mark: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(mark);
    for ch in text.chars() {
        if ch == '\\' {
            out.push('\\');
        } else if ch == mark {
            out.push(mark);
        }
        out.push(ch);
    }
    out.push(mark);
    out
}

/// Strip one pair of `quote` characters, undoing doubled quotes and backslash escapes.
fn unquote(token: &str, quote: char) -> String {
    let Some(inner) = token
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
    else {
        return token.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else if ch == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_option() {
        let column = parse(
            "`user id` int unsigned not null default 0 invisible auto_increment unique key comment 'it''s the id'",
        )
        .expect("parse definition");
        assert_eq!(column.name, "user id");
        assert_eq!(column.dtype, "int unsigned");
        assert!(!column.nullable);
        assert_eq!(column.default.as_deref(), Some("0"));
        assert!(!column.visible);
        assert!(column.auto_increment);
        assert_eq!(column.key_kind(), Some(KeyKind::Unique));
        assert_eq!(column.comment, "it's the id");
    }

    #[test]
    fn primary_forces_not_null() {
        let column = parse("id int null primary key").expect("parse definition");
        assert!(!column.nullable);
        assert_eq!(column.key_kind(), Some(KeyKind::Primary));
    }

    #[test]
    fn keeps_bracketed_types_whole() {
        let column = parse("price decimal(10, 2) default 'a b'").expect("parse definition");
        assert_eq!(column.dtype, "decimal(10, 2)");
        assert_eq!(column.default.as_deref(), Some("'a b'"));
    }

    #[test]
    fn default_takes_the_next_token_even_when_it_is_a_keyword() {
        let column = parse("x int default null").expect("parse definition");
        assert_eq!(column.default.as_deref(), Some("null"));
        assert!(column.nullable);

        let column = parse("x int not null default NULL comment 'c'").expect("parse definition");
        assert_eq!(column.default.as_deref(), Some("NULL"));
        assert!(!column.nullable);
        assert_eq!(column.comment, "c");

        assert!(matches!(parse("x int default"), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn backslashes_survive_rendering() {
        let column = Column::new("path", "text").with_comment("C:\\");
        assert_eq!(render(&column), "path text null comment 'C:\\\\'");
        assert_eq!(parse(&render(&column)).expect("reparse").comment, "C:\\");

        let column = parse(r"note text comment 'it\'s'").expect("parse definition");
        assert_eq!(column.comment, "it's");
    }

    #[test]
    fn splits_definition_lists_outside_brackets() {
        assert_eq!(
            split_definitions("a int, b decimal(10, 2) default 'x,y',  c text").expect("split"),
            vec!["a int", "b decimal(10, 2) default 'x,y'", "c text"]
        );
        assert!(matches!(split_definitions("a int, b varchar(3"), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn rejects_malformed_definitions() {
        assert!(matches!(parse(""), Err(Error::InvalidDefinition(_))));
        assert!(matches!(parse("name"), Err(Error::InvalidDefinition(_))));
        assert!(matches!(parse("name int bogus"), Err(Error::InvalidDefinition(_))));
        assert!(matches!(parse("name int not"), Err(Error::InvalidDefinition(_))));
        assert!(matches!(parse("name varchar(3"), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn renders_in_fixed_option_order() {
        let column = Column::new("id", "int")
            .with_default("1")
            .with_auto_increment(true)
            .with_key(KeyKind::Primary)
            .with_comment("pk");
        assert_eq!(render(&column), "id int not null default 1 auto_increment primary key comment 'pk'");
    }
}
