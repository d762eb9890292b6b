//! Tokenizer for the expression language.

use super::ExprError;
use crate::build::scan;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// Back-tick string: literal chunks and raw `${…}` bodies, alternating.
    Template(Vec<TemplateChunk>),
    Ident(String),
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    Expr(String),
}

/// Punctuators, longest first so greedy matching picks `===` over `==`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "(", ")", "[",
    "]", "{", "}", ",", ".", ":", "?", "!", "+", "-", "*", "/", "%", "<", ">", "=",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::syntax(format!("invalid number '{text}'"), source))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next) = read_quoted(&chars, i, source)?;
            tokens.push(Token::Str(text));
            i = next;
            continue;
        }

        if c == '`' {
            let (chunks, next) = read_template(&chars, i, source)?;
            tokens.push(Token::Template(chunks));
            i = next;
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            return Err(ExprError::syntax(format!("unexpected character '{c}'"), source));
        };
        // `?.5` is a conditional followed by a number, not optional chaining
        if *punct == "?." && chars.get(i + 2).is_some_and(|n| n.is_ascii_digit()) {
            tokens.push(Token::Punct("?"));
            i += 1;
            continue;
        }
        tokens.push(Token::Punct(punct));
        i += punct.chars().count();
    }

    Ok(tokens)
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn read_quoted(chars: &[char], start: usize, source: &str) -> Result<(String, usize), ExprError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(unescape(chars[i + 1]));
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(ExprError::syntax("unterminated string literal", source))
}

/// Read a back-tick literal, splitting out `${…}` interpolations.
fn read_template(
    chars: &[char],
    start: usize,
    source: &str,
) -> Result<(Vec<TemplateChunk>, usize), ExprError> {
    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(unescape(chars[i + 1]));
                i += 2;
            }
            '`' => {
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(text));
                }
                return Ok((chunks, i + 1));
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                let rest: String = chars[i..].iter().collect();
                let close = scan::find_close(&rest, 2)
                    .ok_or_else(|| ExprError::syntax("unterminated template interpolation", source))?;
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                chunks.push(TemplateChunk::Expr(rest[2..close].to_string()));
                i += rest[..=close].chars().count();
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(ExprError::syntax("unterminated template literal", source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_member_call() {
        let tokens = tokenize("tacs.dir.get('post')").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("tacs".into()),
                Token::Punct("."),
                Token::Ident("dir".into()),
                Token::Punct("."),
                Token::Ident("get".into()),
                Token::Punct("("),
                Token::Str("post".into()),
                Token::Punct(")"),
            ]
        );
    }

    #[test]
    fn test_tokenize_operators_greedy() {
        let tokens = tokenize("a === b ?? c?.d").unwrap();
        assert!(tokens.contains(&Token::Punct("===")));
        assert!(tokens.contains(&Token::Punct("??")));
        assert!(tokens.contains(&Token::Punct("?.")));
    }

    #[test]
    fn test_tokenize_template() {
        let tokens = tokenize("`<li>${ p.title }</li>`").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Template(vec![
                TemplateChunk::Text("<li>".into()),
                TemplateChunk::Expr(" p.title ".into()),
                TemplateChunk::Text("</li>".into()),
            ])]
        );
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a # b").is_err());
        assert!(tokenize("`x ${ y `").is_err());
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("1.5").unwrap(), vec![Token::Number(1.5)]);
        assert_eq!(
            tokenize("a?.5:1").unwrap()[1],
            Token::Punct("?")
        );
    }
}
