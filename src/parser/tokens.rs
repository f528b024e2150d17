//! Lexeme-level parsers shared by every statement grammar.
//!
//! Every parser here skips leading whitespace and `--` comments itself, so the
//! statement grammars can chain them without threading `multispace0` around.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{TranslationError, TranslationResult};
use crate::value::{Marker, TypedValue, ValueSource};

/// Words that never parse as a bare identifier.
const RESERVED: &[&str] = &[
    "alter", "and", "asc", "by", "create", "delete", "desc", "from", "ilike", "index", "insert",
    "into", "is", "like", "limit", "not", "null", "offset", "on", "or", "order", "returning",
    "select", "set", "table", "unique", "update", "values", "where",
];

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Skip whitespace and `--` line comments.
pub fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, recognize(pair(tag("--"), not_line_ending))))),
    )(input)
}

/// A whole keyword, case-insensitive. `from` does not match the head of `fromage`.
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, ()> {
    move |input| {
        value(
            (),
            preceded(
                sp,
                terminated(tag_no_case(kw), not(peek(satisfy(is_ident_char)))),
            ),
        )(input)
    }
}

/// A run of keywords such as `ORDER BY` or `IS NOT NULL`.
pub fn keywords<'a>(words: &'static [&'static str]) -> impl FnMut(&'a str) -> IResult<&'a str, ()> {
    move |mut input| {
        for word in words {
            let (rest, _) = keyword(*word)(input)?;
            input = rest;
        }
        Ok((input, ()))
    }
}

/// Punctuation or operator text.
pub fn symbol<'a>(s: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input| preceded(sp, tag(s))(input)
}

/// Any word made of identifier characters, reserved or not.
pub fn word(input: &str) -> IResult<&str, &str> {
    preceded(sp, take_while1(is_ident_char))(input)
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(is_ident_char),
        )),
        |s: &str| !RESERVED.contains(&s.to_ascii_lowercase().as_str()),
    )(input)
}

/// Table, column or index name. Double quotes allow reserved words.
pub fn identifier(input: &str) -> IResult<&str, String> {
    preceded(
        sp,
        alt((
            map(
                delimited(char('"'), take_while1(|c| c != '"'), char('"')),
                String::from,
            ),
            map(bare_identifier, String::from),
        )),
    )(input)
}

/// `a, b, c`
pub fn identifier_list(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(symbol(","), identifier)(input)
}

/// `(a, b, c)`
pub fn paren_identifier_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(symbol("("), identifier_list, symbol(")"))(input)
}

/// `*` (empty projection) or a column list.
pub fn projection(input: &str) -> IResult<&str, Vec<String>> {
    alt((value(Vec::new(), symbol("*")), identifier_list))(input)
}

/// Unsigned integer for LIMIT / OFFSET.
pub fn unsigned(input: &str) -> IResult<&str, u32> {
    preceded(sp, map_res(digit1, str::parse::<u32>))(input)
}

/// `$1`, `$2`, ... (1-based)
pub fn param(input: &str) -> IResult<&str, u32> {
    preceded(
        sp,
        preceded(
            char('$'),
            verify(map_res(digit1, str::parse::<u32>), |n: &u32| *n >= 1),
        ),
    )(input)
}

/// Single-quoted string; `''` is an escaped quote.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    let (input, _) = preceded(sp, char('\''))(input)?;
    let (input, parts) = many0(alt((is_not("'"), value("'", tag("''")))))(input)?;
    let (input, _) = char('\'')(input)?;
    Ok((input, parts.concat()))
}

fn number(input: &str) -> IResult<&str, f64> {
    preceded(
        sp,
        map_res(
            recognize(tuple((
                opt(char('-')),
                digit1,
                opt(pair(char('.'), digit1)),
            ))),
            str::parse::<f64>,
        ),
    )(input)
}

/// `NOW()`, `CURRENT_TIMESTAMP`, `gen_random_uuid()`, `uuid_generate_v4()`.
fn marker(input: &str) -> IResult<&str, Marker> {
    let (rest, name) = word(input)?;
    let (rest, parens) = opt(pair(symbol("("), symbol(")")))(rest)?;

    let marker = match Marker::from_name(name) {
        Some(m) => m,
        None => return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))),
    };
    let bare_ok = name.eq_ignore_ascii_case("current_timestamp");
    if parens.is_none() && !bare_ok {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    Ok((rest, marker))
}

/// A value in an INSERT list, SET assignment or comparison.
pub fn value_token(input: &str) -> IResult<&str, ValueSource> {
    alt((
        map(param, ValueSource::Param),
        value(ValueSource::Literal(TypedValue::Null), keyword("null")),
        value(ValueSource::Literal(TypedValue::Bool(true)), keyword("true")),
        value(ValueSource::Literal(TypedValue::Bool(false)), keyword("false")),
        map(number, |n| ValueSource::Literal(TypedValue::Number(n))),
        map(string_literal, |s| ValueSource::Literal(TypedValue::Text(s))),
        map(marker, Marker::resolve),
    ))(input)
}

/// `(v1, v2, ...)`
pub fn paren_value_list(input: &str) -> IResult<&str, Vec<ValueSource>> {
    delimited(
        symbol("("),
        separated_list1(symbol(","), value_token),
        symbol(")"),
    )(input)
}

/// Run `parser`, turning a failure into a positioned parse error that names
/// what was expected.
pub fn expect<'a, O, P>(
    full: &str,
    input: &'a str,
    mut parser: P,
    what: &str,
) -> TranslationResult<(&'a str, O)>
where
    P: FnMut(&'a str) -> IResult<&'a str, O>,
{
    parser(input).map_err(|_| error_at(full, input, format!("expected {}", what)))
}

/// Run `parser` if it matches, otherwise leave the input untouched.
pub fn maybe<'a, O, P>(input: &'a str, mut parser: P) -> (&'a str, Option<O>)
where
    P: FnMut(&'a str) -> IResult<&'a str, O>,
{
    match parser(input) {
        Ok((rest, out)) => (rest, Some(out)),
        Err(_) => (input, None),
    }
}

/// Accept an optional trailing `;` and require the end of input.
pub fn end_of_statement(full: &str, input: &str) -> TranslationResult<()> {
    let (rest, _) = maybe(input, symbol(";"));
    let (rest, _) = maybe(rest, sp);
    if rest.is_empty() {
        Ok(())
    } else {
        Err(error_at(full, rest, "unexpected trailing content".to_string()))
    }
}

/// Parse error at the first non-blank character of `rest`.
pub fn error_at(full: &str, rest: &str, reason: String) -> TranslationError {
    let rest = match sp(rest) {
        Ok((r, _)) => r,
        Err(_) => rest,
    };
    let near = if rest.is_empty() {
        "end of input".to_string()
    } else {
        let snippet: String = rest.chars().take(24).collect();
        format!("'{}'", snippet)
    };
    TranslationError::parse(full.len() - rest.len(), format!("{} near {}", reason, near))
}

/// Skip a parenthesized block, honouring nesting and quoted strings.
pub fn balanced_parens(input: &str) -> IResult<&str, &str> {
    let (start, _) = preceded(sp, char('('))(input)?;
    let mut depth = 1usize;
    let mut in_string = false;

    for (i, c) in start.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&start[i + 1..], &start[..i]));
                }
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}
