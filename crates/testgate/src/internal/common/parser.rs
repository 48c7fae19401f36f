use std::fmt::{Debug, Display, Formatter};

use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0, satisfy};
use nom::combinator::{all_consuming, map, map_res};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, separated_pair, tuple};
use nom::{AsChar, IResult};

use crate::internal::common::error::GateError;

pub enum ParserError<I> {
    Custom(String),
    Nom(I, ErrorKind),
}

impl<I: Debug> Debug for ParserError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(error) => f.write_fmt(format_args!("Semantic error at {error}")),
            Self::Nom(input, error) => f.write_fmt(format_args!(
                "Parser error at '{input:?}': expecting {error:?}"
            )),
        }
    }
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError::Nom(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I: Display, E: Display> FromExternalError<I, E> for ParserError<I> {
    fn from_external_error(input: I, _: ErrorKind, error: E) -> Self {
        ParserError::Custom(format!("'{input}': {error}"))
    }
}

pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

fn format_parse_error(error: nom::Err<ParserError<&str>>) -> GateError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => GateError::ConfigError(format!("{e:?}")),
        nom::Err::Incomplete(_) => GateError::ConfigError("Incomplete input".to_string()),
    }
}

/// Runs the parser and requires it to consume the whole input.
pub(crate) fn consume_all<'a, T>(
    parser: impl FnMut(&'a str) -> NomResult<'a, T>,
    input: &'a str,
) -> crate::Result<T> {
    all_consuming(parser)(input)
        .map(|(_, value)| value)
        .map_err(format_parse_error)
}

fn p_integer_string(input: &str) -> NomResult<String> {
    let parser = tuple((
        satisfy(|c| c.is_dec_digit()),
        many0(satisfy(|c| c.is_dec_digit() || c == '_')),
    ));
    map(parser, |(first, rest)| {
        let mut number = first.to_string();
        number.extend(rest.into_iter().filter(|c| c.is_dec_digit()));
        number
    })(input)
}

pub fn p_u64(input: &str) -> NomResult<u64> {
    map_res(p_integer_string, |number| number.parse::<u64>())(input)
}

pub fn is_valid_resource_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.')
}

fn p_resource_name(input: &str) -> NomResult<&str> {
    take_while1(is_valid_resource_char)(input)
}

fn p_resource_entry(input: &str) -> NomResult<(&str, u64)> {
    separated_pair(
        p_resource_name,
        tuple((multispace0, char('='), multispace0)),
        p_u64,
    )(input)
}

/// Parses `name=amount` pairs separated by commas, e.g. `cpu=16,memory=64`.
pub(crate) fn p_resource_entries(input: &str) -> NomResult<Vec<(&str, u64)>> {
    delimited(
        multispace0,
        separated_list0(
            tuple((multispace0, char(','), multispace0)),
            p_resource_entry,
        ),
        multispace0,
    )(input)
}
