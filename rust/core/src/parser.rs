//! STEP Parser using nom
//!
//! Zero-copy tokenization of ISO 10303-21 data records and fast record scanning.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::{many1, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .T., .F., .MILLI.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: LENGTH_MEASURE(25.4), LENGTH_UNIT()
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Body of a data record
#[derive(Debug, Clone, PartialEq)]
pub enum Record<'a> {
    /// `#1=CARTESIAN_POINT('',(0.,0.,0.));`
    Simple {
        type_name: &'a str,
        args: Vec<Token<'a>>,
    },
    /// `#2=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));`
    Complex(Vec<(&'a str, Vec<Token<'a>>)>),
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Parse string literal: 'text' or "text"
/// STEP uses '' to escape a single quote within a string
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn parse_string_content(input: &str, quote: char) -> IResult<&str, &str> {
        let mut i = 0;
        let bytes = input.as_bytes();

        while i < bytes.len() {
            if bytes[i] as char == quote {
                if i + 1 < bytes.len() && bytes[i + 1] as char == quote {
                    i += 2;
                    continue;
                } else {
                    return Ok((&input[i..], &input[..i]));
                }
            }
            i += 1;
        }

        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    alt((
        map(
            delimited(char('\''), |i| parse_string_content(i, '\''), char('\'')),
            Token::String,
        ),
        map(
            delimited(char('"'), |i| parse_string_content(i, '"'), char('"')),
            Token::String,
        ),
    ))(input)
}

/// Parse integer: 42, -42, +42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(tuple((opt(one_of("+-")), digit1))), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.E-05
/// STEP allows floats like "0." without decimal digits
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

/// Parse enum: .T., .F., .UNSPECIFIED., .MILLI.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

/// Parse null: $
fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

/// Parse derived: *
fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

/// Keyword: upper-case identifier with digits and underscores
fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Comma-separated token list inside parentheses
fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(delimited(ws, char(','), ws), token),
        preceded(ws, char(')')),
    )(input)
}

/// Parse typed value: LENGTH_MEASURE(25.4), PARAMETER_VALUE(0.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(pair(keyword, preceded(ws, arguments)), |(type_name, args)| {
        Token::TypedValue(type_name, args)
    })(input)
}

/// Skip whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // float before integer (float includes '.')
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

/// Body of a simple record: `NAME(args)`
fn simple_record(input: &str) -> IResult<&str, Record> {
    map(pair(keyword, preceded(ws, arguments)), |(type_name, args)| {
        Record::Simple { type_name, args }
    })(input)
}

/// Body of a complex record: `(A(args) B(args) ...)`
fn complex_record(input: &str) -> IResult<&str, Record> {
    map(
        delimited(
            char('('),
            many1(delimited(ws, pair(keyword, preceded(ws, arguments)), ws)),
            char(')'),
        ),
        Record::Complex,
    )(input)
}

/// Parse a complete data record
/// Example: #123=ADVANCED_FACE('',(#10),#11,.T.);
pub fn parse_entity(input: &str) -> Result<(u32, Record)> {
    let result: IResult<&str, (u32, Record)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        delimited(
            pair(char('='), ws),
            alt((complex_record, simple_record)),
            tuple((ws, char(';'))),
        ),
    ))(input);

    match result {
        Ok((_, (id, record))) => Ok((id, record)),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Parse a HEADER section record (no instance name)
/// Example: FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));
pub fn parse_header_record(input: &str) -> Result<(&str, Vec<Token>)> {
    let result: IResult<&str, Record> =
        delimited(ws, simple_record, tuple((ws, char(';'))))(input);

    match result {
        Ok((_, Record::Simple { type_name, args })) => Ok((type_name, args)),
        Ok((_, Record::Complex(_))) => Err(Error::parse(0, "Unexpected complex header record")),
        Err(e) => Err(Error::parse(0, format!("Failed to parse header record: {}", e))),
    }
}

/// Find the `;` terminating the record that starts at `from`.
/// Semicolons inside string literals are skipped.
pub(crate) fn find_record_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let offset = memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        let at = pos + offset;
        if bytes[at] == b';' {
            return Some(at);
        }
        // Inside a string: '' is an escaped quote, a lone ' closes it
        let mut i = at + 1;
        loop {
            let close = memchr::memchr(b'\'', &bytes[i..])? + i;
            if bytes.get(close + 1) == Some(&b'\'') {
                i = close + 2;
            } else {
                pos = close + 1;
                break;
            }
        }
    }
}

/// Byte offset of the first record in the DATA section (0 if the marker is missing)
pub fn data_section_start(content: &str) -> usize {
    memchr::memmem::find(content.as_bytes(), b"DATA;")
        .map(|pos| pos + "DATA;".len())
        .unwrap_or(0)
}

/// Fast entity scanner - scans the DATA section without full parsing
/// O(n) performance for finding entities by type
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner positioned at the DATA section
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: data_section_start(content),
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, line_start, line_end).
    /// Complex records report an empty type name.
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();
        let start_offset = memchr::memchr(b'#', &bytes[self.position..])?;
        let line_start = self.position + start_offset;

        let line_end = find_record_end(bytes, line_start)? + 1;

        let id_start = line_start + 1;
        let id_end = self.content[id_start..line_end]
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| id_start + i)
            .unwrap_or(line_end);

        self.position = line_end;

        let id = self.content[id_start..id_end].parse::<u32>().ok()?;

        let eq_pos = self.content[id_end..line_end].find('=')?;
        let type_start = id_end + eq_pos + 1;

        let type_start = self.content[type_start..line_end]
            .find(|c: char| !c.is_whitespace())
            .map(|i| type_start + i)?;

        if bytes[type_start] == b'(' {
            return Some((id, "", line_start, line_end));
        }

        let type_end = self.content[type_start..line_end]
            .find(|c: char| c == '(' || c.is_whitespace())
            .map(|i| type_start + i)
            .unwrap_or(line_end);

        Some((id, &self.content[type_start..type_end], line_start, line_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
        assert_eq!(entity_ref("#0"), Ok(("", Token::EntityRef(0))));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("'hello'"), Ok(("", Token::String("hello"))));
        assert_eq!(string_literal("''"), Ok(("", Token::String(""))));
        assert_eq!(
            string_literal("'it''s'"),
            Ok(("", Token::String("it''s")))
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.E-05"), Ok(("", Token::Float(1.0e-5))));
        assert_eq!(float("+2.5"), Ok(("", Token::Float(2.5))));
    }

    #[test]
    fn test_enum() {
        assert_eq!(enum_value(".T."), Ok(("", Token::Enum("T"))));
        assert_eq!(enum_value(".MILLI."), Ok(("", Token::Enum("MILLI"))));
    }

    #[test]
    fn test_nested_list() {
        let (_, token) = list("(1,(2.,3.),#4)").unwrap();
        match token {
            Token::List(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], Token::Integer(1));
                assert_eq!(
                    items[1],
                    Token::List(vec![Token::Float(2.0), Token::Float(3.0)])
                );
                assert_eq!(items[2], Token::EntityRef(4));
            }
            _ => panic!("Expected List token"),
        }
    }

    #[test]
    fn test_parse_simple_entity() {
        let (id, record) = parse_entity("#9=CARTESIAN_POINT('',(0.,0.,10.));").unwrap();
        assert_eq!(id, 9);
        match record {
            Record::Simple { type_name, args } => {
                assert_eq!(type_name, "CARTESIAN_POINT");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], Token::String(""));
                assert!(matches!(&args[1], Token::List(inner) if inner.len() == 3));
            }
            Record::Complex(_) => panic!("Expected simple record"),
        }
    }

    #[test]
    fn test_parse_entity_with_spaces() {
        let (id, record) =
            parse_entity("#12 = ORIENTED_EDGE ( '', *, *, #40, .F. ) ;").unwrap();
        assert_eq!(id, 12);
        assert!(matches!(record, Record::Simple { type_name: "ORIENTED_EDGE", ref args } if args.len() == 5));
    }

    #[test]
    fn test_parse_complex_entity() {
        let input = "#7=( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );";
        let (id, record) = parse_entity(input).unwrap();
        assert_eq!(id, 7);
        match record {
            Record::Complex(parts) => {
                let names: Vec<&str> = parts.iter().map(|(name, _)| *name).collect();
                assert_eq!(names, vec!["LENGTH_UNIT", "NAMED_UNIT", "SI_UNIT"]);
                assert_eq!(parts[2].1, vec![Token::Enum("MILLI"), Token::Enum("METRE")]);
            }
            Record::Simple { .. } => panic!("Expected complex record"),
        }
    }

    #[test]
    fn test_parse_typed_value_argument() {
        let (_, record) =
            parse_entity("#3=LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4),#2);").unwrap();
        match record {
            Record::Simple { args, .. } => {
                assert_eq!(
                    args[0],
                    Token::TypedValue("LENGTH_MEASURE", vec![Token::Float(25.4)])
                );
            }
            Record::Complex(_) => panic!("Expected simple record"),
        }
    }

    #[test]
    fn test_parse_entity_rejects_garbage() {
        assert!(parse_entity("#1=CARTESIAN_POINT('',(0.,0.,0.)").is_err());
        assert!(parse_entity("garbage").is_err());
    }

    #[test]
    fn test_find_record_end_skips_strings() {
        let bytes = b"#1=PRODUCT('a;b','it''s;',$);#2=X();";
        let end = find_record_end(bytes, 0).unwrap();
        assert_eq!(&bytes[..=end], b"#1=PRODUCT('a;b','it''s;',$);");
    }

    #[test]
    fn test_entity_scanner() {
        let content = r#"ISO-10303-21;
HEADER;
FILE_NAME('#not-an-entity',$,(''),(''),'','','');
ENDSEC;
DATA;
#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=DIRECTION('',(0.,0.,1.));
#3=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));
#4=CARTESIAN_POINT('',(1.,0.,0.));
ENDSEC;
END-ISO-10303-21;
"#;

        let mut scanner = EntityScanner::new(content);

        let (id, type_name, _, _) = scanner.next_entity().unwrap();
        assert_eq!(id, 1);
        assert_eq!(type_name, "CARTESIAN_POINT");

        let rest: Vec<(u32, &str)> = std::iter::from_fn(|| scanner.next_entity())
            .map(|(id, type_name, _, _)| (id, type_name))
            .collect();
        assert_eq!(rest, vec![(2, "DIRECTION"), (3, ""), (4, "CARTESIAN_POINT")]);
        assert!(scanner.next_entity().is_none());
    }
}
