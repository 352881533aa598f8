//! PDF object parser.
//!
//! A nom-based parser for the object syntax of ISO 32000-1 Section 7.3:
//! direct objects, indirect object definitions and streams. It covers
//! what the watermark applier needs to read converter output and does not
//! try to recover from badly damaged files.
//!
//! All parsing functions return `IResult` from nom.

use super::object::{Dict, Object, ObjectRef};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn parse_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Skip whitespace and comments.
pub fn skip_ws(mut input: &[u8]) -> IResult<&[u8], ()> {
    loop {
        let (rest, _) = take_while(is_whitespace)(input)?;
        input = rest;
        if input.first() == Some(&b'%') {
            let (rest, _) = take_till(|c| c == b'\r' || c == b'\n')(input)?;
            input = rest;
        } else {
            return Ok((input, ()));
        }
    }
}

/// Keyword that must not run into a following regular character.
fn keyword<'a>(word: &'static str) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], &'a [u8]> {
    move |input: &'a [u8]| {
        let (rest, matched) = tag(word)(input)?;
        match rest.first() {
            Some(&c) if is_regular(c) => Err(parse_error(input, nom::error::ErrorKind::Tag)),
            _ => Ok((rest, matched)),
        }
    }
}

fn unsigned(input: &[u8]) -> IResult<&[u8], u32> {
    let (rest, digits) = digit1(input)?;
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(|n| (rest, n))
        .ok_or_else(|| parse_error(input, nom::error::ErrorKind::Digit))
}

fn number(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), take_while(|c: u8| c.is_ascii_digit()))))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;
    let text = std::str::from_utf8(text).map_err(|_| parse_error(input, nom::error::ErrorKind::Float))?;
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok((rest, Object::Integer(i)));
        }
    }
    text.parse::<f64>()
        .map(|r| (rest, Object::Real(r)))
        .map_err(|_| parse_error(input, nom::error::ErrorKind::Float))
}

/// `id gen R`, falling back to a plain number.
fn reference_or_number(input: &[u8]) -> IResult<&[u8], Object> {
    let mut reference = tuple((unsigned, skip_ws, unsigned, skip_ws, keyword("R")));
    if let Ok((rest, (id, _, gen, _, _))) = reference(input) {
        if let Ok(gen) = u16::try_from(gen) {
            return Ok((rest, Object::Reference(ObjectRef::new(id, gen))));
        }
    }
    number(input)
}

fn name(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    Ok((rest, Object::Name(decode_name(raw))))
}

/// Decode `#xx` escapes in a name.
fn decode_name(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let Ok(byte) = u8::from_str_radix(&String::from_utf8_lossy(&raw[i + 1..i + 3]), 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn literal_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let decoded = decode_literal_escapes(&body[..i]);
                    return Ok((&body[i + 1..], Object::String(decoded)));
                }
            },
            _ => {},
        }
        i += 1;
    }
    Err(parse_error(input, nom::error::ErrorKind::Eof))
}

/// Decode escape sequences of a literal string body (ISO 32000-1 7.3.4.2).
pub fn decode_literal_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        i += 1;
        if c != b'\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = raw.get(i) else { break };
        i += 1;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(next),
            b'\r' => {
                // Line continuation
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                let mut code = (next - b'0') as u32;
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + (d - b'0') as u32;
                            i += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }
    out
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, _) = char('<')(input)?;
    let (rest, digits) = take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(rest)?;
    let (rest, _) = char('>')(rest)?;
    let nibbles: Vec<u8> = digits
        .iter()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|&c| match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => c - b'A' + 10,
        })
        .collect();
    // An odd trailing nibble is padded with zero
    let bytes = nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect();
    Ok((rest, Object::String(bytes)))
}

fn array(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut rest, _) = char('[')(input)?;
    let mut items = Vec::new();
    loop {
        let (after_ws, _) = skip_ws(rest)?;
        if let Ok((after, _)) = char::<&[u8], nom::error::Error<&[u8]>>(']')(after_ws) {
            return Ok((after, Object::Array(items)));
        }
        let (after, item) = parse_object(after_ws)?;
        items.push(item);
        rest = after;
    }
}

fn dictionary(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, dict) = dictionary_body(input)?;
    Ok((rest, Object::Dictionary(dict)))
}

fn dictionary_body(input: &[u8]) -> IResult<&[u8], Dict> {
    let (mut rest, _) = tag("<<")(input)?;
    let mut dict = Dict::new();
    loop {
        let (after_ws, _) = skip_ws(rest)?;
        if let Ok((after, _)) = tag::<_, _, nom::error::Error<&[u8]>>(">>")(after_ws) {
            return Ok((after, dict));
        }
        let (after_key, key) = name(after_ws)?;
        let (after_value, value) = parse_object(after_key)?;
        if let Object::Name(key) = key {
            dict.insert(key, value);
        }
        rest = after_value;
    }
}

fn keyword_object(input: &[u8]) -> IResult<&[u8], Object> {
    alt((
        value(Object::Boolean(true), keyword("true")),
        value(Object::Boolean(false), keyword("false")),
        value(Object::Null, keyword("null")),
    ))(input)
}

/// Parse one direct object (no stream data), skipping leading whitespace.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    preceded(
        skip_ws,
        alt((
            dictionary,
            hex_string,
            array,
            literal_string,
            name,
            keyword_object,
            reference_or_number,
        )),
    )(input)
}

/// Parse an indirect object definition `id gen obj ... endobj`, including
/// stream data when the object is a stream.
pub fn parse_indirect(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, (_, id, _, gen, _, _)) =
        tuple((skip_ws, unsigned, skip_ws, unsigned, skip_ws, keyword("obj")))(input)?;
    let gen = u16::try_from(gen).map_err(|_| parse_error(input, nom::error::ErrorKind::Digit))?;
    let (rest, object) = parse_object(rest)?;
    let (rest, _) = skip_ws(rest)?;

    let (rest, object) = match (object, keyword("stream")(rest)) {
        (Object::Dictionary(dict), Ok((after_kw, _))) => {
            let (after_data, data) = stream_data(after_kw, &dict)?;
            (
                after_data,
                Object::Stream {
                    dict,
                    data: bytes::Bytes::copy_from_slice(data),
                },
            )
        },
        (object, _) => (rest, object),
    };

    let (rest, _) = skip_ws(rest)?;
    let (rest, _) = opt(keyword("endobj"))(rest)?;
    Ok((rest, (ObjectRef::new(id, gen), object)))
}

/// Stream bytes after the `stream` keyword, consuming `endstream`.
///
/// A direct `/Length` is trusted when `endstream` follows it; otherwise the
/// data runs to the next `endstream` keyword.
fn stream_data<'a>(input: &'a [u8], dict: &Dict) -> IResult<&'a [u8], &'a [u8]> {
    let body = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    };

    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        if let Ok(length) = usize::try_from(length) {
            if length <= body.len() {
                let (after, _) = skip_ws(&body[length..])?;
                if let Ok((after, _)) = tag::<_, _, nom::error::Error<&[u8]>>("endstream")(after) {
                    return Ok((after, &body[..length]));
                }
            }
        }
    }

    let pos = find(body, b"endstream").ok_or_else(|| parse_error(input, nom::error::ErrorKind::Eof))?;
    let mut end = pos;
    if end > 0 && body[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && body[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((&body[pos + b"endstream".len()..], &body[..end]))
}

/// Parse a stream dictionary followed by stream data, as found in
/// cross-reference streams.
pub fn parse_dictionary(input: &[u8]) -> IResult<&[u8], Dict> {
    preceded(skip_ws, dictionary_body)(input)
}

/// Position of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Position of the last occurrence of `needle` in `haystack`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Parse a run of unsigned integers separated by whitespace, as used by
/// object stream headers.
pub fn parse_integer_pairs(input: &[u8], count: usize) -> Option<Vec<(u32, usize)>> {
    let mut rest = input;
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let (r, (_, id, _, offset)) =
            tuple((skip_ws, unsigned, skip_ws, unsigned))(rest).ok()?;
        pairs.push((id, offset as usize));
        rest = r;
    }
    Some(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Object {
        parse_object(input).unwrap().1
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b" true"), Object::Boolean(true));
        assert_eq!(parse(b"-42"), Object::Integer(-42));
        assert_eq!(parse(b".5"), Object::Real(0.5));
        assert_eq!(parse(b"3.25"), Object::Real(3.25));
        assert_eq!(parse(b"/Type"), Object::Name("Type".to_string()));
        assert_eq!(parse(b"/A#20B"), Object::Name("A B".to_string()));
    }

    #[test]
    fn test_parse_reference_vs_integers() {
        assert_eq!(parse(b"12 0 R"), Object::Reference(ObjectRef::new(12, 0)));
        let (rest, obj) = parse_object(b"12 0 obj").unwrap();
        assert_eq!(obj, Object::Integer(12));
        assert_eq!(rest, b" 0 obj");
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(parse(b"(a (nested) \\) str)"), Object::String(b"a (nested) ) str".to_vec()));
        assert_eq!(parse(b"(\\101\\n)"), Object::String(b"A\n".to_vec()));
        assert_eq!(parse(b"<48 65 6C6C 6F>"), Object::String(b"Hello".to_vec()));
        assert_eq!(parse(b"<7>"), Object::String(vec![0x70]));
    }

    #[test]
    fn test_parse_containers() {
        let obj = parse(b"<< /Type /Page /Kids [1 0 R 2 0 R] /MediaBox [0 0 595.3 842] % c\n >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("Page"));
        assert_eq!(dict.get("Kids").and_then(Object::as_array).map(Vec::len), Some(2));
        assert_eq!(
            dict.get("MediaBox").and_then(Object::as_array).unwrap()[2],
            Object::Real(595.3)
        );
    }

    #[test]
    fn test_parse_indirect_stream_with_length() {
        let input = b"5 0 obj\n<< /Length 8 >>\nstream\nBT ET q\nendstream\nendobj\n6 0 obj";
        let (rest, (id, obj)) = parse_indirect(input).unwrap();
        assert_eq!(id, ObjectRef::new(5, 0));
        match obj {
            Object::Stream { data, .. } => assert_eq!(data.as_ref(), b"BT ET q\n"),
            other => panic!("expected stream, got {:?}", other),
        }
        assert!(rest.starts_with(b"\n6 0 obj"));
    }

    #[test]
    fn test_parse_indirect_stream_with_indirect_length() {
        let input = b"5 0 obj\n<< /Length 9 0 R >>\nstream\r\nabc\r\nendstream\nendobj";
        let (_, (_, obj)) = parse_indirect(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(data.as_ref(), b"abc"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_array_fails() {
        assert!(parse_object(b"[1 2").is_err());
    }
}
