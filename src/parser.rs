use crate::error::ParseError;
use crate::xref::{Xref, XrefEntry};
use crate::{Dictionary, Error, Object, ObjectId, Stream, StringFormat};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of, space0};
use nom::combinator::{map, map_opt, opt, recognize, verify};
use nom::multi::{fold_many0, fold_many1, many0, many0_count};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, AsChar, IResult, Input, Parser};
use nom_locate::LocatedSpan;

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum allowed embedding of literal strings.
pub const MAX_BRACKET: usize = 100;

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

#[inline]
fn offset_stream(object: &mut Object, offset: usize) {
    if let Object::Stream(stream) = object {
        stream.start_position = stream.start_position.and_then(|sp| sp.checked_add(offset));
    }
}

fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

fn comment(input: ParserInput) -> NomResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol), |_| ()).parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), comment)),
        || {},
        |_, _| (),
    )
    .parse(input)
}

fn parse_span<T: FromStr>(span: ParserInput) -> Option<T> {
    str::from_utf8(span.fragment()).ok().and_then(|s| T::from_str(s).ok())
}

fn integer(input: ParserInput) -> NomResult<i64> {
    map_opt(recognize(pair(opt(one_of("+-")), digit1)), parse_span::<i64>).parse(input)
}

fn real(input: ParserInput) -> NomResult<f32> {
    map_opt(
        recognize(pair(
            opt(one_of("+-")),
            alt((
                map((digit1, tag(&b"."[..]), digit0), |_| ()),
                map(pair(tag(&b"."[..]), digit1), |_| ()),
            )),
        )),
        parse_span::<f32>,
    )
    .parse(input)
}

fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_opt(
        verify(take(2usize), |h: &ParserInput| h.as_bytes().iter().copied().all(AsChar::is_hex_digit)),
        |x: ParserInput| str::from_utf8(x.fragment()).ok().and_then(|s| u8::from_str_radix(s, 16).ok()),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_opt(
        take_while_m_n(1, 3, AsChar::is_oct_digit),
        // Overflow of three digit octal escapes is ignored.
        |x: ParserInput| {
            str::from_utf8(x.fragment())
                .ok()
                .and_then(|s| u16::from_str_radix(s, 8).ok())
                .map(|o| o as u8)
        },
    )
    .parse(input)
}

fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| {
                let c = c.fragment()[0];
                if c != b'#' && is_regular(c) { Some(c) } else { None }
            }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c.fragment()[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s.fragment()),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_| false), |_| vec![]).parse(input)
        } else {
            map(
                delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])),
                |mut content| {
                    content.insert(0, b'(');
                    content.push(b')');
                    content
                },
            )
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| (c.fragment()[0] as char).to_digit(16).map(|d| d as u8)).parse(input)
}

fn hexadecimal_string(input: ParserInput) -> NomResult<Object> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |(mut out, odd), c| {
                        if odd {
                            if let Some(last) = out.last_mut() {
                                *last |= c;
                            }
                        } else {
                            out.push(c << 4);
                        }
                        (out, !odd)
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| Object::String(bytes, StringFormat::Hexadecimal),
    )
    .parse(input)
}

fn boolean(input: ParserInput) -> NomResult<Object> {
    alt((
        map(tag(&b"true"[..]), |_| Object::Boolean(true)),
        map(tag(&b"false"[..]), |_| Object::Boolean(false)),
    ))
    .parse(input)
}

fn null(input: ParserInput) -> NomResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: ParserInput) -> NomResult<Vec<Object>> {
    delimited(pair(tag(&b"["[..]), space), many0(_direct_object), tag(&b"]"[..])).parse(input)
}

fn dictionary(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"<<"[..]), space), inner_dictionary, tag(&b">>"[..])).parse(input)
}

fn inner_dictionary(input: ParserInput) -> NomResult<Dictionary> {
    fold_many0(
        pair(terminated(name, space), _direct_object),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn stream(input: ParserInput) -> NomResult<Object> {
    let (i, dict) = terminated(dictionary, (space, tag(&b"stream"[..]), space0, eol)).parse(input)?;

    // Direct lengths are trusted when "endstream" follows them. Anything else is resolved by the
    // reader once all objects are loaded.
    if let Ok(length) = dict.get(b"Length").and_then(Object::as_i64) {
        if let Ok(length) = usize::try_from(length) {
            let data: NomResult<ParserInput> =
                terminated(take(length), (opt(eol), space, tag(&b"endstream"[..]))).parse(i);
            if let Ok((rest, data)) = data {
                return Ok((rest, Object::Stream(Stream::new(dict, data.fragment().to_vec()))));
            }
        }
    }

    // Position relative to the start of the stream dictionary.
    Ok((i, Object::Stream(Stream::with_position(dict, input.len() - i.len()))))
}

fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_opt(digit1, parse_span::<I>).parse(input)
}

fn object_id(input: ParserInput) -> NomResult<ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

fn reference(input: ParserInput) -> NomResult<Object> {
    map(terminated(object_id, tag(&b"R"[..])), Object::Reference).parse(input)
}

fn _direct_objects(input: ParserInput) -> NomResult<Object> {
    alt((
        null,
        boolean,
        reference,
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        hexadecimal_string,
        map(array, Object::Array),
        map(dictionary, Object::Dictionary),
    ))
    .parse(input)
}

fn _direct_object(input: ParserInput) -> NomResult<Object> {
    terminated(_direct_objects, space).parse(input)
}

/// Parse a single object that is not an indirect object, as stored in object streams.
pub fn direct_object(input: ParserInput) -> Option<Object> {
    strip_nom(preceded(space, _direct_object).parse(input))
}

fn object(input: ParserInput) -> NomResult<Object> {
    terminated(alt((stream, _direct_objects)), space).parse(input)
}

/// Parse the indirect object starting at `offset`.
pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>,
) -> crate::Result<(ObjectId, Object)> {
    if offset > input.len() {
        return Err(ParseError::IndirectObject { offset }.into());
    }
    let input = input.take_from(offset);

    let (i, (_, object_id)) = terminated((space, object_id), pair(tag(&b"obj"[..]), space))
        .parse(input)
        .map_err(|_| ParseError::IndirectObject { offset })?;
    if let Some(expected_id) = expected_id {
        if object_id != expected_id {
            return Err(ParseError::IndirectObject { offset }.into());
        }
    }

    let object_offset = input.len() - i.len();
    let (_, mut object) = terminated(object, (space, opt(tag(&b"endobj"[..])), space))
        .parse(i)
        .map_err(|_| ParseError::IndirectObject { offset })?;

    offset_stream(&mut object, offset + object_offset);

    Ok((object_id, object))
}

/// The version following `%PDF-`.
pub fn header(input: ParserInput) -> Option<String> {
    strip_nom(map_opt(
        delimited(
            tag(&b"%PDF-"[..]),
            take_while(|c: u8| !b"\r\n".contains(&c)),
            pair(eol, many0_count(comment)),
        ),
        |v: ParserInput| str::from_utf8(v.fragment()).ok().map(|s| s.trim_end().to_string()),
    )
    .parse(input))
}

pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    strip_nom(map(
        delimited(tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol),
        |v: ParserInput| v.fragment().to_vec(),
    )
    .parse(input))
}

/// Decode a classic cross-reference table.
fn xref(input: ParserInput) -> NomResult<Xref> {
    let xref_eol = map(alt((tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]))), |_| ());
    let xref_entry = pair(
        separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>),
        delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>),
        preceded(pair(opt(tag(&b" "[..])), eol), many0(xref_entry)),
    );

    delimited(
        pair(tag(&b"xref"[..]), eol),
        fold_many1(
            xref_section,
            || Xref::new(0),
            |mut xref, ((start, _count), entries)| {
                for (index, ((offset, generation), is_normal)) in entries.into_iter().enumerate() {
                    let id = start.saturating_add(index as u32);
                    match u16::try_from(generation) {
                        Ok(generation) if is_normal => xref.insert(id, XrefEntry::Normal { offset, generation }),
                        _ => xref.insert(id, XrefEntry::Free),
                    }
                }
                xref
            },
        ),
        space,
    )
    .parse(input)
}

fn trailer(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Parse a trailer dictionary starting at the `trailer` keyword.
pub fn trailer_dictionary(input: ParserInput) -> Option<Dictionary> {
    strip_nom(trailer(input))
}

/// Parse a classic cross-reference section and the trailer that follows it.
pub fn xref_and_trailer(input: ParserInput) -> crate::Result<(Xref, Dictionary)> {
    let (_, (mut xref, trailer)) = pair(xref, trailer)
        .parse(input)
        .map_err(|_| Error::Parse(ParseError::InvalidXref))?;

    xref.size = trailer
        .get(b"Size")
        .and_then(Object::as_i64)
        .ok()
        .and_then(|size| u32::try_from(size).ok())
        .ok_or(ParseError::InvalidTrailer)?;

    Ok((xref, trailer))
}

pub fn xref_start(input: ParserInput) -> Option<i64> {
    strip_nom(
        delimited(
            pair(tag(&b"startxref"[..]), eol),
            delimited(many0(tag(&b" "[..])), integer, many0(tag(&b" "[..]))),
            (eol, tag(&b"%%EOF"[..]), space),
        )
        .parse(input),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        LocatedSpan::new_extra(s, "test")
    }

    fn tstrip<O>(r: NomResult<O>) -> Option<O> {
        r.ok().and_then(|(i, o)| if !i.is_empty() { None } else { Some(o) })
    }

    #[test]
    fn parse_real_number() {
        let real = |i| tstrip(real(i));

        assert_eq!(real(test_span(b"0.12")), Some(0.12));
        assert_eq!(real(test_span(b"-.12")), Some(-0.12));
        assert_eq!(real(test_span(b"10.")), Some(10.0));
    }

    #[test]
    fn parse_string() {
        let literal_string = |i| tstrip(literal_string(i));

        let data = vec![
            ("()", ""),
            ("(text())", "text()"),
            ("(text\r\n\\\\(nested\\t\\b\\f))", "text\r\n\\(nested\t\x08\x0C)"),
            ("(text\\0\\53\\053\\0053)", "text\0++\x053"),
            ("(text line\\\n())", "text line()"),
        ];

        for (input, expected) in data {
            assert_eq!(
                literal_string(test_span(input.as_bytes())),
                Some(expected.as_bytes().to_vec()),
                "input: {:?} output: {:?}",
                input,
                expected,
            );
        }
    }

    #[test]
    fn parse_name() {
        let (text, expected) = (b"/ABC#5f", b"ABC\x5F");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));

        let (text, expected) = (b"/#cb#ce#cc#e5", b"\xcb\xce\xcc\xe5");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));
    }

    #[test]
    fn hex_partial() {
        let out = tstrip(hexadecimal_string(test_span(b"<901FA>")));

        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn hex_separated() {
        let out = tstrip(hexadecimal_string(test_span(b"<9 01F A>")));

        match out {
            Some(Object::String(s, _)) => assert_eq!(s, b"\x90\x1F\xA0".to_vec()),
            _ => panic!("unexpected {:?}", out),
        }
    }

    #[test]
    fn indirect_stream_with_direct_length() {
        let input = b"4 0 obj\n<</Length 5>>\nstream\nHello\nendstream\nendobj\n";
        let (id, object) = indirect_object(test_span(input), 0, Some((4, 0))).unwrap();
        assert_eq!(id, (4, 0));
        assert_eq!(object.as_stream().unwrap().content, b"Hello");
    }

    #[test]
    fn indirect_stream_with_referenced_length() {
        let input = b"xx 4 0 obj\n<</Length 9 0 R>>\nstream\nHello\nendstream\nendobj\n";
        let (_, object) = indirect_object(test_span(input), 3, None).unwrap();
        let stream = object.as_stream().unwrap();
        assert!(stream.content.is_empty());
        assert_eq!(stream.start_position, Some(36));
        assert_eq!(&input[36..41], b"Hello");
    }

    #[test]
    fn unexpected_object_id_is_rejected() {
        let input = b"4 0 obj 12 endobj";
        assert!(indirect_object(test_span(input), 0, Some((5, 0))).is_err());
        assert!(indirect_object(test_span(input), 100, None).is_err());
    }

    #[test]
    fn big_generation_value() {
        let input = b"xref
0 1
0000000000 65536 f
0 4
0000000000 65535 f
0000153238 00000 n
0000000019 00000 n
0000000313 00000 n
trailer
<</Size 4/Root 3 0 R>>
startxref
153804
%%EOF
";
        let (xref, trailer) = xref_and_trailer(test_span(input)).unwrap();
        assert_eq!(xref.size, 4);
        assert_eq!(xref.get(1), Some(&XrefEntry::Normal { offset: 153238, generation: 0 }));
        assert_eq!(trailer.get(b"Root").unwrap().as_reference().unwrap(), (3, 0));
    }

    #[test]
    fn space_in_startxref_number() {
        let input = b"startxref
153804
%%EOF
";
        assert_eq!(xref_start(test_span(input)), Some(153804));
    }

    #[test]
    fn header_and_binary_mark() {
        assert_eq!(header(test_span(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n")), Some("1.7".to_string()));
        assert_eq!(binary_mark(test_span(b"%\xE2\xE3\xCF\xD3\n")), Some(b"\xE2\xE3\xCF\xD3".to_vec()));
        assert_eq!(header(test_span(b"PK\x03\x04")), None);
    }
}
