//! Percent encoding over the operator alphabets

use std::borrow::Cow;

use crate::operator::Alphabet;

/// Length in bytes of the `%XX` triplet starting at `s`, if any
fn pct_triplet_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (bytes.len() >= 3
        && bytes[0] == b'%'
        && bytes[1].is_ascii_hexdigit()
        && bytes[2].is_ascii_hexdigit())
    .then_some(3)
}

/// Percent-encode every character of `input` outside `alphabet`.
///
/// The reserved alphabet keeps existing pct-triplets; a lone `%` is always
/// escaped.
pub fn encode(input: &str, alphabet: Alphabet) -> String {
    let mut out = String::with_capacity(input.len());
    let mut buf = [0u8; 4];
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if alphabet == Alphabet::Reserved
            && let Some(len) = pct_triplet_len(rest)
        {
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }
        if alphabet.allows(c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Cut an escaped string to at most `units` characters, counting a
/// pct-triplet as one character. `0` means no limit.
pub fn cut(escaped: &str, units: usize) -> &str {
    if units == 0 {
        return escaped;
    }
    let mut end = 0;
    for _ in 0..units {
        let rest = &escaped[end..];
        match pct_triplet_len(rest) {
            Some(len) => end += len,
            None => match rest.chars().next() {
                Some(c) => end += c.len_utf8(),
                None => break,
            },
        }
    }
    &escaped[..end]
}

/// Decode pct-triplets. Malformed sequences stay as written and invalid
/// UTF-8 is replaced.
pub fn decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }
    match urlencoding::decode(input) {
        Ok(decoded) => decoded,
        Err(_) => {
            let bytes = urlencoding::decode_binary(input.as_bytes());
            Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
