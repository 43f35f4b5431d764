//
// Copyright 2024 tbf Contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Framing primitives shared by the decoder: single-byte markers, fixed-width
//! big-endian 32-bit integers, and separator-terminated byte runs.

use nom::{
    IResult,
    bytes::complete::take,
    combinator::map,
    number::complete::be_u32,
};

use crate::document::SEPARATOR;

/// Consumes and returns a single marker or flag byte.
pub fn marker(input: &[u8]) -> IResult<&[u8], u8> {
    map(take(1usize), |b: &[u8]| b[0])(input)
}

/// Consumes a fixed-width 4-byte big-endian unsigned integer.
pub fn u32_be(input: &[u8]) -> IResult<&[u8], u32> {
    be_u32(input)
}

/// Consumes bytes up to (and including) the next `SEPARATOR` byte, returning
/// the bytes before it. End-of-stream acts as an implicit separator: if none
/// is found, the entire remainder is returned and no input is left unconsumed.
pub fn until_separator(input: &[u8]) -> IResult<&[u8], &[u8]> {
    match input.iter().position(|&b| b == SEPARATOR) {
        Some(position) => Ok((&input[position + 1..], &input[..position])),
        None => Ok((&input[input.len()..], input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker() {
        let test_input = &[0x01, 0x02, 0x03];
        assert_eq!(marker(test_input), Ok((&test_input[1..], 0x01)));
    }

    #[test]
    fn test_u32_be() {
        let test_input = &[0x00, 0x00, 0x01, 0x00, 0xFF];
        assert_eq!(u32_be(test_input), Ok((&test_input[4..], 256)));
    }

    #[test]
    fn test_until_separator_basic() {
        let test_input = &[0x45, 0x55, 0x00];
        assert_eq!(
            until_separator(test_input),
            Ok((&test_input[3..], &test_input[0..2]))
        );
    }

    #[test]
    fn test_until_separator_multiple_seps() {
        let input = &[0x45, 0x00, 0x55, 0x00];
        let (rest, first) = until_separator(input).unwrap();
        assert_eq!(first, &[0x45]);
        let (rest, second) = until_separator(rest).unwrap();
        assert_eq!(second, &[0x55]);
        assert_eq!(rest.len(), 0);
    }

    #[test]
    fn test_until_separator_consecutive() {
        let input = &[0x45, 0x55, 0x00, 0x00, 0x45, 0x00];
        let (rest, a) = until_separator(input).unwrap();
        assert_eq!(a, &[0x45, 0x55]);
        let (rest, b) = until_separator(rest).unwrap();
        assert_eq!(b, &[] as &[u8]);
        let (rest, c) = until_separator(rest).unwrap();
        assert_eq!(c, &[0x45]);
        assert_eq!(rest.len(), 0);
    }

    #[test]
    fn test_until_separator_no_sep_stops_at_eof() {
        let input = &[0x45, 0x55];
        let (rest, value) = until_separator(input).unwrap();
        assert_eq!(value, &[0x45, 0x55]);
        assert_eq!(rest.len(), 0);
    }

    #[test]
    fn test_until_separator_empty_run() {
        let input = &[0x00, 0x45];
        let (rest, value) = until_separator(input).unwrap();
        assert_eq!(value, &[] as &[u8]);
        assert_eq!(rest, &[0x45]);
    }
}
