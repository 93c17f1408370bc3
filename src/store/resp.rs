//! RESP2 framing for the remote store client

use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

/// Why a frame could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// More bytes are needed
    Incomplete,
    /// The bytes do not form a valid frame
    Invalid(String),
}

pub struct RespParser;

impl RespParser {
    /// Parse one frame from the start of `input`, returning it and the bytes consumed
    pub fn parse(input: &[u8]) -> Result<(RespValue, usize), ParseError> {
        if input.is_empty() {
            return Err(ParseError::Incomplete);
        }

        match input[0] {
            b'+' => Self::parse_line(input).map(|(s, n)| (RespValue::SimpleString(s), n)),
            b'-' => Self::parse_line(input).map(|(s, n)| (RespValue::Error(s), n)),
            b':' => {
                let (n, consumed) = Self::parse_length(input)?;
                Ok((RespValue::Integer(n), consumed))
            }
            b'$' => Self::parse_bulk_string(input),
            b'*' => Self::parse_array(input),
            other => Err(ParseError::Invalid(format!(
                "Unknown RESP type: {}",
                other as char
            ))),
        }
    }

    fn parse_line(input: &[u8]) -> Result<(String, usize), ParseError> {
        let pos = Self::find_crlf(input).ok_or(ParseError::Incomplete)?;
        let s = String::from_utf8_lossy(&input[1..pos]).to_string();
        Ok((s, pos + 2))
    }

    fn parse_length(input: &[u8]) -> Result<(i64, usize), ParseError> {
        let (s, consumed) = Self::parse_line(input)?;
        let n = s
            .parse::<i64>()
            .map_err(|e| ParseError::Invalid(format!("bad integer {:?}: {}", s, e)))?;
        Ok((n, consumed))
    }

    fn parse_bulk_string(input: &[u8]) -> Result<(RespValue, usize), ParseError> {
        let (len, start) = Self::parse_length(input)?;
        if len == -1 {
            return Ok((RespValue::BulkString(None), start));
        }
        if len < 0 {
            return Err(ParseError::Invalid(format!("negative bulk length {}", len)));
        }

        let end = start
            .checked_add(len as usize)
            .ok_or_else(|| ParseError::Invalid(format!("bulk length {} too large", len)))?;
        if end.saturating_add(2) > input.len() {
            return Err(ParseError::Incomplete);
        }
        if &input[end..end + 2] != b"\r\n" {
            return Err(ParseError::Invalid("bulk string not CRLF terminated".into()));
        }

        Ok((RespValue::BulkString(Some(input[start..end].to_vec())), end + 2))
    }

    fn parse_array(input: &[u8]) -> Result<(RespValue, usize), ParseError> {
        let (len, mut offset) = Self::parse_length(input)?;
        if len == -1 {
            return Ok((RespValue::Array(None), offset));
        }
        if len < 0 {
            return Err(ParseError::Invalid(format!("negative array length {}", len)));
        }

        let mut elements = Vec::with_capacity((len as usize).min(1024));
        for _ in 0..len {
            let (value, consumed) = Self::parse(&input[offset..])?;
            elements.push(value);
            offset += consumed;
        }

        Ok((RespValue::Array(Some(elements)), offset))
    }

    fn find_crlf(input: &[u8]) -> Option<usize> {
        memchr::memchr_iter(b'\r', input).find(|&i| input.get(i + 1) == Some(&b'\n'))
    }

    /// Append the wire form of `value` to `buf`
    pub fn encode_into(value: &RespValue, buf: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                buf.put_u8(b'-');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.put_slice(format!(":{}\r\n", n).as_bytes());
            }
            RespValue::BulkString(None) => buf.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                buf.put_slice(format!("${}\r\n", data.len()).as_bytes());
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            RespValue::Array(None) => buf.put_slice(b"*-1\r\n"),
            RespValue::Array(Some(elements)) => {
                buf.put_slice(format!("*{}\r\n", elements.len()).as_bytes());
                for element in elements {
                    Self::encode_into(element, buf);
                }
            }
        }
    }

    pub fn encode(value: &RespValue) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Self::encode_into(value, &mut buf);
        buf.to_vec()
    }

    /// Encode a command as an array of bulk strings
    pub fn encode_command(parts: &[&str], buf: &mut BytesMut) {
        buf.put_slice(format!("*{}\r\n", parts.len()).as_bytes());
        for part in parts {
            buf.put_slice(format!("${}\r\n", part.len()).as_bytes());
            buf.put_slice(part.as_bytes());
            buf.put_slice(b"\r\n");
        }
    }
}

impl RespValue {
    #[inline]
    pub fn nil() -> Self {
        RespValue::BulkString(None)
    }

    pub fn err(msg: impl Into<String>) -> Self {
        RespValue::Error(msg.into())
    }

    pub fn bulk(s: impl AsRef<[u8]>) -> Self {
        RespValue::BulkString(Some(s.as_ref().to_vec()))
    }

    /// Arguments of a command frame (array of bulk strings)
    pub fn into_command_args(self) -> Option<Vec<String>> {
        match self {
            RespValue::Array(Some(elements)) => elements
                .into_iter()
                .map(|e| match e {
                    RespValue::BulkString(Some(data)) => String::from_utf8(data).ok(),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_types() {
        assert_eq!(
            RespParser::parse(b"+OK\r\n"),
            Ok((RespValue::SimpleString("OK".into()), 5))
        );
        assert_eq!(
            RespParser::parse(b":42\r\n"),
            Ok((RespValue::Integer(42), 5))
        );
        assert_eq!(
            RespParser::parse(b"-ERR nope\r\n"),
            Ok((RespValue::Error("ERR nope".into()), 11))
        );
    }

    #[test]
    fn test_parse_bulk_and_nil() {
        assert_eq!(
            RespParser::parse(b"$4\r\n10.5\r\n"),
            Ok((RespValue::bulk("10.5"), 10))
        );
        assert_eq!(RespParser::parse(b"$-1\r\n"), Ok((RespValue::nil(), 5)));
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(RespParser::parse(b""), Err(ParseError::Incomplete));
        assert_eq!(RespParser::parse(b"$4\r\n10"), Err(ParseError::Incomplete));
        assert_eq!(
            RespParser::parse(b"*2\r\n$1\r\na\r\n"),
            Err(ParseError::Incomplete)
        );
        assert_eq!(RespParser::parse(b":12"), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            RespParser::parse(b"?x\r\n"),
            Err(ParseError::Invalid(_))
        ));
        assert!(matches!(
            RespParser::parse(b":abc\r\n"),
            Err(ParseError::Invalid(_))
        ));
    }

    #[test]
    fn test_encode_command_parses_back_to_args() {
        let mut buf = BytesMut::new();
        RespParser::encode_command(&["HGET", "app:sensors:1:power", "min"], &mut buf);
        let (value, consumed) = RespParser::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(
            value.into_command_args(),
            Some(vec![
                "HGET".to_string(),
                "app:sensors:1:power".to_string(),
                "min".to_string()
            ])
        );
    }

    #[test]
    fn test_pipelined_frames() {
        let input = b":1\r\n$-1\r\n";
        let (first, n) = RespParser::parse(input).unwrap();
        assert_eq!(first, RespValue::Integer(1));
        let (second, _) = RespParser::parse(&input[n..]).unwrap();
        assert_eq!(second, RespValue::nil());
    }
}
