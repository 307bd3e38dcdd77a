//! Whitespace tokenizer shared by the text readers

use crate::IoError;
use std::iter::Peekable;
use std::str::{FromStr, SplitWhitespace};

pub(crate) struct Tokens<'a> {
    format: &'static str,
    inner: Peekable<SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    pub fn new(format: &'static str, text: &'a str) -> Self {
        Self {
            format,
            inner: text.split_whitespace().peekable(),
        }
    }

    pub fn peek(&mut self) -> Option<&'a str> {
        self.inner.peek().copied()
    }

    pub fn next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    /// Next token, or a parse error naming `what` was missing
    pub fn expect(&mut self, what: &str) -> Result<&'a str, IoError> {
        match self.inner.next() {
            Some(token) => Ok(token),
            None => Err(self.error(format!("unexpected end of file, expected {}", what))),
        }
    }

    pub fn parse<T: FromStr>(&mut self, what: &str) -> Result<T, IoError> {
        let token = self.expect(what)?;
        token
            .parse::<T>()
            .map_err(|_| self.error(format!("invalid {}: {:?}", what, token)))
    }

    /// Consume `keyword`, ignoring ASCII case
    pub fn keyword(&mut self, keyword: &str) -> Result<(), IoError> {
        let token = self.expect(keyword)?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {:?}", keyword, token)))
        }
    }

    pub fn error(&self, message: impl AsRef<str>) -> IoError {
        IoError::parse(format!("{}: {}", self.format, message.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_and_report_context() {
        let mut tokens = Tokens::new("TEST", "POINTS 3 float\n 1.5 x");

        assert_eq!(tokens.peek(), Some("POINTS"));
        tokens.keyword("points").unwrap();
        assert_eq!(tokens.parse::<usize>("point count").unwrap(), 3);
        assert_eq!(tokens.expect("type").unwrap(), "float");
        assert_eq!(tokens.parse::<f32>("coordinate").unwrap(), 1.5);

        let err = tokens.parse::<f32>("coordinate").unwrap_err();
        assert!(err.to_string().contains("TEST: invalid coordinate"));

        let err = tokens.expect("more").unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }
}
