//! Tokenizer

use tracing::debug;

use super::error::ParseError;
use crate::domain::Operator;

/// Lexical token with its character position in the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number { value: f64, position: usize },
    Operator { op: Operator, position: usize },
}

impl Token {
    pub fn position(&self) -> usize {
        match self {
            Self::Number { position, .. } | Self::Operator { position, .. } => *position,
        }
    }
}

/// Split expression text into numbers and operators
///
/// Whitespace separates tokens and is otherwise ignored. Numbers are digits
/// with an optional decimal point and must fit a finite `f64`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    debug!(%input, "tokenize: called");
    let mut tokens = Vec::new();
    let mut number = String::new();
    let mut number_start = 0;

    for (position, ch) in input.chars().enumerate() {
        if ch.is_ascii_digit() || ch == '.' {
            if number.is_empty() {
                number_start = position;
            }
            number.push(ch);
            continue;
        }

        flush_number(&mut number, number_start, &mut tokens)?;

        if ch.is_whitespace() {
            continue;
        }

        match Operator::from_char(ch) {
            Some(op) => tokens.push(Token::Operator { op, position }),
            None => return Err(ParseError::InvalidCharacter { ch, position }),
        }
    }
    flush_number(&mut number, number_start, &mut tokens)?;

    debug!(count = tokens.len(), "tokenize: done");
    Ok(tokens)
}

fn flush_number(number: &mut String, position: usize, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
    if number.is_empty() {
        return Ok(());
    }
    let value: f64 = number
        .parse()
        .map_err(|_| ParseError::InvalidNumber(number.clone()))?;
    if !value.is_finite() {
        return Err(ParseError::InvalidNumber(number.clone()));
    }
    tokens.push(Token::Number { value, position });
    number.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Number { value, .. } => value.to_string(),
                Token::Operator { op, .. } => op.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_tokenize_simple_addition() {
        let tokens = tokenize("2+2").unwrap();
        assert_eq!(values(&tokens), vec!["2", "+", "2"]);
    }

    #[test]
    fn test_tokenize_ignores_whitespace() {
        let tokens = tokenize("  2 +\t2 ").unwrap();
        assert_eq!(values(&tokens), vec!["2", "+", "2"]);
    }

    #[test]
    fn test_tokenize_mixed_operators() {
        let tokens = tokenize("2+2*3").unwrap();
        assert_eq!(values(&tokens), vec!["2", "+", "2", "*", "3"]);
    }

    #[test]
    fn test_tokenize_decimals() {
        let tokens = tokenize("2.5+3.5").unwrap();
        assert_eq!(values(&tokens), vec!["2.5", "+", "3.5"]);
    }

    #[test]
    fn test_tokenize_records_positions() {
        let tokens = tokenize("10 - 5").unwrap();
        assert_eq!(tokens[0].position(), 0);
        assert_eq!(tokens[1].position(), 3);
        assert_eq!(tokens[2].position(), 5);
    }

    #[test]
    fn test_tokenize_rejects_letters() {
        let err = tokenize("2 + x").unwrap_err();
        assert_eq!(err, ParseError::InvalidCharacter { ch: 'x', position: 4 });
    }

    #[test]
    fn test_tokenize_rejects_malformed_number() {
        let err = tokenize("1.2.3 + 4").unwrap_err();
        assert_eq!(err, ParseError::InvalidNumber("1.2.3".to_string()));
    }

    #[test]
    fn test_tokenize_rejects_overflowing_number() {
        let digits = format!("1{}", "0".repeat(400));
        let err = tokenize(&format!("{} + 1", digits)).unwrap_err();
        assert_eq!(err, ParseError::InvalidNumber(digits));
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
