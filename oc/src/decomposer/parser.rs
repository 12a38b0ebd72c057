//! Two-pass decomposition into binary operations

use tracing::debug;

use super::error::ParseError;
use super::token::{Token, tokenize};
use crate::domain::{Operation, Operator};

/// Intermediate item after the first pass
#[derive(Debug, Clone, Copy)]
enum Item {
    Number(f64),
    Operator(Operator),
    /// A `number (*|/) number` triple collapsed into one operation
    Collapsed(Operation),
}

/// Decompose expression text into operations in evaluation order
pub fn decompose(input: &str) -> Result<Vec<Operation>, ParseError> {
    debug!(%input, "decompose: called");
    let tokens = tokenize(input)?;
    check_shape(&tokens)?;

    let operator_count = tokens.iter().filter(|t| matches!(t, Token::Operator { .. })).count();
    let items = collapse_tight(&tokens);
    let operations = extract_loose(&items);

    // Every operator must land in exactly one operation
    if operations.len() != operator_count {
        debug!(
            operator_count,
            emitted = operations.len(),
            "decompose: chained operators not expressible"
        );
        return Err(ParseError::Unsupported(input.trim().to_string()));
    }

    debug!(count = operations.len(), "decompose: done");
    Ok(operations)
}

/// Validate `number (operator number)*` with at least one operator
fn check_shape(tokens: &[Token]) -> Result<(), ParseError> {
    let Some(first) = tokens.first() else {
        return Err(ParseError::Empty);
    };

    let mut expect_number = true;
    for token in tokens {
        match (token, expect_number) {
            (Token::Number { .. }, true) | (Token::Operator { .. }, false) => expect_number = !expect_number,
            (Token::Operator { position, .. }, true) => {
                return Err(ParseError::MissingOperand { position: *position });
            }
            (Token::Number { position, .. }, false) => {
                return Err(ParseError::MissingOperator { position: *position });
            }
        }
    }

    if expect_number {
        // Trailing operator
        let position = tokens.last().map(|t| t.position() + 1).unwrap_or(first.position());
        return Err(ParseError::MissingOperand { position });
    }

    if tokens.len() == 1 {
        return Err(ParseError::NoOperator);
    }

    Ok(())
}

/// First pass: collapse literal `a * b` and `a / b` triples
fn collapse_tight(tokens: &[Token]) -> Vec<Item> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if let (Some(Token::Number { value: a, .. }), Some(Token::Operator { op, .. }), Some(Token::Number { value: b, .. })) =
            (tokens.get(i), tokens.get(i + 1), tokens.get(i + 2))
            && op.binds_tight()
        {
            items.push(Item::Collapsed(Operation::new(*op, *a, *b)));
            i += 3;
            continue;
        }

        items.push(match tokens[i] {
            Token::Number { value, .. } => Item::Number(value),
            Token::Operator { op, .. } => Item::Operator(op),
        });
        i += 1;
    }
    items
}

/// Second pass: emit collapsed operations and literal `a + b` / `a - b` triples
fn extract_loose(items: &[Item]) -> Vec<Operation> {
    let mut operations = Vec::new();
    let mut i = 0;
    while i < items.len() {
        match (items.get(i), items.get(i + 1), items.get(i + 2)) {
            (Some(Item::Collapsed(op)), _, _) => {
                operations.push(*op);
                i += 1;
            }
            (Some(Item::Number(a)), Some(Item::Operator(op)), Some(Item::Number(b))) if !op.binds_tight() => {
                operations.push(Operation::new(*op, *a, *b));
                i += 3;
            }
            _ => i += 1,
        }
    }
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decompose_addition() {
        let ops = decompose("2+3").unwrap();
        assert_eq!(ops, vec![Operation::new(Operator::Add, 2.0, 3.0)]);
    }

    #[test]
    fn test_decompose_subtraction_with_spaces() {
        let ops = decompose("10 - 5").unwrap();
        assert_eq!(ops, vec![Operation::new(Operator::Subtract, 10.0, 5.0)]);
    }

    #[test]
    fn test_decompose_division() {
        let ops = decompose("10 / 5").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operator, Operator::Divide);
        assert_eq!(ops[0].operand1 / ops[0].operand2, 2.0);
    }

    #[test]
    fn test_decompose_multiplication_decimals() {
        let ops = decompose("2.5 * 4").unwrap();
        assert_eq!(ops, vec![Operation::new(Operator::Multiply, 2.5, 4.0)]);
    }

    #[test]
    fn test_decompose_missing_operand() {
        assert_eq!(decompose("5 + "), Err(ParseError::MissingOperand { position: 3 }));
        assert!(matches!(decompose("+ 5"), Err(ParseError::MissingOperand { .. })));
        assert!(matches!(decompose("5 + * 3"), Err(ParseError::MissingOperand { .. })));
    }

    #[test]
    fn test_decompose_missing_operator() {
        assert!(matches!(decompose("5 5"), Err(ParseError::MissingOperator { .. })));
    }

    #[test]
    fn test_decompose_no_operator() {
        assert_eq!(decompose("42"), Err(ParseError::NoOperator));
    }

    #[test]
    fn test_decompose_empty() {
        assert_eq!(decompose(""), Err(ParseError::Empty));
        assert_eq!(decompose("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_decompose_non_numeric_operand() {
        assert!(matches!(decompose("abc + 1"), Err(ParseError::InvalidCharacter { .. })));
    }

    #[test]
    fn test_decompose_rejects_mixed_precedence_chain() {
        assert!(matches!(decompose("2+3*4"), Err(ParseError::Unsupported(_))));
        assert!(matches!(decompose("2*3+4"), Err(ParseError::Unsupported(_))));
    }

    #[test]
    fn test_decompose_rejects_same_precedence_chain() {
        assert!(matches!(decompose("1+2+3"), Err(ParseError::Unsupported(_))));
        assert!(matches!(decompose("2*3*4"), Err(ParseError::Unsupported(_))));
    }

    #[test]
    fn test_decompose_rejects_parentheses() {
        assert!(matches!(decompose("(1+2)"), Err(ParseError::InvalidCharacter { ch: '(', .. })));
    }

    fn operator_strategy() -> impl Strategy<Value = Operator> {
        prop_oneof![
            Just(Operator::Add),
            Just(Operator::Subtract),
            Just(Operator::Multiply),
            Just(Operator::Divide),
        ]
    }

    proptest! {
        #[test]
        fn prop_single_operator_yields_one_matching_operation(
            a in 0u32..100_000,
            b in 0u32..100_000,
            op in operator_strategy(),
            spaced in any::<bool>(),
        ) {
            let text = if spaced {
                format!("{} {} {}", a, op, b)
            } else {
                format!("{}{}{}", a, op, b)
            };
            let ops = decompose(&text).unwrap();
            prop_assert_eq!(ops.len(), 1);
            prop_assert_eq!(ops[0], Operation::new(op, a as f64, b as f64));
        }

        #[test]
        fn prop_trailing_operator_is_rejected(a in 0u32..100_000, op in operator_strategy()) {
            let text = format!("{} {} ", a, op);
            let is_missing_operand = matches!(decompose(&text), Err(ParseError::MissingOperand { .. }));
            prop_assert!(is_missing_operand);
        }
    }
}
