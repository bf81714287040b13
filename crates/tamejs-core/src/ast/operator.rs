//! JavaScript operators with their syntactic class and precedence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    Prefix,
    Postfix,
    Infix,
    /// Operand followed by a bracketed list: `a[b]`, `f(x)`.
    Bracket,
    Ternary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Associativity {
    Left,
    Right,
}

macro_rules! define_operators {
    ( $( $variant:ident => ($ty:ident, $prec:expr, $assoc:ident, $sym:expr) ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Operator {
            $( $variant, )*
        }

        impl Operator {
            pub const ALL: &'static [Operator] = &[ $( Operator::$variant, )* ];

            pub fn op_type(self) -> OperatorType {
                match self {
                    $( Operator::$variant => OperatorType::$ty, )*
                }
            }

            /// Binding strength; lower binds tighter.
            pub fn precedence(self) -> u8 {
                match self {
                    $( Operator::$variant => $prec, )*
                }
            }

            pub fn associativity(self) -> Associativity {
                match self {
                    $( Operator::$variant => Associativity::$assoc, )*
                }
            }

            pub fn symbol(self) -> &'static str {
                match self {
                    $( Operator::$variant => $sym, )*
                }
            }
        }
    };
}

define_operators! {
    SquareBracket     => (Bracket, 1, Left, "[]"),
    MemberAccess      => (Infix, 1, Left, "."),
    Construct         => (Prefix, 1, Right, "new"),
    FunctionCall      => (Bracket, 2, Left, "()"),
    PostIncrement     => (Postfix, 3, Left, "++"),
    PostDecrement     => (Postfix, 3, Left, "--"),
    Delete            => (Prefix, 4, Right, "delete"),
    Void              => (Prefix, 4, Right, "void"),
    Typeof            => (Prefix, 4, Right, "typeof"),
    PreIncrement      => (Prefix, 4, Right, "++"),
    PreDecrement      => (Prefix, 4, Right, "--"),
    Identity          => (Prefix, 4, Right, "+"),
    Negation          => (Prefix, 4, Right, "-"),
    Inverse           => (Prefix, 4, Right, "~"),
    Not               => (Prefix, 4, Right, "!"),
    Multiplication    => (Infix, 5, Left, "*"),
    Division          => (Infix, 5, Left, "/"),
    Modulus           => (Infix, 5, Left, "%"),
    Addition          => (Infix, 6, Left, "+"),
    Subtraction       => (Infix, 6, Left, "-"),
    LeftShift         => (Infix, 7, Left, "<<"),
    RightShift        => (Infix, 7, Left, ">>"),
    UnsignedRightShift => (Infix, 7, Left, ">>>"),
    LessThan          => (Infix, 8, Left, "<"),
    GreaterThan       => (Infix, 8, Left, ">"),
    LessEquals        => (Infix, 8, Left, "<="),
    GreaterEquals     => (Infix, 8, Left, ">="),
    InstanceOf        => (Infix, 8, Left, "instanceof"),
    In                => (Infix, 8, Left, "in"),
    Equal             => (Infix, 9, Left, "=="),
    NotEqual          => (Infix, 9, Left, "!="),
    StrictlyEqual     => (Infix, 9, Left, "==="),
    StrictlyNotEqual  => (Infix, 9, Left, "!=="),
    BitwiseAnd        => (Infix, 10, Left, "&"),
    BitwiseXor        => (Infix, 11, Left, "^"),
    BitwiseOr         => (Infix, 12, Left, "|"),
    LogicalAnd        => (Infix, 13, Left, "&&"),
    LogicalOr         => (Infix, 14, Left, "||"),
    Ternary           => (Ternary, 15, Right, "?:"),
    Assign            => (Infix, 16, Right, "="),
    AssignMul         => (Infix, 16, Right, "*="),
    AssignDiv         => (Infix, 16, Right, "/="),
    AssignMod         => (Infix, 16, Right, "%="),
    AssignSum         => (Infix, 16, Right, "+="),
    AssignSub         => (Infix, 16, Right, "-="),
    AssignLsh         => (Infix, 16, Right, "<<="),
    AssignRsh         => (Infix, 16, Right, ">>="),
    AssignUsh         => (Infix, 16, Right, ">>>="),
    AssignAnd         => (Infix, 16, Right, "&="),
    AssignXor         => (Infix, 16, Right, "^="),
    AssignOr          => (Infix, 16, Right, "|="),
    Comma             => (Infix, 17, Left, ","),
}

impl Operator {
    /// Look up an operator by its source symbol within one syntactic class.
    pub fn lookup(symbol: &str, op_type: OperatorType) -> Option<Operator> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.op_type() == op_type && op.symbol() == symbol)
    }

    pub fn is_assignment(self) -> bool {
        self.precedence() == Operator::Assign.precedence()
    }

    /// For compound assignments, the binary operator applied before storing.
    pub fn assignment_delegate(self) -> Option<Operator> {
        match self {
            Operator::AssignMul => Some(Operator::Multiplication),
            Operator::AssignDiv => Some(Operator::Division),
            Operator::AssignMod => Some(Operator::Modulus),
            Operator::AssignSum => Some(Operator::Addition),
            Operator::AssignSub => Some(Operator::Subtraction),
            Operator::AssignLsh => Some(Operator::LeftShift),
            Operator::AssignRsh => Some(Operator::RightShift),
            Operator::AssignUsh => Some(Operator::UnsignedRightShift),
            Operator::AssignAnd => Some(Operator::BitwiseAnd),
            Operator::AssignXor => Some(Operator::BitwiseXor),
            Operator::AssignOr => Some(Operator::BitwiseOr),
            _ => None,
        }
    }

    /// Symbol that opens a bracket operator's operand list.
    pub fn opening_symbol(self) -> &'static str {
        match self {
            Operator::SquareBracket => "[",
            Operator::FunctionCall => "(",
            other => other.symbol(),
        }
    }

    pub fn closing_symbol(self) -> &'static str {
        match self {
            Operator::SquareBracket => "]",
            Operator::FunctionCall => ")",
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_prefix_and_infix() {
        assert_eq!(Operator::lookup("-", OperatorType::Prefix), Some(Operator::Negation));
        assert_eq!(Operator::lookup("-", OperatorType::Infix), Some(Operator::Subtraction));
        assert_eq!(Operator::lookup("++", OperatorType::Postfix), Some(Operator::PostIncrement));
        assert_eq!(Operator::lookup("=>", OperatorType::Infix), None);
    }

    #[test]
    fn compound_assignments_delegate() {
        assert!(Operator::AssignSum.is_assignment());
        assert_eq!(Operator::AssignSum.assignment_delegate(), Some(Operator::Addition));
        assert_eq!(Operator::Assign.assignment_delegate(), None);
        assert!(!Operator::Comma.is_assignment());
    }
}
