//! Filter operators available for each field type.
//!
//! Each field type owns a closed operator enum; [`Operator`] unions them so a
//! filter's operator code can be resolved against its field's type once and
//! then dispatched by pattern match.

use serde::Serialize;

use crate::schema::FieldType;

/// How an operand input should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputHint {
    Text,
    CommaSeparated,
    Regex,
    Date,
}

impl InputHint {
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::CommaSeparated => Some("separate with comma"),
            Self::Regex => Some("enter regex here"),
            Self::Date => Some("YYYYMMDD"),
        }
    }

    pub fn max_length(self) -> Option<usize> {
        match self {
            Self::Date => Some(8),
            _ => None,
        }
    }
}

/// Operand shape of an operator: none, one value, or a `value`/`value1` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    One(InputHint),
    Two(InputHint),
}

impl Operands {
    pub fn count(self) -> u8 {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Two(_) => 2,
        }
    }

    pub fn hint(self) -> Option<InputHint> {
        match self {
            Self::None => None,
            Self::One(hint) | Self::Two(hint) => Some(hint),
        }
    }
}

macro_rules! operator_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($code:literal, $label:literal, $operands:expr)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Operators in presentation order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn operands(self) -> Operands {
                match self {
                    $(Self::$variant => $operands),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.code() == code)
            }
        }
    };
}

use InputHint::{CommaSeparated, Date, Regex, Text};

operator_set! {
    StringOperator {
        Eq => ("eq", "Equal to", Operands::One(Text)),
        Neq => ("neq", "Not equal to", Operands::One(Text)),
        Null => ("nl", "Is null", Operands::None),
        NotNull => ("nnl", "Is not null", Operands::None),
        OneOf => ("iof", "Is one of", Operands::One(CommaSeparated)),
        NotOneOf => ("inof", "Is not one of", Operands::One(CommaSeparated)),
        Matches => ("rgm", "Matches", Operands::One(Regex)),
    }
}

operator_set! {
    IntOperator {
        Eq => ("eq", "Equal to", Operands::One(Text)),
        Neq => ("neq", "Not equal to", Operands::One(Text)),
        Null => ("nl", "Is null", Operands::None),
        NotNull => ("nnl", "Is not null", Operands::None),
        Gt => ("gt", "Greater than", Operands::One(Text)),
        Gte => ("gte", "Greater than or equal to", Operands::One(Text)),
        Lt => ("lt", "Less than", Operands::One(Text)),
        Lte => ("lte", "Less than or equal to", Operands::One(Text)),
        OneOf => ("iof", "Is one of", Operands::One(CommaSeparated)),
        NotOneOf => ("inof", "Is not one of", Operands::One(CommaSeparated)),
        Between => ("btw", "Is between", Operands::Two(Text)),
    }
}

operator_set! {
    BoolOperator {
        Null => ("nl", "Is null", Operands::None),
        NotNull => ("nnl", "Is not null", Operands::None),
        True => ("true", "Is true", Operands::None),
        False => ("false", "Is false", Operands::None),
    }
}

operator_set! {
    DateOperator {
        Eq => ("eq", "Equal to", Operands::One(Text)),
        Neq => ("neq", "Not equal to", Operands::One(Text)),
        SameDay => ("sd", "Is same day as", Operands::One(Date)),
        Before => ("be", "Is before", Operands::One(Date)),
        After => ("af", "Is after", Operands::One(Date)),
        Between => ("btw", "Is between", Operands::Two(Date)),
        Null => ("nl", "Is null", Operands::None),
        NotNull => ("nnl", "Is not null", Operands::None),
    }
}

operator_set! {
    ArrayOperator {
        ContainsString => ("cos", "Contains String", Operands::One(Text)),
        ContainsNumber => ("con", "Contains Number", Operands::One(Text)),
        HasLength => ("hl", "Has length of", Operands::One(Text)),
        NotHasLength => ("dhl", "Doesnt Have length of", Operands::One(Text)),
        LengthGt => ("hlgt", "Has length greater than", Operands::One(Text)),
        LengthGte => ("hlgte", "Has length greater than or equal to", Operands::One(Text)),
        LengthLt => ("hllt", "Has length less than", Operands::One(Text)),
        LengthLte => ("hllte", "Has length less than or equal to", Operands::One(Text)),
    }
}

/// An operator resolved against a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    String(StringOperator),
    Int(IntOperator),
    Bool(BoolOperator),
    Date(DateOperator),
    Array(ArrayOperator),
}

impl Operator {
    /// Resolve an operator code for a field type. Returns None when the code
    /// is not part of that type's operator set.
    pub fn resolve(field_type: FieldType, code: &str) -> Option<Self> {
        match field_type {
            FieldType::String => StringOperator::from_code(code).map(Self::String),
            FieldType::Int => IntOperator::from_code(code).map(Self::Int),
            FieldType::Bool => BoolOperator::from_code(code).map(Self::Bool),
            FieldType::Date => DateOperator::from_code(code).map(Self::Date),
            FieldType::Array => ArrayOperator::from_code(code).map(Self::Array),
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            Self::String(_) => FieldType::String,
            Self::Int(_) => FieldType::Int,
            Self::Bool(_) => FieldType::Bool,
            Self::Date(_) => FieldType::Date,
            Self::Array(_) => FieldType::Array,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::String(op) => op.code(),
            Self::Int(op) => op.code(),
            Self::Bool(op) => op.code(),
            Self::Date(op) => op.code(),
            Self::Array(op) => op.code(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::String(op) => op.label(),
            Self::Int(op) => op.label(),
            Self::Bool(op) => op.label(),
            Self::Date(op) => op.label(),
            Self::Array(op) => op.label(),
        }
    }

    pub fn operands(self) -> Operands {
        match self {
            Self::String(op) => op.operands(),
            Self::Int(op) => op.operands(),
            Self::Bool(op) => op.operands(),
            Self::Date(op) => op.operands(),
            Self::Array(op) => op.operands(),
        }
    }

    pub fn operand_count(self) -> u8 {
        self.operands().count()
    }

    pub fn info(self) -> OperatorInfo {
        OperatorInfo {
            code: self.code(),
            label: self.label(),
            operand_count: self.operand_count(),
            hint: self.operands().hint(),
        }
    }
}

/// Catalog entry describing one operator for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorInfo {
    pub code: &'static str,
    pub label: &'static str,
    pub operand_count: u8,
    pub hint: Option<InputHint>,
}

/// Operators for a field type, in presentation order.
pub fn operators_for(field_type: FieldType) -> Vec<OperatorInfo> {
    match field_type {
        FieldType::String => StringOperator::ALL
            .iter()
            .map(|op| Operator::String(*op).info())
            .collect(),
        FieldType::Int => IntOperator::ALL
            .iter()
            .map(|op| Operator::Int(*op).info())
            .collect(),
        FieldType::Bool => BoolOperator::ALL
            .iter()
            .map(|op| Operator::Bool(*op).info())
            .collect(),
        FieldType::Date => DateOperator::ALL
            .iter()
            .map(|op| Operator::Date(*op).info())
            .collect(),
        FieldType::Array => ArrayOperator::ALL
            .iter()
            .map(|op| Operator::Array(*op).info())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(field_type: FieldType) -> Vec<&'static str> {
        operators_for(field_type).iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_operator_sets_per_type() {
        assert_eq!(
            codes(FieldType::String),
            vec!["eq", "neq", "nl", "nnl", "iof", "inof", "rgm"]
        );
        assert_eq!(
            codes(FieldType::Int),
            vec!["eq", "neq", "nl", "nnl", "gt", "gte", "lt", "lte", "iof", "inof", "btw"]
        );
        assert_eq!(codes(FieldType::Bool), vec!["nl", "nnl", "true", "false"]);
        assert_eq!(
            codes(FieldType::Date),
            vec!["eq", "neq", "sd", "be", "af", "btw", "nl", "nnl"]
        );
        assert_eq!(
            codes(FieldType::Array),
            vec!["cos", "con", "hl", "dhl", "hlgt", "hlgte", "hllt", "hllte"]
        );
    }

    #[test]
    fn test_operand_counts() {
        let btw = Operator::resolve(FieldType::Int, "btw").unwrap();
        assert_eq!(btw.operand_count(), 2);
        let nl = Operator::resolve(FieldType::String, "nl").unwrap();
        assert_eq!(nl.operand_count(), 0);
        assert_eq!(nl.info().hint, None);
        let sd = Operator::resolve(FieldType::Date, "sd").unwrap();
        assert_eq!(sd.operands(), Operands::One(InputHint::Date));
        assert_eq!(InputHint::Date.max_length(), Some(8));
    }

    #[test]
    fn test_resolve_rejects_foreign_operator() {
        assert_eq!(Operator::resolve(FieldType::String, "gt"), None);
        assert_eq!(Operator::resolve(FieldType::Bool, "eq"), None);
        assert_eq!(Operator::resolve(FieldType::Array, "nl"), None);
        assert_eq!(
            Operator::resolve(FieldType::Bool, "true"),
            Some(Operator::Bool(BoolOperator::True))
        );
    }

    #[test]
    fn test_field_type_round_trip() {
        for field_type in FieldType::ALL {
            for info in operators_for(field_type) {
                let op = Operator::resolve(field_type, info.code).unwrap();
                assert_eq!(op.field_type(), field_type);
                assert_eq!(op.label(), info.label);
            }
        }
    }
}
