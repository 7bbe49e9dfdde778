//! The §7 error taxonomy as a typed `DiagnosticKind`, one variant per kind,
//! each mapped 1:1 onto one of `hulk-util`'s reserved `E_HULK_*` codes so a
//! diagnostic's code and its kind can never disagree.

use hulk_util::{Diagnostic, DiagnosticCode, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    AlreadyDefined,
    Undefined,
    CircularInheritance,
    ArityMismatch,
    NotAssignable,
    ProtocolInstantiation,
    OverrideMismatch,
    TypeMismatch,
    NonBooleanCondition,
    NonNumericOperand,
    UninferrableType,
    InvalidCallTarget,
    IndexTargetNotVector,
    IndexNotNumber,
    BaseMisuse,
}

impl DiagnosticKind {
    pub fn code(self) -> DiagnosticCode {
        match self {
            DiagnosticKind::AlreadyDefined => DiagnosticCode::E_HULK_ALREADY_DEFINED,
            DiagnosticKind::Undefined => DiagnosticCode::E_HULK_UNDEFINED,
            DiagnosticKind::CircularInheritance => DiagnosticCode::E_HULK_CIRCULAR_INHERITANCE,
            DiagnosticKind::ArityMismatch => DiagnosticCode::E_HULK_ARITY_MISMATCH,
            DiagnosticKind::NotAssignable => DiagnosticCode::E_HULK_NOT_ASSIGNABLE,
            DiagnosticKind::ProtocolInstantiation => DiagnosticCode::E_HULK_PROTOCOL_INSTANTIATION,
            DiagnosticKind::OverrideMismatch => DiagnosticCode::E_HULK_OVERRIDE_MISMATCH,
            DiagnosticKind::TypeMismatch => DiagnosticCode::E_HULK_TYPE_MISMATCH,
            DiagnosticKind::NonBooleanCondition => DiagnosticCode::E_HULK_NON_BOOLEAN_CONDITION,
            DiagnosticKind::NonNumericOperand => DiagnosticCode::E_HULK_NON_NUMERIC_OPERAND,
            DiagnosticKind::UninferrableType => DiagnosticCode::E_HULK_UNINFERRABLE_TYPE,
            DiagnosticKind::InvalidCallTarget => DiagnosticCode::E_HULK_INVALID_CALL_TARGET,
            DiagnosticKind::IndexTargetNotVector => DiagnosticCode::E_HULK_INDEX_TARGET_NOT_VECTOR,
            DiagnosticKind::IndexNotNumber => DiagnosticCode::E_HULK_INDEX_NOT_NUMBER,
            DiagnosticKind::BaseMisuse => DiagnosticCode::E_HULK_BASE_MISUSE,
        }
    }

    pub fn diagnostic(self, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::error(message, span).with_code(self.code())
    }
}
