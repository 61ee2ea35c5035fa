//! Mapping from node type tokens to target type annotations.
//!
//! Nodes store their declared type as a token (`number`, `string`,
//! `boolean`, `infer`) plus an `array` flag. [`annotation`] turns that pair
//! into an optional [`TypeAnnotation`]; `infer` means "no annotation".

use nodecode_core::NodeId;

use crate::ast::{KeywordType, TypeAnnotation};
use crate::diagnostics::Diagnostic;

/// Token meaning "let the target language infer the type".
pub const INFER: &str = "infer";

/// Looks up the keyword type for a token. `Ok(None)` for `infer`.
pub fn keyword(node: NodeId, token: &str) -> Result<Option<KeywordType>, Diagnostic> {
    let keyword = match token {
        "number" => KeywordType::Number,
        "string" => KeywordType::String,
        "boolean" => KeywordType::Boolean,
        INFER => return Ok(None),
        other => {
            return Err(Diagnostic::UnknownType {
                node,
                type_name: other.to_string(),
            })
        }
    };
    Ok(Some(keyword))
}

/// Maps a node's type token and array flag to an optional annotation.
pub fn annotation(
    node: NodeId,
    token: &str,
    array: bool,
) -> Result<Option<TypeAnnotation>, Diagnostic> {
    Ok(keyword(node, token)?.map(|keyword| TypeAnnotation { keyword, array }))
}

/// Like [`annotation`], but the type must be concrete.
///
/// Parameters always need an explicit type, so `infer` is reported as an
/// unknown type for them.
pub fn required_annotation(
    node: NodeId,
    token: &str,
    array: bool,
) -> Result<TypeAnnotation, Diagnostic> {
    annotation(node, token, array)?.ok_or_else(|| Diagnostic::UnknownType {
        node,
        type_name: token.to_string(),
    })
}
