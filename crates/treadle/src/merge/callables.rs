//! Function and method reconciliation.
//!
//! A spec naming an existing function (or method on the same receiver type)
//! replaces that declaration in place, keeping its doc comment. Anything else
//! is appended.

use tracing::debug;
use treadle_syntax::{Document, TextEdit};

use super::{MERGE_TARGET, append};
use crate::codegen::{self, Signature};
use crate::edits;
use crate::error::Result;
use crate::model::{Declaration, FunctionDecl, base_type_name, declarations};
use crate::spec::{CallableForm, CallableSpec};

/// Finds the declaration `spec` targets.
fn find(doc: &Document, spec: &CallableSpec) -> Option<FunctionDecl> {
    declarations(doc).into_iter().find_map(|decl| match (decl, &spec.receiver) {
        (Declaration::Function(found), None) if found.name == spec.name => Some(found),
        (Declaration::Method(found), Some(receiver))
            if found.name == spec.name
                && found
                    .receiver
                    .as_ref()
                    .is_some_and(|r| r.base_type() == base_type_name(&receiver.type_expr)) =>
        {
            Some(found)
        }
        _ => None,
    })
}

/// Renders the declaration `spec` describes.
pub(crate) fn render(spec: &CallableSpec) -> String {
    let receiver = spec
        .receiver
        .as_ref()
        .map(|r| (r.name.as_str(), r.type_expr.as_str()));
    match &spec.form {
        CallableForm::Structured {
            parameters,
            result,
            body,
        } => codegen::function_declaration(
            Signature {
                receiver,
                name: &spec.name,
                parameters,
                result: result.as_deref(),
            },
            body,
        ),
        CallableForm::Raw(rest) => codegen::raw_function_declaration(receiver, &spec.name, rest),
    }
}

pub(super) fn reconcile(doc: &mut Document, spec: &CallableSpec) -> Result<()> {
    let rendered = render(spec);
    let Some(existing) = find(doc, spec) else {
        debug!(
            target: MERGE_TARGET,
            file = %doc.path().display(),
            name = %spec.name,
            "appending new function"
        );
        return append(doc, &rendered);
    };
    if doc.source().get(existing.span.clone()) == Some(rendered.as_str()) {
        return Ok(());
    }
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name = %spec.name,
        "replacing existing function"
    );
    edits::apply(doc, &[TextEdit::replace(existing.span, rendered)])?;
    Ok(())
}
