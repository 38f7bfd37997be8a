//! Struct reconciliation.

use tracing::debug;
use treadle_syntax::Document;

use super::{MERGE_TARGET, append};
use crate::codegen;
use crate::error::Result;
use crate::model::{Declaration, StructDecl, declarations};
use crate::spec::{StructBody, StructSpec};
use crate::structs as body;

fn find(doc: &Document, name: &str) -> Option<StructDecl> {
    declarations(doc).into_iter().find_map(|decl| match decl {
        Declaration::Struct(found) if found.name == name => Some(found),
        _ => None,
    })
}

pub(super) fn reconcile(doc: &mut Document, spec: &StructSpec) -> Result<()> {
    let Some(existing) = find(doc, &spec.name) else {
        let mut items = Vec::new();
        apply_body(&mut items, &spec.body)?;
        debug!(
            target: MERGE_TARGET,
            file = %doc.path().display(),
            name = %spec.name,
            "appending new struct"
        );
        return append(doc, &codegen::struct_declaration(&spec.name, None, &items));
    };

    let current = body::current_items(doc, &existing)?;
    let mut items = current.clone();
    apply_body(&mut items, &spec.body)?;
    if items == current {
        return Ok(());
    }
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name = %spec.name,
        "reconciling struct fields"
    );
    body::rewrite(doc, &existing, &items)?;
    Ok(())
}

fn apply_body(items: &mut Vec<codegen::BodyItem>, spec: &StructBody) -> Result<()> {
    match spec {
        StructBody::Fields {
            ensure,
            delete,
            preserve_existing,
        } => body::apply_fields(items, ensure, delete, *preserve_existing),
        StructBody::Raw(content) => body::merge_raw(items, body::raw_items(content)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use crate::merge::reconcile;
    use crate::model::{Declaration, declarations};
    use crate::spec::{DeclarationSpec, Field, StructBody, StructSpec};
    use treadle_syntax::Document;

    const PRODUCT: &str =
        "package shop\n\ntype Product struct {\n\tName  string\n\tPrice float64 // in cents\n}\n";

    fn merged_fields(body: StructBody) -> Vec<String> {
        let spec = DeclarationSpec::Struct(StructSpec {
            name: "Product".to_owned(),
            body,
        });
        let outcome =
            reconcile(Some(PRODUCT), Path::new("shop.go"), &spec, "shop").expect("merge");
        let doc = Document::parse("shop.go", outcome.content).expect("valid output");
        declarations(&doc)
            .into_iter()
            .find_map(|decl| match decl {
                Declaration::Struct(s) => Some(s),
                _ => None,
            })
            .expect("struct")
            .fields
            .into_iter()
            .map(|field| field.name)
            .collect()
    }

    fn fields(names: &[&str]) -> Vec<Field> {
        names.iter().map(|name| Field::new(*name, "int")).collect()
    }

    #[rstest]
    #[case::preserve(&["Name", "Stock"], &[], true, &["Name", "Price", "Stock"])]
    #[case::replace(&["Stock"], &[], false, &["Stock"])]
    #[case::preserve_and_delete(&["Stock"], &["Price"], true, &["Name", "Stock"])]
    #[case::delete_without_preserve(&["Stock"], &["Name"], false, &["Price", "Stock"])]
    #[case::ensure_then_delete(&["Stock"], &["Stock"], true, &["Name", "Price"])]
    fn field_set_follows_merge_rules(
        #[case] ensure: &[&str],
        #[case] delete: &[&str],
        #[case] preserve_existing: bool,
        #[case] expected: &[&str],
    ) {
        let result = merged_fields(StructBody::Fields {
            ensure: fields(ensure),
            delete: delete.iter().map(|name| (*name).to_owned()).collect(),
            preserve_existing,
        });
        assert_eq!(result, expected);
    }

    #[test]
    fn raw_content_merges_into_existing_struct() {
        let result = merged_fields(StructBody::Raw("Price int\nSKU string".to_owned()));
        assert_eq!(result, vec!["Name", "Price", "SKU"]);
    }

    #[test]
    fn untouched_fields_keep_their_comments() {
        let spec = DeclarationSpec::Struct(StructSpec {
            name: "Product".to_owned(),
            body: StructBody::Fields {
                ensure: vec![Field::new("Stock", "int")],
                delete: Vec::new(),
                preserve_existing: true,
            },
        });
        let outcome = reconcile(Some(PRODUCT), Path::new("shop.go"), &spec, "shop").expect("merge");
        assert_eq!(
            outcome.content,
            "package shop\n\ntype Product struct {\n\tName  string\n\tPrice float64 // in cents\n\tStock int\n}\n"
        );
    }
}
