//! End-to-end scenarios across the project facade and the template layer.

use std::path::Path;

use rstest::{fixture, rstest};
use treadle::storage::MemoryStorage;
use treadle::{
    ApplyOutcome, Field, Project, ProjectOptions, RejectAll, StructOptions, Template,
};

fn project_with(storage: MemoryStorage, options: ProjectOptions) -> Project<MemoryStorage> {
    Project::new(storage, options)
}

#[test]
fn struct_is_created_in_a_new_file() {
    let project = project_with(
        MemoryStorage::new(),
        ProjectOptions::default().with_package_name("models"),
    );
    let outcome = project
        .apply_struct(&StructOptions {
            file_name: "models/user.go".into(),
            name: "User".to_owned(),
            fields: vec![Field::new("ID", "string"), Field::new("Name", "string")],
            ..StructOptions::default()
        })
        .expect("apply");

    assert_eq!(outcome, ApplyOutcome::Created);
    assert!(project.storage().matches_bundle(
        "# models/user.go
package models

type User struct {
    ID   string
    Name string
}
"
    ));
}

#[test]
fn preserving_merge_appends_missing_fields_in_order() {
    let storage = MemoryStorage::with_files([(
        "shop/product.go",
        "package shop\n\ntype Product struct {\n\tName  string\n\tPrice float64\n}\n",
    )]);
    let project = project_with(storage, ProjectOptions::default());
    let outcome = project
        .apply_struct(&StructOptions {
            file_name: "shop/product.go".into(),
            name: "Product".to_owned(),
            fields: vec![
                Field::new("Name", "string"),
                Field::new("Price", "float64"),
                Field::new("Stock", "int"),
            ],
            preserve_existing: true,
            ..StructOptions::default()
        })
        .expect("apply");

    assert_eq!(outcome, ApplyOutcome::Modified);
    assert_eq!(
        project.storage().contents("shop/product.go").as_deref(),
        Some("package shop\n\ntype Product struct {\n\tName  string\n\tPrice float64\n\tStock int\n}\n")
    );
}

#[fixture]
fn customer_template() -> Template {
    Template::from_sources([(
        "customer.go",
        "package crm\n\ntype Customer struct {\n\tCustomerID int\n}\n\nfunc lookup(c Customer) int {\n\treturn c.CustomerID\n}\n",
    )])
    .expect("template")
}

#[rstest]
fn renamed_template_extracts_under_new_names(customer_template: Template) {
    let user = customer_template
        .rename_struct("Customer", "User")
        .and_then(|t| t.rename_struct_field("User", "CustomerID", &Field::new("UserID", "")))
        .expect("transform");

    let extracted = user.extract_struct("User").expect("User");
    assert_eq!(extracted.fields, [Field::new("UserID", "int")]);
    assert!(user.extract_struct("Customer").expect_err("gone").is_not_found());

    let helper = user.render(Path::new("customer.go")).expect("render");
    assert!(helper.contains("func lookup(c User) int"));
    assert!(helper.contains("c.UserID"));

    // The source template is still usable for another chain.
    assert!(customer_template.extract_struct("Customer").is_ok());
}

#[test]
fn rejecting_policy_leaves_target_and_no_temp_file() {
    let original = "package shop\n\ntype Product struct {\n\tName string\n}\n";
    let storage = MemoryStorage::with_files([("shop/product.go", original)]);
    let project = project_with(storage, ProjectOptions::default().with_resolver(RejectAll));

    let outcome = project
        .apply_struct(&StructOptions {
            file_name: "shop/product.go".into(),
            name: "Product".to_owned(),
            fields: vec![Field::new("Stock", "int")],
            preserve_existing: true,
            ..StructOptions::default()
        })
        .expect("apply");

    assert_eq!(outcome, ApplyOutcome::Rejected);
    let files = project.storage().snapshot();
    assert_eq!(files.len(), 1);
    assert_eq!(
        files.get(Path::new("shop/product.go")).map(String::as_str),
        Some(original)
    );
}

#[test]
fn extracted_struct_generates_a_derived_file() {
    let template = Template::from_sources([(
        "models.go",
        "package models\n\ntype Account struct {\n\tID    string `json:\"id\"`\n\tEmail string `json:\"email\"`\n}\n",
    )])
    .expect("template");
    let project = project_with(
        MemoryStorage::new(),
        ProjectOptions::default().with_package_name("api"),
    );

    let mut options = template.extract_struct("Account").expect("extract");
    options.file_name = "api/account.go".into();
    project.apply_struct(&options).expect("apply");

    assert_eq!(
        project.storage().contents("api/account.go").as_deref(),
        Some(
            "package api\n\ntype Account struct {\n\tID    string `json:\"id\"`\n\tEmail string `json:\"email\"`\n}\n"
        )
    );
}
