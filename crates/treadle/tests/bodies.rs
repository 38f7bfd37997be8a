//! Function and method bodies survive extraction and application byte for
//! byte, including multi-line raw string literals.

use std::path::PathBuf;

use rstest::rstest;
use treadle::storage::MemoryStorage;
use treadle::{ApplyOutcome, FunctionOptions, MethodOptions, Project, ProjectOptions, Template};

const QUERY: &str = "package store

func Query() string {
\tq := `SELECT *
FROM users
  WHERE id = 1`
\treturn q
}
";

const SCHEMA: &str = "package store\n\ntype Repo struct{}\n\n\
func (r *Repo) Schema() string {\n\treturn `\n  CREATE TABLE users (\n\tid INT  \n  )`\n}\n";

fn project(storage: MemoryStorage) -> Project<MemoryStorage> {
    Project::new(storage, ProjectOptions::default().with_package_name("store"))
}

fn extracted_function() -> FunctionOptions {
    let template = Template::from_sources([("query.go", QUERY)]).expect("parse");
    FunctionOptions {
        file_name: PathBuf::from("store/query.go"),
        ..template.extract_function("Query").expect("Query")
    }
}

fn extracted_method() -> MethodOptions {
    let template = Template::from_sources([("repo.go", SCHEMA)]).expect("parse");
    MethodOptions {
        file_name: PathBuf::from("store/repo.go"),
        ..template.extract_method("Repo", "Schema").expect("Schema")
    }
}

#[test]
fn extracted_body_is_dedented_outside_literals() {
    assert_eq!(
        extracted_function().body,
        "q := `SELECT *\nFROM users\n  WHERE id = 1`\nreturn q"
    );
    assert_eq!(
        extracted_method().body,
        "return `\n  CREATE TABLE users (\n\tid INT  \n  )`"
    );
}

#[test]
fn extracted_function_recreates_the_file() {
    let project = project(MemoryStorage::new());
    let outcome = project.apply_function(&extracted_function()).expect("apply");

    assert_eq!(outcome, ApplyOutcome::Created);
    assert_eq!(project.storage().contents("store/query.go").as_deref(), Some(QUERY));
}

#[test]
fn reapplying_an_extracted_function_changes_nothing() {
    let storage = MemoryStorage::from_bundle(&format!("# store/query.go\n{QUERY}"));
    assert_eq!(storage.contents("store/query.go").as_deref(), Some(QUERY));
    let project = project(storage);
    let outcome = project.apply_function(&extracted_function()).expect("apply");

    assert_eq!(outcome, ApplyOutcome::NoChanges);
    assert_eq!(project.storage().contents("store/query.go").as_deref(), Some(QUERY));
}

#[rstest]
#[case::older_body("\treturn `CREATE TABLE users ()`")]
#[case::plain_body("\treturn \"\"")]
fn replaced_method_keeps_literal_bytes(#[case] previous: &str) {
    let existing = format!(
        "package store\n\ntype Repo struct{{}}\n\nfunc (r *Repo) Schema() string {{\n{previous}\n}}\n"
    );
    let project = project(MemoryStorage::with_files([("store/repo.go", existing.as_str())]));
    let outcome = project.apply_method(&extracted_method()).expect("apply");

    assert_eq!(outcome, ApplyOutcome::Modified);
    assert_eq!(project.storage().contents("store/repo.go").as_deref(), Some(SCHEMA));
}

#[test]
fn unevenly_indented_bodies_keep_their_relative_layout() {
    let project = project(MemoryStorage::new());
    let options = FunctionOptions {
        file_name: PathBuf::from("store/render.go"),
        name: "Render".to_owned(),
        return_type: "string".to_owned(),
        body: "if debug {\n\treturn `<pre>\n  raw\n</pre>`\n}\nreturn \"\"".to_owned(),
        ..FunctionOptions::default()
    };
    project.apply_function(&options).expect("apply");

    let written = project.storage().contents("store/render.go").expect("written");
    assert_eq!(
        written,
        "package store\n\nfunc Render() string {\n\tif debug {\n\t\treturn `<pre>\n  raw\n</pre>`\n\t}\n\treturn \"\"\n}\n"
    );

    let template = Template::from_sources([("render.go", written.as_str())]).expect("parse");
    assert_eq!(template.extract_function("Render").expect("Render").body, options.body);
}
