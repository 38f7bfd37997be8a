//! After a rename no identifier spelled with the old name survives.

use rstest::{fixture, rstest};
use treadle::{Result, SourceSet};
use treadle_syntax::node::{descendants, is_identifier_kind};

const INVENTORY: &str = "package inventory

type Item struct {
\tSKU   string
\tCount int
}

type Quantity = int

const Capacity Quantity = 64

var stock = map[string]*Item{}

func restock(sku string, n Quantity) *Item {
\titem := stock[sku]
\tif item == nil {
\t\titem = &Item{SKU: sku}
\t\tstock[sku] = item
\t}
\tif item.Count+int(n) > int(Capacity) {
\t\treturn item
\t}
\titem.Count += int(n)
\treturn item
}
";

const REPORT: &str = "package inventory

import \"fmt\"

func report(items []*Item) {
\tfor _, item := range items {
\t\tfmt.Println(item.SKU, item.Count, Capacity)
\t}
\t_ = restock(\"x\", Quantity(1))
\t_ = len(stock)
}
";

#[fixture]
fn sources() -> SourceSet {
    SourceSet::from_sources([("inventory.go", INVENTORY), ("report.go", REPORT)]).expect("parse")
}

fn occurrences(sources: &SourceSet, spelling: &str) -> usize {
    sources
        .files()
        .iter()
        .map(|doc| {
            descendants(doc.root_node())
                .into_iter()
                .filter(|node| is_identifier_kind(node.kind()) && doc.text(*node) == spelling)
                .count()
        })
        .sum()
}

#[rstest]
#[case::struct_(SourceSet::rename_struct, "Item", "Product")]
#[case::function(SourceSet::rename_function, "restock", "refill")]
#[case::variable(SourceSet::rename_variable, "stock", "shelf")]
#[case::constant(SourceSet::rename_constant, "Capacity", "Limit")]
#[case::type_(SourceSet::rename_type, "Quantity", "Amount")]
fn no_old_identifier_remains(
    mut sources: SourceSet,
    #[case] rename: fn(&mut SourceSet, &str, &str) -> Result<()>,
    #[case] old: &str,
    #[case] new: &str,
) {
    let before = occurrences(&sources, old);
    assert!(before > 0);

    rename(&mut sources, old, new).expect("rename");

    assert_eq!(occurrences(&sources, old), 0);
    assert_eq!(occurrences(&sources, new), before);
}

#[rstest]
fn field_rename_reaches_keys_and_selectors(mut sources: SourceSet) {
    let field = treadle::Field::new("Code", "");
    sources.rename_struct_field("Item", "SKU", &field).expect("rename");

    assert_eq!(occurrences(&sources, "SKU"), 0);
    let decl = sources.require_struct("Item").expect("Item");
    assert_eq!(decl.field_names(), ["Code", "Count"]);
    let inventory = sources.files().first().expect("file").render();
    assert!(inventory.contains("&Item{Code: sku}"));
}

#[rstest]
fn failed_rename_changes_nothing(mut sources: SourceSet) {
    let before: Vec<String> = sources.files().iter().map(|doc| doc.render()).collect();

    assert!(sources.rename_struct("Missing", "Other").expect_err("absent").is_not_found());
    assert!(sources.rename_function("restock", "report").expect_err("taken").is_duplicate());

    let after: Vec<String> = sources.files().iter().map(|doc| doc.render()).collect();
    assert_eq!(after, before);
}
