use std::{fs, path::Path};

use cfgdump::{
    IdService,
    xml::{Element, parse_document, read_localized},
};
use superbuild::{collect::ProjectCollector, ctx::AppContext};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn sample_project(default_language: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "project.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <name>Demo</name>
    <synonym><localised-string><language id="en">Demo app</language></localised-string></synonym>
    <comment/>
    <vendor>ACME</vendor>
    <dev-version>1.0.0</dev-version>
    <platform-version>Version8_3_18</platform-version>
    <update-address>http://example.com/updates</update-address>
    <default-language>{default_language}</default-language>
    <languages>
        <include>English.xml</include>
        <include>Russian.xml</include>
    </languages>
    <catalogs><include>Goods.xml</include></catalogs>
    <documents><include>Order.xml</include></documents>
</project>"#
        ),
    );
    write(
        root,
        "Languages/English.xml",
        r#"<language-definition><id>English</id><code>en</code></language-definition>"#,
    );
    write(
        root,
        "Languages/Russian.xml",
        r#"<language-definition><id>Russian</id><code>ru</code></language-definition>"#,
    );
    write(
        root,
        "Catalogs/Goods.xml",
        r#"<catalog>
    <id>Goods</id>
    <synonym><localised-string>
        <language id="en">Item</language>
        <language id="ru">Элемент</language>
    </localised-string></synonym>
    <version>goods-v1</version>
    <properties>
        <property id="Title"><type id="std::string" length="150" variable="true"/></property>
    </properties>
</catalog>"#,
    );
    write(
        root,
        "Documents/Order.xml",
        r#"<document>
    <id>Order</id>
    <properties>
        <property id="Item"><type id="std::CatalogRef::Goods"/></property>
    </properties>
    <tabular-sections>
        <tabular-section id="Lines">
            <columns>
                <column id="Qty"><type id="std::int" length="9" onlyPositive="false"/></column>
            </columns>
        </tabular-section>
    </tabular-sections>
</document>"#,
    );
    dir
}

fn read(path: &Path) -> Element {
    parse_document(&fs::read_to_string(path).unwrap())
        .unwrap()
        .root
}

#[test]
fn full_dump_on_disk() {
    let project = sample_project("English");
    let output = TempDir::new().unwrap();

    let mut ctx = AppContext::new(project.path(), output.path());
    ctx.seed = Some(5);
    let report = ctx.run().unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.files.len(), 6);

    let out = output.path();
    for rel in [
        "Configuration.xml",
        "ConfigDumpInfo.xml",
        "Languages/English.xml",
        "Languages/Russian.xml",
        "Catalogs/Goods.xml",
        "Documents/Order.xml",
    ] {
        assert!(out.join(rel).is_file(), "{rel} missing");
    }

    let goods = read(&out.join("Catalogs/Goods.xml"));
    let catalog = goods.child("Catalog").unwrap();
    assert_eq!(
        catalog.attr("uuid").unwrap(),
        IdService::new().identifier_for("Catalog.Goods").to_string()
    );
    let synonym = read_localized(catalog.child("Properties").unwrap().child("Synonym").unwrap());
    assert_eq!(synonym.get("en").map(String::as_str), Some("Item"));

    let order = read(&out.join("Documents/Order.xml"));
    let item_type = order
        .find_all("Attribute")
        .into_iter()
        .find(|a| a.child("Properties").unwrap().child_text("Name") == "Item")
        .unwrap()
        .find_all("v8:Type")[0]
        .text()
        .to_string();
    assert_eq!(item_type, "cfg:CatalogRef.Goods");

    let configuration = read(&out.join("Configuration.xml"));
    let props = configuration
        .child("Configuration")
        .unwrap()
        .child("Properties")
        .unwrap();
    assert_eq!(props.child_text("DefaultLanguage"), "Language.English");
    assert_eq!(props.child_text("CompatibilityMode"), "Version8_3_18");

    let ledger = read(&out.join("ConfigDumpInfo.xml"));
    let goods_entry = ledger
        .find_all("Metadata")
        .into_iter()
        .find(|m| m.attr("name") == Some("Catalog.Goods"))
        .unwrap();
    assert_eq!(goods_entry.attr("configVersion"), Some("goods-v1"));
    assert_eq!(ledger.find_all("Metadata").len(), 9);
}

#[test]
fn options_file_changes_output() {
    let project = sample_project("English");
    write(
        project.path(),
        ".superbuild.toml",
        "extension = \"mdo\"\nledger_file = \"Versions\"\nformat_version = \"2.17\"\n",
    );
    let output = TempDir::new().unwrap();

    AppContext::new(project.path(), output.path()).run().unwrap();

    let ledger = read(&output.path().join("Versions.mdo"));
    assert_eq!(ledger.attr("version"), Some("2.17"));
    assert!(output.path().join("Catalogs/Goods.mdo").is_file());
    assert!(!output.path().join("Configuration.xml").exists());
}

#[test]
fn seeded_runs_are_identical() {
    let project = sample_project("English");
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();

    for out in [&a, &b] {
        let mut ctx = AppContext::new(project.path(), out.path());
        ctx.seed = Some(11);
        ctx.run().unwrap();
    }

    for rel in ["Catalogs/Goods.xml", "Documents/Order.xml", "ConfigDumpInfo.xml"] {
        assert_eq!(
            fs::read_to_string(a.path().join(rel)).unwrap(),
            fs::read_to_string(b.path().join(rel)).unwrap(),
            "{rel} differs"
        );
    }
}

#[test]
fn missing_default_language_falls_back() {
    let project = sample_project("French");
    let output = TempDir::new().unwrap();
    let report = AppContext::new(project.path(), output.path()).run().unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("French"));
    let configuration = read(&output.path().join("Configuration.xml"));
    assert_eq!(
        configuration
            .child("Configuration")
            .unwrap()
            .child("Properties")
            .unwrap()
            .child_text("DefaultLanguage"),
        "Language.English"
    );
}

#[test]
fn missing_include_names_the_file() {
    let project = sample_project("English");
    fs::remove_file(project.path().join("Catalogs/Goods.xml")).unwrap();

    let err = ProjectCollector::new(project.path()).collect().unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Goods.xml"), "{message}");
}

#[test]
fn wrong_root_element_is_fatal() {
    let project = sample_project("English");
    write(
        project.path(),
        "Documents/Order.xml",
        "<catalog><id>Order</id></catalog>",
    );
    let err = ProjectCollector::new(project.path()).collect().unwrap_err();
    assert!(err.to_string().contains("<document>"));
}

#[test]
fn missing_project_file_is_fatal() {
    let empty = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let err = AppContext::new(empty.path(), output.path())
        .run()
        .unwrap_err();
    assert!(format!("{err:#}").contains("project.xml"));
}

#[test]
fn unnamed_catalog_names_the_file() {
    let project = sample_project("English");
    write(
        project.path(),
        "Catalogs/Goods.xml",
        "<catalog><id>  </id></catalog>",
    );
    let err = ProjectCollector::new(project.path()).collect().unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Goods.xml"), "{message}");
    assert!(message.contains("<id>"), "{message}");
}

#[test]
fn ledger_named_configuration_is_rejected() {
    let project = sample_project("English");
    write(
        project.path(),
        ".superbuild.toml",
        "ledger_file = \"Configuration\"\n",
    );
    let output = TempDir::new().unwrap();
    let err = AppContext::new(project.path(), output.path())
        .run()
        .unwrap_err();
    assert!(format!("{err:#}").contains("ledger_file"), "{err:#}");
    assert!(!output.path().join("Configuration.xml").exists());
}

#[test]
fn padded_comment_is_kept() {
    let project = sample_project("English");
    write(
        project.path(),
        "Catalogs/Goods.xml",
        "<catalog><id>Goods</id><comment>  kept as typed </comment></catalog>",
    );
    let output = TempDir::new().unwrap();
    AppContext::new(project.path(), output.path()).run().unwrap();

    let goods = read(&output.path().join("Catalogs/Goods.xml"));
    let props = goods.child("Catalog").unwrap().child("Properties").unwrap();
    assert_eq!(props.child_text("Comment"), "  kept as typed ");
}
