//! Reads a declarative project directory into a [`ConfigTree`].
//!
//! # Project layout
//!
//! ```text
//! <root>/project.xml
//! <root>/Languages/<include>.xml    <language-definition>
//! <root>/Catalogs/<include>.xml     <catalog>
//! <root>/Documents/<include>.xml    <document>
//! ```
//!
//! `project.xml` names the configuration and lists the files to include
//! under `<languages>`, `<catalogs>` and `<documents>`. Included files are
//! processed in listing order, which is also the order of the dump.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use cfgdump::{
    tree::{
        Category, ConfigTree, ConfigurationProps, NodeId, NodeInfo, ObjectKind, PropertyList,
        Synonym, TabularSpec, TabularsList,
    },
    typing::TypeDescriptor,
    xml::{Element, parse_document},
};

/// File name of the project description inside the project root.
pub const PROJECT_FILE: &str = "project.xml";

/// Builds a configuration tree from a project directory.
pub struct ProjectCollector {
    root: PathBuf,
}

impl ProjectCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads `project.xml` and every file it includes.
    ///
    /// # Errors
    ///
    /// Fails when a file is missing or unreadable, when a file's root
    /// element is not the expected one, or when the resulting tree would
    /// contain two nodes with the same qualified name. The error context
    /// names the file involved.
    pub fn collect(&self) -> anyhow::Result<ConfigTree> {
        let project_path = self.root.join(PROJECT_FILE);
        let project = load(&project_path, "project")?;

        let name = project.child_text("name").trim();
        if name.is_empty() {
            bail!("{}: <name> is missing or empty", project_path.display());
        }
        let props = ConfigurationProps {
            vendor: project.child_text("vendor").to_string(),
            dev_version: project.child_text("dev-version").to_string(),
            platform_version: project.child_text("platform-version").to_string(),
            update_address: project.child_text("update-address").to_string(),
            default_language: project.child_text("default-language").trim().to_string(),
        };
        let mut tree = ConfigTree::new(node_info(&project, name)?, props);
        info!("collecting project `{name}` from {}", self.root.display());

        for (path, language) in self.includes(&project, Category::Language)? {
            collect_language(&mut tree, &language)
                .with_context(|| format!("while adding {}", path.display()))?;
        }

        for (category, kind) in [
            (Category::Catalog, ObjectKind::Catalog),
            (Category::Document, ObjectKind::Document),
        ] {
            for (path, object) in self.includes(&project, category)? {
                collect_object(&mut tree, kind, &object)
                    .with_context(|| format!("while adding {}", path.display()))?;
            }
        }

        info!(
            "collected {} languages, {} catalogs, {} documents ({} nodes)",
            tree.languages().len(),
            tree.catalogs().len(),
            tree.documents().len(),
            tree.len()
        );
        Ok(tree)
    }

    // Loads every file listed under the category's section of project.xml.
    fn includes(&self, project: &Element, category: Category) -> anyhow::Result<Vec<(PathBuf, Element)>> {
        let (section, root_tag) = match category {
            Category::Language => ("languages", "language-definition"),
            Category::Catalog => ("catalogs", "catalog"),
            Category::Document => ("documents", "document"),
            _ => return Ok(Vec::new()),
        };
        let Some(dir) = category.directory() else {
            return Ok(Vec::new());
        };
        let Some(list) = project.child(section) else {
            return Ok(Vec::new());
        };

        list.children_named("include")
            .map(|include| -> anyhow::Result<(PathBuf, Element)> {
                let path = self.root.join(dir).join(include.text().trim());
                debug!("include {}", path.display());
                let element = load(&path, root_tag)?;
                Ok((path, element))
            })
            .collect()
    }
}

fn load(path: &Path, root_tag: &str) -> anyhow::Result<Element> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document =
        parse_document(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    if document.root.name != root_tag {
        bail!(
            "{}: expected root element <{root_tag}>, found <{}>",
            path.display(),
            document.root.name
        );
    }
    Ok(document.root)
}

fn collect_language(tree: &mut ConfigTree, language: &Element) -> anyhow::Result<NodeId> {
    let info = node_info(language, language.child_text("id"))?;
    Ok(tree.add_language(info, language.child_text("code").trim())?)
}

fn collect_object(tree: &mut ConfigTree, kind: ObjectKind, object: &Element) -> anyhow::Result<NodeId> {
    let id = tree.add_object(kind, node_info(object, object.child_text("id"))?)?;

    let mut properties = PropertyList::new();
    for property in members(object, "properties", "property") {
        properties.push(member_info(property)?, type_of(property));
    }
    tree.attach_properties(id, properties)?;

    let mut sections = TabularsList::new();
    for section in members(object, "tabular-sections", "tabular-section") {
        let mut spec = TabularSpec::new(member_info(section)?);
        for column in members(section, "columns", "column") {
            spec = spec.column(member_info(column)?, type_of(column));
        }
        sections.push(spec);
    }
    tree.attach_tabular_sections(id, sections)?;

    Ok(id)
}

fn members<'a>(owner: &'a Element, list: &'a str, item: &'a str) -> impl Iterator<Item = &'a Element> {
    owner
        .child(list)
        .into_iter()
        .flat_map(move |l| l.children_named(item))
}

/// Shared fields of a top-level definition, named by `name`.
fn node_info(element: &Element, name: &str) -> anyhow::Result<NodeInfo> {
    let name = name.trim();
    if name.is_empty() {
        bail!("<{}> has a missing or empty <id>", element.name);
    }
    Ok(NodeInfo {
        name: name.to_string(),
        synonym: synonym(element),
        comment: element.child_text("comment").to_string(),
        version: non_empty(element.child_text("version")),
    })
}

/// Shared fields of a nested member, named by its `id` attribute.
fn member_info(element: &Element) -> anyhow::Result<NodeInfo> {
    let name = element.attr("id").unwrap_or_default().trim();
    if name.is_empty() {
        bail!("<{}> has a missing or empty `id` attribute", element.name);
    }
    Ok(NodeInfo {
        name: name.to_string(),
        synonym: synonym(element),
        comment: element.child_text("comment").to_string(),
        version: element.attr("version").and_then(non_empty),
    })
}

fn synonym(element: &Element) -> Synonym {
    element
        .child("synonym")
        .and_then(|s| s.child("localised-string"))
        .map(|ls| {
            ls.children_named("language")
                .map(|l| (l.attr("id").unwrap_or_default().to_string(), l.text().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn type_of(member: &Element) -> TypeDescriptor {
    match member.child("type") {
        Some(ty) => TypeDescriptor::from_element_lenient(ty),
        None => {
            warn!(
                "`{}` has no <type>, keeping an empty opaque type",
                member.attr("id").unwrap_or_default()
            );
            TypeDescriptor::Generic(String::new())
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
