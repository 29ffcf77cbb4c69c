//! Exporter: turns a [`ConfigTree`] into dump documents.
//!
//! The root configuration becomes `Configuration.<ext>`; every language,
//! catalog and document becomes `<Category dir>/<name>.<ext>`. Properties,
//! tabular sections and columns are nested inside their owner's document.
//!
//! Documents are handed to a [`DumpSink`], so the same exporter can write
//! to disk ([`FsSink`]) or into memory ([`MemorySink`]).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::{Component, Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    ids::IdService,
    ledger::VersionLedger,
    tree::{Category, ConfigTree, DefaultLanguage, NodeId, NodeInfo, NodeKind, ObjectKind},
    xml::{Document, Element, write_localized},
};

/// Class ids of the objects every configuration contains, in dump order.
pub const CONTAINED_OBJECT_CLASSES: [&str; 7] = [
    "9cd510cd-abfc-11d4-9434-004095e12fc7",
    "9fcd25a0-4822-11d4-9414-008048da11f9",
    "e3687481-0a87-462c-a166-9f34594f9bba",
    "9de14907-ec23-4a07-96f0-85521cb6b53b",
    "51f2d5d8-ea4d-4064-8892-82951750031e",
    "e68182ea-4237-4383-967f-90c1e3370bc7",
    "fb282519-d103-4dd3-bc12-cb271d631dfc",
];

/// Generated types of a catalog or document: name suffix and category.
const OBJECT_GENERATED_TYPES: [(&str, &str); 5] = [
    ("Object", "Object"),
    ("Ref", "Ref"),
    ("Selection", "Selection"),
    ("List", "List"),
    ("Manager", "Manager"),
];

const TOP_LEVEL: [Category; 3] = [Category::Language, Category::Catalog, Category::Document];

/// Output settings of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSettings {
    /// File extension without the dot.
    pub extension: String,
    /// Schema version written on every document.
    pub format_version: String,
    /// File name (without extension) of the version ledger.
    pub ledger_file: String,
    /// Derive contained-object ids from the configuration name instead of
    /// drawing them at random.
    pub deterministic_contained_objects: bool,
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            extension: "xml".into(),
            format_version: "2.18".into(),
            ledger_file: "ConfigDumpInfo".into(),
            deterministic_contained_objects: true,
        }
    }
}

impl DumpSettings {
    fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension)
    }

    /// Path of the document `stem` inside `dir`, refused when `stem` is not
    /// a plain file name or the path is already in `written`.
    fn document_path(&self, dir: &Path, stem: &str, written: &[PathBuf]) -> Result<PathBuf> {
        let mut components = Path::new(stem).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(name)), None) if name == stem
        );
        if !plain || stem.contains(['/', '\\']) {
            return Err(Error::InvalidFileName(stem.to_string()));
        }

        let path = dir.join(self.file_name(stem));
        // Case-insensitive filesystems would merge these too.
        let taken = path.to_string_lossy().to_lowercase();
        if written
            .iter()
            .any(|p| p.to_string_lossy().to_lowercase() == taken)
        {
            return Err(Error::PathCollision(path));
        }
        Ok(path)
    }
}

/// Destination of rendered documents.
pub trait DumpSink {
    /// Ensures a directory (relative to the dump root) exists.
    fn create_dir(&mut self, dir: &Path) -> Result<()>;

    /// Stores a document at a path relative to the dump root.
    fn write_document(&mut self, path: &Path, document: &Document) -> Result<()>;
}

/// Writes documents below a directory on disk.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    /// Creates the sink, creating `root` if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DumpSink for FsSink {
    fn create_dir(&mut self, dir: &Path) -> Result<()> {
        let path = self.root.join(dir);
        fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))
    }

    fn write_document(&mut self, path: &Path, document: &Document) -> Result<()> {
        let path = self.root.join(path);
        let text = document.render()?;
        fs::write(&path, text).map_err(|e| Error::io(&path, e))
    }
}

/// Keeps rendered documents in memory, keyed by relative path.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub dirs: BTreeSet<PathBuf>,
    pub files: BTreeMap<PathBuf, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered text of a stored document.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }
}

impl DumpSink for MemorySink {
    fn create_dir(&mut self, dir: &Path) -> Result<()> {
        self.dirs.insert(dir.to_path_buf());
        Ok(())
    }

    fn write_document(&mut self, path: &Path, document: &Document) -> Result<()> {
        self.files.insert(path.to_path_buf(), document.render()?);
        Ok(())
    }
}

/// Non-fatal condition noticed during export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// The declared default language does not exist.
    DefaultLanguageFallback {
        requested: String,
        used: Option<String>,
    },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::DefaultLanguageFallback {
                requested,
                used: Some(used),
            } => write!(
                f,
                "default language `{requested}` not found, using `{used}`"
            ),
            ExportWarning::DefaultLanguageFallback {
                requested,
                used: None,
            } => write!(
                f,
                "default language `{requested}` not found and no languages are defined"
            ),
        }
    }
}

/// What an export produced.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Written documents, relative to the dump root, in write order.
    pub files: Vec<PathBuf>,
    pub warnings: Vec<ExportWarning>,
}

/// Emits one document per top-level node plus the root document.
pub struct Exporter<'a> {
    tree: &'a ConfigTree,
    ids: &'a mut IdService,
    settings: &'a DumpSettings,
    report: ExportReport,
}

impl<'a> Exporter<'a> {
    pub fn new(tree: &'a ConfigTree, ids: &'a mut IdService, settings: &'a DumpSettings) -> Self {
        Self {
            tree,
            ids,
            settings,
            report: ExportReport::default(),
        }
    }

    /// Writes every object document and `Configuration.<ext>` into `sink`.
    pub fn export(mut self, sink: &mut dyn DumpSink) -> Result<ExportReport> {
        let tree = self.tree;
        let root_id = tree.root();
        let default_language = self.resolve_default_language();

        let mut doc = Document::metadata_object(&self.settings.format_version);
        let configuration = doc.root.append("Configuration");
        configuration.set_attr("uuid", self.identifier(root_id));
        self.contained_objects(configuration.append("InternalInfo"));
        self.configuration_properties(configuration.append("Properties"), default_language);

        let mut child_objects = Element::new("ChildObjects");
        for category in TOP_LEVEL {
            let Some(dir) = category.directory() else {
                continue;
            };
            sink.create_dir(Path::new(dir))?;

            let members = match category {
                Category::Language => tree.languages(),
                Category::Catalog => tree.catalogs(),
                _ => tree.documents(),
            };
            for &id in members {
                let node = tree.node(id);
                let document = match node.kind() {
                    NodeKind::Language { code } => self.language_document(id, code),
                    NodeKind::Object { kind, .. } => self.object_document(id, *kind),
                    _ => continue,
                };
                let path = self.settings.document_path(
                    Path::new(dir),
                    node.name(),
                    &self.report.files,
                )?;
                sink.write_document(&path, &document)?;
                debug!("export: wrote {}", path.display());
                self.report.files.push(path);

                child_objects.append_text(category.token(), node.name());
            }
        }
        configuration.push(child_objects);

        let path = self.settings.document_path(
            Path::new(""),
            Category::Configuration.token(),
            &self.report.files,
        )?;
        sink.write_document(&path, &doc)?;
        debug!("export: wrote {}", path.display());
        self.report.files.push(path);

        info!(
            "exported {} documents for {}",
            self.report.files.len(),
            tree.node(root_id).qualified_name()
        );
        Ok(self.report)
    }

    fn identifier(&self, id: NodeId) -> String {
        self.ids
            .identifier_for(self.tree.node(id).qualified_name())
            .to_string()
    }

    fn resolve_default_language(&mut self) -> Option<NodeId> {
        let tree = self.tree;
        let resolved = tree.default_language();
        if let DefaultLanguage::Fallback { requested, used } = &resolved {
            let warning = ExportWarning::DefaultLanguageFallback {
                requested: requested.clone(),
                used: used.map(|id| tree.node(id).name().to_string()),
            };
            warn!("{warning}");
            self.report.warnings.push(warning);
        }
        resolved.id()
    }

    fn contained_objects(&mut self, internal_info: &mut Element) {
        let tree = self.tree;
        let root_name = tree.node(tree.root()).qualified_name();
        for class_id in CONTAINED_OBJECT_CLASSES {
            let object_id = if self.settings.deterministic_contained_objects {
                self.ids
                    .identifier_for(&format!("{root_name}.ContainedObject.{class_id}"))
            } else {
                self.ids.random_identifier()
            };
            let contained = internal_info.append("xr:ContainedObject");
            contained.append_text("xr:ClassId", class_id);
            contained.append_text("xr:ObjectId", object_id.to_string());
        }
    }

    fn configuration_properties(&self, props: &mut Element, default_language: Option<NodeId>) {
        let root = self.tree.node(self.tree.root());
        let info = self.tree.props();
        common_properties(props, root.info());
        props.append_text("Vendor", info.vendor.as_str());
        props.append_text("Version", info.dev_version.as_str());
        props.append_text("CompatibilityMode", info.platform_version.as_str());
        props.append_text("UpdateCatalogAddress", info.update_address.as_str());
        let default_language = default_language
            .map(|id| self.tree.node(id).qualified_name().to_string())
            .unwrap_or_default();
        props.append_text("DefaultLanguage", default_language);
    }

    fn language_document(&self, id: NodeId, code: &str) -> Document {
        let mut doc = Document::metadata_object(&self.settings.format_version);
        let language = doc.root.append("Language");
        language.set_attr("uuid", self.identifier(id));
        let props = language.append("Properties");
        common_properties(props, self.tree.node(id).info());
        props.append_text("LanguageCode", code);
        doc
    }

    fn object_document(&mut self, id: NodeId, kind: ObjectKind) -> Document {
        let tree = self.tree;
        let node = tree.node(id);
        let mut doc = Document::metadata_object(&self.settings.format_version);
        let mut object = Element::new(kind.prefix()).with_attr("uuid", self.identifier(id));

        let internal_info = object.append("InternalInfo");
        for (suffix, category) in OBJECT_GENERATED_TYPES {
            let name = format!("{}{}.{}", kind.prefix(), suffix, node.name());
            generated_type(self.ids, internal_info, &name, category);
        }

        common_properties(object.append("Properties"), node.info());

        let mut child_objects = Element::new("ChildObjects");
        for child in tree.children(id) {
            match tree.node(child).kind() {
                NodeKind::Property { .. } => child_objects.push(self.attribute_element(child)),
                NodeKind::TabularSection { owner, .. } => {
                    let section = self.tabular_element(child, *owner, node.name());
                    child_objects.push(section);
                }
                _ => {}
            }
        }
        object.push(child_objects);

        doc.root.push(object);
        doc
    }

    fn attribute_element(&self, id: NodeId) -> Element {
        let node = self.tree.node(id);
        let mut attribute = Element::new("Attribute").with_attr("uuid", self.identifier(id));
        let props = attribute.append("Properties");
        common_properties(props, node.info());
        if let Some(ty) = node.type_descriptor() {
            ty.render_into(props);
        }
        attribute
    }

    fn tabular_element(&mut self, id: NodeId, owner: ObjectKind, object_name: &str) -> Element {
        let tree = self.tree;
        let node = tree.node(id);
        let mut section = Element::new("TabularSection").with_attr("uuid", self.identifier(id));

        let internal_info = section.append("InternalInfo");
        for category in ["TabularSection", "TabularSectionRow"] {
            let name = format!(
                "{}{}.{}.{}",
                owner.prefix(),
                category,
                object_name,
                node.name()
            );
            generated_type(self.ids, internal_info, &name, category);
        }

        common_properties(section.append("Properties"), node.info());

        let columns = section.append("ChildObjects");
        for column in tree.children(id) {
            columns.push(self.attribute_element(column));
        }
        section
    }
}

/// Writes the whole dump: object documents, the root document and the
/// version ledger.
pub fn dump(
    tree: &ConfigTree,
    ids: &mut IdService,
    settings: &DumpSettings,
    sink: &mut dyn DumpSink,
) -> Result<ExportReport> {
    let mut report = Exporter::new(tree, ids, settings).export(sink)?;

    let ledger = VersionLedger::build(tree, ids);
    let path = settings.document_path(Path::new(""), &settings.ledger_file, &report.files)?;
    sink.write_document(&path, &ledger.to_document(&settings.format_version))?;
    info!("version ledger: {} entries", ledger.len());
    report.files.push(path);

    Ok(report)
}

fn common_properties(props: &mut Element, info: &NodeInfo) {
    props.append_text("Name", info.name.as_str());
    write_localized(props.append("Synonym"), &info.synonym);
    props.append_text("Comment", info.comment.as_str());
}

// Generated type ids only need to be unique, not stable between runs.
fn generated_type(ids: &mut IdService, internal_info: &mut Element, name: &str, category: &str) {
    let generated = internal_info.append("xr:GeneratedType");
    generated.set_attr("name", name);
    generated.set_attr("category", category);
    generated.append_text("xr:TypeId", ids.random_identifier().to_string());
    generated.append_text("xr:ValueId", ids.random_identifier().to_string());
}
