//! The configuration object tree.
//!
//! Nodes live in an arena owned by [`ConfigTree`]. A node refers to its
//! parent and its children by [`NodeId`]; the arena is the only owner, so a
//! child never keeps its parent alive and parent links cannot form cycles.
//!
//! The tree is built top-down:
//!
//! 1. [`ConfigTree::new`] creates the root configuration;
//! 2. languages, catalogs and documents are appended to it;
//! 3. catalogs and documents, once added, receive a [`PropertyList`] and a
//!    [`TabularsList`].
//!
//! Every node gets its qualified name when it is attached. The tree keeps a
//! registry of those names and refuses to attach a node whose qualified
//! name is already taken.
//!
//! ```rust
//! use cfgdump::tree::{ConfigTree, ConfigurationProps, NodeInfo, PropertyList};
//! use cfgdump::typing::TypeDescriptor;
//!
//! let mut tree = ConfigTree::new(NodeInfo::new("Demo"), ConfigurationProps::default());
//! let goods = tree.add_catalog(NodeInfo::new("Goods")).unwrap();
//!
//! let mut props = PropertyList::new();
//! props.push(NodeInfo::new("Title"), TypeDescriptor::Text { length: 150, variable: true });
//! let ids = tree.attach_properties(goods, props).unwrap();
//!
//! assert_eq!(tree.node(ids[0]).qualified_name(), "Catalog.Goods.Attribute.Title");
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::{
    error::{Error, Result},
    typing::TypeDescriptor,
};

/// Localized display string: language code to text.
pub type Synonym = BTreeMap<String, String>;

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Schema category token of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Configuration,
    Language,
    Catalog,
    Document,
    Attribute,
    TabularSection,
}

impl Category {
    /// Token used in qualified names and as the element name of
    /// child-object references.
    pub fn token(self) -> &'static str {
        match self {
            Category::Configuration => "Configuration",
            Category::Language => "Language",
            Category::Catalog => "Catalog",
            Category::Document => "Document",
            Category::Attribute => "Attribute",
            Category::TabularSection => "TabularSection",
        }
    }

    /// Output subdirectory for top-level categories.
    pub fn directory(self) -> Option<&'static str> {
        match self {
            Category::Language => Some("Languages"),
            Category::Catalog => Some("Catalogs"),
            Category::Document => Some("Documents"),
            _ => None,
        }
    }
}

/// The two kinds of top-level data objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Catalog,
    Document,
}

impl ObjectKind {
    pub fn category(self) -> Category {
        match self {
            ObjectKind::Catalog => Category::Catalog,
            ObjectKind::Document => Category::Document,
        }
    }

    /// Prefix of the generated type names (`CatalogObject`, `DocumentRef`, ...).
    pub fn prefix(self) -> &'static str {
        self.category().token()
    }
}

/// Fields shared by every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    /// Local name, unique among siblings.
    pub name: String,
    pub synonym: Synonym,
    pub comment: String,
    /// Explicit ledger version stamp.
    pub version: Option<String>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_synonym(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.synonym.insert(lang.into(), text.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Root-only properties of a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationProps {
    pub vendor: String,
    /// Version of the application itself.
    pub dev_version: String,
    /// Target platform compatibility mode.
    pub platform_version: String,
    /// Address the platform checks for updates.
    pub update_address: String,
    /// Name of the language used by default.
    pub default_language: String,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Configuration {
        props: ConfigurationProps,
        languages: Vec<NodeId>,
        catalogs: Vec<NodeId>,
        documents: Vec<NodeId>,
    },
    Language {
        code: String,
    },
    Object {
        kind: ObjectKind,
        properties: Vec<NodeId>,
        tabular_sections: Vec<NodeId>,
    },
    Property {
        ty: TypeDescriptor,
    },
    TabularSection {
        /// Kind of the owning object, used to name generated row types.
        owner: ObjectKind,
        columns: Vec<NodeId>,
    },
    TabularColumn {
        ty: TypeDescriptor,
    },
}

/// A node of the configuration tree.
#[derive(Debug, Clone)]
pub struct Node {
    info: NodeInfo,
    kind: NodeKind,
    parent: Option<NodeId>,
    qualified_name: String,
}

impl Node {
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Navigation link to the owning node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn category(&self) -> Category {
        match &self.kind {
            NodeKind::Configuration { .. } => Category::Configuration,
            NodeKind::Language { .. } => Category::Language,
            NodeKind::Object { kind, .. } => kind.category(),
            NodeKind::Property { .. } | NodeKind::TabularColumn { .. } => Category::Attribute,
            NodeKind::TabularSection { .. } => Category::TabularSection,
        }
    }

    /// Dot-joined path identifying this node, e.g.
    /// `Document.Order.TabularSection.Lines.Attribute.Qty`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Type of a property or column.
    pub fn type_descriptor(&self) -> Option<&TypeDescriptor> {
        match &self.kind {
            NodeKind::Property { ty } | NodeKind::TabularColumn { ty } => Some(ty),
            _ => None,
        }
    }
}

/// Properties collected for a catalog or document before attachment.
#[derive(Debug, Clone, Default)]
pub struct PropertyList {
    items: Vec<(NodeInfo, TypeDescriptor)>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: NodeInfo, ty: TypeDescriptor) {
        self.items.push((info, ty));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One tabular section and its columns, before attachment.
#[derive(Debug, Clone, Default)]
pub struct TabularSpec {
    pub info: NodeInfo,
    pub columns: Vec<(NodeInfo, TypeDescriptor)>,
}

impl TabularSpec {
    pub fn new(info: NodeInfo) -> Self {
        Self {
            info,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, info: NodeInfo, ty: TypeDescriptor) -> Self {
        self.columns.push((info, ty));
        self
    }
}

/// Tabular sections collected for a catalog or document before attachment.
#[derive(Debug, Clone, Default)]
pub struct TabularsList {
    items: Vec<TabularSpec>,
}

impl TabularsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: TabularSpec) {
        self.items.push(spec);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of resolving the configuration's default language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultLanguage {
    /// The declared name matches a language.
    Declared(NodeId),
    /// The declared name matched nothing; `used` is the first language, if any.
    Fallback {
        requested: String,
        used: Option<NodeId>,
    },
}

impl DefaultLanguage {
    pub fn id(&self) -> Option<NodeId> {
        match self {
            DefaultLanguage::Declared(id) => Some(*id),
            DefaultLanguage::Fallback { used, .. } => *used,
        }
    }
}

/// Arena-backed configuration tree rooted at a configuration node.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<Node>,
    names: HashSet<String>,
}

impl ConfigTree {
    /// Creates a tree holding only the root configuration.
    pub fn new(info: NodeInfo, props: ConfigurationProps) -> Self {
        let qualified_name = format!("{}.{}", Category::Configuration.token(), info.name);
        let mut names = HashSet::new();
        names.insert(qualified_name.clone());
        let root = Node {
            info,
            kind: NodeKind::Configuration {
                props,
                languages: Vec::new(),
                catalogs: Vec::new(),
                documents: Vec::new(),
            },
            parent: None,
            qualified_name,
        };
        Self {
            nodes: vec![root],
            names,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by another tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent.map(|p| self.node(p))
    }

    /// Root configuration properties.
    pub fn props(&self) -> &ConfigurationProps {
        match &self.nodes[0].kind {
            NodeKind::Configuration { props, .. } => props,
            _ => unreachable!("node 0 is always the configuration"),
        }
    }

    pub fn languages(&self) -> &[NodeId] {
        self.top_level(Category::Language)
    }

    pub fn catalogs(&self) -> &[NodeId] {
        self.top_level(Category::Catalog)
    }

    pub fn documents(&self) -> &[NodeId] {
        self.top_level(Category::Document)
    }

    fn top_level(&self, category: Category) -> &[NodeId] {
        match &self.nodes[0].kind {
            NodeKind::Configuration {
                languages,
                catalogs,
                documents,
                ..
            } => match category {
                Category::Language => languages.as_slice(),
                Category::Catalog => catalogs.as_slice(),
                Category::Document => documents.as_slice(),
                _ => &[],
            },
            _ => &[],
        }
    }

    /// Looks a node up by qualified name.
    pub fn find(&self, qualified_name: &str) -> Option<NodeId> {
        if !self.names.contains(qualified_name) {
            return None;
        }
        self.nodes
            .iter()
            .position(|n| n.qualified_name == qualified_name)
            .map(NodeId)
    }

    /// Children in emission order: languages, catalogs, documents for the
    /// root; properties then tabular sections for objects; columns for
    /// tabular sections.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::Configuration {
                languages,
                catalogs,
                documents,
                ..
            } => languages
                .iter()
                .chain(catalogs)
                .chain(documents)
                .copied()
                .collect(),
            NodeKind::Object {
                properties,
                tabular_sections,
                ..
            } => properties.iter().chain(tabular_sections).copied().collect(),
            NodeKind::TabularSection { columns, .. } => columns.clone(),
            NodeKind::Language { .. } | NodeKind::Property { .. } | NodeKind::TabularColumn { .. } => {
                Vec::new()
            }
        }
    }

    /// Every node in pre-order, starting with the root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.children(id).into_iter().rev());
        }
        order
    }

    pub fn add_language(&mut self, info: NodeInfo, code: impl Into<String>) -> Result<NodeId> {
        let id = self.insert(self.root(), info, NodeKind::Language { code: code.into() })?;
        self.root_list(Category::Language).push(id);
        Ok(id)
    }

    /// Adds an empty catalog shell. Attach its contents afterwards.
    pub fn add_catalog(&mut self, info: NodeInfo) -> Result<NodeId> {
        self.add_object(ObjectKind::Catalog, info)
    }

    /// Adds an empty document shell. Attach its contents afterwards.
    pub fn add_document(&mut self, info: NodeInfo) -> Result<NodeId> {
        self.add_object(ObjectKind::Document, info)
    }

    pub fn add_object(&mut self, kind: ObjectKind, info: NodeInfo) -> Result<NodeId> {
        let id = self.insert(
            self.root(),
            info,
            NodeKind::Object {
                kind,
                properties: Vec::new(),
                tabular_sections: Vec::new(),
            },
        )?;
        self.root_list(kind.category()).push(id);
        Ok(id)
    }

    /// Attaches properties to a catalog or document, keeping list order.
    pub fn attach_properties(&mut self, owner: NodeId, list: PropertyList) -> Result<Vec<NodeId>> {
        list.items
            .into_iter()
            .map(|(info, ty)| self.add_property(owner, info, ty))
            .collect()
    }

    /// Attaches tabular sections (with their columns) to a catalog or document.
    pub fn attach_tabular_sections(
        &mut self,
        owner: NodeId,
        list: TabularsList,
    ) -> Result<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(list.items.len());
        for spec in list.items {
            let section = self.add_tabular_section(owner, spec.info)?;
            for (info, ty) in spec.columns {
                self.add_column(section, info, ty)?;
            }
            ids.push(section);
        }
        Ok(ids)
    }

    pub fn add_property(&mut self, owner: NodeId, info: NodeInfo, ty: TypeDescriptor) -> Result<NodeId> {
        self.object_kind(owner, Category::Attribute)?;
        self.check_object_member(owner, &info.name)?;
        let id = self.insert(owner, info, NodeKind::Property { ty })?;
        if let NodeKind::Object { properties, .. } = &mut self.nodes[owner.0].kind {
            properties.push(id);
        }
        Ok(id)
    }

    pub fn add_tabular_section(&mut self, owner: NodeId, info: NodeInfo) -> Result<NodeId> {
        let kind = self.object_kind(owner, Category::TabularSection)?;
        self.check_object_member(owner, &info.name)?;
        let id = self.insert(
            owner,
            info,
            NodeKind::TabularSection {
                owner: kind,
                columns: Vec::new(),
            },
        )?;
        if let NodeKind::Object {
            tabular_sections, ..
        } = &mut self.nodes[owner.0].kind
        {
            tabular_sections.push(id);
        }
        Ok(id)
    }

    pub fn add_column(&mut self, section: NodeId, info: NodeInfo, ty: TypeDescriptor) -> Result<NodeId> {
        if !matches!(self.node(section).kind, NodeKind::TabularSection { .. }) {
            return Err(self.unexpected_parent(section, Category::Attribute, &info.name));
        }
        let id = self.insert(section, info, NodeKind::TabularColumn { ty })?;
        if let NodeKind::TabularSection { columns, .. } = &mut self.nodes[section.0].kind {
            columns.push(id);
        }
        Ok(id)
    }

    /// Resolves the declared default language.
    ///
    /// When no language carries the declared name the first language (if
    /// any) is used instead; the caller decides how to report that.
    pub fn default_language(&self) -> DefaultLanguage {
        let requested = &self.props().default_language;
        match self
            .languages()
            .iter()
            .find(|id| self.node(**id).name() == requested)
        {
            Some(id) => DefaultLanguage::Declared(*id),
            None => DefaultLanguage::Fallback {
                requested: requested.clone(),
                used: self.languages().first().copied(),
            },
        }
    }

    fn insert(&mut self, parent: NodeId, info: NodeInfo, kind: NodeKind) -> Result<NodeId> {
        let mut node = Node {
            info,
            kind,
            parent: Some(parent),
            qualified_name: String::new(),
        };
        let own = format!("{}.{}", node.category().token(), node.info.name);
        // Top-level objects are addressed without the configuration prefix.
        node.qualified_name = if parent == self.root() {
            own
        } else {
            format!("{}.{}", self.node(parent).qualified_name, own)
        };

        if !self.names.insert(node.qualified_name.clone()) {
            return Err(Error::DuplicateQualifiedName(node.qualified_name));
        }
        debug!("tree: attached {}", node.qualified_name);

        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn root_list(&mut self, category: Category) -> &mut Vec<NodeId> {
        match &mut self.nodes[0].kind {
            NodeKind::Configuration {
                languages,
                catalogs,
                documents,
                ..
            } => match category {
                Category::Language => languages,
                Category::Catalog => catalogs,
                Category::Document => documents,
                _ => unreachable!("only top-level categories hang off the root"),
            },
            _ => unreachable!("node 0 is always the configuration"),
        }
    }

    fn object_kind(&self, owner: NodeId, child: Category) -> Result<ObjectKind> {
        match self.node(owner).kind {
            NodeKind::Object { kind, .. } => Ok(kind),
            _ => Err(self.unexpected_parent(owner, child, "")),
        }
    }

    // Properties and tabular sections share the owner's child-object list,
    // so their local names must not overlap.
    fn check_object_member(&self, owner: NodeId, name: &str) -> Result<()> {
        let taken = self
            .children(owner)
            .into_iter()
            .any(|id| self.node(id).name() == name);
        if taken {
            return Err(Error::DuplicateName {
                owner: self.node(owner).qualified_name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn unexpected_parent(&self, parent: NodeId, child: Category, name: &str) -> Error {
        let child = if name.is_empty() {
            child.token().to_string()
        } else {
            format!("{}.{}", child.token(), name)
        };
        Error::UnexpectedParent {
            child,
            parent: self.node(parent).qualified_name.clone(),
        }
    }
}
