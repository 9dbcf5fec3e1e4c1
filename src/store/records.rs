//! Domain records for the relational index
//!
//! Every table has an insert value (`New*`) and a fetched row (`*Record`).
//! Kind columns are tagged variants in the domain model and plain strings
//! at the schema boundary; the tag sets are enforced at insertion time.
//!
//! @module store/records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SPANS
// =============================================================================

/// An inclusive source span, 0-based lines and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Spans must be lexicographically ordered: (start_line, start_col) <= (end_line, end_col)
    pub fn is_valid(&self) -> bool {
        (self.start_line, self.start_col) <= (self.end_line, self.end_col)
    }

    /// Whether the span contains the given position (inclusive on both ends)
    pub fn contains(&self, line: u32, col: u32) -> bool {
        (self.start_line, self.start_col) <= (line, col)
            && (line, col) <= (self.end_line, self.end_col)
    }

    /// Whether `other` lies entirely inside this span
    pub fn encloses(&self, other: &Span) -> bool {
        self.contains(other.start_line, other.start_col)
            && self.contains(other.end_line, other.end_col)
    }

    /// Extent used for narrowest-span tie-breaking
    pub fn extent(&self) -> (u32, u32) {
        (
            self.end_line - self.start_line,
            self.end_col.saturating_sub(self.start_col),
        )
    }
}

// =============================================================================
// KIND TAG SETS
// =============================================================================

/// Classification of symbol declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Trait,
    Enum,
    EnumMember,
    Variable,
    Constant,
    TypeAlias,
    Module,
    Package,
    Namespace,
    Property,
    Field,
    Constructor,
    StaticMethod,
    ClassMethod,
    Union,
    Macro,
    Mixin,
    Protocol,
    Delegate,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Module => "module",
            SymbolKind::Package => "package",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::Constructor => "constructor",
            SymbolKind::StaticMethod => "static_method",
            SymbolKind::ClassMethod => "class_method",
            SymbolKind::Union => "union",
            SymbolKind::Macro => "macro",
            SymbolKind::Mixin => "mixin",
            SymbolKind::Protocol => "protocol",
            SymbolKind::Delegate => "delegate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "class" => SymbolKind::Class,
            "struct" => SymbolKind::Struct,
            "interface" => SymbolKind::Interface,
            "trait" => SymbolKind::Trait,
            "enum" => SymbolKind::Enum,
            "enum_member" => SymbolKind::EnumMember,
            "variable" => SymbolKind::Variable,
            "constant" => SymbolKind::Constant,
            "type_alias" => SymbolKind::TypeAlias,
            "module" => SymbolKind::Module,
            "package" => SymbolKind::Package,
            "namespace" => SymbolKind::Namespace,
            "property" => SymbolKind::Property,
            "field" => SymbolKind::Field,
            "constructor" => SymbolKind::Constructor,
            "static_method" => SymbolKind::StaticMethod,
            "class_method" => SymbolKind::ClassMethod,
            "union" => SymbolKind::Union,
            "macro" => SymbolKind::Macro,
            "mixin" => SymbolKind::Mixin,
            "protocol" => SymbolKind::Protocol,
            "delegate" => SymbolKind::Delegate,
            _ => return None,
        })
    }

    /// Kinds that carry a module identifier for import matching
    pub fn is_module_like(&self) -> bool {
        matches!(
            self,
            SymbolKind::Package | SymbolKind::Module | SymbolKind::Namespace
        )
    }
}

/// Classification of lexical scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    File,
    Block,
    Function,
    Method,
    Class,
    Module,
    Namespace,
    Impl,
    Lambda,
    Loop,
    Conditional,
    Comprehension,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::File => "file",
            ScopeKind::Block => "block",
            ScopeKind::Function => "function",
            ScopeKind::Method => "method",
            ScopeKind::Class => "class",
            ScopeKind::Module => "module",
            ScopeKind::Namespace => "namespace",
            ScopeKind::Impl => "impl",
            ScopeKind::Lambda => "lambda",
            ScopeKind::Loop => "loop",
            ScopeKind::Conditional => "conditional",
            ScopeKind::Comprehension => "comprehension",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "file" => ScopeKind::File,
            "block" => ScopeKind::Block,
            "function" => ScopeKind::Function,
            "method" => ScopeKind::Method,
            "class" => ScopeKind::Class,
            "module" => ScopeKind::Module,
            "namespace" => ScopeKind::Namespace,
            "impl" => ScopeKind::Impl,
            "lambda" => ScopeKind::Lambda,
            "loop" => ScopeKind::Loop,
            "conditional" => ScopeKind::Conditional,
            "comprehension" => ScopeKind::Comprehension,
            _ => return None,
        })
    }
}

/// Context of a reference use-site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefContext {
    Call,
    TypeAnnotation,
    FieldAccess,
    Assignment,
    Read,
    Write,
    Import,
    Export,
    Decorator,
    Inheritance,
    Construction,
    DynamicDispatch,
    MacroInvocation,
}

impl RefContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefContext::Call => "call",
            RefContext::TypeAnnotation => "type_annotation",
            RefContext::FieldAccess => "field_access",
            RefContext::Assignment => "assignment",
            RefContext::Read => "read",
            RefContext::Write => "write",
            RefContext::Import => "import",
            RefContext::Export => "export",
            RefContext::Decorator => "decorator",
            RefContext::Inheritance => "inheritance",
            RefContext::Construction => "construction",
            RefContext::DynamicDispatch => "dynamic_dispatch",
            RefContext::MacroInvocation => "macro_invocation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "call" => RefContext::Call,
            "type_annotation" => RefContext::TypeAnnotation,
            "field_access" => RefContext::FieldAccess,
            "assignment" => RefContext::Assignment,
            "read" => RefContext::Read,
            "write" => RefContext::Write,
            "import" => RefContext::Import,
            "export" => RefContext::Export,
            "decorator" => RefContext::Decorator,
            "inheritance" => RefContext::Inheritance,
            "construction" => RefContext::Construction,
            "dynamic_dispatch" => RefContext::DynamicDispatch,
            "macro_invocation" => RefContext::MacroInvocation,
            _ => return None,
        })
    }
}

/// Kind of an import statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Module,
    Named,
    Default,
    Namespace,
    Static,
    Header,
    Symbol,
    Require,
    Relative,
    Reexport,
    Wildcard,
    Use,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Module => "module",
            ImportKind::Named => "named",
            ImportKind::Default => "default",
            ImportKind::Namespace => "namespace",
            ImportKind::Static => "static",
            ImportKind::Header => "header",
            ImportKind::Symbol => "symbol",
            ImportKind::Require => "require",
            ImportKind::Relative => "relative",
            ImportKind::Reexport => "reexport",
            ImportKind::Wildcard => "wildcard",
            ImportKind::Use => "use",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "module" => ImportKind::Module,
            "named" => ImportKind::Named,
            "default" => ImportKind::Default,
            "namespace" => ImportKind::Namespace,
            "static" => ImportKind::Static,
            "header" => ImportKind::Header,
            "symbol" => ImportKind::Symbol,
            "require" => ImportKind::Require,
            "relative" => ImportKind::Relative,
            "reexport" => ImportKind::Reexport,
            "wildcard" => ImportKind::Wildcard,
            "use" => ImportKind::Use,
            _ => return None,
        })
    }
}

/// Kind of a type member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Method,
    Embedded,
    Property,
    Variant,
    Constant,
    BaseClass,
    AssociatedType,
    StaticField,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
            MemberKind::Embedded => "embedded",
            MemberKind::Property => "property",
            MemberKind::Variant => "variant",
            MemberKind::Constant => "constant",
            MemberKind::BaseClass => "base_class",
            MemberKind::AssociatedType => "associated_type",
            MemberKind::StaticField => "static_field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "field" => MemberKind::Field,
            "method" => MemberKind::Method,
            "embedded" => MemberKind::Embedded,
            "property" => MemberKind::Property,
            "variant" => MemberKind::Variant,
            "constant" => MemberKind::Constant,
            "base_class" => MemberKind::BaseClass,
            "associated_type" => MemberKind::AssociatedType,
            "static_field" => MemberKind::StaticField,
            _ => return None,
        })
    }
}

/// How a reference was resolved to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Direct,
    Import,
    Inheritance,
    Interface,
    Extension,
    DynamicDispatch,
    Reexport,
    Package,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::Direct => "direct",
            ResolutionKind::Import => "import",
            ResolutionKind::Inheritance => "inheritance",
            ResolutionKind::Interface => "interface",
            ResolutionKind::Extension => "extension",
            ResolutionKind::DynamicDispatch => "dynamic_dispatch",
            ResolutionKind::Reexport => "reexport",
            ResolutionKind::Package => "package",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "direct" => ResolutionKind::Direct,
            "import" => ResolutionKind::Import,
            "inheritance" => ResolutionKind::Inheritance,
            "interface" => ResolutionKind::Interface,
            "extension" => ResolutionKind::Extension,
            "dynamic_dispatch" => ResolutionKind::DynamicDispatch,
            "reexport" => ResolutionKind::Reexport,
            "package" => ResolutionKind::Package,
            _ => return None,
        })
    }
}

/// How a type satisfies an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplKind {
    Explicit,
    Implicit,
    Structural,
    Delegation,
    Mixin,
    Trait,
    Extends,
}

impl ImplKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImplKind::Explicit => "explicit",
            ImplKind::Implicit => "implicit",
            ImplKind::Structural => "structural",
            ImplKind::Delegation => "delegation",
            ImplKind::Mixin => "mixin",
            ImplKind::Trait => "trait",
            ImplKind::Extends => "extends",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "explicit" => ImplKind::Explicit,
            "implicit" => ImplKind::Implicit,
            "structural" => ImplKind::Structural,
            "delegation" => ImplKind::Delegation,
            "mixin" => ImplKind::Mixin,
            "trait" => ImplKind::Trait,
            "extends" => ImplKind::Extends,
            _ => return None,
        })
    }
}

/// Kind of an extension binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    Method,
    Property,
    Subscript,
    Override,
}

impl ExtensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionKind::Method => "method",
            ExtensionKind::Property => "property",
            ExtensionKind::Subscript => "subscript",
            ExtensionKind::Override => "override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "method" => ExtensionKind::Method,
            "property" => ExtensionKind::Property,
            "subscript" => ExtensionKind::Subscript,
            "override" => ExtensionKind::Override,
            _ => return None,
        })
    }
}

/// Kind of a type composition edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    MixinInclude,
    TypeUnion,
    ProtocolComposition,
    ErrorSetMerge,
}

impl CompositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionKind::MixinInclude => "mixin_include",
            CompositionKind::TypeUnion => "type_union",
            CompositionKind::ProtocolComposition => "protocol_composition",
            CompositionKind::ErrorSetMerge => "error_set_merge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "mixin_include" => CompositionKind::MixinInclude,
            "type_union" => CompositionKind::TypeUnion,
            "protocol_composition" => CompositionKind::ProtocolComposition,
            "error_set_merge" => CompositionKind::ErrorSetMerge,
            _ => return None,
        })
    }
}

// =============================================================================
// EXTRACTION RECORDS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub language: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub last_indexed: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSymbol {
    pub file_id: Option<i64>,
    pub name: String,
    pub kind: SymbolKind,
    pub visibility: Option<String>,
    /// Ordered modifier tokens (async, static, unsafe, ...)
    pub modifiers: Vec<String>,
    pub span: Span,
    pub parent_symbol_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolRecord {
    pub id: i64,
    pub file_id: Option<i64>,
    pub name: String,
    pub kind: SymbolKind,
    pub visibility: Option<String>,
    pub modifiers: Vec<String>,
    pub signature_hash: String,
    pub span: Span,
    pub parent_symbol_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewSymbolFragment {
    pub symbol_id: i64,
    pub file_id: i64,
    pub span: Span,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolFragmentRecord {
    pub id: i64,
    pub symbol_id: i64,
    pub file_id: i64,
    pub span: Span,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct NewScope {
    pub file_id: i64,
    pub symbol_id: Option<i64>,
    pub kind: ScopeKind,
    pub span: Span,
    pub parent_scope_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeRecord {
    pub id: i64,
    pub file_id: i64,
    pub symbol_id: Option<i64>,
    pub kind: ScopeKind,
    pub span: Span,
    pub parent_scope_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewReference {
    pub file_id: i64,
    pub scope_id: Option<i64>,
    pub name: String,
    pub span: Span,
    pub context: RefContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceRecord {
    pub id: i64,
    pub file_id: i64,
    pub scope_id: Option<i64>,
    pub name: String,
    pub span: Span,
    pub context: RefContext,
}

#[derive(Debug, Clone)]
pub struct NewImport {
    pub file_id: i64,
    pub source: String,
    pub imported_name: Option<String>,
    pub local_alias: Option<String>,
    pub kind: ImportKind,
    /// Lexical level of the import (file, function, block)
    pub scope: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub id: i64,
    pub file_id: i64,
    pub source: String,
    pub imported_name: Option<String>,
    pub local_alias: Option<String>,
    pub kind: ImportKind,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct NewTypeMember {
    pub symbol_id: i64,
    pub name: String,
    pub kind: MemberKind,
    pub type_expr: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeMemberRecord {
    pub id: i64,
    pub symbol_id: i64,
    pub name: String,
    pub kind: MemberKind,
    pub type_expr: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFunctionParam {
    pub symbol_id: i64,
    pub name: Option<String>,
    pub ordinal: u32,
    pub type_expr: Option<String>,
    pub is_receiver: bool,
    pub is_return: bool,
    pub has_default: bool,
    pub default_expr: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionParamRecord {
    pub id: i64,
    pub symbol_id: i64,
    pub name: Option<String>,
    pub ordinal: u32,
    pub type_expr: Option<String>,
    pub is_receiver: bool,
    pub is_return: bool,
    pub has_default: bool,
    pub default_expr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTypeParam {
    pub symbol_id: i64,
    pub name: String,
    pub ordinal: u32,
    pub param_kind: Option<String>,
    pub variance: Option<String>,
    pub constraints: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeParamRecord {
    pub id: i64,
    pub symbol_id: i64,
    pub name: String,
    pub ordinal: u32,
    pub param_kind: Option<String>,
    pub variance: Option<String>,
    pub constraints: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAnnotation {
    pub target_symbol_id: i64,
    pub name: String,
    pub resolved_symbol_id: Option<i64>,
    pub arguments: Option<String>,
    pub file_id: Option<i64>,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRecord {
    pub id: i64,
    pub target_symbol_id: i64,
    pub name: String,
    pub resolved_symbol_id: Option<i64>,
    pub arguments: Option<String>,
    pub file_id: Option<i64>,
    pub line: u32,
    pub col: u32,
}

// =============================================================================
// RESOLUTION RECORDS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewResolvedReference {
    pub reference_id: i64,
    pub target_symbol_id: i64,
    pub confidence: f64,
    pub resolution_kind: ResolutionKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedReferenceRecord {
    pub id: i64,
    pub reference_id: i64,
    pub target_symbol_id: i64,
    pub confidence: f64,
    pub resolution_kind: ResolutionKind,
}

#[derive(Debug, Clone)]
pub struct NewImplementation {
    pub type_symbol_id: i64,
    pub interface_symbol_id: i64,
    pub kind: ImplKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplementationRecord {
    pub id: i64,
    pub type_symbol_id: i64,
    pub interface_symbol_id: i64,
    pub kind: ImplKind,
}

#[derive(Debug, Clone)]
pub struct NewCallEdge {
    pub caller_symbol_id: i64,
    pub callee_symbol_id: i64,
    pub file_id: Option<i64>,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallEdgeRecord {
    pub id: i64,
    pub caller_symbol_id: i64,
    pub callee_symbol_id: i64,
    pub file_id: Option<i64>,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone)]
pub struct NewReexport {
    pub file_id: i64,
    pub original_symbol_id: i64,
    pub exported_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReexportRecord {
    pub id: i64,
    pub file_id: i64,
    pub original_symbol_id: i64,
    pub exported_name: String,
}

#[derive(Debug, Clone)]
pub struct NewExtensionBinding {
    pub member_symbol_id: i64,
    pub extended_type_expr: String,
    pub extended_type_symbol_id: Option<i64>,
    pub kind: ExtensionKind,
    pub constraints: Option<String>,
    pub is_default_impl: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionBindingRecord {
    pub id: i64,
    pub member_symbol_id: i64,
    pub extended_type_expr: String,
    pub extended_type_symbol_id: Option<i64>,
    pub kind: ExtensionKind,
    pub constraints: Option<String>,
    pub is_default_impl: bool,
}

#[derive(Debug, Clone)]
pub struct NewTypeComposition {
    pub composite_symbol_id: i64,
    pub component_symbol_id: i64,
    pub composition_kind: CompositionKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCompositionRecord {
    pub id: i64,
    pub composite_symbol_id: i64,
    pub component_symbol_id: i64,
    pub composition_kind: CompositionKind,
}

// =============================================================================
// MODIFIER ENCODING
// =============================================================================

/// Encode ordered modifier tokens for the schema boundary
pub fn join_modifiers(modifiers: &[String]) -> String {
    modifiers.join(" ")
}

/// Decode modifiers back into the ordered token list
pub fn split_modifiers(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(' ').map(|s| s.to_string()).collect()
    }
}
