//! Loading schema classes from Rust source files.
//!
//! A definitions module is a `.rs` file, or a directory of them, whose
//! structs describe request and response bodies. Every named-field struct is
//! turned into a [`SchemaSpec`]; the ones whose name ends in `Schema` are what
//! the document builder pre-registers.
//!
//! # Example
//!
//! ```no_run
//! use swagger_from_routes::definitions::DefinitionsLoader;
//!
//! let catalog = DefinitionsLoader::new("src/schemas").load().unwrap();
//! for class in catalog.exported() {
//!     println!("{}", class.registry_name());
//! }
//! ```

use crate::catalog::{FieldSpec, SchemaCatalog, SchemaSpec};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loads schema classes from a Rust source file or directory.
pub struct DefinitionsLoader {
    root: PathBuf,
}

/// A parsed source file and the module path it defines.
struct SourceModule {
    module: String,
    syntax_tree: syn::File,
}

impl DefinitionsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parse every source file and build the catalog of its structs.
    ///
    /// Files with syntax errors are logged and skipped.
    pub fn load(&self) -> Result<SchemaCatalog> {
        let mut modules = Vec::new();
        for path in self.source_files()? {
            match parse_source(&path) {
                Ok(syntax_tree) => modules.push(SourceModule {
                    module: self.module_path(&path),
                    syntax_tree,
                }),
                Err(e) => warn!("Skipping definitions file: {}", e),
            }
        }

        let specs = collect_specs(&modules);
        debug!(
            "Found {} struct definitions in {}",
            specs.len(),
            self.root.display()
        );
        SchemaCatalog::from_specs(&specs)
    }

    /// All `.rs` files under the root, skipping `target` and hidden directories.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }
        if !self.root.is_dir() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("definitions path does not exist: {}", self.root.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => warn!("Failed to access path: {}", e),
            }
        }
        Ok(files)
    }

    /// Module path of a source file, e.g. `billing/address.rs` → `billing.address`.
    fn module_path(&self, file: &Path) -> String {
        let relative = if self.root.is_file() {
            file.file_name().map(PathBuf::from).unwrap_or_default()
        } else {
            file.strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| file.to_path_buf())
        };

        let mut parts: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if matches!(parts.last().map(String::as_str), Some("mod" | "lib" | "main")) {
            parts.pop();
        }
        parts.join(".")
    }
}

/// Read and parse one Rust source file.
pub fn parse_source(path: &Path) -> Result<syn::File> {
    debug!("Parsing file: {}", path.display());
    let content = fs::read_to_string(path)?;
    syn::parse_file(&content).map_err(|e| Error::ParseError {
        file: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn collect_specs(modules: &[SourceModule]) -> IndexMap<String, SchemaSpec> {
    // struct name -> catalog key, first definition wins
    let mut known: HashMap<String, String> = HashMap::new();
    for source in modules {
        for item in &source.syntax_tree.items {
            if let syn::Item::Struct(item_struct) = item {
                let ident = item_struct.ident.to_string();
                let key = qualified_key(&source.module, &ident);
                known.entry(ident).or_insert(key);
            }
        }
    }

    let mut specs = IndexMap::new();
    for source in modules {
        let mapper = TypeMapper {
            module: &source.module,
            modules,
            known: &known,
        };
        for item in &source.syntax_tree.items {
            if let syn::Item::Struct(item_struct) = item {
                if let syn::Fields::Named(named) = &item_struct.fields {
                    let key = qualified_key(&source.module, &item_struct.ident.to_string());
                    specs.insert(key, mapper.struct_spec(named));
                }
            }
        }
    }
    specs
}

fn qualified_key(module: &str, ident: &str) -> String {
    if module.is_empty() {
        ident.to_string()
    } else {
        format!("{}.{}", module, ident)
    }
}

/// Serde attributes that change the documented shape of a field
#[derive(Debug, Default)]
struct SerdeAttributes {
    rename: Option<String>,
    skip: bool,
    default: bool,
}

struct TypeMapper<'a> {
    module: &'a str,
    modules: &'a [SourceModule],
    known: &'a HashMap<String, String>,
}

impl TypeMapper<'_> {
    fn struct_spec(&self, fields: &syn::FieldsNamed) -> SchemaSpec {
        let mut spec = SchemaSpec::default();
        for field in &fields.named {
            let Some(ident) = &field.ident else { continue };
            let serde_attrs = parse_serde_attributes(&field.attrs);
            if serde_attrs.skip {
                continue;
            }

            let (mut field_spec, required) = self.type_spec(&field.ty);
            field_spec.required = required && !serde_attrs.default;
            field_spec.description = doc_comment(&field.attrs);

            let name = serde_attrs
                .rename
                .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
            spec.fields.insert(name, field_spec);
        }
        spec
    }

    /// Spec of a field type and whether the value is required.
    fn type_spec(&self, ty: &syn::Type) -> (FieldSpec, bool) {
        match ty {
            syn::Type::Path(type_path) => self.path_spec(&type_path.path),
            syn::Type::Reference(reference) => self.type_spec(&reference.elem),
            syn::Type::Slice(slice) => {
                let mut spec = FieldSpec::new("list");
                spec.items = Some(Box::new(self.type_spec(&slice.elem).0));
                (spec, true)
            }
            _ => (FieldSpec::new("raw"), true),
        }
    }

    fn path_spec(&self, path: &syn::Path) -> (FieldSpec, bool) {
        let Some(segment) = path.segments.last() else {
            return (FieldSpec::new("raw"), true);
        };
        let type_name = segment.ident.to_string();
        let inner = first_type_argument(&segment.arguments);

        match (type_name.as_str(), inner) {
            ("Option", Some(inner)) => (self.type_spec(inner).0, false),
            ("Box" | "Arc" | "Rc", Some(inner)) => self.type_spec(inner),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "IndexSet", Some(inner)) => {
                let mut spec = FieldSpec::new("list");
                spec.items = Some(Box::new(self.type_spec(inner).0));
                (spec, true)
            }
            ("HashMap" | "BTreeMap" | "IndexMap" | "Value" | "Map", _) => {
                (FieldSpec::new("dict"), true)
            }
            (name, _) => match scalar_kind(name) {
                Some(kind) => (FieldSpec::new(kind), true),
                None => match self.struct_key(name) {
                    Some(key) => {
                        let mut spec = FieldSpec::new("nested");
                        spec.schema = Some(key);
                        (spec, true)
                    }
                    None => {
                        debug!("Unknown field type {}, documented without a type", name);
                        (FieldSpec::new("raw"), true)
                    }
                },
            },
        }
    }

    /// Catalog key of a struct, preferring one declared in the same module.
    fn struct_key(&self, ident: &str) -> Option<String> {
        let local = self.modules.iter().any(|source| {
            source.module == self.module
                && source.syntax_tree.items.iter().any(
                    |item| matches!(item, syn::Item::Struct(s) if s.ident == ident),
                )
        });
        if local {
            Some(qualified_key(self.module, ident))
        } else {
            self.known.get(ident).cloned()
        }
    }
}

fn first_type_argument(arguments: &syn::PathArguments) -> Option<&syn::Type> {
    if let syn::PathArguments::AngleBracketed(args) = arguments {
        args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
    } else {
        None
    }
}

fn scalar_kind(type_name: &str) -> Option<&'static str> {
    match type_name {
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => Some("integer"),
        "i64" | "i128" | "isize" | "u64" | "u128" | "usize" => Some("long"),
        "f32" => Some("float"),
        "f64" => Some("double"),
        "String" | "str" | "char" => Some("string"),
        "bool" => Some("boolean"),
        "Uuid" => Some("uuid"),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" => Some("date-time"),
        "NaiveDate" | "Date" => Some("date"),
        "NaiveTime" | "Time" => Some("time"),
        "Decimal" => Some("decimal"),
        "Url" => Some("url"),
        _ => None,
    }
}

fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                serde_attrs.rename = Some(value.value());
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                serde_attrs.skip = true;
            } else if meta.path.is_ident("default") {
                serde_attrs.default = true;
                if meta.input.peek(syn::Token![=]) {
                    let _: syn::LitStr = meta.value()?.parse()?;
                }
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
        if let Err(e) = parsed {
            debug!("Ignoring unsupported serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Joined `///` lines of an item, if any.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(doc),
                        ..
                    }),
                ..
            }) => Some(doc.value().trim().to_string()),
            _ => None,
        })
        .collect();

    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
