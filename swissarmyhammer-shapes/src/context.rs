//! ShapesContext, the main API surface for the shapes registry.
//!
//! Manages shape definitions as YAML files under `definitions/` inside the
//! root it is opened with, and derives their restricted forms on demand.
//! Restricted shapes are computed once per definition and cached until any
//! definition changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::classify::ShapeResolver;
use crate::error::{Result, ShapesError};
use crate::restrict::{restrict, RestrictedShape};
use crate::types::ShapeDef;

/// A collection of default shape definitions.
///
/// Consumers build this to pass to `ShapesContextBuilder::with_defaults()`.
/// On open, defaults that don't already exist on disk are written.
pub struct ShapeDefaults {
    shapes: Vec<ShapeDef>,
}

impl ShapeDefaults {
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }

    /// Add a default shape definition.
    pub fn shape(mut self, def: ShapeDef) -> Self {
        self.shapes.push(def);
        self
    }
}

impl Default for ShapeDefaults {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ShapesContext`. Created by `ShapesContext::open()`.
pub struct ShapesContextBuilder {
    root: PathBuf,
    defaults: Option<ShapeDefaults>,
}

impl ShapesContextBuilder {
    /// Provide default shape definitions.
    /// Defaults are seeded on first open; existing definitions are preserved.
    pub fn with_defaults(mut self, defaults: ShapeDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Build the context: create directories, load from disk, seed defaults.
    pub async fn build(self) -> Result<ShapesContext> {
        let root = self.root;
        fs::create_dir_all(root.join("definitions")).await?;

        let mut ctx = ShapesContext {
            root,
            shapes: Vec::new(),
            name_index: HashMap::new(),
            sources: HashMap::new(),
            restricted: Mutex::new(HashMap::new()),
        };
        ctx.load_definitions().await?;

        if let Some(defaults) = self.defaults {
            ctx.seed_defaults(defaults).await?;
        }

        debug!(shapes = ctx.shapes.len(), "shapes context opened");
        Ok(ctx)
    }
}

/// Context for shape definitions.
///
/// Owns the root directory it was opened with:
/// ```text
/// <root>/
///   definitions/    ← one .yaml per shape
/// ```
///
/// A shape is keyed by the `name` inside its file, not by the file name.
/// The file each shape was loaded from is remembered so updates and
/// deletes touch that file.
pub struct ShapesContext {
    root: PathBuf,
    shapes: Vec<ShapeDef>,
    name_index: HashMap<String, usize>,
    sources: HashMap<String, PathBuf>,
    restricted: Mutex<HashMap<String, Arc<RestrictedShape>>>,
}

impl ShapesContext {
    /// Open or create a shapes directory. Returns a builder for optional configuration.
    ///
    /// ```rust,ignore
    /// let ctx = ShapesContext::open(path)
    ///     .with_defaults(my_defaults())
    ///     .build()
    ///     .await?;
    /// let account = ctx.restricted("account")?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> ShapesContextBuilder {
        ShapesContextBuilder {
            root: root.into(),
            defaults: None,
        }
    }

    pub fn get_shape(&self, name: &str) -> Option<&ShapeDef> {
        self.name_index.get(name).map(|&i| &self.shapes[i])
    }

    pub fn all_shapes(&self) -> &[ShapeDef] {
        &self.shapes
    }

    /// Write (create or update) a shape definition. Persists to YAML immediately.
    pub async fn write_shape(&mut self, def: &ShapeDef) -> Result<()> {
        validate_name(&def.name)?;
        let yaml = serde_yaml_ng::to_string(def)?;
        let path = self.source_path(&def.name);
        atomic_write(&path, yaml.as_bytes()).await?;
        self.sources.insert(def.name.clone(), path);

        if let Some(&idx) = self.name_index.get(&def.name) {
            self.shapes[idx] = def.clone();
        } else {
            let idx = self.shapes.len();
            self.shapes.push(def.clone());
            self.name_index.insert(def.name.clone(), idx);
        }
        self.invalidate();
        Ok(())
    }

    /// Delete a shape definition by name.
    pub async fn delete_shape(&mut self, name: &str) -> Result<()> {
        let idx = self
            .name_index
            .get(name)
            .copied()
            .ok_or_else(|| ShapesError::ShapeNotFound {
                name: name.to_string(),
            })?;

        let path = self.source_path(name);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, name, "shape file already gone");
            }
            Err(e) => return Err(e.into()),
        }
        self.name_index.remove(name);
        self.sources.remove(name);

        // Swap-remove and fix the moved entry's index
        self.shapes.swap_remove(idx);
        if idx < self.shapes.len() {
            self.name_index.insert(self.shapes[idx].name.clone(), idx);
        }
        self.invalidate();
        Ok(())
    }

    /// The restricted form of a registered shape.
    ///
    /// Derived on first request and shared afterwards; the same `Arc` is
    /// returned until a definition is written or deleted.
    pub fn restricted(&self, name: &str) -> Result<Arc<RestrictedShape>> {
        let def = self
            .get_shape(name)
            .ok_or_else(|| ShapesError::ShapeNotFound {
                name: name.to_string(),
            })?;

        let mut cache = self
            .restricted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(name) {
            return Ok(Arc::clone(hit));
        }
        let derived = Arc::new(restrict(def, self));
        cache.insert(name.to_string(), Arc::clone(&derived));
        Ok(derived)
    }

    /// The root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // --- Internal ---

    fn invalidate(&self) {
        // A change to one shape can alter every shape that references it.
        self.restricted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// The file a shape was loaded from, or where a new one belongs.
    fn source_path(&self, name: &str) -> PathBuf {
        self.sources
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.root.join("definitions").join(format!("{name}.yaml")))
    }

    /// Write defaults whose name is not already loaded, whatever file holds it.
    async fn seed_defaults(&mut self, defaults: ShapeDefaults) -> Result<()> {
        for def in defaults.shapes {
            if self.name_index.contains_key(&def.name) {
                continue;
            }
            self.write_shape(&def).await?;
            debug!(name = %def.name, "seeded default shape");
        }
        Ok(())
    }

    async fn load_definitions(&mut self) -> Result<()> {
        let defs_dir = self.root.join("definitions");
        let mut entries = fs::read_dir(&defs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_yaml_ng::from_str::<ShapeDef>(&content) {
                Ok(def) => {
                    if self.name_index.contains_key(&def.name) {
                        warn!(?path, name = %def.name, "skipping duplicate shape definition");
                        continue;
                    }
                    let idx = self.shapes.len();
                    self.name_index.insert(def.name.clone(), idx);
                    self.sources.insert(def.name.clone(), path);
                    self.shapes.push(def);
                }
                Err(e) => {
                    warn!(?path, %e, "skipping invalid shape definition");
                }
            }
        }
        Ok(())
    }
}

impl ShapeResolver for ShapesContext {
    fn resolve(&self, name: &str) -> Option<&ShapeDef> {
        self.get_shape(name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(ShapesError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Write to a temp file then rename for atomic persistence.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restrict::FieldKind;
    use crate::types::TypeDesc;
    use tempfile::TempDir;

    fn sample_defaults() -> ShapeDefaults {
        ShapeDefaults::new()
            .shape(
                ShapeDef::new("profile")
                    .field("display_name", TypeDesc::String)
                    .field("joined", TypeDesc::opaque("date")),
            )
            .shape(
                ShapeDef::new("account")
                    .field("username", TypeDesc::String)
                    .field("profile", TypeDesc::reference("profile")),
            )
    }

    #[tokio::test]
    async fn open_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("shapes");
        let ctx = ShapesContext::open(&root).build().await.unwrap();
        assert!(root.join("definitions").is_dir());
        assert!(ctx.all_shapes().is_empty());
        assert_eq!(ctx.root(), root.as_path());
    }

    #[tokio::test]
    async fn write_and_read_shape() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("shapes");
        let mut ctx = ShapesContext::open(&root).build().await.unwrap();

        let shape = ShapeDef::new("point")
            .field("x", TypeDesc::Number)
            .field("y", TypeDesc::Number);
        ctx.write_shape(&shape).await.unwrap();

        assert_eq!(ctx.get_shape("point"), Some(&shape));
        assert!(root.join("definitions/point.yaml").exists());
    }

    #[tokio::test]
    async fn write_rejects_path_like_names() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        for bad in ["", "../up", "a/b", ".hidden"] {
            let err = ctx.write_shape(&ShapeDef::new(bad)).await.unwrap_err();
            assert!(matches!(err, ShapesError::InvalidName { .. }), "{bad}");
        }
    }

    #[tokio::test]
    async fn delete_shape_fixes_indexes() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        for name in ["a", "b", "c"] {
            ctx.write_shape(&ShapeDef::new(name)).await.unwrap();
        }
        ctx.delete_shape("a").await.unwrap();

        assert!(ctx.get_shape("a").is_none());
        assert_eq!(ctx.get_shape("b").unwrap().name, "b");
        assert_eq!(ctx.get_shape("c").unwrap().name, "c");
        assert!(!tmp.path().join("definitions/a.yaml").exists());
    }

    #[tokio::test]
    async fn delete_removes_file_named_differently_from_shape() {
        let tmp = TempDir::new().unwrap();
        let defs = tmp.path().join("definitions");
        std::fs::create_dir_all(&defs).unwrap();
        std::fs::write(defs.join("Account.yaml"), "name: account\nfields: {}\n").unwrap();

        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        assert!(ctx.get_shape("account").is_some());
        ctx.delete_shape("account").await.unwrap();
        assert!(!defs.join("Account.yaml").exists());

        let ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        assert!(ctx.get_shape("account").is_none());
    }

    #[tokio::test]
    async fn update_rewrites_original_file() {
        let tmp = TempDir::new().unwrap();
        let defs = tmp.path().join("definitions");
        std::fs::create_dir_all(&defs).unwrap();
        std::fs::write(defs.join("Account.yaml"), "name: account\nfields: {}\n").unwrap();

        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        ctx.write_shape(&ShapeDef::new("account").field("username", TypeDesc::String))
            .await
            .unwrap();
        assert!(!defs.join("account.yaml").exists());

        let ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        assert_eq!(ctx.all_shapes().len(), 1);
        assert!(ctx.get_shape("account").unwrap().fields.contains_key("username"));
    }

    #[tokio::test]
    async fn delete_reports_io_errors() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        ctx.write_shape(&ShapeDef::new("tag")).await.unwrap();

        // A directory where the file should be cannot be removed as a file.
        let path = tmp.path().join("definitions/tag.yaml");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = ctx.delete_shape("tag").await.unwrap_err();
        assert!(matches!(err, ShapesError::Io(_)));
        assert!(ctx.get_shape("tag").is_some());
    }

    #[tokio::test]
    async fn delete_nonexistent_shape_errors() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        let err = ctx.delete_shape("ghost").await.unwrap_err();
        assert!(matches!(err, ShapesError::ShapeNotFound { .. }));
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("shapes");
        {
            let mut ctx = ShapesContext::open(&root).build().await.unwrap();
            ctx.write_shape(&ShapeDef::new("tag").field("name", TypeDesc::String))
                .await
                .unwrap();
        }
        let ctx = ShapesContext::open(&root).build().await.unwrap();
        assert_eq!(ctx.get_shape("tag").unwrap().fields["name"], TypeDesc::String);
    }

    #[test_log::test(tokio::test)]
    async fn invalid_yaml_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let defs = tmp.path().join("definitions");
        std::fs::create_dir_all(&defs).unwrap();
        std::fs::write(defs.join("broken.yaml"), "fields: [not, a, map").unwrap();
        std::fs::write(defs.join("notes.txt"), "ignored").unwrap();
        std::fs::write(defs.join("ok.yaml"), "name: ok\nfields:\n  a:\n    kind: string\n").unwrap();

        let ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        assert_eq!(ctx.all_shapes().len(), 1);
        assert!(ctx.get_shape("ok").is_some());
    }

    #[tokio::test]
    async fn first_open_seeds_defaults() {
        let tmp = TempDir::new().unwrap();
        let ctx = ShapesContext::open(tmp.path())
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();
        assert_eq!(ctx.all_shapes().len(), 2);
        assert!(tmp.path().join("definitions/account.yaml").exists());
    }

    #[tokio::test]
    async fn user_modified_definitions_preserved() {
        let tmp = TempDir::new().unwrap();
        {
            let mut ctx = ShapesContext::open(tmp.path())
                .with_defaults(sample_defaults())
                .build()
                .await
                .unwrap();
            let custom = ShapeDef::new("profile").field("display_name", TypeDesc::String);
            ctx.write_shape(&custom).await.unwrap();
        }
        let ctx = ShapesContext::open(tmp.path())
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();
        assert!(!ctx.get_shape("profile").unwrap().fields.contains_key("joined"));
    }

    #[tokio::test]
    async fn defaults_match_loaded_shapes_by_name() {
        let tmp = TempDir::new().unwrap();
        let defs = tmp.path().join("definitions");
        std::fs::create_dir_all(&defs).unwrap();
        std::fs::write(defs.join("Account.yaml"), "name: account\nfields: {}\n").unwrap();

        let ctx = ShapesContext::open(tmp.path())
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();
        assert!(!defs.join("account.yaml").exists());
        assert!(ctx.get_shape("account").unwrap().fields.is_empty());
        assert!(defs.join("profile.yaml").exists());
    }

    #[tokio::test]
    async fn restricted_is_cached_per_definition() {
        let tmp = TempDir::new().unwrap();
        let ctx = ShapesContext::open(tmp.path())
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        let first = ctx.restricted("account").unwrap();
        let second = ctx.restricted("account").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.widened_paths(), vec!["profile.joined"]);
    }

    #[tokio::test]
    async fn writes_invalidate_dependent_restrictions() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ShapesContext::open(tmp.path())
            .with_defaults(sample_defaults())
            .build()
            .await
            .unwrap();

        let before = ctx.restricted("account").unwrap();
        assert_eq!(before.fields["profile"].kind(), FieldKind::Nested);

        // Making the referenced shape JSON-safe lets the account keep its ref.
        ctx.write_shape(&ShapeDef::new("profile").field("display_name", TypeDesc::String))
            .await
            .unwrap();
        let after = ctx.restricted("account").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.fields["profile"].kind(), FieldKind::Preserved);
    }

    #[tokio::test]
    async fn restricted_unknown_shape_errors() {
        let tmp = TempDir::new().unwrap();
        let ctx = ShapesContext::open(tmp.path()).build().await.unwrap();
        assert!(matches!(
            ctx.restricted("nope"),
            Err(ShapesError::ShapeNotFound { .. })
        ));
    }
}
