//! Ignition documents and the helpers that fill them from templates
//!
//! Generators render embedded minijinja templates into storage files and
//! systemd units, then encode the document as JSON.

pub mod aio;
pub mod bootstrap_in_place;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use forge_asset::{AssetFile, GenerateError, LoadError};
use minijinja::{Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};

/// Ignition spec version written into generated documents
pub const IGNITION_VERSION: &str = "3.1.0";

const DATA_URL_PREFIX: &str = "data:text/plain;charset=utf-8;base64,";

/// Root of an Ignition document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnitionConfig {
    /// Document metadata
    pub ignition: Ignition,
    /// Users
    #[serde(default, skip_serializing_if = "Passwd::is_empty")]
    pub passwd: Passwd,
    /// Files
    #[serde(default, skip_serializing_if = "Storage::is_empty")]
    pub storage: Storage,
    /// Units
    #[serde(default, skip_serializing_if = "Systemd::is_empty")]
    pub systemd: Systemd,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            ignition: Ignition {
                version: IGNITION_VERSION.to_string(),
            },
            passwd: Passwd::default(),
            storage: Storage::default(),
            systemd: Systemd::default(),
        }
    }
}

/// Ignition metadata section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignition {
    /// Spec version
    pub version: String,
}

/// Users section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passwd {
    /// Users to create or amend
    #[serde(default)]
    pub users: Vec<PasswdUser>,
}

impl Passwd {
    fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// One user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswdUser {
    /// Login name
    pub name: String,
    /// Authorised public keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
}

/// Storage section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Files to write
    #[serde(default)]
    pub files: Vec<File>,
}

impl Storage {
    fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A file written on first boot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Absolute path on the host
    pub path: String,
    /// Replace an existing file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
    /// Permission bits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    /// File contents
    #[serde(default)]
    pub contents: Resource,
}

impl File {
    /// Decoded contents, when the source is an embedded data URL
    #[must_use]
    pub fn decoded(&self) -> Option<Vec<u8>> {
        let encoded = self.contents.source.as_deref()?.strip_prefix(DATA_URL_PREFIX)?;
        STANDARD.decode(encoded).ok()
    }
}

/// File contents reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Data URL or remote location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Systemd section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Systemd {
    /// Units to install
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Systemd {
    fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// A systemd unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit name, e.g. `kubelet.service`
    pub name: String,
    /// Enable the unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Unit file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

impl IgnitionConfig {
    /// Names of enabled units, in document order
    pub fn enabled_units(&self) -> impl Iterator<Item = &str> {
        self.systemd
            .units
            .iter()
            .filter(|u| u.enabled == Some(true))
            .map(|u| u.name.as_str())
    }

    /// Look up a storage file by host path
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&File> {
        self.storage.files.iter().find(|f| f.path == path)
    }

    /// Append a file with embedded contents
    pub fn add_file(&mut self, path: impl Into<String>, mode: u32, contents: &[u8]) {
        self.storage.files.push(File {
            path: path.into(),
            overwrite: Some(true),
            mode: Some(mode),
            contents: Resource {
                source: Some(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(contents))),
            },
        });
    }

    /// Authorise `ssh_key` for `user`, creating the user entry if needed
    pub fn add_ssh_key(&mut self, user: &str, ssh_key: &str) {
        if ssh_key.is_empty() {
            return;
        }
        match self.passwd.users.iter_mut().find(|u| u.name == user) {
            Some(existing) => existing.ssh_authorized_keys.push(ssh_key.to_string()),
            None => self.passwd.users.push(PasswdUser {
                name: user.to_string(),
                ssh_authorized_keys: vec![ssh_key.to_string()],
            }),
        }
    }
}

/// Template for a storage file
#[derive(Debug, Clone, Copy)]
pub struct FileTemplate {
    /// Host path
    pub path: &'static str,
    /// Permission bits
    pub mode: u32,
    /// minijinja source
    pub source: &'static str,
}

/// Template for a systemd unit
#[derive(Debug, Clone, Copy)]
pub struct UnitTemplate {
    /// Unit name
    pub name: &'static str,
    /// minijinja source
    pub source: &'static str,
}

/// Strict minijinja environment; undefined variables are errors
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    /// Renderer with strict undefined handling
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Render one template
    ///
    /// # Errors
    /// Returns [`GenerateError::Render`] for syntax errors or undefined variables.
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        source: &str,
        data: S,
    ) -> Result<String, GenerateError> {
        self.env
            .render_str(source, data)
            .map_err(|e| GenerateError::Render {
                template: name.to_string(),
                source: Box::new(e),
            })
    }
}

/// Render `templates` and append them to the storage section
///
/// # Errors
/// Returns [`GenerateError::Render`] for the first template that fails.
pub fn add_storage_files<S: Serialize>(
    config: &mut IgnitionConfig,
    renderer: &Renderer,
    templates: &[FileTemplate],
    data: &S,
) -> Result<(), GenerateError> {
    for template in templates {
        let rendered = renderer.render(template.path, template.source, data)?;
        config.add_file(template.path, template.mode, rendered.as_bytes());
    }
    Ok(())
}

/// Render `templates` into units; those named in `enabled` are enabled
///
/// # Errors
/// Returns [`GenerateError::Render`] for the first template that fails.
pub fn add_systemd_units<S: Serialize>(
    config: &mut IgnitionConfig,
    renderer: &Renderer,
    templates: &[UnitTemplate],
    data: &S,
    enabled: &[&str],
) -> Result<(), GenerateError> {
    for template in templates {
        let contents = renderer.render(template.name, template.source, data)?;
        config.systemd.units.push(Unit {
            name: template.name.to_string(),
            enabled: enabled.contains(&template.name).then_some(true),
            contents: Some(contents),
        });
    }
    Ok(())
}

/// Copy emitted asset files beneath `root` on the host
pub fn add_asset_files(config: &mut IgnitionConfig, root: &str, files: &[AssetFile]) {
    for file in files {
        let mode = if file.filename.ends_with(".key") { 0o600 } else { 0o644 };
        config.add_file(format!("{root}/{}", file.filename), mode, &file.data);
    }
}

/// Encode `config` as the file `filename`
///
/// # Errors
/// Returns [`GenerateError::Encode`] if serialization fails.
pub fn encode(config: &IgnitionConfig, filename: &str) -> Result<AssetFile, GenerateError> {
    let data = serde_json::to_vec(config).map_err(|e| GenerateError::Encode {
        what: filename.to_string(),
        source: Box::new(e),
    })?;
    Ok(AssetFile::new(filename, data))
}

/// Parse a previously emitted Ignition file
///
/// # Errors
/// Returns [`LoadError::Parse`] when the file is not a valid document.
pub fn decode(file: &AssetFile) -> Result<IgnitionConfig, LoadError> {
    serde_json::from_slice(&file.data).map_err(|e| LoadError::parse(&file.filename, e))
}
