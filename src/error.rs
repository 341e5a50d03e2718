//! Error and diagnostic types shared by every pipeline stage.
//!
//! Validation problems are collected as [`Diagnostic`]s inside a
//! [`ValidationReport`] so a single run can surface every defect of a
//! configuration. Everything that stops the pipeline outright is a
//! [`GenerateError`].

use std::fmt;
use std::path::PathBuf;

/// Exit code for a configuration that failed validation.
pub const EXIT_VALIDATION: i32 = 1;
/// Exit code for unreadable input or an unusable output location.
pub const EXIT_IO: i32 = 2;

/// Classification of a diagnostic or fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Missing or malformed section, unsupported schema version
    Schema,
    /// Dangling reference between routers, links, roles, owners or scenarios
    Referential,
    /// ASN, address or prefix outside its allowed bounds, or malformed
    Range,
    /// Duplicate name, management IP or router-id
    Uniqueness,
    /// Link subnet too small for the routers attached to it
    Capacity,
    /// Unreadable configuration or unwritable output location
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Referential => "ReferentialError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Uniqueness => "UniquenessError",
            ErrorKind::Capacity => "CapacityError",
            ErrorKind::Io => "IOError",
        };
        f.write_str(name)
    }
}

/// Kind of configuration entity a diagnostic points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Lab,
    Metadata,
    Role,
    Router,
    Link,
    PrefixOwner,
    Scenario,
    Service,
    PcapPipeline,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Lab => "lab",
            EntityKind::Metadata => "metadata",
            EntityKind::Role => "role",
            EntityKind::Router => "router",
            EntityKind::Link => "link",
            EntityKind::PrefixOwner => "prefix_owner",
            EntityKind::Scenario => "scenario",
            EntityKind::Service => "service",
            EntityKind::PcapPipeline => "pcap_pipeline",
        };
        f.write_str(name)
    }
}

/// Where in the configuration a problem was found: entity kind, entity
/// name and, when it applies, the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub entity: EntityKind,
    pub name: String,
    pub field: Option<String>,
}

impl Locator {
    pub fn new(entity: EntityKind, name: impl Into<String>) -> Self {
        Locator {
            entity,
            name: name.into(),
            field: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.entity, self.name)?;
        if let Some(field) = &self.field {
            write!(f, " field '{}'", field)?;
        }
        Ok(())
    }
}

/// One problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub locator: Locator,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, locator: Locator, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            locator,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.locator, self.message)
    }
}

/// Ordered list of diagnostics produced by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn push(&mut self, kind: ErrorKind, locator: Locator, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(kind, locator, message));
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns true if at least one diagnostic has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.diagnostics.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Errors that stop a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("schema error in section '{section}' (expected schema version {expected_version}): {message}")]
    Schema {
        section: String,
        expected_version: u32,
        message: String,
    },

    #[error("configuration failed validation with {} diagnostic(s)", .0.len())]
    Validation(ValidationReport),

    #[error("link '{link}' has {attached} attached router(s) but {subnet} only has {usable} usable host address(es)")]
    Capacity {
        link: String,
        subnet: String,
        attached: usize,
        usable: u64,
    },

    #[error("address conflict on link '{link}': {message}")]
    AddressConflict { link: String, message: String },

    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory '{}' is not empty (use --force to overwrite)", path.display())]
    OutputNotEmpty { path: PathBuf },

    #[error("failed to render {artifact}: {message}")]
    Render { artifact: String, message: String },
}

impl GenerateError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Error kind used when reporting this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::Schema { .. } => ErrorKind::Schema,
            GenerateError::Validation(report) => report
                .diagnostics()
                .first()
                .map(|d| d.kind)
                .unwrap_or(ErrorKind::Schema),
            GenerateError::Capacity { .. } | GenerateError::AddressConflict { .. } => {
                ErrorKind::Capacity
            }
            GenerateError::Io { .. }
            | GenerateError::OutputNotEmpty { .. }
            | GenerateError::Render { .. } => ErrorKind::Io,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => EXIT_IO,
            _ => EXIT_VALIDATION,
        }
    }

    /// Flattens the error into diagnostics with locators, for printing.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            GenerateError::Validation(report) => report.diagnostics().to_vec(),
            GenerateError::Schema { section, message, expected_version } => vec![Diagnostic::new(
                ErrorKind::Schema,
                Locator::new(EntityKind::Lab, section.clone()),
                format!("{} (expected schema version {})", message, expected_version),
            )],
            GenerateError::Capacity { link, .. }
            | GenerateError::AddressConflict { link, .. } => vec![Diagnostic::new(
                ErrorKind::Capacity,
                Locator::new(EntityKind::Link, link.clone()).field("ipv4_subnet"),
                self.to_string(),
            )],
            other => vec![Diagnostic::new(
                ErrorKind::Io,
                Locator::new(EntityKind::Lab, "output"),
                other.to_string(),
            )],
        }
    }
}
