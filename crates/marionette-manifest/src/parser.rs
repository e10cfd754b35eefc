//! Line-oriented Puppetfile parser.
//!
//! The grammar is small:
//! - `forge '<url>'` sets the registry endpoint
//! - `mod '<author>-<name>'[, '<version>']` declares a forge module
//! - `mod '<slug>', :git => '<url>'[, :ref => '<ref>']` declares a
//!   repository module
//! - `#` lines collect into a comment block attached to the next `mod`;
//!   a blank line discards the pending block
//! - a line containing the dependency sentinel switches to the
//!   pre-resolved dependent-modules section
//!
//! Declarations may wrap: any line that starts none of the productions
//! while a declaration is open is appended to it, whitespace-stripped.

use crate::error::ManifestError;
use marionette_core::Slug;
use marionette_forge::DEFAULT_FORGE_URL;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static FORGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^forge\s+['"]([^'"]+)['"]\s*$"#).unwrap());
static MOD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^mod\s+['"]([^'"]+)['"]\s*(?:,\s*(.*))?$"#).unwrap());
static VERSION_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^['"]([^'"]+)['"]\s*$"#).unwrap());
static GIT_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r#":git\s*=>\s*['"]([^'"]+)['"]"#).unwrap());
static REF_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r#":ref\s*=>\s*['"]([^'"]+)['"]"#).unwrap());

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Line marker separating top-level modules from dependent modules.
    pub dependency_sentinel: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dependency_sentinel: crate::DEFAULT_DEPENDENCY_SENTINEL.to_string(),
        }
    }
}

/// One parsed `mod` declaration, not yet materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDeclaration {
    /// Forge module, optionally pinned to a literal version.
    Forge {
        /// Module slug.
        slug: Slug,
        /// Literal version text, if declared.
        version: Option<String>,
    },
    /// Repository module.
    Repo {
        /// Module slug.
        slug: Slug,
        /// Repository URL.
        url: String,
        /// Ref to check out, if declared.
        reference: Option<String>,
    },
}

impl RawDeclaration {
    /// The declared module's slug.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        match self {
            Self::Forge { slug, .. } | Self::Repo { slug, .. } => slug,
        }
    }
}

/// A declaration plus its attached comment block and source line.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    /// The parsed declaration.
    pub declaration: RawDeclaration,
    /// Comment lines immediately above the declaration, verbatim.
    pub comments: Vec<String>,
    /// 1-based line number of the `mod` keyword.
    pub line: usize,
}

/// A fully parsed manifest.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    /// Forge endpoint (defaults to the public Forge).
    pub forge: Url,
    /// Modules declared above the dependency sentinel.
    pub top_level: Vec<ModuleEntry>,
    /// Modules declared below the dependency sentinel.
    pub dependent: Vec<ModuleEntry>,
}

/// Parse manifest text with the default configuration.
pub fn parse(text: &str) -> Result<ParsedManifest, ManifestError> {
    parse_with_config(text, &ParserConfig::default())
}

/// Parse manifest text.
pub fn parse_with_config(
    text: &str,
    config: &ParserConfig,
) -> Result<ParsedManifest, ManifestError> {
    let mut state = Machine::new(config);
    for (idx, line) in text.lines().enumerate() {
        state.feed(idx + 1, line)?;
    }
    state.finish()
}

struct Pending {
    text: String,
    comments: Vec<String>,
    line: usize,
}

/// Parsing state machine: idle, inside a `mod` declaration, or past the
/// dependency sentinel (which persists for the rest of the file).
struct Machine<'a> {
    config: &'a ParserConfig,
    forge: Url,
    top_level: Vec<ModuleEntry>,
    dependent: Vec<ModuleEntry>,
    in_dependencies: bool,
    pending: Option<Pending>,
    comments: Vec<String>,
}

impl<'a> Machine<'a> {
    fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            forge: Url::parse(DEFAULT_FORGE_URL).expect("default forge URL is valid"),
            top_level: Vec::new(),
            dependent: Vec::new(),
            in_dependencies: false,
            pending: None,
            comments: Vec::new(),
        }
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<(), ManifestError> {
        let trimmed = line.trim();

        if line.contains(&self.config.dependency_sentinel) {
            self.flush()?;
            self.comments.clear();
            self.in_dependencies = true;
            return Ok(());
        }

        if trimmed.is_empty() {
            self.flush()?;
            self.comments.clear();
            return Ok(());
        }

        if trimmed.starts_with('#') {
            self.flush()?;
            self.comments.push(trimmed.to_string());
            return Ok(());
        }

        if trimmed.starts_with("forge") {
            self.flush()?;
            self.comments.clear();
            let captures = FORGE_LINE.captures(trimmed).ok_or(ManifestError::Syntax {
                line: line_no,
                text: line.to_string(),
            })?;
            self.forge = Url::parse(&captures[1]).map_err(|_| ManifestError::Syntax {
                line: line_no,
                text: line.to_string(),
            })?;
            return Ok(());
        }

        if trimmed == "mod" || trimmed.starts_with("mod ") || trimmed.starts_with("mod\t") {
            // Validation happens at flush time: a continuation line may
            // still complete this declaration.
            self.flush()?;
            self.pending = Some(Pending {
                text: trimmed.to_string(),
                comments: std::mem::take(&mut self.comments),
                line: line_no,
            });
            return Ok(());
        }

        // Continuation of an open declaration.
        if let Some(pending) = &mut self.pending {
            pending.text.push_str(trimmed);
            return Ok(());
        }

        Err(ManifestError::Syntax {
            line: line_no,
            text: line.to_string(),
        })
    }

    fn flush(&mut self) -> Result<(), ManifestError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let declaration = parse_declaration(&pending.text, pending.line)?;
        let entry = ModuleEntry {
            declaration,
            comments: pending.comments,
            line: pending.line,
        };

        if self.in_dependencies {
            self.dependent.push(entry);
        } else {
            self.top_level.push(entry);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ParsedManifest, ManifestError> {
        self.flush()?;
        Ok(ParsedManifest {
            forge: self.forge,
            top_level: self.top_level,
            dependent: self.dependent,
        })
    }
}

fn parse_declaration(text: &str, line: usize) -> Result<RawDeclaration, ManifestError> {
    let syntax_error = || ManifestError::Syntax {
        line,
        text: text.to_string(),
    };

    let captures = MOD_LINE.captures(text).ok_or_else(syntax_error)?;
    let slug = Slug::parse(&captures[1]).ok_or_else(syntax_error)?;
    let rest = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");

    if rest.is_empty() {
        return Ok(RawDeclaration::Forge {
            slug,
            version: None,
        });
    }

    if let Some(version) = VERSION_ARG.captures(rest) {
        return Ok(RawDeclaration::Forge {
            slug,
            version: Some(version[1].to_string()),
        });
    }

    if rest.contains(":git") {
        let url = GIT_ARG.captures(rest).ok_or_else(syntax_error)?[1].to_string();
        let reference = REF_ARG.captures(rest).map(|c| c[1].to_string());
        return Ok(RawDeclaration::Repo {
            slug,
            url,
            reference,
        });
    }

    Err(syntax_error())
}
