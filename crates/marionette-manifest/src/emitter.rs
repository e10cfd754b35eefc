//! Canonical manifest emission.
//!
//! Emission is deterministic: forge directive, optional preamble,
//! repository modules then forge modules (each sorted by slug), the
//! dependency sentinel, then dependent modules sorted by slug. Comment
//! blocks are reproduced verbatim above their module. Inline comments
//! from the input are not preserved.
//!
//! Emitting a manifest that already matches this form and reparsing it
//! round-trips byte-for-byte.

use crate::module::{ModuleDecl, ModuleKind};
use std::fmt::Write as _;
use url::Url;

/// A resolved manifest ready for emission.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    /// Forge endpoint.
    pub forge: Url,
    /// Preamble comment block placed above the module list, verbatim.
    pub preamble: Option<String>,
    /// Top-level modules.
    pub top_level: Vec<ModuleDecl>,
    /// Dependent modules.
    pub dependent: Vec<ModuleDecl>,
    /// Sentinel line emitted between the two sections.
    pub dependency_sentinel: String,
}

impl ResolvedManifest {
    /// Render the canonical manifest text.
    #[must_use]
    pub fn emit(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "forge '{}'",
            self.forge.as_str().trim_end_matches('/')
        );
        out.push('\n');

        if let Some(preamble) = &self.preamble {
            for line in preamble.lines() {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        let mut repo: Vec<&ModuleDecl> = self.top_level.iter().filter(|m| m.is_repo()).collect();
        let mut forge: Vec<&ModuleDecl> = self.top_level.iter().filter(|m| !m.is_repo()).collect();
        repo.sort_by(|a, b| a.slug().cmp(b.slug()));
        forge.sort_by(|a, b| a.slug().cmp(b.slug()));

        for module in repo.into_iter().chain(forge) {
            emit_module(&mut out, module);
        }

        out.push('\n');
        out.push_str(&self.dependency_sentinel);
        out.push('\n');

        let mut dependent: Vec<&ModuleDecl> = self.dependent.iter().collect();
        dependent.sort_by(|a, b| a.slug().cmp(b.slug()));
        for module in dependent {
            emit_module(&mut out, module);
        }

        out
    }
}

impl ResolvedManifest {
    /// Rebuild a resolved manifest from parsed text, without retrieving
    /// any metadata. Only meaningful for text that already carries
    /// concrete versions (i.e. previously emitted manifests).
    pub fn from_parsed(
        parsed: &crate::parser::ParsedManifest,
        sentinel: String,
    ) -> Result<Self, crate::error::ManifestError> {
        let rebuild = |entry: &crate::parser::ModuleEntry| -> Result<ModuleDecl, crate::error::ManifestError> {
            use crate::parser::RawDeclaration;
            match &entry.declaration {
                RawDeclaration::Forge { slug, version } => {
                    let version = version
                        .as_ref()
                        .map(|text| {
                            semver::Version::parse(text).map_err(|e| {
                                marionette_core::Error::InvalidVersion {
                                    version: text.clone(),
                                    reason: e.to_string(),
                                }
                            })
                        })
                        .transpose()?;
                    Ok(ModuleDecl::from_parts(
                        slug.clone(),
                        ModuleKind::Forge,
                        version,
                        Some(parsed.forge.clone()),
                        entry.comments.clone(),
                    ))
                }
                RawDeclaration::Repo {
                    slug,
                    url,
                    reference,
                } => Ok(ModuleDecl::from_parts(
                    slug.clone(),
                    ModuleKind::Repo {
                        url: url.clone(),
                        reference: reference.clone(),
                    },
                    None,
                    None,
                    entry.comments.clone(),
                )),
            }
        };

        let top_level = parsed.top_level.iter().map(rebuild).collect::<Result<_, _>>()?;
        let dependent = parsed.dependent.iter().map(rebuild).collect::<Result<_, _>>()?;

        Ok(Self {
            forge: parsed.forge.clone(),
            preamble: None,
            top_level,
            dependent,
            dependency_sentinel: sentinel,
        })
    }
}

fn emit_module(out: &mut String, module: &ModuleDecl) {
    for comment in module.comments() {
        out.push_str(comment);
        out.push('\n');
    }

    match module.kind() {
        ModuleKind::Repo { url, reference } => {
            let _ = write!(out, "mod '{}', :git => '{}'", module.slug(), url);
            if let Some(reference) = reference {
                let _ = write!(out, ", :ref => '{reference}'");
            }
            out.push('\n');
        }
        ModuleKind::Forge => match module.version() {
            Some(version) => {
                let _ = writeln!(out, "mod '{}', '{}'", module.slug(), version);
            }
            None => {
                let _ = writeln!(out, "mod '{}'", module.slug());
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use marionette_core::{Slug, Version};
    use pretty_assertions::assert_eq;

    fn forge_decl(slug: &str, version: &str, comments: &[&str]) -> ModuleDecl {
        ModuleDecl::from_parts(
            Slug::parse(slug).unwrap(),
            ModuleKind::Forge,
            Some(Version::parse(version).unwrap()),
            None,
            comments.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn emits_sections_in_canonical_order() {
        let manifest = ResolvedManifest {
            forge: Url::parse("https://forge.example.com").unwrap(),
            preamble: None,
            top_level: vec![
                forge_decl("zzz-last", "1.0.0", &[]),
                ModuleDecl::from_parts(
                    Slug::parse("acme-repo").unwrap(),
                    ModuleKind::Repo {
                        url: "https://git.example.com/repo.git".to_string(),
                        reference: Some("v2".to_string()),
                    },
                    None,
                    None,
                    Vec::new(),
                ),
                forge_decl("puppetlabs-stdlib", "8.5.0", &["# the standard library"]),
            ],
            dependent: vec![forge_decl("acme-dep", "0.3.0", &[])],
            dependency_sentinel: "## dependencies".to_string(),
        };

        assert_eq!(
            manifest.emit(),
            "forge 'https://forge.example.com'\n\
             \n\
             mod 'acme-repo', :git => 'https://git.example.com/repo.git', :ref => 'v2'\n\
             # the standard library\n\
             mod 'puppetlabs-stdlib', '8.5.0'\n\
             mod 'zzz-last', '1.0.0'\n\
             \n\
             ## dependencies\n\
             mod 'acme-dep', '0.3.0'\n"
        );
    }

    #[test]
    fn preamble_is_reproduced_verbatim() {
        let manifest = ResolvedManifest {
            forge: Url::parse("https://forge.example.com").unwrap(),
            preamble: Some("# managed by marionette\n# do not edit".to_string()),
            top_level: vec![forge_decl("acme-a", "1.0.0", &[])],
            dependent: Vec::new(),
            dependency_sentinel: "## dependencies".to_string(),
        };

        let text = manifest.emit();
        assert!(text.contains("\n# managed by marionette\n# do not edit\n\n"));
    }

    #[test]
    fn canonical_text_round_trips_byte_for_byte() {
        let input = "forge 'https://forge.example.com'\n\
             \n\
             mod 'acme-repo', :git => 'https://git.example.com/repo.git', :ref => 'v2'\n\
             # the standard library\n\
             # pinned by operations\n\
             mod 'puppetlabs-stdlib', '8.5.0'\n\
             mod 'zzz-last', '1.0.0'\n\
             \n\
             ## dependencies\n\
             # discovered dependency\n\
             mod 'acme-dep', '0.3.0'\n";

        let parsed = parse(input).unwrap();
        let rebuilt =
            ResolvedManifest::from_parsed(&parsed, "## dependencies".to_string()).unwrap();
        assert_eq!(rebuilt.emit(), input);
    }

    #[test]
    fn emission_is_idempotent() {
        let manifest = ResolvedManifest {
            forge: Url::parse("https://forge.example.com").unwrap(),
            preamble: None,
            top_level: vec![
                forge_decl("b-two", "2.0.0", &[]),
                forge_decl("a-one", "1.0.0", &[]),
            ],
            dependent: vec![forge_decl("c-three", "3.0.0", &[])],
            dependency_sentinel: "## dependencies".to_string(),
        };

        let once = manifest.emit();
        let reparsed = parse(&once).unwrap();
        let rebuilt =
            ResolvedManifest::from_parsed(&reparsed, "## dependencies".to_string()).unwrap();
        assert_eq!(rebuilt.emit(), once);
    }
}
