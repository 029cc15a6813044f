//! Hyperlink, include and xref resolution.
//!
//! [`LinkResolver`] sits on top of [`FileResolver`] and owns the side effects
//! of a successful resolution:
//!
//! - newly discovered documents go into the [`WorkQueue`]
//! - every edge goes into the [`DependencyMapBuilder`]
//! - fragments are registered with the [`BookmarkValidator`]
//!
//! Per-link problems never abort the build. They are pushed into the
//! diagnostics of the [`RenderContext`] and the link keeps a best-effort href.

use std::sync::Arc;

use crate::core::url::{decode, relative_url, split_url};
use crate::core::{ContentType, LinkKind, PathError};
use crate::dependency::{DependencyMapBuilder, DependencyType};
use crate::diagnostic::{Code, Diagnostic, SourceInfo};
use crate::docset::{Docset, Document};
use crate::error::BuildError;
use crate::queue::WorkQueue;

use super::bookmark::{BookmarkReference, BookmarkValidator};
use super::context::RenderContext;
use super::file::{FileLookup, FileResolver};
use super::xref::{XrefResolver, split_xref};

// ============================================================================
// Link model
// ============================================================================

/// How a rendered href relates to the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    External,
    /// Site-root absolute (`/a/b`), never rewritten.
    AbsolutePath,
    /// Points at a document of this build; may be made page-relative.
    RelativePath,
    /// Same page: only query and fragment.
    SelfBookmark,
    WindowsAbsolutePath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub href: String,
    pub link_type: LinkType,
    /// The document the link points at, when it resolved to one.
    pub target: Option<Document>,
    /// Display text suggested by an xref.
    pub display: Option<String>,
}

impl ResolvedLink {
    fn new(href: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            href: href.into(),
            link_type,
            target: None,
            display: None,
        }
    }

    fn to(mut self, target: Document) -> Self {
        self.target = Some(target);
        self
    }
}

/// Outcome of resolving the path part of a file-relative href.
#[derive(Debug)]
enum Resolution {
    Resolved(Document),
    Redirected(Document),
    OutOfScope(Document),
    SelfBookmark(Document),
    NotFound,
    InvalidPath(PathError),
}

/// Where a reference was written, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct LinkSource<'a> {
    pub file: &'a Document,
    pub line: Option<usize>,
}

impl<'a> LinkSource<'a> {
    pub fn new(file: &'a Document, line: Option<usize>) -> Self {
        Self { file, line }
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            file: self.file.address.clone(),
            line: self.line,
        }
    }
}

// ============================================================================
// LinkResolver
// ============================================================================

pub struct LinkResolver {
    files: FileResolver,
    xref: Arc<dyn XrefResolver>,
    queue: WorkQueue,
    dependencies: DependencyMapBuilder,
    bookmarks: BookmarkValidator,
}

impl LinkResolver {
    pub fn new(docset: Arc<Docset>, xref: Arc<dyn XrefResolver>) -> Self {
        Self {
            files: FileResolver::new(docset),
            xref,
            queue: WorkQueue::new(),
            dependencies: DependencyMapBuilder::new(),
            bookmarks: BookmarkValidator::new(),
        }
    }

    pub fn docset(&self) -> &Docset {
        self.files.docset()
    }

    pub fn files(&self) -> &FileResolver {
        &self.files
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn dependencies(&self) -> &DependencyMapBuilder {
        &self.dependencies
    }

    pub fn bookmarks(&self) -> &BookmarkValidator {
        &self.bookmarks
    }

    /// Read an included file.
    ///
    /// Returns `None` after reporting a diagnostic when the include cannot
    /// be used. Includes never follow redirections.
    pub fn resolve_content(
        &self,
        href: &str,
        source: LinkSource<'_>,
        ctx: &RenderContext<'_>,
        kind: DependencyType,
    ) -> Result<Option<(String, Document)>, BuildError> {
        let (path, _, _) = split_url(href.trim());
        let path = decode(path);
        let referencing = source.file;

        let doc = match self
            .files
            .try_resolve_relative_path(&referencing.address, &path, true)?
        {
            FileLookup::Found(doc) => doc,
            FileLookup::NotFound => {
                report(ctx, source, Code::IncludeNotFound, format!("Cannot resolve include '{href}'"));
                return Ok(None);
            }
            FileLookup::InvalidPath(err) => {
                report(ctx, source, Code::InvalidPath, format!("Invalid include '{href}': {err}"));
                return Ok(None);
            }
        };

        if doc.content_type == ContentType::Redirection {
            report(
                ctx,
                source,
                Code::IncludeRedirection,
                format!("Cannot include '{href}': it is a redirection to '{}'", doc.site_url),
            );
            return Ok(None);
        }
        if ctx.is_active(&doc.address) {
            report(
                ctx,
                source,
                Code::CircularReference,
                format!("Circular include: '{}' includes itself", doc.address),
            );
            return Ok(None);
        }

        let text = match self.docset().read_text(&doc.address) {
            Ok(text) => text,
            Err(BuildError::Io(_, err)) if err.kind() == std::io::ErrorKind::NotFound => {
                report(ctx, source, Code::IncludeNotFound, format!("Cannot read include '{href}'"));
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        self.dependencies
            .add_dependency_item(referencing, Some(&doc), kind);
        Ok(Some((text, doc)))
    }

    /// Resolve an href to an absolute site URL.
    pub fn resolve_absolute_link(
        &self,
        href: &str,
        source: LinkSource<'_>,
        ctx: &RenderContext<'_>,
    ) -> Result<ResolvedLink, BuildError> {
        match LinkKind::parse(href) {
            LinkKind::Empty => self.resolve_file_link("#", source, ctx),
            LinkKind::Xref(uid) => Ok(self.resolve_xref(href, uid, source, ctx)),
            LinkKind::WindowsAbsolute(path) => {
                report(
                    ctx,
                    source,
                    Code::LocalFilePath,
                    format!("Link '{path}' points to a local file path"),
                );
                Ok(ResolvedLink::new("", LinkType::WindowsAbsolutePath))
            }
            LinkKind::External(url) => Ok(ResolvedLink::new(url, LinkType::External)),
            LinkKind::SiteRoot(url) => Ok(ResolvedLink::new(url, LinkType::AbsolutePath)),
            LinkKind::FileRelative(href) => self.resolve_file_link(href, source, ctx),
        }
    }

    /// Like [`Self::resolve_absolute_link`], with links into this build made
    /// relative to the output location of `relative_to`.
    pub fn resolve_relative_link(
        &self,
        relative_to: &Document,
        href: &str,
        source: LinkSource<'_>,
        ctx: &RenderContext<'_>,
    ) -> Result<ResolvedLink, BuildError> {
        let mut link = self.resolve_absolute_link(href, source, ctx)?;
        if link.link_type == LinkType::RelativePath && link.href.starts_with('/') {
            link.href = relative_url(&relative_to.site_url, &link.href);
        }
        Ok(link)
    }

    fn resolve_xref(
        &self,
        href: &str,
        uid: &str,
        source: LinkSource<'_>,
        ctx: &RenderContext<'_>,
    ) -> ResolvedLink {
        let (uid, fragment) = split_xref(uid);
        let uid = decode(uid);

        let Some(spec) = self.xref.resolve_xref(&uid, source.file) else {
            report(ctx, source, Code::XrefNotFound, format!("Cannot find uid '{uid}'"));
            return ResolvedLink::new(href, LinkType::External);
        };

        let link_type = match spec.declaring {
            Some(_) => LinkType::RelativePath,
            None => LinkType::External,
        };
        let mut link = ResolvedLink::new(format!("{}{fragment}", spec.href), link_type);
        link.display = spec.name;

        if let Some(declaring) = spec.declaring {
            self.dependencies
                .add_dependency_item(source.file, Some(&declaring), DependencyType::Uid);
            self.add_bookmark(source, &declaring, fragment, false);
            link = link.to(declaring);
        }
        link
    }

    fn resolve_file_link(
        &self,
        href: &str,
        source: LinkSource<'_>,
        ctx: &RenderContext<'_>,
    ) -> Result<ResolvedLink, BuildError> {
        let (path, query, fragment) = split_url(href);
        let referencing = source.file;

        let link = match self.resolve_path(&decode(path), referencing, ctx)? {
            Resolution::SelfBookmark(doc) => {
                let href = match format!("{query}{fragment}") {
                    suffix if suffix.is_empty() => doc.site_url.to_string(),
                    suffix => suffix,
                };
                if fragment.len() > 1 {
                    self.dependencies
                        .add_dependency_item(referencing, Some(&doc), DependencyType::Bookmark);
                }
                self.add_bookmark(source, &doc, fragment, true);
                ResolvedLink::new(href, LinkType::SelfBookmark).to(doc)
            }

            Resolution::Redirected(doc) => {
                self.dependencies
                    .add_dependency_item(referencing, Some(&doc), DependencyType::File);
                let link_type = match LinkKind::parse(&doc.site_url) {
                    LinkKind::External(_) => LinkType::External,
                    _ => LinkType::AbsolutePath,
                };
                ResolvedLink::new(format!("{}{query}{fragment}", doc.site_url), link_type).to(doc)
            }

            Resolution::OutOfScope(doc) => {
                report(
                    ctx,
                    source,
                    Code::LinkOutOfScope,
                    format!("Link '{href}' points to '{}', which is excluded from the build", doc.address),
                );
                ResolvedLink::new(href, LinkType::RelativePath)
            }

            Resolution::Resolved(doc) => {
                let url = format!("{}{query}{fragment}", doc.site_url);
                if doc.dependency_name().is_some()
                    && !doc.is_resource()
                    && doc.address.origin != referencing.address.origin
                {
                    report(
                        ctx,
                        source,
                        Code::LinkIntoDependency,
                        format!("Link '{href}' points into dependency docset file '{}'", doc.address),
                    );
                    return Ok(ResolvedLink::new(url, LinkType::RelativePath).to(doc));
                }

                self.queue.enqueue(doc.clone());
                let kind = if fragment.len() > 1 {
                    DependencyType::Bookmark
                } else {
                    DependencyType::File
                };
                self.dependencies
                    .add_dependency_item(referencing, Some(&doc), kind);
                self.add_bookmark(source, &doc, fragment, false);
                ResolvedLink::new(url, LinkType::RelativePath).to(doc)
            }

            Resolution::NotFound => {
                let is_route = referencing.is_landing_page()
                    && !path.rsplit('/').next().is_some_and(|name| name.contains('.'));
                if !is_route {
                    report(ctx, source, Code::FileNotFound, format!("Invalid file link: '{href}'"));
                }
                ResolvedLink::new(href, LinkType::RelativePath)
            }

            Resolution::InvalidPath(err) => {
                report(ctx, source, Code::InvalidPath, format!("Invalid link '{href}': {err}"));
                ResolvedLink::new(href, LinkType::RelativePath)
            }
        };
        Ok(link)
    }

    fn resolve_path(
        &self,
        path: &str,
        referencing: &Document,
        ctx: &RenderContext<'_>,
    ) -> Result<Resolution, BuildError> {
        if path.is_empty() {
            return Ok(Resolution::SelfBookmark(ctx.root().clone()));
        }

        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let lookup_history = ContentType::from_file_name(name) == ContentType::Resource;

        let doc = match self
            .files
            .try_resolve_relative_path(&referencing.address, path, lookup_history)?
        {
            FileLookup::Found(doc) => doc,
            FileLookup::NotFound => return Ok(Resolution::NotFound),
            FileLookup::InvalidPath(err) => return Ok(Resolution::InvalidPath(err)),
        };

        Ok(if doc.address == referencing.address || doc.address == ctx.root().address {
            Resolution::SelfBookmark(doc)
        } else if doc.content_type == ContentType::Redirection {
            Resolution::Redirected(doc)
        } else if self.docset().scope().out_of_scope(&doc) {
            Resolution::OutOfScope(doc)
        } else {
            Resolution::Resolved(doc)
        })
    }

    fn add_bookmark(&self, source: LinkSource<'_>, target: &Document, fragment: &str, is_self: bool) {
        if fragment.len() <= 1 {
            return;
        }
        self.bookmarks.add_bookmark_reference(BookmarkReference {
            referencing: source.file.address.clone(),
            target: target.address.clone(),
            fragment: fragment.to_string(),
            is_self_bookmark: is_self,
            source: source.info(),
        });
    }
}

fn report(ctx: &RenderContext<'_>, source: LinkSource<'_>, code: Code, message: String) {
    ctx.diagnostics()
        .push(Diagnostic::error(code, message).with_source(source.info()));
}

// ============================================================================
// Tests
// ============================================================================
