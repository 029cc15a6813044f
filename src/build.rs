//! Docset building orchestration.
//!
//! Build phases:
//! - **Init** - Locator, docset index, scope, redirections, xref map
//! - **Seed** - In-scope master content, resources and tables of contents
//! - **Waves** - Drain the work queue and build each wave in parallel; links
//!   discovered while building enqueue more documents
//! - **Validate** - Bookmark validation, strictly after every wave finished
//! - **Finalize** - Freeze the dependency map
//!
//! Cancellation is observed between waves. Work already started completes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::DocsetConfig;
use crate::core::{ContentType, PathAddress};
use crate::dependency::{DependencyMap, DependencyType};
use crate::diagnostic::{Code, Diagnostic, Diagnostics};
use crate::docset::{Docset, Document};
use crate::error::BuildError;
use crate::logger::ProgressLine;
use crate::markup::{
    LinkSink, MarkdownRenderer, MarkupRenderer, RenderOutput, StructuredRef, structured_refs,
};
use crate::repo::{DependencyFetcher, GitProvider, GixProvider, LocalFetcher, RepositoryLocator};
use crate::resolve::{LinkResolver, LinkSource, RenderContext, ResolvedLink, XrefMap};
use crate::{debug, debug_do, log};

/// Element ids of each rendered page.
pub type RenderedIds = FxHashMap<PathAddress, Arc<FxHashSet<String>>>;

/// Everything a finished build produced besides diagnostics.
#[derive(Debug)]
pub struct BuildOutput {
    pub dependency_map: DependencyMap,
    pub rendered_ids: RenderedIds,
    /// Documents built, sorted.
    pub built: Vec<PathAddress>,
    /// The build stopped before the queue was empty.
    pub cancelled: bool,
}

pub struct Builder {
    config: Arc<DocsetConfig>,
    git: Arc<dyn GitProvider>,
    fetcher: Arc<dyn DependencyFetcher>,
    renderer: Arc<dyn MarkupRenderer>,
    cancel: Arc<AtomicBool>,
    progress: bool,
}

impl Builder {
    /// Builder with the `gix` provider, the local fetcher and the markdown renderer.
    pub fn new(config: Arc<DocsetConfig>) -> Self {
        let fetcher = LocalFetcher::new(config.cache_dir());
        Self {
            config,
            git: Arc::new(GixProvider::new()),
            fetcher: Arc::new(fetcher),
            renderer: Arc::new(MarkdownRenderer::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: false,
        }
    }

    pub fn with_git(mut self, git: Arc<dyn GitProvider>) -> Self {
        self.git = git;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DependencyFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Show a progress line on stderr.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Flag that stops the build before the next wave.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one full build.
    ///
    /// Returns `Err` only for fatal configuration or host failures; everything
    /// else ends up in `diagnostics`.
    pub fn run(&self, diagnostics: &Diagnostics) -> Result<BuildOutput, BuildError> {
        for key in self.config.unknown_fields() {
            diagnostics.push(Diagnostic::warning(
                Code::UnknownConfigKey,
                format!("Unknown config key `{key}`"),
            ));
        }

        let locator = Arc::new(RepositoryLocator::new(
            Arc::clone(&self.config),
            Arc::clone(&self.git),
            Arc::clone(&self.fetcher),
        ));
        let docset = Arc::new(Docset::create(Arc::clone(&self.config), locator, diagnostics)?);
        let xref = XrefMap::build(&docset)?;
        debug!("build"; "{} uids known", xref.len());
        let resolver = LinkResolver::new(Arc::clone(&docset), Arc::new(xref));

        let seeded = seed(&docset, &resolver);
        log!("build"; "{} documents seeded", seeded);

        let rendered: DashMap<PathAddress, Arc<FxHashSet<String>>> = DashMap::new();
        let built = SegQueue::new();
        let progress = self.progress.then(|| ProgressLine::new(&["built", "queued"]));
        let mut cancelled = false;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            let wave = resolver.queue().drain();
            if wave.is_empty() {
                break;
            }
            debug!("build"; "wave of {}", wave.len());

            wave.par_iter().try_for_each(|doc| {
                if let Some(ids) = self.build_document(doc, &resolver, diagnostics)? {
                    rendered.insert(doc.address.clone(), Arc::new(ids));
                }
                built.push(doc.address.clone());
                if let Some(progress) = &progress {
                    progress.set("built", built.len());
                }
                Ok::<_, BuildError>(())
            })?;

            if let Some(progress) = &progress {
                progress.set("queued", resolver.queue().seen_count());
            }
        }

        if let Some(progress) = progress {
            progress.finish();
        }

        if cancelled {
            log!("build"; "cancelled, {} documents built", built.len());
        } else {
            let missing = resolver
                .bookmarks()
                .validate(|address| rendered.get(address).map(|ids| Arc::clone(ids.value())), diagnostics);
            debug!("build"; "{} missing bookmarks", missing);
        }

        let dependency_map = resolver.dependencies().build();
        debug_do! {
            let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
            for item in dependency_map.items() {
                *by_kind.entry(item.kind.name()).or_default() += 1;
            }
            for (kind, count) in by_kind {
                log!("build"; "  {kind}: {count}");
            }
        }
        let mut built: Vec<_> = std::iter::from_fn(|| built.pop()).collect();
        built.sort();

        log!(
            "build";
            "{} documents, {} dependencies, {} errors, {} warnings",
            built.len(),
            dependency_map.len(),
            diagnostics.error_count(),
            diagnostics.warning_count()
        );

        Ok(BuildOutput {
            dependency_map,
            rendered_ids: rendered.into_iter().collect(),
            built,
            cancelled,
        })
    }

    /// Build one document. Returns the element ids of rendered pages.
    fn build_document(
        &self,
        doc: &Document,
        resolver: &LinkResolver,
        diagnostics: &Diagnostics,
    ) -> Result<Option<FxHashSet<String>>, BuildError> {
        let is_markdown = doc.address.path.extension().as_deref() == Some("md");
        match doc.content_type {
            ContentType::Markdown => {
                let text = resolver.docset().read_text(&doc.address)?;
                let out = self.render_page(doc, &text, resolver, diagnostics)?;
                Ok(Some(out.ids))
            }
            ContentType::TableOfContents if is_markdown => {
                let text = resolver.docset().read_text(&doc.address)?;
                self.render_page(doc, &text, resolver, diagnostics)?;
                Ok(None)
            }
            ContentType::SchemaDocument | ContentType::TableOfContents => {
                let text = resolver.docset().read_text(&doc.address)?;
                build_structured(doc, &text, resolver, diagnostics)?;
                Ok(None)
            }
            ContentType::Resource | ContentType::Redirection | ContentType::Unknown => Ok(None),
        }
    }

    fn render_page(
        &self,
        doc: &Document,
        text: &str,
        resolver: &LinkResolver,
        diagnostics: &Diagnostics,
    ) -> Result<RenderOutput, BuildError> {
        let links = PageLinks {
            resolver,
            renderer: self.renderer.as_ref(),
            file: doc.clone(),
            ctx: RenderContext::new(doc.clone(), diagnostics),
        };
        self.renderer.render(text, &links)
    }
}

/// Enqueue every buildable in-scope file. Redirection sources are not built.
fn seed(docset: &Docset, resolver: &LinkResolver) -> usize {
    docset
        .scope()
        .files()
        .iter()
        .filter(|address| docset.redirections().try_get(&address.path).is_none())
        .map(|address| docset.document(address.clone()))
        .filter(|doc| {
            doc.is_master_content()
                || doc.is_resource()
                || doc.content_type == ContentType::TableOfContents
        })
        .filter(|doc| resolver.queue().enqueue(doc.clone()))
        .count()
}

/// Resolve the references of a schema document or YAML/JSON TOC.
fn build_structured(
    doc: &Document,
    text: &str,
    resolver: &LinkResolver,
    diagnostics: &Diagnostics,
) -> Result<(), BuildError> {
    let refs = match structured_refs(text) {
        Ok(refs) => refs,
        Err(err) => {
            log!("build"; "skipping references of {}: {err}", doc.address.path);
            return Ok(());
        }
    };
    let ctx = RenderContext::new(doc.clone(), diagnostics);
    for (reference, line) in refs {
        let href = match reference {
            StructuredRef::Link(href) => href,
            StructuredRef::Xref(uid) => format!("xref:{uid}"),
        };
        resolver.resolve_relative_link(doc, &href, LinkSource::new(doc, Some(line)), &ctx)?;
    }
    Ok(())
}

// ============================================================================
// Link sink
// ============================================================================

/// Resolution callbacks for one file being rendered as part of a page.
struct PageLinks<'a> {
    resolver: &'a LinkResolver,
    renderer: &'a dyn MarkupRenderer,
    /// The file whose text is being rendered (the page or an include).
    file: Document,
    ctx: RenderContext<'a>,
}

impl PageLinks<'_> {
    fn source(&self, line: Option<usize>) -> LinkSource<'_> {
        LinkSource::new(&self.file, line)
    }
}

impl LinkSink for PageLinks<'_> {
    fn link(&self, href: &str, line: Option<usize>) -> Result<ResolvedLink, BuildError> {
        self.resolver
            .resolve_relative_link(self.ctx.root(), href, self.source(line), &self.ctx)
    }

    fn xref(&self, uid: &str, line: Option<usize>) -> Result<ResolvedLink, BuildError> {
        self.link(&format!("xref:{uid}"), line)
    }

    fn include(&self, path: &str, line: Option<usize>) -> Result<Option<RenderOutput>, BuildError> {
        let Some((text, doc)) = self.resolver.resolve_content(
            path,
            self.source(line),
            &self.ctx,
            DependencyType::Include,
        )?
        else {
            return Ok(None);
        };

        let nested = PageLinks {
            resolver: self.resolver,
            renderer: self.renderer,
            ctx: self.ctx.enter(&doc),
            file: doc,
        };
        self.renderer.render(&text, &nested).map(Some)
    }
}

// ============================================================================
// Tests
// ============================================================================
