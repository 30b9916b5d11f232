use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::page::Page;
use chromiumoxide::element::Element;
use tracing::debug;

/// Which heuristic produced a page descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    TabList,
    SidebarNav,
    GenericPageButton,
}

/// How to re-find the navigation control for a page. A held handle is valid
/// only within the page load it was discovered in; a stale handle must
/// surface as a navigation failure, never a crash.
pub enum Locator {
    Handle(Element),
    Selector { css: String, index: usize },
}

/// One navigable page within a multi-page report. Not persisted; consumed
/// by the navigator immediately after discovery.
pub struct PageDescriptor {
    pub display_name: String,
    pub strategy: DiscoveryStrategy,
    pub locator: Locator,
    pub ordinal: usize,
}

#[async_trait]
pub trait DetectStrategy: Send + Sync {
    fn kind(&self) -> DiscoveryStrategy;
    async fn try_detect(&self, page: &Page) -> Result<Vec<PageDescriptor>>;
}

/// Ordered from most specific to most generic: BI front-ends vary in DOM
/// structure across versions, and the tab-list role markup is the most
/// reliable signal when present.
pub fn default_strategies() -> Vec<Box<dyn DetectStrategy>> {
    vec![
        Box::new(TabListStrategy),
        Box::new(SidebarNavStrategy),
        Box::new(GenericPageButtonStrategy),
    ]
}

/// Inspect a loaded report for sub-pages. Strategies are tried in priority
/// order; the first one matching more than one element wins. Strategy errors
/// fall through silently. An empty result means the report is single-page.
pub async fn discover_pages(page: &Page) -> Vec<PageDescriptor> {
    for strategy in default_strategies() {
        match strategy.try_detect(page).await {
            Ok(found) if found.len() > 1 => {
                debug!(strategy = ?strategy.kind(), pages = found.len(), "page set discovered");
                return found;
            }
            Ok(found) => {
                debug!(strategy = ?strategy.kind(), matches = found.len(), "strategy matched too few elements");
            }
            Err(e) => {
                debug!(strategy = ?strategy.kind(), error = %e, "strategy failed, falling through");
            }
        }
    }
    Vec::new()
}

/// Trimmed element text, or `Page N` when the control carries no text.
pub fn page_label(text: Option<String>, ordinal: usize) -> String {
    match text.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => t,
        _ => format!("Page {}", ordinal + 1),
    }
}

async fn element_label(element: &Element, ordinal: usize) -> String {
    let text = element.inner_text().await.ok().flatten();
    page_label(text, ordinal)
}

pub struct TabListStrategy;

#[async_trait]
impl DetectStrategy for TabListStrategy {
    fn kind(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::TabList
    }

    async fn try_detect(&self, page: &Page) -> Result<Vec<PageDescriptor>> {
        let elements = page.find_elements("[role='tablist'] [role='tab']").await?;
        let mut pages = Vec::with_capacity(elements.len());
        for (ordinal, element) in elements.into_iter().enumerate() {
            let display_name = element_label(&element, ordinal).await;
            pages.push(PageDescriptor {
                display_name,
                strategy: self.kind(),
                // Tabs were just queried; keep the live handles.
                locator: Locator::Handle(element),
                ordinal,
            });
        }
        Ok(pages)
    }
}

pub struct SidebarNavStrategy;

/// Alternative selector families for the sidebar page navigator, tried in
/// order; the first family matching anything wins within this strategy.
const SIDEBAR_SELECTORS: &[&str] = &[
    ".dashboard-page-navigator button",
    ".page-navigator .page-item",
    "nav[aria-label*='page' i] button",
    "[data-testid='page-nav'] button",
];

#[async_trait]
impl DetectStrategy for SidebarNavStrategy {
    fn kind(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::SidebarNav
    }

    async fn try_detect(&self, page: &Page) -> Result<Vec<PageDescriptor>> {
        for css in SIDEBAR_SELECTORS {
            let elements = page.find_elements(*css).await?;
            if elements.is_empty() {
                continue;
            }
            let mut pages = Vec::with_capacity(elements.len());
            for (ordinal, element) in elements.iter().enumerate() {
                let display_name = element_label(element, ordinal).await;
                pages.push(PageDescriptor {
                    display_name,
                    strategy: self.kind(),
                    locator: Locator::Selector { css: css.to_string(), index: ordinal },
                    ordinal,
                });
            }
            return Ok(pages);
        }
        Ok(Vec::new())
    }
}

pub struct GenericPageButtonStrategy;

#[async_trait]
impl DetectStrategy for GenericPageButtonStrategy {
    fn kind(&self) -> DiscoveryStrategy {
        DiscoveryStrategy::GenericPageButton
    }

    async fn try_detect(&self, page: &Page) -> Result<Vec<PageDescriptor>> {
        let css = "button[class*='page'], [role='button'][class*='page']";
        let elements = page.find_elements(css).await?;
        let mut pages = Vec::with_capacity(elements.len());
        for (ordinal, element) in elements.iter().enumerate() {
            let display_name = element_label(element, ordinal).await;
            pages.push(PageDescriptor {
                display_name,
                strategy: self.kind(),
                locator: Locator::Selector { css: css.to_string(), index: ordinal },
                ordinal,
            });
        }
        Ok(pages)
    }
}
