use serde::Serialize;

use crate::{
    constants::{LOAD_MORE_DELAY, RESULTS_PAGE_SIZE, SCROLL_LOAD_THRESHOLD_PX},
    response::Product,
};

/// Scroll position of the results container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub client_height: f32,
    pub scroll_height: f32,
}

impl ScrollMetrics {
    pub fn near_bottom(&self) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - SCROLL_LOAD_THRESHOLD_PX
    }
}

/// What a result card shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub price: String,
    pub url: String,
    pub vendor: Option<String>,
    pub available: bool,
}

impl From<&Product> for ProductCard {
    fn from(p: &Product) -> Self {
        let price = match p.currency.as_deref() {
            Some(currency) if !currency.is_empty() => format!("{} {:.2}", currency, p.price),
            _ => format!("{:.2}", p.price),
        };
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            image: p.image.clone(),
            price,
            url: format!("/products/{}", p.handle),
            vendor: p.vendor.clone(),
            available: p.available,
        }
    }
}

/// Client-side paging over a result set that is already fully in memory.
#[derive(Debug, Clone, Default)]
pub struct ResultsPager {
    products: Vec<Product>,
    rendered: usize,
    loading: bool,
}

impl ResultsPager {
    /// Replace the result set and render the first page.
    pub fn new(products: Vec<Product>) -> Self {
        let rendered = products.len().min(RESULTS_PAGE_SIZE);
        Self {
            products,
            rendered,
            loading: false,
        }
    }

    pub fn total(&self) -> usize {
        self.products.len()
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    pub fn has_more(&self) -> bool {
        self.rendered < self.products.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn cards(&self) -> Vec<ProductCard> {
        self.products[..self.rendered]
            .iter()
            .map(ProductCard::from)
            .collect()
    }

    /// Whether this scroll position should start loading the next page.
    ///
    /// Marks the pager as loading so repeated scroll events do not queue
    /// more than one page.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        if self.loading || !self.has_more() || !metrics.near_bottom() {
            return false;
        }
        self.loading = true;
        true
    }

    /// Append the next page. Returns the cards that were added.
    pub fn append_next_page(&mut self) -> Vec<ProductCard> {
        self.loading = false;
        let start = self.rendered;
        self.rendered = (start + RESULTS_PAGE_SIZE).min(self.products.len());
        self.products[start..self.rendered]
            .iter()
            .map(ProductCard::from)
            .collect()
    }

    /// Append the next page after the pacing delay.
    pub async fn load_more_paced(&mut self) -> Vec<ProductCard> {
        tokio::time::sleep(LOAD_MORE_DELAY).await;
        self.append_next_page()
    }
}
