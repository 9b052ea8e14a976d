//! Parsed HTML document handle
//!
//! A [`ParsedDocument`] owns the parsed tree of one fetched page. It is created
//! by the fetcher, queried and rewritten by the extractor within the same task,
//! then dropped. The underlying tree is not `Send`, so it must never be held
//! across an await point.

use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// An image found inside the article body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    /// Position among the body images in document order
    pub index: usize,

    /// Raw source attribute (eager `src`, else lazy `data-src`)
    pub src: String,

    /// Caption text from the enclosing figure, empty when absent
    pub caption: String,
}

pub struct ParsedDocument {
    html: Html,
    url: Url,
}

impl ParsedDocument {
    pub fn parse(body: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(body),
            url,
        }
    }

    /// The URL the document was fetched from (after redirects)
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Text of the first element matching `selector`, as the site wrote it
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>())
    }

    /// Concatenated text of every element matching `selector`
    pub fn text_of(&self, selector: &Selector) -> String {
        self.html
            .select(selector)
            .flat_map(|element| element.text())
            .collect()
    }

    /// Raw `href` values of all anchors, in document order
    pub fn hrefs(&self) -> Vec<String> {
        let anchors = match Selector::parse("a[href]") {
            Ok(selector) => selector,
            Err(_) => return Vec::new(),
        };

        self.html
            .select(&anchors)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    /// Detaches every element matching `selector`, returning how many were removed
    pub fn remove(&mut self, selector: &Selector) -> usize {
        let ids: Vec<_> = self.html.select(selector).map(|element| element.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids.len()
    }

    /// Marks the images inside the body containers
    ///
    /// Every image with a source gets a text node carrying `placeholder(index)`
    /// inserted right after it, and its figure caption is read and detached so
    /// the caption text does not reappear in the body. Images with neither
    /// source attribute keep their index but get no placeholder.
    pub fn mark_images<F>(
        &mut self,
        body: &Selector,
        image: &Selector,
        caption: &Selector,
        placeholder: F,
    ) -> Vec<ImageSlot>
    where
        F: Fn(usize) -> String,
    {
        let mut slots = Vec::new();
        let mut anchors = Vec::new();
        let mut captions = Vec::new();
        let mut claimed = HashSet::new();
        let mut visited = HashSet::new();

        for container in self.html.select(body) {
            for img in container.select(image) {
                if !visited.insert(img.id()) {
                    continue;
                }
                let index = visited.len() - 1;

                let Some(src) = image_source(&img) else {
                    tracing::debug!(page = %self.url, index, "Image has no source attribute");
                    continue;
                };

                let mut text = String::new();
                if let Some(figcaption) = enclosing_figure(&img)
                    .and_then(|figure| figure.select(caption).next())
                {
                    // A caption shared by several images describes the first one
                    if claimed.insert(figcaption.id()) {
                        text = figcaption.text().collect::<String>().trim().to_string();
                        captions.push(figcaption.id());
                    }
                }

                anchors.push((img.id(), index));
                slots.push(ImageSlot {
                    index,
                    src,
                    caption: text,
                });
            }
        }

        for (id, index) in anchors {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                let token = format!("\n{}\n", placeholder(index));
                node.insert_after(Node::Text(Text {
                    text: token.as_str().into(),
                }));
            }
        }

        for id in captions {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
            }
        }

        slots
    }
}

fn image_source(img: &ElementRef<'_>) -> Option<String> {
    ["src", "data-src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn enclosing_figure<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "figure")
}
