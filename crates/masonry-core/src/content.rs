//! Item content as seen by the engine.
//!
//! The engine treats content as opaque except for one question: does
//! this item contain images that have not finished loading? Hosts
//! answer it by implementing [`ItemContent`]. [`ContentNode`] is a
//! small element tree that does so by walking every descendant.

use serde::{Deserialize, Serialize};

/// An image discovered inside an item's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProbe {
    pub src: String,
    /// Already decoded (or already failed) when discovered.
    pub complete: bool,
}

impl ImageProbe {
    pub fn pending(src: impl Into<String>) -> Self {
        Self { src: src.into(), complete: false }
    }

    pub fn complete(src: impl Into<String>) -> Self {
        Self { src: src.into(), complete: true }
    }
}

/// Content the engine can scan for embedded images.
pub trait ItemContent {
    /// Every image in the content, in document order.
    fn images(&self) -> Vec<ImageProbe>;
}

impl ItemContent for () {
    fn images(&self) -> Vec<ImageProbe> {
        Vec::new()
    }
}

impl<T: ItemContent + ?Sized> ItemContent for &T {
    fn images(&self) -> Vec<ImageProbe> {
        (**self).images()
    }
}

/// A minimal element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Text { text: String },
    Image {
        src: String,
        #[serde(default)]
        complete: bool,
    },
    Element {
        tag: String,
        #[serde(default)]
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text { text: text.into() }
    }

    pub fn image(src: impl Into<String>) -> Self {
        ContentNode::Image { src: src.into(), complete: false }
    }

    pub fn loaded_image(src: impl Into<String>) -> Self {
        ContentNode::Image { src: src.into(), complete: true }
    }

    pub fn element(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element { tag: tag.into(), children }
    }

    fn collect_images(&self, out: &mut Vec<ImageProbe>) {
        match self {
            ContentNode::Text { .. } => {}
            ContentNode::Image { src, complete } => out.push(ImageProbe {
                src: src.clone(),
                complete: *complete,
            }),
            ContentNode::Element { children, .. } => {
                for child in children {
                    child.collect_images(out);
                }
            }
        }
    }
}

impl ItemContent for ContentNode {
    fn images(&self) -> Vec<ImageProbe> {
        let mut out = Vec::new();
        self.collect_images(&mut out);
        out
    }
}
