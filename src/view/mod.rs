pub mod corpus_info;
pub mod file_loader;
pub mod oni_loader;
pub mod wrapper;

pub use corpus_info::CorpusInfoWidget;
pub use file_loader::FileLoaderWidget;
pub use oni_loader::OniLoaderWidget;
pub use wrapper::ViewWrapper;

use crate::controller::Controller;

/// A display component refreshed from controller state
pub trait Widget {
    /// Pull fresh state from the controller
    fn update_display(&mut self, controller: &dyn Controller);

    /// Text rendering of the widget
    fn render(&self) -> String;
}

/// Titled tabs with one active index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabs {
    titles: Vec<String>,
    active: usize,
}

impl Tabs {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
            active: 0,
        }
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Switch tabs; out-of-range indices leave the active tab unchanged
    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.titles.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Tab bar with the active title bracketed
    pub fn render(&self) -> String {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                if i == self.active {
                    format!("[ {title} ]")
                } else {
                    format!("  {title}  ")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
