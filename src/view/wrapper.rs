use crate::constants::{CORPUS_OVERVIEW_TAB, FILE_LOADER_TAB, ONI_LOADER_TAB};
use crate::controller::Controller;
use crate::models::FileReference;
use crate::view::{CorpusInfoWidget, FileLoaderWidget, OniLoaderWidget, Tabs, Widget};
use tracing::debug;

/// Tabbed container forwarding user actions to the controller and keeping
/// the child widgets in sync with it
pub struct ViewWrapper<C: Controller> {
    controller: C,
    file_loader: FileLoaderWidget,
    oni_loader: OniLoaderWidget,
    corpus_display: CorpusInfoWidget,
    tabs: Tabs,
    display_idx: usize,
}

impl<C: Controller> ViewWrapper<C> {
    pub fn new(controller: C) -> Self {
        let mut wrapper = Self {
            controller,
            file_loader: FileLoaderWidget::new(),
            oni_loader: OniLoaderWidget::new(),
            corpus_display: CorpusInfoWidget::new(),
            tabs: Tabs::new([FILE_LOADER_TAB, ONI_LOADER_TAB, CORPUS_OVERVIEW_TAB]),
            display_idx: 2,
        };
        wrapper.update_displays();
        wrapper
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn tabs(&self) -> &Tabs {
        &self.tabs
    }

    pub fn file_loader(&self) -> &FileLoaderWidget {
        &self.file_loader
    }

    pub fn oni_loader(&self) -> &OniLoaderWidget {
        &self.oni_loader
    }

    pub fn oni_loader_mut(&mut self) -> &mut OniLoaderWidget {
        &mut self.oni_loader
    }

    pub fn corpus_display(&self) -> &CorpusInfoWidget {
        &self.corpus_display
    }

    pub fn set_active_tab(&mut self, index: usize) -> bool {
        self.tabs.set_active(index)
    }

    pub async fn load_corpus_from_filepaths(&mut self, files: &[FileReference]) -> bool {
        let success = self.controller.load_corpus_from_filepaths(files).await;
        self.update_displays();
        success
    }

    pub async fn load_meta_from_filepaths(&mut self, files: &[FileReference]) -> bool {
        let success = self.controller.load_meta_from_filepaths(files).await;
        self.update_displays();
        success
    }

    /// Build a corpus; the overview tab is shown only when the build succeeds
    pub async fn build_corpus(&mut self, corpus_name: &str) -> bool {
        let success = self.controller.build_corpus(corpus_name).await;
        if success {
            self.tabs.set_active(self.display_idx);
            self.update_displays();
        }
        success
    }

    pub fn update_displays(&mut self) {
        debug!("refreshing displays");
        self.file_loader.update_display(&self.controller);
        self.oni_loader.update_display(&self.controller);
        self.corpus_display.update_display(&self.controller);
    }

    /// Tab bar followed by the active widget
    pub fn render(&self) -> String {
        let body = match self.tabs.active() {
            0 => self.file_loader.render(),
            1 => self.oni_loader.render(),
            _ => self.corpus_display.render(),
        };
        format!("{}\n\n{}", self.tabs.render(), body)
    }
}
