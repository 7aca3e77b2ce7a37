use crate::controller::Controller;
use crate::view::Widget;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CorpusSummary {
    name: String,
    documents: usize,
    meta_headers: Vec<String>,
}

/// Overview of every built corpus
#[derive(Debug, Default)]
pub struct CorpusInfoWidget {
    summaries: Vec<CorpusSummary>,
}

impl CorpusInfoWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corpus_count(&self) -> usize {
        self.summaries.len()
    }
}

impl Widget for CorpusInfoWidget {
    fn update_display(&mut self, controller: &dyn Controller) {
        self.summaries = controller
            .corpora()
            .iter()
            .map(|corpus| CorpusSummary {
                name: corpus.name.clone(),
                documents: corpus.len(),
                meta_headers: corpus.meta_headers.clone(),
            })
            .collect();
    }

    fn render(&self) -> String {
        if self.summaries.is_empty() {
            return "No corpora built yet".to_string();
        }

        self.summaries
            .iter()
            .map(|s| {
                let columns = if s.meta_headers.is_empty() {
                    "(none)".to_string()
                } else {
                    s.meta_headers.join(", ")
                };
                format!(
                    "Corpus: {}\n  Documents: {}\n  Metadata columns: {}",
                    s.name, s.documents, columns
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
