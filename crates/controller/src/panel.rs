use results::{RenderedBatch, ResultCard, truncation_notice_html};

/// Model of the `#results` container. Hosts mirror [`ResultsPanel::to_html`]
/// and [`ResultsPanel::opacity`] into the DOM after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPanel {
    generation: u64,
    notice: Option<usize>,
    cards: Vec<ResultCard>,
    visible: bool,
    pending: bool,
    error: Option<String>,
}

impl ResultsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cards(&self) -> &[ResultCard] {
        &self.cards
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// A render was issued for the current generation and has not landed.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn opacity(&self) -> f64 {
        if self.visible { 1.0 } else { 0.0 }
    }

    /// Empties and hides the panel. Any in-flight batch becomes stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.notice = None;
        self.cards.clear();
        self.visible = false;
        self.pending = false;
    }

    /// Clears and returns the generation the new render belongs to.
    pub fn begin_render(&mut self, truncated_to: Option<usize>) -> u64 {
        self.clear();
        self.notice = truncated_to;
        self.pending = true;
        self.generation
    }

    /// Appends a finished batch and reveals the panel. Returns `false` and
    /// leaves the panel untouched when the batch is stale.
    pub fn complete(&mut self, batch: RenderedBatch) -> bool {
        if !self.pending || batch.generation != self.generation {
            tracing::debug!(
                batch = batch.generation,
                current = self.generation,
                "discarding stale card batch"
            );
            return false;
        }
        self.cards.extend(batch.cards);
        self.pending = false;
        self.visible = true;
        true
    }

    /// Fatal state: replaces the contents with `message` and reveals it.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.clear();
        self.error = Some(message.into());
        self.visible = true;
    }

    pub fn to_html(&self) -> String {
        if let Some(error) = &self.error {
            return format!(
                r#"<div style="color: #a33; padding: 8px">{}</div>"#,
                results::escape_html(error)
            );
        }
        let mut html = String::new();
        if let Some(shown) = self.notice {
            html.push_str(&truncation_notice_html(shown));
        }
        for card in &self.cards {
            html.push_str(&card.to_html());
        }
        html
    }
}
