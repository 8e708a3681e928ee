use serde_json::{Value, json};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub render_ms: f64,
    pub block_count: usize,
    pub drawn_elements: usize,
    pub unresolved_uses: usize,
    pub skipped_elements: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub measure_ms: f64,
    pub compose_ms: f64,
    pub parse_ms: f64,
    pub total_render_ms: f64,
}

impl DocumentMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn drawn_elements(&self) -> usize {
        self.pages.iter().map(|p| p.drawn_elements).sum()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": "metrics.document",
            "pages": self.pages.len(),
            "measure_ms": self.measure_ms,
            "compose_ms": self.compose_ms,
            "parse_ms": self.parse_ms,
            "render_ms": self.total_render_ms,
            "drawn": self.drawn_elements(),
            "unresolved_uses": self.pages.iter().map(|p| p.unresolved_uses).sum::<usize>(),
            "skipped": self.pages.iter().map(|p| p.skipped_elements).sum::<usize>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_page_counters() {
        let metrics = DocumentMetrics {
            pages: vec![
                PageMetrics {
                    page_number: 1,
                    drawn_elements: 3,
                    unresolved_uses: 1,
                    ..PageMetrics::default()
                },
                PageMetrics {
                    page_number: 2,
                    drawn_elements: 4,
                    skipped_elements: 2,
                    ..PageMetrics::default()
                },
            ],
            ..DocumentMetrics::default()
        };
        assert_eq!(metrics.page_count(), 2);
        let json = metrics.to_json();
        assert_eq!(json["drawn"], 7);
        assert_eq!(json["unresolved_uses"], 1);
        assert_eq!(json["skipped"], 2);
    }
}
