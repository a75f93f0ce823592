//! Format-independent layout blocks produced by the section renderers.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Accepts English and Spanish spellings. Unknown or missing values count as low.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("high" | "alta" | "critical" | "crítica" | "critica") => Priority::High,
            Some("medium" | "media" | "moderate") => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "Alta",
            Priority::Medium => "Media",
            Priority::Low => "Baja",
        }
    }
}

/// One entry of an [`LayoutBlock::ItemizedList`].
///
/// An empty title marks the continuation of the previous item's detail and
/// is drawn without a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub title: String,
    pub detail: Option<String>,
    pub priority: Option<Priority>,
}

impl ListItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: None,
            priority: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.trim().is_empty() {
            self.detail = Some(detail);
        }
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    Heading {
        text: String,
        level: u8,
    },
    Paragraph {
        text: String,
    },
    KeyValueTable {
        title: Option<String>,
        rows: Vec<(String, String)>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    ScoreGauge {
        label: String,
        score: Option<f64>,
    },
    ItemizedList {
        items: Vec<ListItem>,
    },
    /// Trailing notice after a truncated list section.
    UpgradeNotice {
        remaining: usize,
    },
    Footer {
        text: String,
    },
}

impl LayoutBlock {
    pub fn heading(text: impl Into<String>) -> Self {
        LayoutBlock::Heading {
            text: text.into(),
            level: 1,
        }
    }

    pub fn subheading(text: impl Into<String>) -> Self {
        LayoutBlock::Heading {
            text: text.into(),
            level: 2,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        LayoutBlock::Paragraph { text: text.into() }
    }

    pub fn upgrade_text(remaining: usize) -> String {
        if remaining == 1 {
            "... y 1 elemento más. Actualiza tu plan para desbloquear el informe completo.".to_string()
        } else {
            format!(
                "... y {remaining} elementos más. Actualiza tu plan para desbloquear el informe completo."
            )
        }
    }
}

/// Caps `items` at `limit` and returns the dropped count.
pub fn truncate_list<T>(mut items: Vec<T>, limit: usize) -> (Vec<T>, usize) {
    let remaining = items.len().saturating_sub(limit);
    items.truncate(limit);
    (items, remaining)
}

/// Appends the notice block when a list section was truncated.
pub fn push_upgrade_notice(blocks: &mut Vec<LayoutBlock>, remaining: usize) {
    if remaining > 0 {
        blocks.push(LayoutBlock::UpgradeNotice { remaining });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing() {
        assert_eq!(Priority::parse(Some("HIGH")), Priority::High);
        assert_eq!(Priority::parse(Some("media")), Priority::Medium);
        assert_eq!(Priority::parse(Some("whatever")), Priority::Low);
        assert_eq!(Priority::parse(None), Priority::Low);
    }

    #[test]
    fn test_truncate_list() {
        let (kept, remaining) = truncate_list(vec![1, 2, 3, 4, 5, 6], 5);
        assert_eq!(kept, vec![1, 2, 3, 4, 5]);
        assert_eq!(remaining, 1);

        let (kept, remaining) = truncate_list(vec![1, 2], usize::MAX);
        assert_eq!(kept.len(), 2);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_notice_only_when_truncated() {
        let mut blocks = Vec::new();
        push_upgrade_notice(&mut blocks, 0);
        assert!(blocks.is_empty());
        push_upgrade_notice(&mut blocks, 3);
        assert_eq!(blocks, vec![LayoutBlock::UpgradeNotice { remaining: 3 }]);
    }

    #[test]
    fn test_list_item_ignores_blank_detail() {
        let item = ListItem::new("Falta meta description").with_detail("  ");
        assert!(item.detail.is_none());
    }
}
