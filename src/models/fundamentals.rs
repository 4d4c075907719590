/// Company fundamentals scraped from the Finviz quote page.
///
/// The snapshot is kept as ordered label/value pairs exactly as they appear
/// in the source table; the UI renders them verbatim.
#[derive(Debug, Clone, Default)]
pub struct Fundamentals {
    /// Company name (e.g. "Apple Inc").
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    /// Metric/value pairs from the snapshot table ("P/E" -> "29.51", ...).
    pub snapshot: Vec<(String, String)>,
    /// Business description paragraph.
    pub description: String,
}

impl Fundamentals {
    /// One-line "Sector | Industry | Country" header for the info pane.
    pub fn meta_line(&self) -> String {
        format!("{} | {} | {}", self.sector, self.industry, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_line_joins_fields() {
        let fundamentals = Fundamentals {
            name: "Apple Inc".to_string(),
            sector: "Technology".to_string(),
            industry: "Consumer Electronics".to_string(),
            country: "USA".to_string(),
            ..Default::default()
        };
        assert_eq!(
            fundamentals.meta_line(),
            "Technology | Consumer Electronics | USA"
        );
    }
}
