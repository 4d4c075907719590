//! Finviz quote-page scraper for company fundamentals.
//!
//! The page is stable enough that plain string-level tag lookup works: the
//! snapshot table is the element carrying `snapshot-table2`, the company
//! header carries `quote-header_ticker-wrapper_company`, and the business
//! description sits in a `fullview-profile` cell. No HTML parser is pulled
//! in for this; any layout drift degrades to `Unavailable`.

use tracing::{debug, info, instrument};

use crate::api::FundamentalsError;
use crate::models::Fundamentals;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fetch and scrape fundamentals for `symbol` from Finviz.
#[instrument]
pub async fn fetch_fundamentals(symbol: &str) -> Result<Fundamentals, FundamentalsError> {
    let url = format!("https://finviz.com/quote.ashx?t={symbol}&p=d");
    debug!(url = %url, "requesting Finviz quote page");

    let unavailable = || FundamentalsError::Unavailable(symbol.to_string());

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|_| unavailable())?;

    let response = client.get(&url).send().await.map_err(|_| unavailable())?;
    if !response.status().is_success() {
        return Err(unavailable());
    }
    let body = response.text().await.map_err(|_| unavailable())?;

    let fundamentals = parse_quote_page(&body, symbol)?;
    info!(metrics = fundamentals.snapshot.len(), "scraped fundamentals");
    Ok(fundamentals)
}

fn parse_quote_page(html: &str, symbol: &str) -> Result<Fundamentals, FundamentalsError> {
    let snapshot = parse_snapshot_table(html);
    if snapshot.is_empty() {
        return Err(FundamentalsError::Unavailable(symbol.to_string()));
    }

    let name = parse_company_name(html).unwrap_or_else(|| symbol.to_string());
    let links = parse_quote_links(html);
    let mut links = links.into_iter();
    let sector = links.next().unwrap_or_default();
    let industry = links.next().unwrap_or_default();
    let country = links.next().unwrap_or_default();
    let description = parse_description(html).unwrap_or_default();

    Ok(Fundamentals {
        name,
        sector,
        industry,
        country,
        snapshot,
        description,
    })
}

/// Label/value pairs from the snapshot table: cells alternate metric name
/// and metric value across each row.
fn parse_snapshot_table(html: &str) -> Vec<(String, String)> {
    let Some(table) = between(html, "snapshot-table2", "</table>") else {
        return Vec::new();
    };

    let mut cells = Vec::new();
    let mut rest = table;
    while let Some(cell) = between(rest, "<td", "</td>") {
        // Skip the tag's own attributes up to the closing '>'.
        let text = cell.find('>').map(|i| &cell[i + 1..]).unwrap_or(cell);
        cells.push(strip_tags(text));
        let Some(close) = rest.find("</td>") else { break };
        rest = &rest[close + "</td>".len()..];
    }

    cells
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

fn parse_company_name(html: &str) -> Option<String> {
    let segment = between(html, "quote-header_ticker-wrapper_company", "</h2>")?;
    let name = strip_tags(segment);
    let name = name.trim_matches(|c: char| c == '"' || c == '>' || c.is_whitespace());
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Sector, industry and country are the first three links of the quote-links
/// strip under the header.
fn parse_quote_links(html: &str) -> Vec<String> {
    let Some(segment) = between(html, "quote-links", "</div>") else {
        return Vec::new();
    };

    let mut texts = Vec::new();
    let mut rest = segment;
    while let Some(anchor) = between(rest, "<a", "</a>") {
        let text = anchor.find('>').map(|i| &anchor[i + 1..]).unwrap_or(anchor);
        let text = strip_tags(text);
        if !text.is_empty() {
            texts.push(text);
        }
        if texts.len() == 3 {
            break;
        }
        let Some(close) = rest.find("</a>") else { break };
        rest = &rest[close + "</a>".len()..];
    }
    texts
}

fn parse_description(html: &str) -> Option<String> {
    let segment = between(html, "fullview-profile", "</td>")
        .or_else(|| between(html, "quote_profile", "</div>"))?;
    let text = segment.find('>').map(|i| &segment[i + 1..]).unwrap_or(segment);
    let text = strip_tags(text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Slice between the first occurrence of `start` and the next `end` after it.
fn between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let to = haystack[from..].find(end)?;
    Some(&haystack[from..from + to])
}

/// Drop every `<...>` tag, decode the handful of entities Finviz emits, and
/// collapse surrounding whitespace.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><head><title>AAPL Apple Inc Stock Quote</title></head><body>
        <h2 class="quote-header_ticker-wrapper_company"><a href="/q.ashx">Apple Inc</a></h2>
        <div class="quote-links">
          <a href="/screener.ashx?f=sec_technology">Technology</a> |
          <a href="/screener.ashx?f=ind_consumer">Consumer Electronics</a> |
          <a href="/screener.ashx?f=geo_usa">USA</a>
        </div>
        <table class="snapshot-table2">
          <tr><td width="7%">Index</td><td><b>DJIA, S&amp;P 500</b></td>
              <td>P/E</td><td><b>29.51</b></td></tr>
          <tr><td>Market Cap</td><td><b>2800.00B</b></td>
              <td>Dividend</td><td><b>0.96</b></td></tr>
        </table>
        <td class="fullview-profile" align="left">Apple Inc designs smartphones
        and personal computers.</td>
        </body></html>
    "#;

    #[test]
    fn parses_full_quote_page() {
        let fundamentals = parse_quote_page(FIXTURE, "AAPL").unwrap();
        assert_eq!(fundamentals.name, "Apple Inc");
        assert_eq!(fundamentals.sector, "Technology");
        assert_eq!(fundamentals.industry, "Consumer Electronics");
        assert_eq!(fundamentals.country, "USA");
        assert!(fundamentals.description.starts_with("Apple Inc designs"));
    }

    #[test]
    fn snapshot_pairs_labels_with_values() {
        let snapshot = parse_snapshot_table(FIXTURE);
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot[0], ("Index".to_string(), "DJIA, S&P 500".to_string()));
        assert_eq!(snapshot[1], ("P/E".to_string(), "29.51".to_string()));
        assert_eq!(snapshot[3], ("Dividend".to_string(), "0.96".to_string()));
    }

    #[test]
    fn page_without_snapshot_is_unavailable() {
        let result = parse_quote_page("<html><body>captcha</body></html>", "AAPL");
        assert!(matches!(result, Err(FundamentalsError::Unavailable(_))));
    }

    #[test]
    fn missing_name_falls_back_to_symbol() {
        let html = r#"
            <table class="snapshot-table2">
              <tr><td>P/E</td><td>10.0</td></tr>
            </table>
        "#;
        let fundamentals = parse_quote_page(html, "XYZ").unwrap();
        assert_eq!(fundamentals.name, "XYZ");
        assert!(fundamentals.sector.is_empty());
    }

    #[test]
    fn strip_tags_decodes_entities() {
        assert_eq!(strip_tags("<b>S&amp;P</b> 500"), "S&P 500");
        assert_eq!(strip_tags("  plain  "), "plain");
    }
}
