use crate::debug_println;
use crate::models::{Partner, Table};
use crate::parser;
use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::Path;

/// Labelled values of one rendered detail page. How the page was obtained
/// (browser, saved file, fixture) is the caller's business; lookups that find
/// nothing return `None` rather than failing.
pub trait PageSource {
    fn name(&self) -> &str;

    fn lookup(&self, label: &str) -> Option<String>;

    fn table(&self, _caption: &str) -> Option<Table> {
        None
    }

    fn partners(&self) -> Vec<Partner> {
        Vec::new()
    }
}

/// A saved HTML detail page.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    name: String,
    blocks: Vec<String>,
    tables: Vec<(Vec<String>, Table)>,
    partners: Vec<Partner>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Failed to parse selector {}: {:?}", css, e))
}

/// Text nodes of an element, one per line.
fn element_lines(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl HtmlPage {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)
            .context(format!("Failed to read page: {}", path.display()))?;
        Self::parse(&path.display().to_string(), &html)
    }

    pub fn parse(name: &str, html: &str) -> Result<Self> {
        let document = Html::parse_document(html);

        let block_selector = selector("td, li, p")?;
        let blocks: Vec<String> = document
            .select(&block_selector)
            .map(|el| element_lines(&el))
            .filter(|text| !text.is_empty())
            .collect();

        let tables = Self::parse_tables(&document)?;
        let partners = Self::parse_partners(&document)?;

        debug_println!(
            "Parsed {}: {} text blocks, {} tables, {} partners",
            name,
            blocks.len(),
            tables.len(),
            partners.len()
        );

        Ok(Self { name: name.to_string(), blocks, tables, partners })
    }

    fn parse_tables(document: &Html) -> Result<Vec<(Vec<String>, Table)>> {
        let table_selector = selector("table")?;
        let strong_selector = selector("strong")?;
        let head_row_selector = selector("thead tr")?;
        let th_selector = selector("th")?;
        let body_row_selector = selector("tbody tr")?;
        let td_selector = selector("td")?;

        let mut tables = Vec::new();
        for table in document.select(&table_selector) {
            let captions: Vec<String> = table
                .select(&strong_selector)
                .map(|s| element_text(&s))
                .filter(|s| !s.is_empty())
                .collect();

            // Caption rows sit above the real header row; the last one wins
            let headers = table
                .select(&head_row_selector)
                .map(|tr| tr.select(&th_selector).map(|th| element_text(&th)).collect::<Vec<_>>())
                .filter(|cells| !cells.is_empty())
                .last()
                .unwrap_or_default();

            let rows = table
                .select(&body_row_selector)
                .map(|tr| tr.select(&td_selector).map(|td| element_text(&td)).collect::<Vec<_>>())
                .filter(|cells| !cells.is_empty())
                .collect();

            tables.push((captions, Table { headers, rows }));
        }
        Ok(tables)
    }

    /// `<p><strong>Name</strong><span>..</span></p>` style entries, grouped
    /// in document order. A new `Name` starts a new partner.
    fn parse_partners(document: &Html) -> Result<Vec<Partner>> {
        let p_selector = selector("p")?;
        let strong_selector = selector("strong")?;
        let span_selector = selector("span")?;

        let mut partners = Vec::new();
        let mut current = Partner::default();
        for p in document.select(&p_selector) {
            let Some(label) = p.select(&strong_selector).next().map(|s| element_text(&s)) else {
                continue;
            };
            let label = parser::clean_label(&label).to_lowercase();
            let value = p
                .select(&span_selector)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_default();

            if label == "name" {
                if !current.is_empty() {
                    partners.push(std::mem::take(&mut current));
                }
                current.name = value;
            } else if label.starts_with("mobile") && !current.name.is_empty() {
                current.mobile = value;
            } else if label.starts_with("email") && !current.name.is_empty() {
                current.email = value;
            }
        }
        if !current.is_empty() {
            partners.push(current);
        }
        Ok(partners)
    }
}

impl PageSource for HtmlPage {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, label: &str) -> Option<String> {
        self.blocks
            .iter()
            .find_map(|block| parser::value_after_marker(block, label))
    }

    fn table(&self, caption: &str) -> Option<Table> {
        let caption = caption.to_lowercase();
        self.tables
            .iter()
            .find(|(captions, _)| captions.iter().any(|c| c.to_lowercase().contains(&caption)))
            .map(|(_, table)| table.clone())
    }

    fn partners(&self) -> Vec<Partner> {
        self.partners.clone()
    }
}

/// A page held as plain label/value pairs.
#[derive(Debug, Clone, Default)]
pub struct MapPage {
    name: String,
    values: HashMap<String, String>,
    tables: HashMap<String, Table>,
    partners: Vec<Partner>,
}

impl MapPage {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn with_value(mut self, label: &str, value: &str) -> Self {
        self.values.insert(label.to_string(), value.to_string());
        self
    }

    pub fn with_table(mut self, caption: &str, table: Table) -> Self {
        self.tables.insert(caption.to_lowercase(), table);
        self
    }

    pub fn with_partner(mut self, partner: Partner) -> Self {
        self.partners.push(partner);
        self
    }
}

impl PageSource for MapPage {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, label: &str) -> Option<String> {
        let value = self.values.get(label).or_else(|| {
            self.values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(label))
                .map(|(_, v)| v)
        })?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn table(&self, caption: &str) -> Option<Table> {
        self.tables.get(&caption.to_lowercase()).cloned()
    }

    fn partners(&self) -> Vec<Partner> {
        self.partners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <table><tr>
            <td>Project Name:- Shivalik Heights</td>
            <td>GUJRERA Reg. No.:- <b>pr/gj/ahmedabad/0001</b></td>
          </tr></table>
          <p><strong>Promoter Name</strong><span>Shivalik Builders</span></p>
          <table>
            <thead>
              <tr><th colspan="3"><strong>Type Details</strong></th></tr>
              <tr><th>Unit Type</th><th>Block</th><th>Booked Units as on</th></tr>
            </thead>
            <tbody>
              <tr><td>2 BHK</td><td>A</td><td>10</td></tr>
              <tr><td>3 BHK</td><td>B</td><td>4</td></tr>
            </tbody>
          </table>
          <div><p><strong>Name</strong><span>Ravi Shah</span></p>
               <p><strong>Mobile</strong><span>+91 98250 11111</span></p>
               <p><strong>Email Id</strong><span>ravi@example.com</span></p></div>
          <div><p><strong>Name</strong><span>Mehul Patel</span></p></div>
        </body></html>
    "#;

    #[test]
    fn looks_up_labelled_cells() {
        let page = HtmlPage::parse("detail", DETAIL_PAGE).unwrap();
        assert_eq!(page.lookup("Project Name").as_deref(), Some("Shivalik Heights"));
        assert_eq!(page.lookup("GUJRERA Reg. No.").as_deref(), Some("pr/gj/ahmedabad/0001"));
        assert_eq!(page.lookup("Promoter Name").as_deref(), Some("Shivalik Builders"));
        assert_eq!(page.lookup("Website"), None);
    }

    #[test]
    fn finds_table_by_caption() {
        let page = HtmlPage::parse("detail", DETAIL_PAGE).unwrap();
        let table = page.table("type details").unwrap();
        assert_eq!(table.headers, vec!["Unit Type", "Block", "Booked Units as on"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["3 BHK", "B", "4"]);
        assert!(page.table("Financial Summary").is_none());
    }

    #[test]
    fn groups_partners_in_order() {
        let page = HtmlPage::parse("detail", DETAIL_PAGE).unwrap();
        let partners = page.partners();
        assert_eq!(partners.len(), 2);
        assert_eq!(partners[0].name, "Ravi Shah");
        assert_eq!(partners[0].mobile, "+91 98250 11111");
        assert_eq!(partners[0].email, "ravi@example.com");
        assert_eq!(partners[1].name, "Mehul Patel");
        assert!(partners[1].mobile.is_empty());
    }

    #[test]
    fn map_page_ignores_case_and_blanks() {
        let page = MapPage::new("m").with_value("District", "Ahmedabad").with_value("Taluka", "  ");
        assert_eq!(page.lookup("district").as_deref(), Some("Ahmedabad"));
        assert_eq!(page.lookup("Taluka"), None);
        assert!(page.table("anything").is_none());
    }
}
