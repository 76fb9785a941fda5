//! HTML and JSON report generation.
//!
//! This module writes one data file and one grid page per aggregator,
//! plus an index page with the run metadata.

use crate::aggregators::{Aggregator, Row};
use crate::config::INDEX_REPORT_NAME;
use crate::report::markup::{escape_html, render_explanation, script_safe_json};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const AG_GRID_SCRIPT: &str =
    "https://cdn.jsdelivr.net/npm/ag-grid-community@31.3.2/dist/ag-grid-community.min.js";

/// Facts about the run shown on the index page.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub input_file: String,
    pub card_count: u64,
    pub generated_at: DateTime<Local>,
}

/// Navigation entry for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub name: String,
    pub display_name: String,
    pub description: String,
}

impl NavLink {
    pub fn from_aggregator(aggregator: &dyn Aggregator) -> Self {
        Self {
            name: aggregator.name().to_string(),
            display_name: aggregator.display_name().to_string(),
            description: aggregator.description().to_string(),
        }
    }

    fn href(&self) -> String {
        format!("{}.html", self.name)
    }
}

/// Write every report page, its data file and the index.
///
/// Returns the paths written, index last.
pub fn write_reports(
    output_dir: &Path,
    aggregators: &[Box<dyn Aggregator>],
    metadata: &RunMetadata,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let nav: Vec<NavLink> = aggregators
        .iter()
        .map(|a| NavLink::from_aggregator(a.as_ref()))
        .collect();

    let mut written = Vec::new();
    for aggregator in aggregators {
        let rows = aggregator.sorted_rows();
        debug!("{}: {} rows", aggregator.name(), rows.len());

        let json_path = output_dir.join(format!("{}.json", aggregator.name()));
        write_json_rows(&rows, &json_path)?;
        written.push(json_path);

        let html_path = output_dir.join(format!("{}.html", aggregator.name()));
        let page = generate_report_page(aggregator.as_ref(), &nav)?;
        write_file(&html_path, &page)?;
        written.push(html_path);
    }

    let index_path = output_dir.join(format!("{}.html", INDEX_REPORT_NAME));
    write_file(&index_path, &generate_index_page(&nav, metadata))?;
    written.push(index_path);

    info!("Wrote {} report files to {}", written.len(), output_dir.display());
    Ok(written)
}

/// Write rows as a JSON array.
fn write_json_rows(rows: &[Row], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, rows)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Generate the page head shared by all pages.
fn generate_head(title: &str, with_grid: bool) -> String {
    let mut head = String::new();

    head.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    head.push_str("<meta charset=\"utf-8\">\n");
    head.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    head.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    if with_grid {
        head.push_str(&format!("<script src=\"{}\"></script>\n", AG_GRID_SCRIPT));
    }
    head.push_str(STYLE);
    head.push_str("</head>\n");

    head
}

/// Generate the navigation bar, marking `current` as active.
fn generate_nav(nav: &[NavLink], current: Option<&str>) -> String {
    let mut section = String::new();

    section.push_str("<nav>\n<a href=\"index.html\">Index</a>\n");
    for link in nav {
        let class = if current == Some(link.name.as_str()) {
            " class=\"active\""
        } else {
            ""
        };
        section.push_str(&format!(
            "<a href=\"{}\"{} title=\"{}\">{}</a>\n",
            escape_html(&link.href()),
            class,
            escape_html(&link.description),
            escape_html(&link.display_name)
        ));
    }
    section.push_str("</nav>\n");

    section
}

/// Generate the grid page for one aggregator.
pub fn generate_report_page(aggregator: &dyn Aggregator, nav: &[NavLink]) -> Result<String> {
    let columns = script_safe_json(&aggregator.columns())
        .with_context(|| format!("Failed to serialize columns for {}", aggregator.name()))?;
    let data_file = script_safe_json(&format!("{}.json", aggregator.name()))?;

    let mut page = String::new();

    page.push_str(&generate_head(aggregator.display_name(), true));
    page.push_str("<body>\n");
    page.push_str(&generate_nav(nav, Some(aggregator.name())));
    page.push_str("<main>\n");
    page.push_str(&format!("<h1>{}</h1>\n", escape_html(aggregator.display_name())));

    if !aggregator.description().is_empty() {
        page.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            escape_html(aggregator.description())
        ));
    }

    if !aggregator.explanation().is_empty() {
        page.push_str("<section class=\"explanation\">\n");
        page.push_str(&render_explanation(aggregator.explanation()));
        page.push_str("</section>\n");
    }

    page.push_str("<input id=\"quick-filter\" type=\"search\" placeholder=\"Filter...\">\n");
    page.push_str("<div id=\"grid\" class=\"ag-theme-alpine\"></div>\n");
    page.push_str("<img id=\"card-preview\" alt=\"\">\n");
    page.push_str("</main>\n");

    page.push_str("<script>\n");
    page.push_str(&format!("const columnDefs = {};\n", columns));
    page.push_str(&format!("const dataFile = {};\n", data_file));
    page.push_str(GRID_SCRIPT);
    page.push_str("</script>\n");
    page.push_str("</body>\n</html>\n");

    Ok(page)
}

/// Generate the index page listing every report.
pub fn generate_index_page(nav: &[NavLink], metadata: &RunMetadata) -> String {
    let mut page = String::new();

    page.push_str(&generate_head("Card Aggregator Reports", false));
    page.push_str("<body>\n");
    page.push_str(&generate_nav(nav, None));
    page.push_str("<main>\n<h1>Card Aggregator Reports</h1>\n");

    page.push_str("<ul class=\"metadata\">\n");
    page.push_str(&format!(
        "<li><strong>Input file:</strong> {}</li>\n",
        escape_html(&metadata.input_file)
    ));
    page.push_str(&format!(
        "<li><strong>Cards processed:</strong> {}</li>\n",
        metadata.card_count
    ));
    page.push_str(&format!(
        "<li><strong>Generated:</strong> {}</li>\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    page.push_str("</ul>\n");

    page.push_str("<table class=\"reports\">\n<thead><tr><th>Report</th><th>Description</th></tr></thead>\n<tbody>\n");
    for link in nav {
        page.push_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td></tr>\n",
            escape_html(&link.href()),
            escape_html(&link.display_name),
            escape_html(&link.description)
        ));
    }
    page.push_str("</tbody>\n</table>\n</main>\n");

    page.push_str(&format!(
        "<footer>Generated by card-aggregator v{}</footer>\n",
        env!("CARGO_PKG_VERSION")
    ));
    page.push_str("</body>\n</html>\n");

    page
}

const STYLE: &str = r#"<style>
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
nav { display: flex; flex-wrap: wrap; gap: 0.25rem 1rem; padding: 0.75rem 1rem; background: #1f2933; }
nav a { color: #cbd2d9; text-decoration: none; font-size: 0.9rem; }
nav a.active, nav a:hover { color: #fff; text-decoration: underline; }
main { padding: 1rem 1.5rem; }
.description { color: #52606d; }
.explanation { max-width: 60rem; line-height: 1.5; }
#quick-filter { margin: 0.5rem 0; padding: 0.3rem 0.5rem; width: 20rem; }
#grid { height: 75vh; width: 100%; }
#card-preview { position: fixed; display: none; width: 244px; border-radius: 10px; pointer-events: none; z-index: 10; box-shadow: 0 4px 16px rgba(0,0,0,0.4); }
.card-link { color: #1d4ed8; }
table.reports { border-collapse: collapse; }
table.reports td, table.reports th { text-align: left; padding: 0.4rem 1rem 0.4rem 0; border-bottom: 1px solid #e4e7eb; }
footer { padding: 1rem 1.5rem; color: #7b8794; font-size: 0.8rem; }
</style>
"#;

const GRID_SCRIPT: &str = r#"
const preview = document.getElementById('card-preview');

function showPreview(event, imageUri) {
  if (!imageUri) return;
  preview.src = imageUri;
  preview.style.display = 'block';
  movePreview(event);
}

function movePreview(event) {
  preview.style.left = (event.clientX + 16) + 'px';
  preview.style.top = Math.max(8, event.clientY - 170) + 'px';
}

function hidePreview() {
  preview.style.display = 'none';
}

function makeCardLink(name, scryfallUri, imageUri) {
  const link = document.createElement(scryfallUri ? 'a' : 'span');
  link.textContent = name;
  link.className = 'card-link';
  if (scryfallUri) {
    link.href = scryfallUri;
    link.target = '_blank';
    link.rel = 'noopener noreferrer';
  }
  link.addEventListener('mouseenter', (e) => showPreview(e, imageUri));
  link.addEventListener('mousemove', movePreview);
  link.addEventListener('mouseleave', hidePreview);
  return link;
}

class cardLinkRenderer {
  init(params) {
    this.eGui = document.createElement('span');
    const listField = params.colDef.cardLinkData;
    const cards = listField ? params.data[listField] : null;
    if (Array.isArray(cards)) {
      cards.forEach((card, i) => {
        if (i > 0) this.eGui.appendChild(document.createTextNode(', '));
        this.eGui.appendChild(makeCardLink(card.name, card.scryfall_uri, card.image_uri));
      });
    } else {
      this.eGui.appendChild(
        makeCardLink(params.value ?? '', params.data.scryfall_uri, params.data.image_uri));
    }
  }
  getGui() {
    return this.eGui;
  }
}

const gridOptions = {
  columnDefs: columnDefs,
  defaultColDef: { sortable: true, filter: true, resizable: true },
  components: { cardLinkRenderer: cardLinkRenderer },
  pagination: true,
  paginationPageSize: 100,
  rowData: [],
};

const gridApi = agGrid.createGrid(document.getElementById('grid'), gridOptions);

document.getElementById('quick-filter').addEventListener('input', (e) => {
  gridApi.setGridOption('quickFilterText', e.target.value);
});

fetch(dataFile)
  .then((response) => response.json())
  .then((rows) => gridApi.setGridOption('rowData', rows))
  .catch((err) => console.error('Failed to load ' + dataFile, err));
"#;
