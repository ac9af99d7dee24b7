//! Markdown to HTML
//!
//! Intermediate HTML rendering of the report. Image references are rewritten
//! to absolute `file://` URLs so the document renders from any location.

use std::path::Path;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

const STYLESHEET: &str = r"
@page { size: A4; margin: 2cm; }
body { font-family: sans-serif; }
h1, h2, h3 { color: #333; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
img { max-width: 100%; height: auto; display: block; margin-left: auto; margin-right: auto; margin-bottom: 1em; }
";

/// Parser options shared by the HTML and PDF renderers
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Absolute `file://` URL for an image referenced relative to `plots_dir`.
///
/// Remote and already-absolute URLs are returned unchanged.
pub fn resolve_image_url(dest: &str, plots_dir: &Path) -> String {
    if dest.contains("://") || dest.starts_with('/') {
        return dest.to_string();
    }
    let dir = std::path::absolute(plots_dir).unwrap_or_else(|_| plots_dir.to_path_buf());
    format!("file://{}", dir.join(dest).display())
}

/// HTML body fragment for `markdown`
pub fn markdown_to_html_fragment(markdown: &str, plots_dir: &Path) -> String {
    let parser = Parser::new_ext(markdown, markdown_options()).map(|event| match event {
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
            let resolved = resolve_image_url(&dest_url, plots_dir);
            Event::Start(Tag::Image {
                link_type,
                dest_url: CowStr::from(resolved),
                title,
                id,
            })
        }
        other => other,
    });

    let mut body = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut body, parser);
    body
}

/// Standalone HTML document for `markdown`
pub fn markdown_to_html(markdown: &str, title: &str, plots_dir: &Path) -> String {
    let body = markdown_to_html_fragment(markdown, plots_dir);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLESHEET}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_paths_become_absolute() {
        let md = "![BTC-USD Price Trend](btc_price_trend_2025-05-08.svg)\n";
        let html = markdown_to_html_fragment(md, Path::new("/srv/reports/plots"));

        assert!(html.contains(r#"src="file:///srv/reports/plots/btc_price_trend_2025-05-08.svg""#));
        assert!(html.contains(r#"alt="BTC-USD Price Trend""#));
    }

    #[test]
    fn test_remote_images_untouched() {
        assert_eq!(
            resolve_image_url("https://example.com/a.png", Path::new("/tmp")),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_tables_render() {
        let md = "| date | price |\n|---|--:|\n| 2025-05-08 | 1.00 |\n";
        let html = markdown_to_html_fragment(md, Path::new("/tmp"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>2025-05-08</td>"));
    }

    #[test]
    fn test_document_wrapper() {
        let doc = markdown_to_html("# Title", "Daily <Report>", Path::new("/tmp"));
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Daily &lt;Report&gt;</title>"));
        assert!(doc.contains("<h1>Title</h1>"));
    }
}
