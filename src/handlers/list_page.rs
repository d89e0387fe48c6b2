//! Renders the directory-grouped listing as a standalone HTML page.
//!
//! The view model arrives escaped; only URLs are escaped here since they carry
//! the caller's `Host` header.

use crate::{models::listing::ListView, services::listing_service::html_escape};

const PAGE_HEAD: &str = concat!(
    "<!DOCTYPE html><html lang=\"en\"><head>",
    "<meta charset=\"utf-8\">",
    "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
    "<title>Files</title>",
    "<style>",
    "body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:60rem;padding:0 1rem}",
    "h2{font-size:1.1rem;margin-top:2rem;border-bottom:1px solid #ddd}",
    "h2 small{color:#777;font-weight:normal}",
    "ul{list-style:none;padding:0}li{padding:.15rem 0}",
    "</style></head><body><h1>Files</h1>"
);

const PAGE_TAIL: &str = "</body></html>";

pub fn render(view: &ListView) -> String {
    let mut html = String::from(PAGE_HEAD);

    if view.directories.is_empty() {
        html.push_str("<p>No files.</p>");
    }

    for dir in &view.directories {
        html.push_str("<section>");
        html.push_str(&format!(
            "<h2>{} <small>({} {})</small></h2>",
            dir.name,
            dir.file_count,
            if dir.file_count == 1 { "file" } else { "files" }
        ));
        html.push_str("<ul>");
        for file in &dir.files {
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>",
                html_escape(&file.url),
                file.display_name.as_deref().unwrap_or_default()
            ));
        }
        html.push_str("</ul></section>");
    }

    html.push_str(PAGE_TAIL);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::{DirectoryView, ObjectEntry};

    #[test]
    fn renders_groups_in_order() {
        let view = ListView {
            directories: vec![
                DirectoryView {
                    name: "Root Directory".into(),
                    file_count: 1,
                    files: vec![ObjectEntry {
                        name: "a.txt".into(),
                        url: "http://gw/a.txt".into(),
                        display_name: Some("a.txt".into()),
                    }],
                },
                DirectoryView {
                    name: "docs".into(),
                    file_count: 2,
                    files: vec![],
                },
            ],
        };
        let html = render(&view);
        let root = html.find("Root Directory").unwrap();
        let docs = html.find("docs").unwrap();
        assert!(root < docs);
        assert!(html.contains("<a href=\"http://gw/a.txt\">a.txt</a>"));
        assert!(html.contains("(2 files)"));
        assert!(html.contains("(1 file)"));
    }

    #[test]
    fn escapes_url_attribute() {
        let view = ListView {
            directories: vec![DirectoryView {
                name: "x".into(),
                file_count: 1,
                files: vec![ObjectEntry {
                    name: "a".into(),
                    url: "http://\"><script>/a".into(),
                    display_name: Some("a".into()),
                }],
            }],
        };
        let html = render(&view);
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert!(render(&ListView::default()).contains("No files."));
    }
}
