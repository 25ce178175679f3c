/// Everything shown on a rendered listing page.
pub struct PageContent<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub price: &'a str,
    pub url: &'a str,
    /// Image paths relative to the page itself.
    pub images: &'a [String],
    pub description: &'a str,
    pub contact: &'a str,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Standalone dark-themed HTML page for one listing.
pub fn render_listing_page(page: &PageContent) -> String {
    let title = escape(page.title);
    let images: String = page
        .images
        .iter()
        .map(|src| format!("<img src=\"{}\">", escape(src)))
        .collect();
    let contact = if page.contact.is_empty() {
        String::new()
    } else {
        format!("<div class=\"content\">{}</div>", escape(page.contact))
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="sk">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
:root {{ color-scheme: dark; background: #121212; color: #e0e0e0; font-family: sans-serif; }}
a {{ color: #80cbc4; }}
img {{ max-width: 100%; height: auto; margin: 10px 0; }}
.meta {{ font-size: .9em; color: #aaa; }}
.content {{ white-space: pre-wrap; margin-top: 1em; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="meta">{date} | {price}</p>
<p><a href="{url}" target="_blank">Otvoriť inzerát</a></p>
{images}
<div class="content">{description}</div>
{contact}
</body>
</html>
"#,
        title = title,
        date = escape(page.date),
        price = escape(page.price),
        url = escape(page.url),
        images = images,
        description = escape(page.description),
        contact = contact,
    )
}
