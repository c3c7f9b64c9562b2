//! HTML fixtures shaped like the listing and indirection pages the
//! extractor understands.

pub const LISTING_URL: &str = "https://games.test/some-release/";

/// Indirection link for `filename` on the download host.
pub fn host_link(id: &str, filename: &str) -> String {
    format!("https://fuckingfast.co/{}#{}", id, filename)
}

/// A listing page whose second spoiler block holds `links`. The first block
/// always carries a decoy link that must be ignored.
pub fn listing_page(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}" target="_blank">{}</a><br>"#, href, href))
        .collect();

    format!(
        r#"<!DOCTYPE html><html><body>
<div class="su-spoiler su-spoiler-style-fancy">
  <div class="su-spoiler-content su-u-clearfix su-u-trim">
    <a href="https://fuckingfast.co/decoy#optional-extras.rar">extras</a>
  </div>
</div>
<div class="su-spoiler su-spoiler-style-fancy">
  <div class="su-spoiler-content su-u-clearfix su-u-trim">{}</div>
</div>
</body></html>"#,
        anchors
    )
}

/// A listing page without the download section.
pub fn page_without_section() -> String {
    r#"<!DOCTYPE html><html><body><div class="entry-content"><p>Nothing here</p></div></body></html>"#
        .to_string()
}

/// An indirection page whose download script opens `direct_url`.
pub fn indirection_page(direct_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
<script src="/static/app.js"></script>
<script>
  function download() {{
    window.open("{}")
  }}
</script>
</head><body><button onclick="download()">DOWNLOAD</button></body></html>"#,
        direct_url
    )
}

/// An indirection page without a download script (expired or removed file).
pub fn dead_indirection_page() -> String {
    r#"<!DOCTYPE html><html><head><title>File not found</title></head><body></body></html>"#
        .to_string()
}
