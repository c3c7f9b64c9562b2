//! Parsing of `207 Multi-Status` PROPFIND bodies.
//!
//! Only the `<href>` of each `<response>` is read. Namespace prefixes vary by
//! server (`d:`, `D:`, none), so elements are matched on their local name.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, WebDavError};

/// Extract the raw `href` of every `<response>` element, in document order.
pub fn parse_hrefs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut hrefs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"href"
                    && stack.last().map(Vec::as_slice) == Some(&b"response"[..])
                {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"href" {
                    if let Some(href) = current.take() {
                        hrefs.push(href);
                    }
                }
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                if let Some(href) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| WebDavError::Parse(e.to_string()))?;
                    href.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(href) = current.as_mut() {
                    href.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(WebDavError::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(hrefs)
}

/// Last path segment of an href, percent-decoded. Empty for collections
/// (`/dav/files/` ends with a slash).
pub fn file_name_from_href(href: &str) -> String {
    let segment = href.trim().rsplit('/').next().unwrap_or_default();
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// File names listed in a multistatus body; collection entries are dropped.
pub fn parse_file_names(xml: &str) -> Result<Vec<String>> {
    Ok(parse_hrefs(xml)?
        .iter()
        .map(|href| file_name_from_href(href))
        .filter(|name| !name.is_empty())
        .collect())
}
