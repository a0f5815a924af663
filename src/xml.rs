//! XML processing for IAM Query API responses
//!
//! IAM answers every Query API call with an XML document such as:
//!
//! ```text
//! <ListUsersResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
//!   <ListUsersResult>
//!     <Users>
//!       <member><UserName>alice</UserName><Arn>arn:aws:iam::1:user/alice</Arn></member>
//!     </Users>
//!     <IsTruncated>true</IsTruncated>
//!     <Marker>opaque</Marker>
//!   </ListUsersResult>
//! </ListUsersResponse>
//! ```
//!
//! The parser walks the document once, tracking the path of local element
//! names (namespace prefixes dropped), and picks values by path suffix.

use anyhow::{anyhow, Context, Result};
use quick_xml::{events::Event, Reader};
use tracing::debug;

use crate::directory::{Page, Principal};

/// A text node or a closing tag, with the element path leading to it
enum Node<'a> {
    Text { path: &'a [String], text: String },
    Close { path: &'a [String] },
}

/// Walks `xml` and hands every text node (CDATA included) and closing tag to `visit`
fn walk<F>(xml: &str, mut visit: F) -> Result<()>
where
    F: FnMut(Node<'_>) -> Result<()>,
{
    if xml.trim().is_empty() {
        return Err(anyhow!("Empty XML content"));
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref())
                    .context("Invalid UTF-8 in tag name")?
                    .to_string();
                path.push(name);
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .context("Failed to unescape text content")?
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    visit(Node::Text { path: &path, text })?;
                }
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e.into_inner())
                    .context("Invalid UTF-8 in CDATA section")?
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    visit(Node::Text { path: &path, text })?;
                }
            }
            Ok(Event::End(_)) => {
                visit(Node::Close { path: &path })?;
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

/// Parses a `ListUsers` response into a page
///
/// The continuation token is the `Marker` when `IsTruncated` is true. A
/// truncated response without a marker cannot be continued and is an error.
pub fn parse_list_users(xml: &str) -> Result<Page> {
    let mut principals = Vec::new();
    let mut current: Option<Principal> = None;
    let mut arn: Option<String> = None;
    let mut truncated = false;
    let mut marker: Option<String> = None;
    let mut saw_result = false;

    walk(xml, |node| {
        match node {
            Node::Text { path, text } => {
                if ends_with(path, &["Users", "member", "UserName"]) {
                    current = Some(Principal::new(text));
                } else if ends_with(path, &["Users", "member", "Arn"]) {
                    arn = Some(text);
                } else if ends_with(path, &["ListUsersResult", "IsTruncated"]) {
                    truncated = text.eq_ignore_ascii_case("true");
                } else if ends_with(path, &["ListUsersResult", "Marker"]) {
                    marker = Some(text);
                }
            }
            Node::Close { path } => {
                if ends_with(path, &["Users", "member"]) {
                    let mut principal = current
                        .take()
                        .ok_or_else(|| anyhow!("User entry without a UserName"))?;
                    principal.arn = arn.take();
                    principals.push(principal);
                } else if ends_with(path, &["ListUsersResult"]) {
                    saw_result = true;
                }
            }
        }
        Ok(())
    })
    .context("Failed to parse ListUsers response")?;

    if !saw_result {
        return Err(anyhow!("Missing ListUsersResult element"));
    }

    let next_token = match (truncated, marker) {
        (true, Some(marker)) => Some(marker),
        (true, None) => return Err(anyhow!("Truncated ListUsers response without a Marker")),
        (false, _) => None,
    };

    debug!(
        "Parsed {} users from ListUsers response (truncated: {})",
        principals.len(),
        truncated
    );
    Ok(Page {
        principals,
        next_token,
    })
}

/// Parses a `ListGroupsForUser` response into group names, in document order
pub fn parse_list_groups_for_user(xml: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut saw_result = false;

    walk(xml, |node| {
        match node {
            Node::Text { path, text } => {
                if ends_with(path, &["Groups", "member", "GroupName"]) {
                    groups.push(text);
                }
            }
            Node::Close { path } => {
                if ends_with(path, &["ListGroupsForUserResult"]) {
                    saw_result = true;
                }
            }
        }
        Ok(())
    })
    .context("Failed to parse ListGroupsForUser response")?;

    if !saw_result {
        return Err(anyhow!("Missing ListGroupsForUserResult element"));
    }

    Ok(groups)
}

/// Extracts `(Code, Message)` from an `ErrorResponse` document
///
/// Returns `None` when the body is not an error document.
pub fn parse_error_response(xml: &str) -> Option<(String, String)> {
    let mut code = None;
    let mut message = String::new();

    walk(xml, |node| {
        if let Node::Text { path, text } = node {
            if ends_with(path, &["Error", "Code"]) {
                code = Some(text);
            } else if ends_with(path, &["Error", "Message"]) {
                message = text;
            }
        }
        Ok(())
    })
    .ok()?;

    code.map(|code| (code, message))
}
