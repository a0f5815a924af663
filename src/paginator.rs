//! Sequential cursor pagination
//!
//! Each page request depends on the token returned by the previous one, so
//! pages are fetched strictly one at a time.

use anyhow::Result;
use std::future::Future;
use tracing::debug;

use crate::directory::{Page, Principal};
use crate::error::AuditError;

/// Fetches every page and concatenates the principals in page order
///
/// `list_page` is called with `None` first and then with each continuation
/// token until a page carries none. There is no upper bound on the number
/// of pages. The first failing page aborts the whole listing and discards
/// whatever was accumulated so far.
///
/// # Examples
///
/// ```
/// use awsusers::directory::{Page, Principal};
/// use awsusers::paginator::fetch_all;
///
/// # async fn example() -> Result<(), awsusers::error::AuditError> {
/// let principals = fetch_all(|token| async move {
///     Ok(match token.as_deref() {
///         None => Page::with_next(vec![Principal::new("alice")], "2"),
///         Some(_) => Page::last(vec![Principal::new("bob")]),
///     })
/// })
/// .await?;
/// assert_eq!(principals.len(), 2);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_all<F, Fut>(mut list_page: F) -> Result<Vec<Principal>, AuditError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let mut principals = Vec::new();
    let mut token: Option<String> = None;
    let mut page_index = 0;

    loop {
        let page = list_page(token.take())
            .await
            .map_err(|source| AuditError::Pagination {
                page: page_index,
                source: source.into(),
            })?;

        debug!(
            "Page {} returned {} principals (more: {})",
            page_index,
            page.principals.len(),
            page.next_token.is_some()
        );

        principals.extend(page.principals);
        page_index += 1;

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(principals)
}
