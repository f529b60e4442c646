//! Generic cursor pagination.

use std::sync::Arc;

use async_trait::async_trait;
use execlens_api::ApiError;
use execlens_model::Page;
use futures::Stream;
use futures::stream;
use tracing::{debug, warn};

/// Fetches one page of a collection given the previous page's cursor.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
  async fn fetch_page(&self, cursor: Option<String>, first: usize) -> Result<Page<T>, ApiError>;
}

/// Everything fetched so far, after one more page arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
  /// All items in fetch order. Each snapshot extends the previous one.
  ///
  /// Shared with the stream: dropping a snapshot before pulling the next one
  /// lets the stream append in place instead of copying.
  pub items: Arc<Vec<T>>,
  /// Offset of the first item of the page that produced this snapshot.
  pub page_start: usize,
  pub loaded_count: usize,
  /// Total reported with the first page; later reports are ignored.
  pub total_count: Option<u64>,
  pub has_more: bool,
  /// Set on the last snapshot only.
  pub is_complete: bool,
}

impl<T> Snapshot<T> {
  /// Items added by the page that produced this snapshot.
  pub fn new_items(&self) -> &[T] {
    &self.items[self.page_start..]
  }
}

struct PaginationState<S, T> {
  source: S,
  cursor: Option<String>,
  items: Arc<Vec<T>>,
  total_count: Option<u64>,
  fetched_pages: usize,
  exhausted: bool,
}

/// Stream the pages of `source`, `batch_size` items at a time.
///
/// Each poll fetches at most one page. The stream ends after the snapshot
/// with `is_complete = true`, or right after yielding the first error.
pub fn paginate<T, S>(
  source: S,
  batch_size: usize,
) -> impl Stream<Item = Result<Snapshot<T>, ApiError>> + Send
where
  T: Clone + Send + Sync + 'static,
  S: PageSource<T> + 'static,
{
  let initial = PaginationState {
    source,
    cursor: None,
    items: Arc::new(Vec::new()),
    total_count: None,
    fetched_pages: 0,
    exhausted: false,
  };

  stream::try_unfold(initial, move |mut state| async move {
    if state.exhausted {
      return Ok(None);
    }

    let page = state
      .source
      .fetch_page(state.cursor.clone(), batch_size)
      .await?;

    if state.fetched_pages == 0 {
      state.total_count = page.total_count;
    }
    state.fetched_pages += 1;

    let page_start = state.items.len();
    Arc::make_mut(&mut state.items).extend(page.items);

    let mut has_more = page.has_next_page;
    if has_more {
      match page.end_cursor {
        Some(next) if state.cursor.as_deref() != Some(next.as_str()) => {
          state.cursor = Some(next);
        }
        _ => {
          warn!(
            page = state.fetched_pages,
            "server reported more pages without a new cursor; stopping"
          );
          has_more = false;
        }
      }
    }
    state.exhausted = !has_more;

    debug!(
      page = state.fetched_pages,
      loaded = state.items.len(),
      page_size = state.items.len() - page_start,
      has_more,
      "page fetched"
    );

    let snapshot = Snapshot {
      items: Arc::clone(&state.items),
      page_start,
      loaded_count: state.items.len(),
      total_count: state.total_count,
      has_more,
      is_complete: !has_more,
    };

    Ok(Some((snapshot, state)))
  })
}
