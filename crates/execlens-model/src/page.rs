/// One page of a cursor-paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Cursor to pass back to fetch the following page.
  pub end_cursor: Option<String>,
  pub has_next_page: bool,
  /// Server-reported size of the whole collection, when the query asks for it.
  pub total_count: Option<u64>,
}

impl<T> Page<T> {
  /// A final page with no items.
  pub fn empty() -> Self {
    Self {
      items: Vec::new(),
      end_cursor: None,
      has_next_page: false,
      total_count: Some(0),
    }
  }
}
