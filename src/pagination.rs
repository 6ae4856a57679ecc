use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use crate::client::Api;
use crate::entity::{Entity, Resource};
use crate::error::RefineError;

/// Query-string filters for search endpoints. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_all<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        for value in values {
            self.0.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn without(&self, keys: &[&str]) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(name, _)| !keys.contains(&name.as_str()))
            .cloned()
            .collect()
    }
}

/// List response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

struct PageCache<R> {
    pages: Vec<Option<Arc<Vec<R>>>>,
    changed: Option<usize>,
}

/// Random-access view over a paginated search result.
///
/// The total count and page size are fixed when the list is created. Pages
/// are fetched on demand by `offset`/`limit`; if the server ever reports a
/// different total, the list refuses all further access.
pub struct PaginatedList<R: Resource> {
    api: Api,
    url: String,
    filters: Filters,
    base_offset: usize,
    count: usize,
    page_size: usize,
    cache: Mutex<PageCache<R>>,
}

impl<R: Resource> PaginatedList<R> {
    pub fn fetch(api: &Api, url: String, filters: Filters) -> Result<Self, RefineError> {
        let envelope: Envelope<R> = api.get_url(&url, filters.pairs())?;
        Ok(Self::from_envelope(api, url, filters, envelope))
    }

    pub fn from_envelope(api: &Api, url: String, filters: Filters, envelope: Envelope<R>) -> Self {
        let base_offset = filters
            .value("offset")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        let count = envelope.count;
        let len = count.saturating_sub(base_offset);
        let page_size = if envelope.results.is_empty() {
            filters
                .value("limit")
                .and_then(|value| value.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(1)
        } else {
            envelope.results.len()
        };

        let mut pages = vec![None; len.div_ceil(page_size)];
        if let Some(first) = pages.first_mut() {
            if !envelope.results.is_empty() {
                *first = Some(Arc::new(envelope.results));
            }
        }

        Self {
            api: api.clone(),
            url,
            filters,
            base_offset,
            count,
            page_size,
            cache: Mutex::new(PageCache {
                pages,
                changed: None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.count.saturating_sub(self.base_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Negative indexes count from the end: `-1` is the last element.
    pub fn get(&self, index: isize) -> Result<Entity<R>, RefineError> {
        let position = self.position(index)?;
        let record = self.record_at(position)?;
        Ok(Entity::from_record(&self.api, record))
    }

    pub fn first(&self) -> Result<Option<Entity<R>>, RefineError> {
        if self.is_empty() {
            return Ok(None);
        }
        self.get(0).map(Some)
    }

    /// Equivalent of `list[start:stop:step]`.
    pub fn slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<Vec<Entity<R>>, RefineError> {
        slice_indices(self.len(), start, stop, step)?
            .into_iter()
            .map(|position| {
                self.record_at(position)
                    .map(|record| Entity::from_record(&self.api, record))
            })
            .collect()
    }

    pub fn iter(&self) -> Iter<'_, R> {
        Iter {
            list: self,
            cursor: 0,
        }
    }

    fn position(&self, index: isize) -> Result<usize, RefineError> {
        let len = self.len();
        let normalized = if index < 0 {
            index.checked_add_unsigned(len)
        } else {
            Some(index)
        };
        match normalized {
            Some(position) if position >= 0 && (position as usize) < len => Ok(position as usize),
            _ => Err(RefineError::IndexOutOfRange { index, len }),
        }
    }

    fn record_at(&self, position: usize) -> Result<R, RefineError> {
        let page_index = position / self.page_size;
        let page = self.page(page_index)?;
        page.get(position % self.page_size)
            .cloned()
            .ok_or(RefineError::ListChanged {
                expected: self.count,
                actual: self.base_offset + page_index * self.page_size + page.len(),
            })
    }

    fn page(&self, index: usize) -> Result<Arc<Vec<R>>, RefineError> {
        let mut cache = self.lock();
        if let Some(actual) = cache.changed {
            return Err(RefineError::ListChanged {
                expected: self.count,
                actual,
            });
        }
        if let Some(Some(page)) = cache.pages.get(index) {
            return Ok(page.clone());
        }

        let offset = self.base_offset + index * self.page_size;
        let mut query = self.filters.without(&["offset", "limit"]);
        query.push(("offset".to_string(), offset.to_string()));
        query.push(("limit".to_string(), self.page_size.to_string()));
        tracing::debug!(
            resource = R::NAME,
            page = index,
            offset,
            limit = self.page_size,
            "fetching page"
        );

        let envelope: Envelope<R> = self.api.get_url(&self.url, &query)?;
        if envelope.count != self.count {
            tracing::warn!(
                resource = R::NAME,
                expected = self.count,
                actual = envelope.count,
                "result set changed since the list was created"
            );
            cache.changed = Some(envelope.count);
            return Err(RefineError::ListChanged {
                expected: self.count,
                actual: envelope.count,
            });
        }

        let page = Arc::new(envelope.results);
        if let Some(slot) = cache.pages.get_mut(index) {
            *slot = Some(page.clone());
        }
        Ok(page)
    }

    fn lock(&self) -> MutexGuard<'_, PageCache<R>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Resource> fmt::Debug for PaginatedList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedList")
            .field("resource", &R::NAME)
            .field("url", &self.url)
            .field("len", &self.len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

pub struct Iter<'a, R: Resource> {
    list: &'a PaginatedList<R>,
    cursor: usize,
}

impl<R: Resource> Iterator for Iter<'_, R> {
    type Item = Result<Entity<R>, RefineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.list.len();
        if self.cursor >= len {
            return None;
        }
        let item = self
            .list
            .record_at(self.cursor)
            .map(|record| Entity::from_record(&self.list.api, record));
        self.cursor = if item.is_ok() { self.cursor + 1 } else { len };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.list.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl<'a, R: Resource> IntoIterator for &'a PaginatedList<R> {
    type Item = Result<Entity<R>, RefineError>;
    type IntoIter = Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolves `start:stop:step` against `len` items. Bounds are clamped and
/// negative values count from the end.
pub fn slice_indices(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
) -> Result<Vec<usize>, RefineError> {
    if step == 0 {
        return Err(RefineError::InvalidArgument(
            "slice step cannot be zero".to_string(),
        ));
    }
    let len = len as isize;
    let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
    let clamp = |bound: Option<isize>, default: isize| match bound {
        None => default,
        Some(value) if value < 0 => (value + len).max(lower),
        Some(value) => value.min(upper),
    };
    let (start, stop) = if step < 0 {
        (clamp(start, upper), clamp(stop, lower))
    } else {
        (clamp(start, lower), clamp(stop, upper))
    };

    let mut indices = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        indices.push(current as usize);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_slices() {
        assert_eq!(
            slice_indices(20, Some(5), Some(15), 1).unwrap(),
            (5..15).collect::<Vec<_>>()
        );
        assert_eq!(
            slice_indices(20, Some(5), Some(15), 2).unwrap(),
            vec![5, 7, 9, 11, 13]
        );
        assert_eq!(
            slice_indices(20, Some(5), Some(-5), 1).unwrap(),
            (5..15).collect::<Vec<_>>()
        );
        assert_eq!(slice_indices(20, None, None, 5).unwrap(), vec![0, 5, 10, 15]);
    }

    #[test]
    fn huge_steps_stop_after_one_index() {
        assert_eq!(slice_indices(4, Some(1), None, isize::MAX).unwrap(), vec![1]);
        assert_eq!(slice_indices(4, None, None, isize::MIN).unwrap(), vec![3]);
    }

    #[test]
    fn backward_slices() {
        assert_eq!(
            slice_indices(20, Some(15), Some(5), -1).unwrap(),
            (6..=15).rev().collect::<Vec<_>>()
        );
        assert_eq!(slice_indices(20, None, None, -5).unwrap(), vec![19, 14, 9, 4]);
        assert_eq!(slice_indices(3, None, None, -1).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn out_of_range_bounds_are_clamped() {
        assert_eq!(slice_indices(4, Some(-100), Some(100), 1).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(slice_indices(4, Some(100), Some(-100), -1).unwrap(), vec![3, 2, 1, 0]);
        assert!(slice_indices(4, Some(3), Some(1), 1).unwrap().is_empty());
        assert!(slice_indices(0, None, None, -1).unwrap().is_empty());
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            slice_indices(4, None, None, 0),
            Err(RefineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn filters_drop_paging_keys() {
        let filters = Filters::new()
            .with("limit", 10)
            .with("organism", "HOMO_SAPIENS")
            .with("offset", 0);
        assert_eq!(
            filters.without(&["offset", "limit"]),
            vec![("organism".to_string(), "HOMO_SAPIENS".to_string())]
        );
        assert_eq!(filters.value("limit"), Some("10"));
    }
}
