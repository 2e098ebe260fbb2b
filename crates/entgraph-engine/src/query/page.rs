//! Pagination and mapped queries.

use std::marker::PhantomData;
use std::ops::ControlFlow;

use entgraph_common::utils::error::{ConfigError, Result};
use entgraph_core::storage::IndexKey;

use super::Query;
use crate::ctx::Ctx;
use crate::ent::Ent;

/// A page request.
///
/// The cursor is the [`IndexKey`] of the last entity of the previous page,
/// as returned in [`Page::continue_cursor`]. It is only meaningful for a
/// query of the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Resume after this key. `None` starts from the beginning.
    pub cursor: Option<IndexKey>,
    /// Page size. `None` falls back to the query's `take`, then to the
    /// configured default page size. Zero is rejected.
    pub num_items: Option<usize>,
}

impl PageRequest {
    /// First page of `n` items.
    #[must_use]
    pub fn first(n: usize) -> Self {
        Self {
            cursor: None,
            num_items: Some(n),
        }
    }

    /// Page following `cursor`.
    #[must_use]
    pub fn after(cursor: Option<IndexKey>) -> Self {
        Self {
            cursor,
            num_items: None,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub fn num_items(mut self, n: usize) -> Self {
        self.num_items = Some(n);
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items of this page.
    pub page: Vec<T>,
    /// Key to pass as the next request's cursor.
    pub continue_cursor: Option<IndexKey>,
    /// True when no items follow this page.
    pub is_done: bool,
}

impl Query {
    pub(super) fn paginate_with<T, F>(
        &self,
        ctx: &Ctx<'_>,
        request: PageRequest,
        mut f: F,
    ) -> Result<Page<T>>
    where
        F: FnMut(Ent) -> Result<T>,
    {
        let n = request
            .num_items
            .or(self.limit)
            .unwrap_or(ctx.config().default_page_size);
        if n == 0 {
            if request.num_items.is_none() && self.limit == Some(0) {
                return Ok(Page {
                    page: Vec::new(),
                    continue_cursor: request.cursor,
                    is_done: true,
                });
            }
            return Err(ConfigError::ZeroPageSize.into());
        }
        let mut page = Vec::new();
        let mut continue_cursor = request.cursor.clone();
        let mut more = false;

        self.scan_matches(ctx, request.cursor, |key, ent| {
            if page.len() == n {
                more = true;
                return Ok(ControlFlow::Break(()));
            }
            page.push(f(ent)?);
            continue_cursor = Some(key);
            Ok(ControlFlow::Continue(()))
        })?;

        Ok(Page {
            page,
            continue_cursor,
            is_done: !more,
        })
    }
}

/// A query whose results pass through a closure. Created by
/// [`Query::map`].
pub struct MappedQuery<F, T> {
    query: Query,
    f: F,
    _out: PhantomData<fn() -> T>,
}

impl<F, T> MappedQuery<F, T>
where
    F: FnMut(&Ctx<'_>, Ent) -> Result<T>,
{
    pub(super) fn new(query: Query, f: F) -> Self {
        Self {
            query,
            f,
            _out: PhantomData,
        }
    }

    /// Collects every mapped result.
    pub fn collect(self, ctx: &Ctx<'_>) -> Result<Vec<T>> {
        let Self { query, mut f, .. } = self;
        let mut out = Vec::new();
        query.scan_matches(ctx, None, |_, ent| {
            out.push(f(ctx, ent)?);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    /// Maps the first result, if any.
    pub fn first(self, ctx: &Ctx<'_>) -> Result<Option<T>> {
        let Self { query, mut f, .. } = self;
        match query.first(ctx)? {
            Some(ent) => f(ctx, ent).map(Some),
            None => Ok(None),
        }
    }

    /// Returns one page of mapped results.
    pub fn paginate(self, ctx: &Ctx<'_>, request: PageRequest) -> Result<Page<T>> {
        let Self { query, mut f, .. } = self;
        query.paginate_with(ctx, request, |ent| f(ctx, ent))
    }
}

impl<F, T> std::fmt::Debug for MappedQuery<F, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedQuery")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
