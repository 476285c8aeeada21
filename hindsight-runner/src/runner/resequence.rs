// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::{
    collections::BTreeMap,
    pin::Pin,
    task::{Context, Poll},
};

pin_project! {
    /// Restores index order for a stream of `(index, item)` pairs that complete out of order.
    ///
    /// Indexes are expected to be exactly `0..n`, each seen once. Items that arrive early are
    /// buffered until every item before them has been yielded.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub(crate) struct Resequence<S, T> {
        #[pin]
        inner: S,
        pending: BTreeMap<usize, T>,
        next: usize,
        done: bool,
    }
}

impl<S, T> Resequence<S, T>
where
    S: Stream<Item = (usize, T)>,
{
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            pending: BTreeMap::new(),
            next: 0,
            done: false,
        }
    }
}

impl<S, T> Stream for Resequence<S, T>
where
    S: Stream<Item = (usize, T)>,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut this = self.project();
        loop {
            let next = *this.next;
            if let Some(item) = this.pending.remove(&next) {
                *this.next += 1;
                return Poll::Ready(Some(item));
            }

            if *this.done {
                // A gap means an index was never produced. Flush what's left in index order
                // rather than dropping it.
                return Poll::Ready(this.pending.pop_first().map(|(_, item)| item));
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some((index, item)) => {
                    this.pending.insert(index, item);
                }
                None => *this.done = true,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = if self.done {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        };
        let pending = self.pending.len();
        (
            lower.saturating_add(pending),
            upper.and_then(|upper| upper.checked_add(pending)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, executor::block_on, stream};

    #[test]
    fn reorders_out_of_order_items() {
        let items = stream::iter([(2, 'c'), (0, 'a'), (3, 'd'), (1, 'b')]);
        let out: Vec<_> = block_on(Resequence::new(items).collect());
        assert_eq!(out, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn in_order_passthrough() {
        let items = stream::iter((0..5).map(|i| (i, i * 10)));
        let out: Vec<_> = block_on(Resequence::new(items).collect());
        assert_eq!(out, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn flushes_after_gap() {
        let items = stream::iter([(3, 'd'), (0, 'a'), (2, 'c')]);
        let out: Vec<_> = block_on(Resequence::new(items).collect());
        assert_eq!(out, vec!['a', 'c', 'd']);
    }

    #[test]
    fn empty() {
        let items = stream::iter(Vec::<(usize, ())>::new());
        let out: Vec<_> = block_on(Resequence::new(items).collect());
        assert!(out.is_empty());
    }
}
