//! Record sources feeding the collator
//!
//! The collator pulls records one at a time from a [`RecordSource`]. Decoding
//! the records from a file or network stream is the source's concern; the
//! collator only needs the next record and a one-time header.

use auto_impl::auto_impl;

use crate::Result;

/// A stream of records with an associated header
///
/// `next_record` returns `Ok(None)` once the stream is exhausted; this is the
/// end-of-stream signal, not an error. Failures reading the underlying data
/// are returned as errors and abort collation.
#[auto_impl(&mut, Box)]
pub trait RecordSource {
    type Record;
    type Header;

    /// The metadata blob read once at the start of the stream
    fn header(&self) -> &Self::Header;

    /// Pulls the next record, blocking until one is available
    fn next_record(&mut self) -> Result<Option<Self::Record>>;
}

/// A [`RecordSource`] over any in-memory iterator of records
pub struct IterSource<I, H> {
    header: H,
    inner: I,
}
impl<I, H> IterSource<I, H> {
    pub fn new<T>(header: H, records: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            header,
            inner: records.into_iter(),
        }
    }
}
impl<I: Iterator, H> RecordSource for IterSource<I, H> {
    type Record = I::Item;
    type Header = H;

    fn header(&self) -> &H {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<I::Item>> {
        Ok(self.inner.next())
    }
}
