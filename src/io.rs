//! I/O wrappers that tick a bar by bytes transferred.
//!
//! [`ProgressReader`] and [`ProgressWriter`] wrap any [`Read`] or [`Write`] and
//! tick the attached [`ProgressBar`] by the number of bytes each call moved. Size
//! the bar in bytes (e.g. from file metadata) and it completes when the last byte
//! goes through.

use std::{
    borrow::BorrowMut,
    io::{self, Read, Write},
};

use crate::ProgressBar;

/// A [`Read`] adapter ticking a bar by bytes read.
pub struct ProgressReader<R, B> {
    inner: R,
    bar: B,
}

impl<R, B: BorrowMut<ProgressBar>> ProgressReader<R, B> {
    /// Wraps `inner`, ticking `bar`.
    pub const fn new(inner: R, bar: B) -> Self {
        Self { inner, bar }
    }

    /// Unwraps the adapter.
    pub fn into_inner(self) -> (R, B) {
        (self.inner, self.bar)
    }
}

impl<R: Read, B: BorrowMut<ProgressBar>> Read for ProgressReader<R, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.borrow_mut().tick(n as u64);
        Ok(n)
    }
}

/// A [`Write`] adapter ticking a bar by bytes written.
pub struct ProgressWriter<W, B> {
    inner: W,
    bar: B,
}

impl<W, B: BorrowMut<ProgressBar>> ProgressWriter<W, B> {
    /// Wraps `inner`, ticking `bar`.
    pub const fn new(inner: W, bar: B) -> Self {
        Self { inner, bar }
    }

    /// Unwraps the adapter.
    pub fn into_inner(self) -> (W, B) {
        (self.inner, self.bar)
    }
}

impl<W: Write, B: BorrowMut<ProgressBar>> Write for ProgressWriter<W, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bar.borrow_mut().tick(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
