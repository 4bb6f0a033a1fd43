//! Buffered copy helper shared by the extraction backends.

use std::io::{self, Read, Write};

/// Outcome of a capped copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyRead {
    /// Reader drained before the cap; holds the total bytes copied.
    Complete(u64),
    /// Cap reached with input left over; holds the bytes copied (the cap).
    CapHit(u64),
}

/// Reusable 64 KiB copy buffer for streaming extraction.
///
/// One buffer is allocated per archive and shared across members, so
/// extraction cost stays flat regardless of member count.
pub(crate) struct CopyBuffer {
    buf: [u8; Self::LEN],
}

impl CopyBuffer {
    const LEN: usize = 64 * 1024;

    pub(crate) const fn new() -> Self {
        Self { buf: [0; Self::LEN] }
    }

    /// Copies at most `cap` bytes from `reader` into `writer`.
    ///
    /// Returns [`CopyRead::CapHit`] when the reader still has data after the
    /// cap is reached, so callers can reject members whose real size exceeds
    /// their allowance even when the archive header lied about it. The probe
    /// consumes one byte past the cap; callers discard the partial output on
    /// a cap hit.
    pub(crate) fn copy_limited<R: Read + ?Sized, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        cap: u64,
    ) -> io::Result<CopyRead> {
        let mut copied: u64 = 0;
        loop {
            let remaining = cap - copied;
            if remaining == 0 {
                return if self.has_more(reader)? {
                    Ok(CopyRead::CapHit(copied))
                } else {
                    Ok(CopyRead::Complete(copied))
                };
            }
            let want = usize::try_from(remaining.min(Self::LEN as u64)).unwrap_or(Self::LEN);
            let n = match reader.read(&mut self.buf[..want]) {
                Ok(0) => return Ok(CopyRead::Complete(copied)),
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            writer.write_all(&self.buf[..n])?;
            copied = copied.checked_add(n as u64).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "copied byte count overflowed")
            })?;
        }
    }

    fn has_more<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<bool> {
        loop {
            match reader.read(&mut self.buf[..1]) {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
