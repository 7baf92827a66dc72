use std::io::{self, Read};

/// A pass-through read observer.
///
/// Wraps any readable source; after each physical read the callback
/// receives exactly the bytes just read, then the bytes are returned to
/// the caller unchanged. Archiving and auditing collaborators use this to
/// obtain a streamed copy without altering the primary read path.
///
/// The callback runs synchronously, once per physical underlying read
/// (one logical read higher up may trigger zero, one, or several). A
/// failing callback is logged and swallowed: a broken archive side effect
/// must never abort primary processing.
pub struct ReadTap<R, F> {
    inner: R,
    on_chunk: F,
}

impl<R, F> ReadTap<R, F>
where
    R: Read,
    F: FnMut(&[u8]) -> anyhow::Result<()>,
{
    pub fn new(inner: R, on_chunk: F) -> Self {
        Self { inner, on_chunk }
    }

    /// Unwrap the tap, returning the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R, F> Read for ReadTap<R, F>
where
    R: Read,
    F: FnMut(&[u8]) -> anyhow::Result<()>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let copied = self.inner.read(buf)?;
        if copied > 0 {
            if let Err(err) = (self.on_chunk)(&buf[..copied]) {
                log::warn!("tap: observer failed, continuing: {err}");
            }
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use anyhow::anyhow;

    use super::ReadTap;

    #[test]
    fn observer_sees_an_exact_copy() {
        let mut spool = Vec::new();
        let mut tap = ReadTap::new(Cursor::new(b"hello world"), |chunk| {
            spool.extend_from_slice(chunk);
            Ok(())
        });

        let mut out = Vec::new();
        tap.read_to_end(&mut out).expect("read failed");
        drop(tap);

        assert_eq!(out, b"hello world");
        assert_eq!(spool, b"hello world");
    }

    #[test]
    fn observer_fires_once_per_physical_read() {
        let mut calls = 0;
        let mut tap = ReadTap::new(Cursor::new(b"abcdef"), |_| {
            calls += 1;
            Ok(())
        });

        let mut dest = [0u8; 2];
        while tap.read(&mut dest).unwrap() > 0 {}
        drop(tap);

        // Three 2-byte reads; the final zero-length read is not observed.
        assert_eq!(calls, 3);
    }

    #[test]
    fn failing_observer_never_disturbs_the_read_path() {
        let mut tap = ReadTap::new(Cursor::new(b"payload"), |_| {
            Err(anyhow!("archive is full"))
        });

        let mut out = Vec::new();
        tap.read_to_end(&mut out).expect("read failed");
        assert_eq!(out, b"payload");
    }
}
