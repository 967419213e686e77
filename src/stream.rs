use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

/// Fills `buf` from `reader`, retrying interrupted reads, until the buffer is full or the
/// reader hits end of file. Returns how many bytes were actually read.
pub fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break, // EOF
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err)
        }
    }
    Ok(filled)
}

/// Reads up to `len` bytes from the start of `source`. Shorter files give a shorter buffer.
pub fn read_prefix<R: Read + Seek>(source: &mut R, len: u64) -> io::Result<Vec<u8>> {
    source.seek(SeekFrom::Start(0))?;
    let mut prefix = Vec::new();
    source.by_ref().take(len).read_to_end(&mut prefix)?;
    Ok(prefix)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // yields at most `chunk` bytes per call and fails every other call with Interrupted
    struct Stuttering<'a> {
        data: &'a [u8],
        chunk: usize,
        interrupt: bool
    }

    impl Read for Stuttering<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn retries_interrupted_and_short_reads() {
        let data: Vec<u8> = (0..10).collect();
        let mut reader = Stuttering { data: &data, chunk: 3, interrupt: false };
        let mut buf = [0u8; 8];
        assert_eq!(read_fully(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn stops_at_end_of_file() {
        let mut reader = Cursor::new(vec![9u8; 5]);
        let mut buf = [0u8; 8];
        assert_eq!(read_fully(&mut reader, &mut buf).unwrap(), 5);
        assert_eq!(&buf[5..], &[0, 0, 0]);
    }

    #[test]
    fn propagates_hard_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::PermissionDenied, "nope"))
            }
        }
        let mut buf = [0u8; 4];
        let err = read_fully(&mut Broken, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn prefix_is_clipped_to_file_length() {
        let mut source = Cursor::new(vec![1u8, 2, 3]);
        source.set_position(2);
        assert_eq!(read_prefix(&mut source, 100).unwrap(), vec![1, 2, 3]);
        assert_eq!(read_prefix(&mut source, 2).unwrap(), vec![1, 2]);
    }
}
