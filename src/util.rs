use std::fmt;

/// Trace log a chunk of wire data as hex and ascii rows.
pub(crate) fn log_data(data: &[u8]) {
    if !log_enabled!(log::Level::Trace) {
        return;
    }

    for row in data.chunks(16) {
        trace!("{:?}", Row(row));
    }
}

struct Row<'a>(&'a [u8]);

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x} ", b)?;
        }

        // Pad short rows so the ascii column lines up.
        for _ in self.0.len()..16 {
            write!(f, "   ")?;
        }

        for b in self.0 {
            let c = if b.is_ascii_graphic() || *b == b' ' {
                *b as char
            } else {
                '.'
            };
            write!(f, "{}", c)?;
        }

        Ok(())
    }
}
