//! Resumable decoders for the NUL-delimited output of status queries.
//!
//! Two wire layouts are handled:
//!
//! - diff records: `:<src-mode> <dst-mode> <src-oid> <dst-oid> <status>\0<path>\0`
//! - listing records: `<path>\0`
//!
//! A [`StreamParser`] buffers whatever it is fed and only emits a record once
//! every terminator of that record has arrived, so chunk boundaries may fall
//! anywhere. Bytes still buffered when the stream ends are dropped.

use crate::core::{
    state::FileInfo,
    status_code::{SlotStatus, StatusFragment},
};
use bstr::{BString, ByteSlice};
use bytes::{Buf, BytesMut};

/// Which query produced the bytes, and therefore how records are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Tree-vs-index diff; describes the baseline slot
    DiffIndex,
    /// Index-vs-worktree diff; describes the staged slot
    DiffFiles,
    /// Untracked file listing
    Others,
}

/// One decoded record, ready to be merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub path: BString,
    pub fragment: StatusFragment,
    pub baseline_info: Option<FileInfo>,
    pub staged_info: Option<FileInfo>,
}

#[derive(Debug)]
pub struct StreamParser {
    format: RecordFormat,
    buf: BytesMut,
}

impl StreamParser {
    pub fn new(format: RecordFormat) -> Self {
        Self {
            format,
            buf: BytesMut::new(),
        }
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Number of bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append a chunk and decode every record it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ParsedRecord> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();

        loop {
            let next = match self.format {
                RecordFormat::Others => self.next_listing_record(),
                RecordFormat::DiffIndex | RecordFormat::DiffFiles => self.next_diff_record(),
            };
            match next {
                Some(Some(record)) => records.push(record),
                Some(None) => continue,
                None => break,
            }
        }

        records
    }

    /// End of stream; an unterminated tail is discarded
    pub fn finish(self) -> usize {
        let dropped = self.buf.len();
        if dropped > 0 {
            log::warn!(
                "{:?} stream ended inside a record, discarding {} bytes",
                self.format,
                dropped
            );
        }
        dropped
    }

    /// `None` when the buffer holds no complete record, `Some(None)` when a
    /// complete but undecodable record was consumed
    fn next_diff_record(&mut self) -> Option<Option<ParsedRecord>> {
        let meta_end = self.buf.find_byte(0)?;
        let path_end = meta_end + 1 + self.buf[meta_end + 1..].find_byte(0)?;

        let record = {
            let meta = &self.buf[..meta_end];
            let path = &self.buf[meta_end + 1..path_end];
            decode_diff_record(self.format, meta, path)
        };
        self.buf.advance(path_end + 1);

        Some(record)
    }

    fn next_listing_record(&mut self) -> Option<Option<ParsedRecord>> {
        let end = self.buf.find_byte(0)?;
        let mut path = &self.buf[..end];
        if let Some(stripped) = path.strip_suffix(b"/") {
            path = stripped;
        }
        let record = ParsedRecord {
            path: BString::from(path),
            fragment: StatusFragment::untracked(),
            baseline_info: None,
            staged_info: None,
        };
        self.buf.advance(end + 1);

        Some(Some(record))
    }
}

fn decode_diff_record(format: RecordFormat, meta: &[u8], path: &[u8]) -> Option<ParsedRecord> {
    let fields = match DiffFields::parse(meta) {
        Some(fields) => fields,
        None => {
            log::warn!(
                "skipping malformed diff record {:?} for {}",
                meta.as_bstr(),
                path.as_bstr()
            );
            return None;
        }
    };

    let (fragment, baseline_info, staged_info) = match format {
        RecordFormat::DiffIndex => (
            StatusFragment::baseline(fields.status),
            Some(fields.src),
            Some(fields.dst),
        ),
        RecordFormat::DiffFiles => (StatusFragment::staged(fields.status), None, Some(fields.src)),
        RecordFormat::Others => return None,
    };

    Some(ParsedRecord {
        path: BString::from(path),
        fragment,
        baseline_info,
        staged_info,
    })
}

struct DiffFields {
    src: FileInfo,
    dst: FileInfo,
    status: SlotStatus,
}

impl DiffFields {
    fn parse(meta: &[u8]) -> Option<Self> {
        let meta = std::str::from_utf8(meta).ok()?;
        let meta = meta.strip_prefix(':').unwrap_or(meta);
        let fields: Vec<&str> = meta.split(' ').collect();
        if fields.len() < 5 {
            return None;
        }

        // the letter may carry a similarity score, e.g. R086
        let letter = fields[4].chars().next()?;
        let status = match SlotStatus::from_char(letter) {
            Some(SlotStatus::Unmodified) | Some(SlotStatus::Untracked) | None => {
                log::debug!("unexpected diff status {letter:?}, treating as modified");
                SlotStatus::Modified
            }
            Some(status) => status,
        };

        Some(Self {
            src: FileInfo::parse(fields[0], fields[2])?,
            dst: FileInfo::parse(fields[1], fields[3])?,
            status,
        })
    }
}
