use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use crate::{
    domain::{MessageId, MessageRecord},
    errors::Error,
    formatting::{format_message_block, parse_heading_id, BLOCK_SEPARATOR},
    Result,
};

/// How an output file is opened at job start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    Overwrite,
}

/// Appends message blocks to one channel's output file.
///
/// Each block is a single write followed by a flush, so an interrupted run
/// loses at most the message being written.
pub struct MarkdownWriter {
    path: PathBuf,
    file: File,
    written: u64,
}

impl MarkdownWriter {
    /// Open `path`; overwrite mode truncates it once, here.
    pub fn open(path: impl Into<PathBuf>, mode: WriteMode) -> Result<Self> {
        let path = path.into();
        let mut opts = OpenOptions::new();
        opts.create(true);
        match mode {
            WriteMode::Append => opts.append(true),
            WriteMode::Overwrite => opts.write(true).truncate(true),
        };
        let file = opts.open(&path).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn append(&mut self, record: &MessageRecord) -> Result<()> {
        let block = format_message_block(record);
        self.file
            .write_all(block.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| Error::Write {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }
}

/// Id of the last block already exported to `path`, if the file exists.
///
/// A heading counts only at the start of the file or right after a separator
/// and only in its exact rendered form; body lines of that form are escaped
/// on write.
pub fn last_exported_id(path: &Path) -> Result<Option<MessageId>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut last: Option<MessageId> = None;
    let mut at_block_start = true;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if at_block_start {
            if let Some(id) = parse_heading_id(&line) {
                last = Some(MessageId(id));
            }
        }
        at_block_start = line == BLOCK_SEPARATOR;
    }
    Ok(last)
}
