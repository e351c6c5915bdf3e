use std::path::{Path, PathBuf};

use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::{
    errors::{self, Errors},
    interface::{ILineSource, LineRead},
};

/// Follows a log file that is still being written.
///
/// Reaching the end of the file only means "no data yet". The stream is
/// closed once the file has been removed.
#[derive(Debug)]
pub struct TailSource {
    path: PathBuf,
    reader: BufReader<File>,
    pending: Vec<u8>,
}

impl TailSource {
    pub async fn open(path: &Path) -> errors::Result<Self> {
        let file = File::open(path).await.map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => Errors::InputNotFound(path.display().to_string()),
            _ => Errors::IOError(error),
        })?;

        log::debug!("Tailing {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            pending: vec![],
        })
    }

    fn take_pending(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_owned();
        self.pending.clear();
        line
    }
}

#[async_trait::async_trait]
impl ILineSource for TailSource {
    async fn next_line(&mut self) -> errors::Result<LineRead> {
        let read = self.reader.read_until(b'\n', &mut self.pending).await?;

        if read == 0 {
            if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
                return Ok(LineRead::Pending);
            }
            if !self.pending.is_empty() {
                return Ok(LineRead::Line(self.take_pending()));
            }
            log::debug!("{} has been removed", self.path.display());
            return Ok(LineRead::Closed);
        }

        // a partial line stays buffered until the writer finishes it
        if self.pending.last() != Some(&b'\n') {
            return Ok(LineRead::Pending);
        }

        Ok(LineRead::Line(self.take_pending()))
    }
}
