//! Terminal and log-file output.

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::color::TermColor;
use crate::error::ConsoleLogError;

/// Resolves an output target argument to a log-file path.
///
/// `file:<path>` always names a file. A bare value names a file when it
/// contains a path separator or a `.`. Anything else means no file.
pub fn parse_file_target(target: &str) -> Option<PathBuf> {
    let target = target.trim();
    if let Some(path) = target.strip_prefix("file:") {
        return (!path.is_empty()).then(|| PathBuf::from(path));
    }
    if target.contains(['/', '\\', '.']) {
        return Some(PathBuf::from(target));
    }
    None
}

/// Removes ANSI escape sequences (CSI, OSC and two-byte Fe escapes).
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.contains('\x1b') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != 0x1b {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1).copied() {
            None => i += 1,
            Some(b'[') => {
                i += 2;
                while i < bytes.len() {
                    let b = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&b) {
                        break;
                    }
                }
            }
            Some(b']') => {
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            Some(0x40..=0x5f) => i += 2,
            Some(_) => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Fan-out writer: colorized terminal plus an optional plain append-only file.
///
/// The two targets fail independently. A terminal error is reported once
/// and writing continues; a file error is reported once and the file is
/// dropped for the rest of the session.
pub struct OutputSink {
    terminal: Box<dyn Write + Send>,
    colors: bool,
    file: Option<FileSink>,
    terminal_failed: bool,
    closed: bool,
}

impl OutputSink {
    pub fn new(terminal: Box<dyn Write + Send>, colors: bool) -> Self {
        Self {
            terminal,
            colors,
            file: None,
            terminal_failed: false,
            closed: false,
        }
    }

    /// Sink writing to standard output.
    pub fn stdout(colors: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), colors)
    }

    /// Opens `path` for appending and writes the session-start marker.
    ///
    /// Parent directories are created as needed. Replaces any file already
    /// attached, closing it first.
    pub fn attach_file(&mut self, path: &Path) -> Result<(), ConsoleLogError> {
        self.close_file();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "=== devtap session started {} ===", now_rfc3339())?;
        writer.flush()?;

        tracing::info!(path = %path.display(), "log file opened");
        self.file = Some(FileSink {
            path: path.to_path_buf(),
            writer,
        });
        Ok(())
    }

    /// Path of the attached log file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    /// Writes already formatted, newline-terminated text.
    ///
    /// With colors on, each line is painted separately so escapes never
    /// span a newline. The file copy never carries escapes.
    pub fn write_line(&mut self, text: &str, color: Option<TermColor>) {
        if self.closed {
            return;
        }

        let painted = match color.filter(|_| self.colors) {
            Some(color) => Cow::Owned(paint_lines(text, color)),
            None => Cow::Borrowed(text),
        };
        let result = self
            .terminal
            .write_all(painted.as_bytes())
            .and_then(|()| self.terminal.flush());
        if let Err(e) = result {
            if !self.terminal_failed {
                tracing::warn!(error = %e, "terminal write failed");
                self.terminal_failed = true;
            }
        }

        if let Some(file) = self.file.as_mut() {
            let plain = strip_ansi(text);
            let result = file
                .writer
                .write_all(plain.as_bytes())
                .and_then(|()| file.writer.flush());
            if let Err(e) = result {
                tracing::warn!(
                    path = %file.path.display(),
                    error = %e,
                    "log file write failed, disabling file output"
                );
                self.file = None;
            }
        }
    }

    /// Writes the session-end marker, closes the file and flushes the
    /// terminal. Further writes are ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.close_file();
        let _ = self.terminal.flush();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn close_file(&mut self) {
        if let Some(mut file) = self.file.take() {
            let result = writeln!(file.writer, "=== devtap session ended {} ===", now_rfc3339())
                .and_then(|()| file.writer.flush());
            match result {
                Ok(()) => tracing::info!(path = %file.path.display(), "log file closed"),
                Err(e) => tracing::warn!(error = %e, "failed to finalize log file"),
            }
        }
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn paint_lines(text: &str, color: TermColor) -> String {
    text.split_inclusive('\n')
        .map(|line| match line.strip_suffix('\n') {
            Some(body) => format!("{}\n", color.paint(body)),
            None => color.paint(line),
        })
        .collect()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// In-memory terminal for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CaptureBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
