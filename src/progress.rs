//! Progress bars for batched index writes, and a log writer that prints
//! above them instead of through them.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        if io::stderr().is_terminal() {
            mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        } else {
            mp.set_draw_target(ProgressDrawTarget::hidden());
        }
        mp
    })
}

/// Progress bar over `total_batches` write batches; hidden when `visible` is false
pub fn batch_progress(total_batches: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = multi_progress().add(ProgressBar::new(total_batches));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} indexing [{bar:30}] batch {pos}/{len} {msg}",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Print one log line above any active bars, or straight to stderr when bars are hidden
fn print_line(line: &str) {
    let mp = multi_progress();
    if mp.is_hidden() {
        let _ = writeln!(io::stderr(), "{}", line);
    } else {
        let _ = mp.println(line);
    }
}

/// `MakeWriter` for tracing-subscriber that keeps progress bars pinned
#[derive(Default, Clone)]
pub struct LogWriterFactory;

pub struct LogWriter {
    pending: Vec<u8>,
}

impl LogWriter {
    fn emit_complete_lines(&mut self) {
        while let Some(idx) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=idx).collect();
            let text = String::from_utf8_lossy(&line);
            print_line(text.trim_end_matches(['\n', '\r']));
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.emit_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines();
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).to_string();
            print_line(&rest);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            pending: Vec::new(),
        }
    }
}
