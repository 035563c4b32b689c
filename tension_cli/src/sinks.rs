//! Output collaborators: JSONL record persistence and the CSV sample log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread::JoinHandle;

use eyre::{Result, WrapErr};
use tension_core::session::{RecordSink, TensionRecord};

/// Appends accepted tension records as one JSON object per line.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("open record file {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for JsonlSink {
    fn store(
        &mut self,
        record: &TensionRecord,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let line = serde_json::json!({
            "tension_g": record.tension_g,
            "frequency_hz": record.frequency_hz,
            "measured_at": record.measured_at.to_rfc3339(),
            "operator": record.operator,
            "tube_id": record.tube_id,
        });
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// One filtered sample from the motion loop.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub elapsed_ms: u64,
    pub tension_g: f32,
}

/// CSV sample log fed from the control loop over a channel; the file write
/// happens on its own thread so it never stalls a tick.
pub struct SampleLog {
    tx: crossbeam_channel::Sender<Sample>,
    handle: JoinHandle<Result<()>>,
}

impl SampleLog {
    pub fn spawn(path: &Path) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)
            .wrap_err_with(|| format!("open sample log {}", path.display()))?;
        writer
            .write_record(["elapsed_ms", "tension_g"])
            .wrap_err("write sample log header")?;

        let (tx, rx) = crossbeam_channel::unbounded::<Sample>();
        let handle = std::thread::spawn(move || -> Result<()> {
            for sample in rx {
                writer
                    .write_record([
                        sample.elapsed_ms.to_string(),
                        format!("{:.2}", sample.tension_g),
                    ])
                    .wrap_err("write sample log row")?;
            }
            writer.flush().wrap_err("flush sample log")?;
            Ok(())
        });
        Ok(Self { tx, handle })
    }

    pub fn sender(&self) -> crossbeam_channel::Sender<Sample> {
        self.tx.clone()
    }

    /// Close the channel and wait for the writer to flush.
    pub fn finish(self) -> Result<()> {
        drop(self.tx);
        match self.handle.join() {
            Ok(res) => res,
            Err(_) => Err(eyre::eyre!("sample log writer panicked")),
        }
    }
}
