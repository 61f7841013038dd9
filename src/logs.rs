//! Run-owned log streams.
//!
//! Each run gets its own directory `<logs_dir>/<task>_<timestamp>/` with
//! three append-only streams (`info.out`, `err.out`, `tx.out`), every line
//! prefixed with a wall-clock timestamp. The final attempt report is written
//! next to them. The struct is opened at run start and passed explicitly to
//! every component that logs; there is no global logger state.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{error, info};

use crate::error::Result;
use crate::types::MintAttempt;

const LINE_STAMP: &str = "%Y-%m-%d %H:%M:%S";
const DIR_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

pub struct RunLogs {
    dir: PathBuf,
    stamp: String,
    info: Mutex<BufWriter<File>>,
    err: Mutex<BufWriter<File>>,
    tx: Mutex<BufWriter<File>>,
}

impl RunLogs {
    /// Create the run directory and open the three streams.
    pub fn open(logs_dir: &Path, task: &str) -> Result<Self> {
        let stamp = Local::now().format(DIR_STAMP).to_string();
        let dir = logs_dir.join(format!("{}_{}", task, stamp));
        fs::create_dir_all(&dir)?;
        Ok(Self {
            info: Mutex::new(Self::open_stream(&dir, "info")?),
            err: Mutex::new(Self::open_stream(&dir, "err")?),
            tx: Mutex::new(Self::open_stream(&dir, "tx")?),
            dir,
            stamp,
        })
    }

    fn open_stream(dir: &Path, method: &str) -> Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{}.out", method)))?;
        Ok(BufWriter::new(file))
    }

    fn write_line(stream: &Mutex<BufWriter<File>>, msg: &str) {
        let mut writer = match stream.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stamp = Local::now().format(LINE_STAMP);
        // Log writes are best effort; a full disk must not kill the run.
        let _ = writeln!(writer, "{} >> {}", stamp, msg);
        let _ = writer.flush();
    }

    pub fn info(&self, msg: &str) {
        info!("{}", msg);
        Self::write_line(&self.info, msg);
    }

    pub fn err(&self, msg: &str) {
        error!("{}", msg);
        Self::write_line(&self.err, msg);
    }

    pub fn tx(&self, signature: &str) {
        info!(">>> MINT TX: {}", signature);
        Self::write_line(&self.tx, signature);
    }

    /// Persist the full attempt list as one JSON document.
    pub fn write_report(&self, attempts: &[MintAttempt]) -> Result<PathBuf> {
        let path = self.dir.join(format!("mint_result_{}.json", self.stamp));
        fs::write(&path, serde_json::to_string(attempts)?)?;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
