//! 事务日志存储
//!
//! 只追加的日志文件；服务器自身的 `shutdown` 不会关闭它

use crate::server::monitor::lock_unpoisoned;
use crate::server::traits::StorageHandle;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// 事务日志文件名
pub const TXN_LOG_FILE: &str = "txnlog";

/// 持久化数据存储
#[derive(Debug)]
pub struct DataStore {
    path: PathBuf,
    log: Mutex<Option<BufWriter<File>>>,
}

impl DataStore {
    /// 打开（必要时创建）日志目录下的事务日志
    pub fn open(log_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(TXN_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Transaction log opened");

        Ok(Self {
            path,
            log: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条带时间戳的记录
    pub fn append(&self, entry: &str) -> io::Result<()> {
        let mut guard = lock_unpoisoned(&self.log);
        match guard.as_mut() {
            Some(writer) => writeln!(writer, "{} {}", chrono::Utc::now().to_rfc3339(), entry),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "transaction log is closed",
            )),
        }
    }

    /// 追加一条记录，失败只记录日志
    ///
    /// 返回是否写入成功
    pub fn record(&self, entry: &str) -> bool {
        match self.append(entry) {
            Ok(()) => true,
            Err(e) => {
                warn!(entry = entry, error = %e, "Failed to record entry in transaction log");
                false
            }
        }
    }
}

impl StorageHandle for DataStore {
    /// 刷新并释放日志文件，重复调用无副作用
    fn close(&self) -> io::Result<()> {
        let writer = lock_unpoisoned(&self.log).take();
        if let Some(mut writer) = writer {
            writer.flush()?;
            debug!(path = %self.path.display(), "Transaction log closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        lock_unpoisoned(&self.log).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_flushes_entries_and_rejects_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();
        store.append("session 1 created").unwrap();

        store.close().unwrap();
        assert!(store.is_closed());
        store.close().unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("session 1 created"));
        assert_eq!(
            store.append("late").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }

    #[test]
    fn test_record_reports_failure_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();

        assert!(store.record("startup"));
        store.close().unwrap();
        assert!(!store.record("shutdown"));

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("startup"));
        assert!(!content.contains("shutdown"));
    }
}
