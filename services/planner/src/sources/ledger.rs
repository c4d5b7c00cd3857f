use super::traits::LedgerSource;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Budget spreadsheet exported as CSV or Parquet.
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl LedgerSource for FileLedger {
    fn name(&self) -> &str {
        "file-ledger"
    }

    async fn load_ledger(&self) -> Result<DataFrame> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_ledger_file(&path))
            .await
            .context("Ledger reader task failed")?
    }
}

/// Picks the reader from the file extension.
pub fn read_ledger_file(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        bail!("Ledger file not found: {:?}", path);
    }

    match path.extension().and_then(|s| s.to_str()) {
        Some("csv") => LazyCsvReader::new(path)
            .finish()
            .and_then(|lf| lf.collect())
            .with_context(|| format!("Failed to read ledger CSV {:?}", path)),
        Some("parquet") => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open ledger {:?}", path))?;
            ParquetReader::new(file)
                .finish()
                .with_context(|| format!("Failed to read ledger Parquet {:?}", path))
        }
        other => bail!("Unsupported ledger format {:?} for {:?}", other, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_ledger_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("finance.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bulan_id,budget_final_game").unwrap();
        writeln!(file, "202501,250000").unwrap();
        writeln!(file, "202502,250000.5").unwrap();
        drop(file);

        let ledger = FileLedger::new(&path);
        let df = ledger.load_ledger().await.unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("bulan_id").is_ok());
        assert!(df.column("budget_final_game").is_ok());
    }

    #[tokio::test]
    async fn test_file_ledger_missing() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = FileLedger::new(temp_dir.path().join("nope.csv"));
        let err = ledger.load_ledger().await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("finance.xlsx");
        std::fs::write(&path, b"binary").unwrap();
        let err = read_ledger_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported ledger format"));
    }
}
