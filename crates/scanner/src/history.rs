use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use interface::HistoryRecord;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 코인별 추가 전용 로그
/// 기존 레코드는 절대 수정하거나 지우지 않는다
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, coin: &str, record: HistoryRecord) -> Result<(), HistoryError>;

    /// 코인의 레코드를 기록 순서대로 반환
    async fn records(&self, coin: &str) -> Result<Vec<HistoryRecord>, HistoryError>;

    /// 코인의 레코드 수
    async fn count(&self, coin: &str) -> usize;
}

/// 파일 한 줄 = 레코드 하나
#[derive(Debug, Serialize, Deserialize)]
struct HistoryLine {
    coin: String,
    record: HistoryRecord,
}

struct JsonlState {
    file: File,
    counts: HashMap<String, usize>,
}

/// JSON Lines 파일 기반 히스토리
///
/// 파일은 append 모드로만 연다. 메모리에는 코인별 개수만 유지하고
/// 레코드 조회는 파일을 다시 읽는다.
pub struct JsonlHistory {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlHistory {
    /// 파일이 없으면 빈 로그로 시작한다
    /// 읽을 수 없는 줄은 경고만 남기고 건너뛴다
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();

        let existing = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("history file {} unreadable, starting empty: {}", path.display(), e);
                Vec::new()
            }
        };

        let (lines, skipped) = parse_lines(&String::from_utf8_lossy(&existing));
        if skipped > 0 {
            warn!(
                "history file {}: {}개 손상된 줄 무시",
                path.display(),
                skipped
            );
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for line in &lines {
            *counts.entry(line.coin.clone()).or_default() += 1;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        // 마지막 줄이 중간에 끊긴 경우 다음 레코드가 붙지 않도록 줄바꿈 추가
        if existing.last().is_some_and(|b| *b != b'\n') {
            file.write_all(b"\n").await?;
        }

        info!(
            "히스토리 로드 완료: {} ({}개 레코드, {}개 코인)",
            path.display(),
            lines.len(),
            counts.len()
        );

        Ok(Self {
            path,
            state: Mutex::new(JsonlState { file, counts }),
        })
    }
}

fn parse_lines(content: &str) -> (Vec<HistoryLine>, usize) {
    let mut lines = Vec::new();
    let mut skipped = 0;

    for raw in content.lines() {
        if raw.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryLine>(raw) {
            Ok(line) => lines.push(line),
            Err(_) => skipped += 1,
        }
    }

    (lines, skipped)
}

#[async_trait]
impl HistoryStore for JsonlHistory {
    async fn append(&self, coin: &str, record: HistoryRecord) -> Result<(), HistoryError> {
        let line = HistoryLine {
            coin: coin.to_string(),
            record,
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');

        let mut state = self.state.lock().await;
        state.file.write_all(&bytes).await?;
        state.file.flush().await?;
        *state.counts.entry(coin.to_string()).or_default() += 1;

        Ok(())
    }

    async fn records(&self, coin: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        // 쓰기와 겹치지 않도록 잠금을 잡고 읽는다
        let _state = self.state.lock().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(parse_lines(&content)
            .0
            .into_iter()
            .filter(|line| line.coin == coin)
            .map(|line| line.record)
            .collect())
    }

    async fn count(&self, coin: &str) -> usize {
        self.state
            .lock()
            .await
            .counts
            .get(coin)
            .copied()
            .unwrap_or_default()
    }
}

/// 메모리 히스토리 (테스트, dry-run 용)
#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<HashMap<String, Vec<HistoryRecord>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, coin: &str, record: HistoryRecord) -> Result<(), HistoryError> {
        self.records
            .lock()
            .await
            .entry(coin.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn records(&self, coin: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self
            .records
            .lock()
            .await
            .get(coin)
            .cloned()
            .unwrap_or_default())
    }

    async fn count(&self, coin: &str) -> usize {
        self.records.lock().await.get(coin).map_or(0, Vec::len)
    }
}
