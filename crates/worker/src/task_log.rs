//! 任务日志文件
//!
//! 每个任务对应一个只追加的日志文件，子进程的 stdout/stderr 直接写入其中。
//! 查看日志时从文件末尾向前读取，只加载需要的部分。

use panel_core::{PanelError, PanelResult};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const CHUNK_SIZE: u64 = 64 * 1024;

async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// 以追加模式打开日志文件，必要时创建父目录
pub async fn open_for_append(path: impl AsRef<Path>) -> std::io::Result<std::fs::File> {
    let path = path.as_ref();
    ensure_parent_dir(path).await?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(file.into_std().await)
}

/// 向日志末尾追加一行
pub async fn append_line(path: impl AsRef<Path>, line: &str) -> std::io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path).await?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}

/// 读取日志最后 `lines` 行，最新的一行在最前
///
/// 文件不存在或无法读取时返回 `LogUnavailable`。
pub async fn tail_reversed(path: impl AsRef<Path>, lines: usize) -> PanelResult<String> {
    let path = path.as_ref();
    let unavailable = |e: std::io::Error| PanelError::LogUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let mut file = File::open(path).await.map_err(unavailable)?;
    let len = file.metadata().await.map_err(unavailable)?.len();

    // 多读一个换行符，保证开头不完整的那一行可以被丢弃
    let mut pos = len;
    let mut buf: Vec<u8> = Vec::new();
    let mut newlines = 0usize;
    while pos > 0 && newlines <= lines {
        let read = CHUNK_SIZE.min(pos);
        pos -= read;
        file.seek(SeekFrom::Start(pos)).await.map_err(unavailable)?;

        let mut chunk = vec![0u8; read as usize];
        file.read_exact(&mut chunk).await.map_err(unavailable)?;
        newlines += chunk.iter().filter(|b| **b == b'\n').count();
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    let text = String::from_utf8_lossy(&buf);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().rev().copied().collect::<Vec<_>>().join("\n"))
}
