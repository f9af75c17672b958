//! 文件便捷扫描（grep / grep_lines）
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use memchr::memchr_iter;
use serde::Serialize;

use crate::decompress::maybe_decompress;
use crate::error::ScanError;
use crate::matcher::CompiledMatcher;
use crate::scan::{scan, scan_collect, MatchEvent, ScanAction, ScanSummary};

/// 行粒度命中（1 基行号；行文本保留结尾换行符）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub line_number: u64,
    pub line: String,
    /// 该行首个命中事件所属的模式 id
    pub pattern_id: u32,
}

/// 读取文件全部字节；gzip/zstd 输入按魔数识别后在内存中解压
/// - 打不开、读不了、解压失败一律映射为 InvalidFile（“无效文件”结果码）
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, ScanError> {
    let file = File::open(path).map_err(|e| invalid_file(path, &e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(|e| invalid_file(path, &e.to_string()))?;
    maybe_decompress(buf).map_err(|e| invalid_file(path, &e.to_string()))
}

fn invalid_file(path: &Path, reason: &str) -> ScanError {
    ScanError::InvalidFile { path: path.to_path_buf(), reason: reason.to_string() }
}

/// 对单个文件执行一趟扫描：整读（必要时解压）后匹配，不做流式分块
/// - 文件读取失败时回调不会被调用
pub fn grep<F>(matcher: &CompiledMatcher, path: &Path, on_match: F) -> Result<ScanSummary, ScanError>
where
    F: FnMut(MatchEvent) -> ScanAction,
{
    let buf = read_input(path)?;
    scan(matcher, &buf, on_match)
}

/// 行导向的文件扫描：每个命中行只上报一次（归属该行首个事件的模式）
pub fn grep_lines(matcher: &CompiledMatcher, path: &Path) -> Result<Vec<LineMatch>, ScanError> {
    let buf = read_input(path)?;
    let events = scan_collect(matcher, &buf)?;
    let index = LineIndex::new(&buf);

    let mut out: Vec<LineMatch> = Vec::new();
    // 事件按 start 全局有序，行号单调不减，去重只需比对上一行
    let mut last_line: Option<usize> = None;
    for ev in events {
        let li = index.line_of(ev.start);
        if last_line == Some(li) {
            continue;
        }
        last_line = Some(li);
        let (s, e) = index.span(li);
        out.push(LineMatch {
            line_number: (li + 1) as u64,
            line: String::from_utf8_lossy(&buf[s..e]).into_owned(),
            pattern_id: ev.pattern_id,
        });
    }
    Ok(out)
}

/// 行号索引：一次 memchr 建表，事件偏移二分定位
pub(crate) struct LineIndex {
    /// 每行的起始偏移（首行恒为 0）
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub(crate) fn new(buf: &[u8]) -> Self {
        let mut starts = vec![0];
        for pos in memchr_iter(b'\n', buf) {
            if pos + 1 < buf.len() {
                starts.push(pos + 1);
            }
        }
        Self { starts, len: buf.len() }
    }

    /// 偏移所在行（0 基）
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        }
    }

    /// 行的字节区间 [start, end)；end 含结尾换行符（若有）
    pub(crate) fn span(&self, line: usize) -> (usize, usize) {
        let s = self.starts[line];
        let e = self.starts.get(line + 1).copied().unwrap_or(self.len);
        (s, e)
    }
}
