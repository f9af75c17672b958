//! 多文件并行 grep 与输出调度
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ScanError;
use crate::grep::{read_input, LineIndex};
use crate::matcher::CompiledMatcher;
use crate::scan::{scan, ScanAction};

/// 输出选项（与 grep 习惯一致）
#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    /// 输出行带文件名前缀
    pub with_file_name: bool,
    /// 输出行带行号前缀（1 基）
    pub with_line_number: bool,
    /// 每文件只输出命中行数
    pub count_results: bool,
    /// 只在末尾输出全部文件的命中总数（总数不带文件名前缀）
    pub total_results: bool,
    /// 只输出命中的片段本身（逐事件输出，不做行去重）
    pub only_matching: bool,
    /// 每文件最多上报的命中数；达到后通过回调 Stop 提前终止该文件的扫描
    pub max_match_count: Option<usize>,
    /// 线程数；None 表示自动（CPU 核数）
    pub threads: Option<usize>,
}

/// 汇总统计（便于调用方打印或断言）
#[derive(Debug, Default, Clone)]
pub struct GrepStats {
    pub files_scanned: usize,
    pub lines_matched: usize,
}

/// 单个文件的扫描产出：已格式化的输出行 + 命中计数
struct FileOutput {
    lines: Vec<String>,
    matched: usize,
}

/// 并行扫描多个文件并按输入顺序输出
/// 稳定性保证：
/// - Worker 在后台线程内建 Rayon 池执行；Writer 留在调用线程，按文件下标重排，
///   输出顺序与输入文件顺序一致，可复现
/// - 单个文件读取失败不终止整体：该文件计为未扫描，跳过（与 grep 对缺失文件的容忍一致）
pub fn parallel_grep(
    files: &[PathBuf],
    matcher: &Arc<CompiledMatcher>,
    opts: &GrepOptions,
    out: &mut dyn Write,
) -> Result<GrepStats> {
    let threads = opts.threads.unwrap_or_else(num_cpus::get);
    let mut stats = GrepStats::default();
    let mut total = 0usize;

    // 串行快路径：单线程或单文件时不起池
    if threads <= 1 || files.len() <= 1 {
        for path in files {
            let rep = match grep_file(path, matcher, opts) {
                Ok(rep) => rep,
                Err(_) => continue,
            };
            flush_file(&rep, &mut stats, &mut total, out)?;
        }
        if opts.total_results {
            writeln!(out, "{total}")?;
        }
        return Ok(stats);
    }

    use crossbeam_channel as channel;
    use rayon::prelude::*;

    // 通道用于 worker → writer 传递结果；None 表示该文件扫描失败
    type Msg = (usize /*idx*/, Option<FileOutput>);
    let (tx, rx) = channel::bounded::<Msg>(256);

    let matcher = Arc::clone(matcher);
    let worker_opts = opts.clone();
    let files_vec: Vec<(usize, PathBuf)> = files.iter().cloned().enumerate().collect();

    let scan_thread = std::thread::spawn(move || {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("build rayon pool");
        pool.install(|| {
            files_vec.par_iter().for_each(|(idx, path)| {
                let rep = grep_file(path, &matcher, &worker_opts).ok();
                let _ = tx.send((*idx, rep));
            });
        });
        // 池退出后所有 Sender 释放，Writer 端随之收到关闭
    });

    // Writer：维护 next_idx 与缓存，按序冲刷
    let mut next_idx: usize = 0;
    let mut pending: BTreeMap<usize, Option<FileOutput>> = BTreeMap::new();

    while let Ok((idx, rep)) = rx.recv() {
        pending.insert(idx, rep);
        while let Some(slot) = pending.remove(&next_idx) {
            if let Some(rep) = slot {
                flush_file(&rep, &mut stats, &mut total, out)?;
            }
            next_idx += 1;
        }
    }

    let _ = scan_thread.join();

    // 残余冲刷（理论上缓存此时应已清空）
    while let Some(slot) = pending.remove(&next_idx) {
        if let Some(rep) = slot {
            flush_file(&rep, &mut stats, &mut total, out)?;
        }
        next_idx += 1;
    }

    if opts.total_results {
        writeln!(out, "{total}")?;
    }
    Ok(stats)
}

fn flush_file(
    rep: &FileOutput,
    stats: &mut GrepStats,
    total: &mut usize,
    out: &mut dyn Write,
) -> Result<()> {
    stats.files_scanned += 1;
    stats.lines_matched += rep.matched;
    *total += rep.matched;
    for line in &rep.lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// 扫描单个文件并按选项格式化输出行
fn grep_file(path: &Path, matcher: &CompiledMatcher, opts: &GrepOptions) -> Result<FileOutput, ScanError> {
    let buf = read_input(path)?;
    let index = LineIndex::new(&buf);
    let display = path.display().to_string();

    // count/total 模式只统计，不积累输出行
    let collect_lines = !opts.count_results && !opts.total_results;
    let mut lines: Vec<String> = Vec::new();
    let mut matched = 0usize;
    let mut last_line: Option<usize> = None;

    scan(matcher, &buf, |ev| {
        if opts.only_matching {
            matched += 1;
            if collect_lines {
                let text = String::from_utf8_lossy(&buf[ev.start..ev.end]);
                let line_no = opts.with_line_number.then(|| (index.line_of(ev.start) + 1) as u64);
                lines.push(format_line(&display, opts, line_no, &text));
            }
        } else {
            let li = index.line_of(ev.start);
            // 行去重：事件按 start 有序，只需与上一命中行比较
            if last_line != Some(li) {
                last_line = Some(li);
                matched += 1;
                if collect_lines {
                    let (s, e) = index.span(li);
                    let text = String::from_utf8_lossy(&buf[s..e]);
                    let text = text.trim_end_matches(['\r', '\n']);
                    let line_no = opts.with_line_number.then(|| (li + 1) as u64);
                    lines.push(format_line(&display, opts, line_no, text));
                }
            }
        }
        match opts.max_match_count {
            Some(cap) if matched >= cap => ScanAction::Stop,
            _ => ScanAction::Continue,
        }
    })?;

    if opts.count_results {
        lines = vec![if opts.with_file_name {
            format!("{display}:{matched}")
        } else {
            matched.to_string()
        }];
    }

    Ok(FileOutput { lines, matched })
}

/// 组装输出行：[file:][line:]text
fn format_line(display: &str, opts: &GrepOptions, line_no: Option<u64>, text: &str) -> String {
    let mut s = String::new();
    if opts.with_file_name {
        s.push_str(display);
        s.push(':');
    }
    if let Some(n) = line_no {
        s.push_str(&n.to_string());
        s.push(':');
    }
    s.push_str(text);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags;
    use crate::matcher::compile;
    use crate::pattern::Pattern;

    fn fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(files: &[PathBuf], patterns: &[Pattern], opts: GrepOptions) -> (Vec<String>, GrepStats) {
        let matcher = Arc::new(compile(patterns).unwrap());
        let mut out: Vec<u8> = Vec::new();
        let stats = parallel_grep(files, &matcher, &opts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        (text.lines().map(str::to_string).collect(), stats)
    }

    #[test]
    fn output_order_follows_input_order_under_parallelism() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "alpha\nfoobar\n");
        let f2 = fixture(&dir, "g2.txt", "foobar\nomega\n");
        let opts = GrepOptions {
            with_file_name: true,
            with_line_number: true,
            threads: Some(4),
            ..Default::default()
        };
        let (lines, stats) = run(&[f1.clone(), f2.clone()], &[Pattern::new("foobar", 0)], opts);
        assert_eq!(
            lines,
            vec![
                format!("{}:2:foobar", f1.display()),
                format!("{}:1:foobar", f2.display()),
            ]
        );
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.lines_matched, 2);
    }

    #[test]
    fn count_results_prints_per_file_counts() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "foo\nfoobar\nxx\nfoo\n");
        let opts = GrepOptions { count_results: true, ..Default::default() };
        let (lines, _) = run(&[f1], &[Pattern::new("foo", 0)], opts);
        assert_eq!(lines, vec!["3".to_string()]);
    }

    #[test]
    fn total_results_prints_single_unprefixed_total() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "foo\nfoo\n");
        let f2 = fixture(&dir, "g2.txt", "foo\n");
        let opts = GrepOptions {
            total_results: true,
            with_file_name: true,
            threads: Some(2),
            ..Default::default()
        };
        let (lines, stats) = run(&[f1, f2], &[Pattern::new("foo", 0)], opts);
        assert_eq!(lines, vec!["3".to_string()]);
        assert_eq!(stats.lines_matched, 3);
    }

    #[test]
    fn max_match_count_stops_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "foo\nfoo\nfoo\nfoo\nfoo\n");
        let opts = GrepOptions { max_match_count: Some(2), ..Default::default() };
        let (lines, stats) = run(&[f1], &[Pattern::new("foo", 0)], opts);
        assert_eq!(lines, vec!["foo".to_string(), "foo".to_string()]);
        assert_eq!(stats.lines_matched, 2);
    }

    #[test]
    fn only_matching_prints_spans() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "grep file to test patterns\nsync with others\n");
        let opts = GrepOptions { only_matching: true, ..Default::default() };
        let (lines, _) = run(
            &[f1],
            &[Pattern::new("grep file to test|sync with", 0)],
            opts,
        );
        assert_eq!(lines, vec!["grep file to test".to_string(), "sync with".to_string()]);
    }

    #[test]
    fn matching_line_printed_once_despite_redundant_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "foobar\n");
        let set = vec![
            Pattern::new("foobar", 0),
            Pattern::new("fo{2}bar", 1),
            Pattern::new("fo+bar", 2),
        ];
        let (lines, _) = run(&[f1], &set, GrepOptions::default());
        assert_eq!(lines, vec!["foobar".to_string()]);
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "foobar\n");
        let missing = dir.path().join("missing.txt");
        let (lines, stats) = run(&[missing, f1], &[Pattern::new("foobar", 0)], GrepOptions::default());
        assert_eq!(lines, vec!["foobar".to_string()]);
        assert_eq!(stats.files_scanned, 1);
    }

    #[test]
    fn caseless_flag_flows_through() {
        let dir = tempfile::tempdir().unwrap();
        let f1 = fixture(&dir, "g1.txt", "plain\nfOoBaR\n");
        let (lines, _) = run(
            &[f1],
            &[Pattern::with_flags("foobar", 0, flags::CASELESS)],
            GrepOptions::default(),
        );
        assert_eq!(lines, vec!["fOoBaR".to_string()]);
    }
}
