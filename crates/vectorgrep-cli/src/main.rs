use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use vectorgrep_core::{
    check_compatibility, compile, grep, load_pattern_file, parallel_grep, CompiledMatcher,
    GrepOptions, Pattern, PatternFlags, ScanAction, CASELESS,
};

/// 命令行入口（grep 风格，基于 clap）
#[derive(Parser, Debug)]
#[command(name = "vectorgrep", version, about = "多模式并行 grep（字节级扫描引擎，支持 gz/zst 透明解压）")]
struct Cli {
    /// 匹配模式；当 -e/-f/--rules 提供了模式时，该位置参数按文件处理（与 grep 习惯一致）
    pattern: Option<String>,

    /// 待扫描文件列表
    files: Vec<PathBuf>,

    /// 追加模式（可多次）
    #[arg(short = 'e', long = "regexp")]
    patterns: Vec<String>,

    /// 模式文件：每行一条模式
    #[arg(short = 'f', long = "file")]
    pattern_file: Option<PathBuf>,

    /// TOML 规则文件（带 id 与标志）
    #[arg(long)]
    rules: Option<PathBuf>,

    /// 大小写不敏感（作用于 -e/-f/位置参数模式；规则文件自带标志）
    #[arg(short = 'i', long = "ignore-case")]
    ignore_case: bool,

    /// 每文件只输出命中行数
    #[arg(short = 'c', long = "count")]
    count: bool,

    /// 只输出全部文件的命中总数
    #[arg(long)]
    total: bool,

    /// 输出行号
    #[arg(short = 'n', long = "line-number")]
    line_number: bool,

    /// 输出文件名前缀（多文件时自动开启）
    #[arg(short = 'H', long = "with-filename")]
    with_filename: bool,

    /// 只输出命中的片段本身
    #[arg(short = 'o', long = "only-matching")]
    only_matching: bool,

    /// 每文件最多输出的命中数
    #[arg(short = 'm', long = "max-count")]
    max_count: Option<usize>,

    /// 线程数（"auto"=CPU 核心数）
    #[arg(long, default_value = "auto")]
    threads: String,

    /// 以 JSON 行输出原始命中事件（文件、模式 id、字节偏移）
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // 初始化日志（支持 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    // 能力检查失败属不可恢复条件，直接报给用户
    check_compatibility().context("host capability check failed")?;

    let patterns = resolve_patterns(&cli)?;
    let files = resolve_files(&cli);
    if files.is_empty() {
        bail!("no input files");
    }

    let matcher = Arc::new(compile(&patterns).context("compile patterns")?);
    info!(patterns = patterns.len(), files = files.len(), "starting scan");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let matched = if cli.json {
        json_grep(&files, &matcher, &mut out)?
    } else {
        let opts = GrepOptions {
            with_file_name: cli.with_filename || files.len() > 1,
            with_line_number: cli.line_number,
            count_results: cli.count,
            total_results: cli.total,
            only_matching: cli.only_matching,
            max_match_count: cli.max_count,
            threads: parse_threads(&cli.threads),
        };
        let stats = parallel_grep(&files, &matcher, &opts, &mut out)?;
        info!(
            files_scanned = stats.files_scanned,
            lines_matched = stats.lines_matched,
            "scan finished"
        );
        stats.lines_matched
    };
    out.flush().ok();

    // grep 约定：有命中退出 0，无命中退出 1
    if matched == 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// JSON 行输出：每个命中事件一行；返回事件总数
fn json_grep(
    files: &[PathBuf],
    matcher: &Arc<CompiledMatcher>,
    out: &mut dyn Write,
) -> Result<usize> {
    let mut total = 0usize;
    for path in files {
        let mut events = Vec::new();
        // 单个文件失败不终止整体，与行模式的容忍一致
        if grep(matcher, path, |ev| {
            events.push(ev);
            ScanAction::Continue
        })
        .is_err()
        {
            continue;
        }
        for ev in &events {
            let item = serde_json::json!({
                "file": path.display().to_string(),
                "pattern_id": ev.pattern_id,
                "start": ev.start,
                "end": ev.end,
            });
            serde_json::to_writer(&mut *out, &item)?;
            writeln!(out)?;
        }
        total += events.len();
    }
    Ok(total)
}

/// 汇总全部模式来源并分配 id
/// - 规则文件条目保留自带 id；-e/-f/位置参数按出现顺序在其后编号
fn resolve_patterns(cli: &Cli) -> Result<Vec<Pattern>> {
    let mut patterns: Vec<Pattern> = Vec::new();
    let mut texts: Vec<String> = Vec::new();
    let mut explicit = false;

    if !cli.patterns.is_empty() {
        texts.extend(cli.patterns.iter().cloned());
        explicit = true;
    }
    if let Some(pf) = &cli.pattern_file {
        let content = std::fs::read_to_string(pf)
            .with_context(|| format!("read pattern file {}", pf.display()))?;
        texts.extend(content.lines().filter(|l| !l.is_empty()).map(str::to_string));
        explicit = true;
    }
    if let Some(rules) = &cli.rules {
        patterns.extend(load_pattern_file(rules)?);
        explicit = true;
    }
    // 任一选项提供了模式时，位置参数回归为文件（见 resolve_files）
    if !explicit {
        match &cli.pattern {
            Some(p) => texts.push(p.clone()),
            None => bail!("no pattern provided"),
        }
    }

    let base = patterns.iter().map(|p| p.id + 1).max().unwrap_or(0);
    let flags = if cli.ignore_case { CASELESS } else { PatternFlags::empty() };
    for (i, text) in texts.into_iter().enumerate() {
        patterns.push(Pattern::with_flags(text, base + i as u32, flags));
    }
    Ok(patterns)
}

/// 待扫描文件列表：当模式由选项提供时，位置参数 pattern 视为首个文件
fn resolve_files(cli: &Cli) -> Vec<PathBuf> {
    let explicit = !cli.patterns.is_empty() || cli.pattern_file.is_some() || cli.rules.is_some();
    let mut files = Vec::new();
    if explicit {
        if let Some(p) = &cli.pattern {
            files.push(PathBuf::from(p));
        }
    }
    files.extend(cli.files.iter().cloned());
    files
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") {
        return None;
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
