//! 多模式字面量/正则扫描门面
//!
//! 设计要点：
//! - “一次编译、多次扫描”：CompiledMatcher 构建后不可变，可跨线程只读共享，
//!   每个线程各自驱动独立的扫描调用（单编译多并发扫描的高吞吐形态）。
//! - 字节级匹配优先：全部匹配跑在原始字节上，避免 UTF-8 解码失败导致漏检。
//! - 全字面量集合走 Aho-Corasick 快路径；一般集合走 regex-automata meta 多模式引擎。
//! - 命中通过同步回调逐个上报，回调返回 Stop 即提前终止（协作式取消，无超时机制）。
//! - gzip/zstd 输入按魔数识别后在内存解压再扫描；文件路径问题统一映射为“无效文件”。
//! - 宿主能力检查一次性执行并缓存，首次编译前隐式触发。

mod compat;
mod decompress;
mod error;
mod flags;
mod grep;
mod matcher;
mod parallel;
mod pattern;
mod rules;
mod scan;

pub use compat::check_compatibility;
pub use error::{
    ScanError, RC_CAPABILITY_ERROR, RC_COMPILE_ERROR, RC_INVALID_FILE, RC_INVALID_INPUT,
    RC_SCAN_TERMINATED, RC_SUCCESS,
};
pub use flags::{PatternFlags, CASELESS, DOTALL, MULTILINE, SINGLEMATCH};
pub use grep::{grep, grep_lines, LineMatch};
pub use matcher::{compile, CompiledMatcher};
pub use parallel::{parallel_grep, GrepOptions, GrepStats};
pub use pattern::Pattern;
pub use rules::load_pattern_file;
pub use scan::{scan, scan_collect, MatchEvent, ScanAction, ScanStatus, ScanSummary};
